use crate::engine::FlowMatch;
use crate::ScanReport;

/// Capabilities listed for flows that are only partially held.
const PARTIAL_CAPABILITIES: usize = 2;

/// Render a scan report as plain console text: ready flows, partial flows,
/// then the per-operation breakdown.
pub fn render(scan: &ScanReport) -> String {
    let report = &scan.report;
    let mut output = String::new();

    let principal = scan.principal.as_deref().unwrap_or("principal");
    output.push_str(&format!(
        "\n  {}: score {} [{}]\n",
        principal, report.aggregate_score, report.risk_level
    ));

    if report.operations.is_empty() {
        output.push_str("\n  No tracked operations held.\n");
    }

    let ready: Vec<&FlowMatch> = report.ready_flows().collect();
    if !ready.is_empty() {
        output.push_str(&format!("\n  {} flow(s) ready:\n\n", ready.len()));
        for flow in ready {
            push_flow(&mut output, flow, usize::MAX);
        }
    }

    let partial: Vec<&FlowMatch> = report.partial_flows().collect();
    if !partial.is_empty() {
        output.push_str(&format!("\n  {} flow(s) partially available:\n\n", partial.len()));
        for flow in partial {
            push_flow(&mut output, flow, PARTIAL_CAPABILITIES);
        }
    }

    if !report.operations.is_empty() {
        output.push_str("\n  Operations:\n");
        for op in &report.operations {
            output.push_str(&format!(
                "    {:>3}  {:<40} {}\n",
                op.score, op.id, op.category
            ));
        }
    }

    if !report.unknown_operations.is_empty() {
        output.push_str(&format!(
            "\n  Untracked: {}\n",
            report.unknown_operations.join(", ")
        ));
    }

    let status = if scan.verdict.pass { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "\n  Result: {} (threshold: {}, risk: {})\n\n",
        status, scan.verdict.fail_threshold, report.risk_level
    ));

    output
}

fn push_flow(output: &mut String, flow: &FlowMatch, max_capabilities: usize) {
    let label = if flow.label.is_empty() {
        String::new()
    } else {
        format!("{} ", flow.label)
    };
    output.push_str(&format!(
        "  [{}] {}{} severity {} ({}/{} ops, {:.0}%)\n",
        flow.status,
        label,
        flow.flow,
        flow.severity,
        flow.matched.len(),
        flow.matched.len() + flow.missing.len(),
        flow.coverage * 100.0
    ));
    if !flow.description.is_empty() {
        output.push_str(&format!("           {}\n", flow.description));
    }
    for capability in flow.capabilities.iter().take(max_capabilities) {
        output.push_str(&format!("           - {}\n", capability));
    }
    if !flow.missing.is_empty() {
        output.push_str(&format!("           missing: {}\n", flow.missing.join(", ")));
    }
    output.push('\n');
}
