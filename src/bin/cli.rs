use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flowguard::catalog::{Catalog, Priority};
use flowguard::config::Config;
use flowguard::error::GuardError;
use flowguard::output::OutputFormat;
use flowguard::report::RiskLevel;
use flowguard::ScanOptions;

#[derive(Parser)]
#[command(
    name = "flowguard",
    about = "Risk scoring and attack-flow detection for AWS principals",
    version,
    author
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a principal's operation set and detect attack flows
    Scan {
        /// Operation list: JSON array/object or one identifier per line ("-" for stdin)
        input: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Catalog file (TOML or JSON) instead of the built-in AWS catalog
        #[arg(long, env = "FLOWGUARD_CATALOG")]
        catalog: Option<PathBuf>,

        /// Output format (console, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Minimum risk level to fail (low, medium, high, critical)
        #[arg(long)]
        fail_on: Option<String>,

        /// Only evaluate flows in these tiers (repeatable)
        #[arg(long = "tier")]
        tiers: Vec<String>,

        /// Fail when the input holds operations the catalog does not track
        #[arg(long)]
        strict: bool,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List catalog operations and their scores
    ListOperations {
        /// Catalog file instead of the built-in AWS catalog
        #[arg(long, env = "FLOWGUARD_CATALOG")]
        catalog: Option<PathBuf>,

        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// List catalog attack flows
    ListFlows {
        /// Catalog file instead of the built-in AWS catalog
        #[arg(long, env = "FLOWGUARD_CATALOG")]
        catalog: Option<PathBuf>,

        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Validate a catalog file
    Validate {
        /// Catalog file (TOML or JSON)
        catalog: PathBuf,
    },

    /// Generate a starter .flowguard.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Scan {
            input,
            config,
            catalog,
            format,
            fail_on,
            tiers,
            strict,
            output,
        } => cmd_scan(ScanArgs {
            input,
            config,
            catalog,
            format,
            fail_on,
            tiers,
            strict,
            output,
        }),
        Commands::ListOperations { catalog, format } => cmd_list_operations(catalog, format),
        Commands::ListFlows { catalog, format } => cmd_list_flows(catalog, format),
        Commands::Validate { catalog } => cmd_validate(catalog),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "flowguard=debug" } else { "flowguard=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct ScanArgs {
    input: PathBuf,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    format: String,
    fail_on: Option<String>,
    tiers: Vec<String>,
    strict: bool,
    output: Option<PathBuf>,
}

fn cmd_scan(args: ScanArgs) -> Result<i32, GuardError> {
    let format = OutputFormat::from_str_lenient(&args.format).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", args.format);
        OutputFormat::Console
    });

    let fail_on = args.fail_on.and_then(|s| {
        let level = RiskLevel::from_str_lenient(&s);
        if level.is_none() {
            eprintln!("Warning: unknown risk level '{}', using config default", s);
        }
        level
    });

    let tiers = Priority::parse_list(&args.tiers)?;

    let options = ScanOptions {
        config_path: args.config,
        catalog_path: args.catalog,
        format,
        fail_on_override: fail_on,
        tiers,
        strict: args.strict,
    };

    let report = flowguard::scan(&args.input, &options)?;
    let rendered = flowguard::render_report(&report, format)?;

    match args.output {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = pass, 1 = risk at or above threshold
    Ok(if report.verdict.pass { 0 } else { 1 })
}

fn load_catalog(path: Option<PathBuf>) -> Result<Catalog, GuardError> {
    match path {
        Some(path) => Catalog::load(&path),
        None => Catalog::builtin(),
    }
}

fn cmd_list_operations(catalog: Option<PathBuf>, format_str: String) -> Result<i32, GuardError> {
    let catalog = load_catalog(catalog)?;
    let operations = catalog.operations().all();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(operations)?;
            println!("{}", json);
        }
        _ => {
            println!("{:<42} {:<6} {:<16} DESCRIPTION", "ID", "SCORE", "CATEGORY");
            println!("{}", "-".repeat(100));
            for op in operations {
                println!(
                    "{:<42} {:<6} {:<16} {}",
                    op.id,
                    op.score,
                    op.category.to_string(),
                    op.description,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_list_flows(catalog: Option<PathBuf>, format_str: String) -> Result<i32, GuardError> {
    let catalog = load_catalog(catalog)?;
    let flows = catalog.flows().all();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(flows)?;
            println!("{}", json);
        }
        _ => {
            println!("{:<36} {:<10} {:<5} DESCRIPTION", "NAME", "TIER", "OPS");
            println!("{}", "-".repeat(100));
            for flow in flows {
                println!(
                    "{:<36} {:<10} {:<5} {}",
                    flow.name,
                    flow.priority.to_string(),
                    flow.required.len(),
                    flow.description,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_validate(path: PathBuf) -> Result<i32, GuardError> {
    match Catalog::load(&path) {
        Ok(catalog) => {
            println!(
                "{}: OK ({} operations, {} flows)",
                path.display(),
                catalog.operations().len(),
                catalog.flows().len()
            );
            Ok(0)
        }
        Err(GuardError::CatalogIntegrity(violations)) => {
            println!("{}: {} violation(s)", path.display(), violations.len());
            for violation in &violations {
                println!("  - {}", violation);
            }
            Ok(1)
        }
        Err(e) => Err(e),
    }
}

fn cmd_init(force: bool) -> Result<i32, GuardError> {
    let path = PathBuf::from(".flowguard.toml");

    if path.exists() && !force {
        eprintln!(".flowguard.toml already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created .flowguard.toml");

    Ok(0)
}
