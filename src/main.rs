//! solver-deps - Main entry point
//!
//! Parses the command line, layers configuration, and runs the fail-fast
//! pipeline. The exit status is the failing tool's own status, 1 for usage
//! and configuration errors, 0 on success.

use tracing::{debug, info, warn};

use solver_deps::cli::{self, Cli};
use solver_deps::config::{BuildConfig, ConfigOverrides};
use solver_deps::error::{Result, SolverDepsError};
use solver_deps::orchestrator::{BuildReport, Orchestrator};
use solver_deps::process_guard::{self, ProcessGuard};
use solver_deps::runner::{DryRunRunner, ProcessRunner};

/// Initialize the logger; `RUST_LOG` overrides the default `info` level.
fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn main() {
    init_logger();

    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) if cli::is_usage_error(&e) => {
            eprint!("{}", cli::usage_error(&e));
            std::process::exit(1);
        }
        // --help / --version
        Err(e) => e.exit(),
    };
    debug!("CLI arguments parsed: {:?}", cli);

    let code = match run(&cli) {
        Ok(report) => {
            if report.dry_run {
                println!("✓ Dry run complete: {} commands", report.steps.len());
            } else {
                println!(
                    "✓ GKlib, METIS, ParMETIS and superlu_dist installed into {}",
                    report.install_dir.display()
                );
            }
            0
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}

fn load_config(cli: &Cli) -> Result<BuildConfig> {
    let mut config = BuildConfig::default();

    if let Some(path) = &cli.config {
        info!("Loading configuration from {:?}", path);
        let file = ConfigOverrides::load_from_file(path)
            .map_err(|e| SolverDepsError::config(format!("{:#}", e)))?;
        config = config.apply(file);
    }

    Ok(config
        .apply(ConfigOverrides::from_process_env()?)
        .apply(cli.overrides()))
}

fn run(cli: &Cli) -> Result<BuildReport> {
    let config = load_config(cli)?;
    debug!("Effective configuration: {:?}", config);

    // --check-tools is rejected alongside --dry-run at parse time
    if cli.dry_run {
        return Orchestrator::new(&cli.download_dir, config, DryRunRunner::new()).run();
    }

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    // Dropped before exit: terminates anything still registered
    let _guard = ProcessGuard::new();

    let report = Orchestrator::new(&cli.download_dir, config, ProcessRunner::new())
        .with_tool_check(cli.check_tools)
        .run()?;

    // A signal after the last tool finished still reports as interrupted
    match process_guard::interrupted() {
        Some(signal) => Err(SolverDepsError::Interrupted { signal }),
        None => Ok(report),
    }
}
