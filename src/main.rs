use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use roundtrip::{
    CONFIG_TEMPLATE, CommandGenerator, CommandParser, Config, ConfigError, Corpus,
    DEFAULT_CONFIG_FILENAME, Diagnostic, Driver, DriverError, Verifier, XfailRegistry,
};
use tracing_subscriber::EnvFilter;

const EXIT_UNEXPECTED: i32 = 1;
const EXIT_SETUP: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "roundtrip")]
#[command(about = "Parse/generate round-trip consistency checker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify every corpus case, stopping at the first unexpected result.
    Run {
        #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
        /// Only run these case identifiers.
        #[arg(long = "case")]
        cases: Vec<String>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate the expected-failure table against the corpus.
    Xfails {
        #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
    },
    /// Write a template configuration.
    Init {
        #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Command::Run { verbose: true, .. });
    init_tracing(verbose);

    let exit_code = match cli.command {
        Command::Run {
            config,
            cases,
            verbose: _,
        } => run_cases(&config, &cases),
        Command::Xfails { config } => run_xfails(&config),
        Command::Init { config } => run_init(&config),
    };
    std::process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cases(config_path: &Path, only: &[String]) -> i32 {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => return report_config_error(config_path, &err),
    };
    let registry = match load_registry(&config) {
        Ok(registry) => registry,
        Err(d) => {
            eprintln!("{d}");
            return EXIT_SETUP;
        }
    };
    let corpus = match Corpus::open(&config.corpus) {
        Ok(corpus) => corpus,
        Err(err) => {
            eprintln!("{}", Diagnostic::new(err.code(), err.to_string()));
            return EXIT_SETUP;
        }
    };

    let verifier = Verifier::new(
        CommandParser::new(config.parser.clone()),
        CommandGenerator::new(config.generator.clone()),
    );
    let driver = Driver::new(&corpus, &verifier, &registry);

    match driver.run(only) {
        Ok(summary) => {
            println!(
                "ok: {} cases, {} passed, {} failed as expected",
                summary.total, summary.passed, summary.expected_failures
            );
            0
        }
        Err(DriverError::Unexpected(failure)) => {
            let d = Diagnostic::new(failure.error.code(), failure.error.to_string())
                .with_source(failure.error.case());
            eprintln!("{d}");
            eprintln!("outcome on re-run: {}", failure.outcome.description());
            if let Some(report) = &failure.report {
                eprint!("{report}");
            }
            eprintln!(
                "stopped after {} cases ({} passed, {} failed as expected)",
                failure.summary.total, failure.summary.passed, failure.summary.expected_failures
            );
            EXIT_UNEXPECTED
        }
        Err(err) => {
            eprintln!("{}", Diagnostic::new(err.code(), err.to_string()));
            EXIT_SETUP
        }
    }
}

fn run_xfails(config_path: &Path) -> i32 {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => return report_config_error(config_path, &err),
    };
    let registry = match load_registry(&config) {
        Ok(registry) => registry,
        Err(d) => {
            eprintln!("{d}");
            return EXIT_SETUP;
        }
    };
    let ids = match Corpus::open(&config.corpus).and_then(|corpus| corpus.case_ids()) {
        Ok(ids) => ids,
        Err(err) => {
            eprintln!("{}", Diagnostic::new(err.code(), err.to_string()));
            return EXIT_SETUP;
        }
    };

    let stale = registry.stale_entries(&ids);
    for entry in &stale {
        println!("stale: {} ({})", entry.id, entry.expect);
    }
    println!(
        "ok: {} xfail entries, {} stale, {} corpus cases",
        registry.len(),
        stale.len(),
        ids.len()
    );
    0
}

fn run_init(config_path: &Path) -> i32 {
    if config_path.exists() {
        eprintln!(
            "{}",
            Diagnostic::new("E-CONFIG", "config file already exists")
                .with_source(config_path.display().to_string())
        );
        return EXIT_SETUP;
    }
    match fs::write(config_path, CONFIG_TEMPLATE) {
        Ok(()) => {
            println!("wrote {}", config_path.display());
            0
        }
        Err(err) => {
            eprintln!(
                "{}",
                Diagnostic::new("E-IO", format!("failed to write config: {err}"))
                    .with_source(config_path.display().to_string())
            );
            EXIT_SETUP
        }
    }
}

fn load_registry(config: &Config) -> Result<XfailRegistry, Diagnostic> {
    match &config.xfail_path {
        Some(path) => XfailRegistry::load(path).map_err(|err| {
            Diagnostic::new(err.code(), err.to_string()).with_source(path.display().to_string())
        }),
        None => Ok(XfailRegistry::default()),
    }
}

fn report_config_error(config_path: &Path, err: &ConfigError) -> i32 {
    eprintln!(
        "{}",
        Diagnostic::new(err.code(), err.to_string()).with_source(config_path.display().to_string())
    );
    if let ConfigError::Missing { path, template } = err {
        eprintln!("create {} with:\n\n{template}", path.display());
    }
    EXIT_SETUP
}
