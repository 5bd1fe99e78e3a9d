use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use mimalloc::MiMalloc;
use sensor_stats::{
    config::{Config, USAGE},
    error::{Error, Result},
    reader,
    report::format_results,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: &Config) -> Result<String> {
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|error| Error::Config(error.to_string()))?;
        info!(threads, "using configured worker threads");
    }

    let mut registry = reader::load(config)?;
    let results = registry.report()?;
    format_results(&results).map_err(Error::Encode)
}

/// Writes the report, surfacing a closed stdout as an error instead of panicking.
fn emit<W: Write>(out: &mut W, text: &str) -> Result<()> {
    writeln!(out, "{}", text)
        .and_then(|_| out.flush())
        .map_err(|source| Error::Io {
            path: PathBuf::from("<stdout>"),
            source,
        })
}

fn main() -> ExitCode {
    init_tracing();

    let outcome = Config::from_env()
        .and_then(|config| match config {
            Some(config) => run(&config),
            None => Ok(USAGE.to_string()),
        })
        .and_then(|output| emit(&mut io::stdout().lock(), &output));

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("KO: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}
