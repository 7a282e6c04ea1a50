use clap::Parser;
use tracing_subscriber::EnvFilter;

use sam_reheader::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag. Logs go to stderr; stdout
    // carries the merged stream.
    let filter = if cli.verbose {
        EnvFilter::new("sam_reheader=debug,info")
    } else {
        EnvFilter::new("sam_reheader=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    cli::run(&cli)
}
