use std::io;

use clap::Parser;
use epirecipes_count::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "epirecipes-count", version)]
#[command(about = "Count the documents in the epirecipes OpenSearch index", long_about = None)]
struct Args {
    /// Print only the summary line, without the raw count response
    #[arg(long)]
    summary_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Ok(path) = dotenv::dotenv() {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let args = Args::parse();
    let config = ConnectionConfig::from_env()?;
    let options = ReportOptions {
        print_raw: !args.summary_only,
    };

    run(&config, &options, io::stdout()).await?;
    Ok(())
}
