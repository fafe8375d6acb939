//! Elastic metrics CLI entry point.

use elastic_metrics::cli::{self, Cli};
use elastic_metrics::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli).await
}
