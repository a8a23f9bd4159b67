use clap::Parser;
use sheet_review::app;
use sheet_review::config::{self, Config};

/// Main entry point for the web application
///
/// Reads the configuration from flags and environment, sets up logging and
/// serves the review UI until the server stops.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    config::init_logging(&config.log_level);

    log::info!(
        "Starting review server (upload limit {} MB, idle sessions dropped after {} min)",
        config.max_upload_mb,
        config.session_ttl_mins
    );
    app::run(config).await
}
