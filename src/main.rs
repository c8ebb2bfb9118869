//! OData SPARQL service entry point.
//!
//! Loads the service settings document, builds the endpoint registry and
//! serves the OData HTTP surface.
//!
//! Usage:
//!   odata-sparql --config odata-sparql.json --host 0.0.0.0 --port 8080

use std::sync::Arc;

use clap::Parser;
use log::info;

use odata_sparql::config::{EndpointRegistry, ServiceSettings};
use odata_sparql::http::start_server;

#[derive(Parser, Debug)]
#[command(name = "odata-sparql")]
#[command(about = "OData query endpoint for SPARQL graph stores", long_about = None)]
struct Args {
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the service settings document
    #[arg(short, long, default_value = "odata-sparql.json")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let settings = ServiceSettings::from_file(&args.config)?;
    info!(
        "loaded {} endpoint(s) from {}",
        settings.endpoints.len(),
        args.config
    );
    let registry = Arc::new(EndpointRegistry::new(settings));

    let addr = format!("{}:{}", args.host, args.port);
    start_server(&addr, registry).await?;

    Ok(())
}
