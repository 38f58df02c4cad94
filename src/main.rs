use clap::Parser;
use dca_sim::api::{Cli, Command, run_http_server, run_projection};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        Command::Project(args) => match run_projection(args) {
            Ok(report) => println!("{report}"),
            Err(msg) => {
                error!(%msg, "projection failed");
                std::process::exit(1);
            }
        },
    }
}
