mod auth;
mod cache;
mod config;
mod error;
mod routes;
mod sms;
mod state;
mod sweeper;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{arg, Command};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use config::Config;
use state::AppState;

fn cli() -> Command {
    Command::new("stakeboard-server")
        .about("HTTP/WebSocket front door for the stakeboard gaming backend.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("run").arg(arg!([config] "The path to config file")))
}

async fn run(path: &PathBuf) -> anyhow::Result<()> {
    let config = Config::from_path(path).await?;
    let port = config.port;
    let state = AppState::build(config).await?;

    sweeper::spawn(state.clone());

    let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

    let app = routes::router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("stakeboard-server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("run", subcommand_matches)) => {
            let path = subcommand_matches.get_one::<PathBuf>("config");
            run(path.unwrap_or(&"config.toml".into())).await?;
        }
        _ => unreachable!(),
    }
    Ok(())
}
