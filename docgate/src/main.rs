use docgate::{config::GatewayConfig, init_app_state, init_router, logging::init_logging};
use dotenvy::dotenv;
use std::net::{Ipv4Addr, SocketAddr};
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("STARTUP_ERROR {err}");
            std::process::exit(1);
        },
    };

    let state = match init_app_state(&config).await {
        Ok(state) => state,
        Err(err) => {
            eprintln!("STARTUP_ERROR {err:#}");
            std::process::exit(1);
        },
    };

    let store = state.store.clone();
    let app = init_router(state);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("STARTUP_ERROR failed to bind {addr}: {err}");
            std::process::exit(1);
        },
    };

    info!(%addr, "docgate listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("SERVER_ERROR {err}");
        std::process::exit(1);
    }

    if let Err(err) = store.shutdown().await {
        warn!(error = %err, "store shutdown failed");
    }

    info!("docgate stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }

    info!("shutdown signal received");
}
