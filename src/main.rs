use anyhow::Result;
use lark_relay::api::{router, AppState};
use lark_relay::config::AppConfig;
use lark_relay::dispatch::Dispatcher;
use lark_relay::lark;
use lark_relay::llm;
use lark_relay::logging::init_logging;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let logging_runtime = init_logging(&config)?;
    info!(
        model = %config.model,
        lark_api_base_url = %config.lark_api_base_url,
        verification = config.verification_token.is_some(),
        log_file = %logging_runtime.log_file.display(),
        log_level = %config.log_level,
        "lark-relay logging initialized"
    );

    let state = build_app(&config);
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "lark-relay server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drop(logging_runtime);

    Ok(())
}

pub fn build_app(config: &AppConfig) -> AppState {
    let completion = llm::build_provider(config);
    let delivery = lark::build_delivery(config);

    let dispatcher = Dispatcher::new(
        completion,
        delivery,
        config.model.clone(),
        config.verification_token.clone(),
    );

    AppState::new(Arc::new(dispatcher))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
