pub mod handlers;
pub mod response;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::services::ServiceContext;

pub struct AppState {
    pub ctx: Arc<ServiceContext>,
    pub started: Instant,
}

impl AppState {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            started: Instant::now(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::describe))
        .route("/healthz", get(handlers::healthz))
        .route("/analyze", post(handlers::analyze))
        .route("/review", post(handlers::review))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，停止接收新请求");
}

/// 启动 HTTP 服务，Ctrl-C 时优雅退出
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("监听端口失败: {}", addr))?;
    info!("🚀 服务已启动: http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;
    Ok(())
}
