//! Application state, router construction and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use verde_db::{Database, InvoiceIssuer};

use crate::handlers;

/// Shared application state. Cloning is cheap: the database wraps a
/// pool and the issuer is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub issuer: Arc<dyn InvoiceIssuer>,
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health::health))
        // Sales
        .route("/sale", post(handlers::sales::create_sale))
        .route("/api/sales", get(handlers::sales::list_sales))
        .route("/sales/stats", get(handlers::sales::sales_stats))
        .route("/sales/:id", delete(handlers::sales::delete_sale))
        .route("/daily_summary", get(handlers::sales::daily_summary))
        // Cash cuts
        .route(
            "/api/cortes",
            get(handlers::cortes::list_cortes).post(handlers::cortes::create_corte),
        )
        .route("/api/cortes/:id", get(handlers::cortes::get_corte))
        .route(
            "/api/cortes/totales/:year/:month",
            get(handlers::cortes::monthly_totals),
        )
        // Global invoices
        .route(
            "/generate_global_invoice",
            post(handlers::invoices::generate_global_invoice),
        )
        .route(
            "/global-invoice/generate",
            post(handlers::invoices::generate_for_day),
        )
        .route(
            "/global-invoice/pending-sales",
            get(handlers::invoices::pending_sales),
        )
        .route("/global-invoice/history", get(handlers::invoices::history))
        // Clients
        .route(
            "/api/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route("/api/clients/search", get(handlers::clients::search_clients))
        .route(
            "/api/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        // Products
        .route(
            "/api/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the listener and serves until a shutdown signal arrives.
pub async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
