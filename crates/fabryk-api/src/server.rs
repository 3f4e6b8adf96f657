//! Router assembly and the HTTP server loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use fabryk_auth::{AuthConfig, AuthLayer, TokenValidator};
use tokio::net::TcpListener;

use crate::Result;
use crate::routes::{api_routes, public_routes};
use crate::state::AppState;

/// Builds the full application: authenticated API routes plus `/health`.
pub fn app<V: TokenValidator>(state: AppState, validator: Arc<V>, auth: AuthConfig) -> Router {
    let api = api_routes().layer(AuthLayer::new(validator, auth));
    public_routes().merge(api).with_state(state)
}

/// Serves `app` on `addr` until `shutdown` resolves.
pub async fn serve<F>(app: Router, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("Server stopped");
    Ok(())
}
