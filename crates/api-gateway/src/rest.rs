//! HTTP server

use std::future::Future;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use axum::Router;
use tracing::info;

use common::error::{Error, Result};
use registry_config::ServerSettings;
use registry_core::RegistryEngine;

use crate::handlers::AppState;
use crate::routes::create_router;

/// REST server bound to one address
pub struct RestApi {
    /// Application router
    router: Router,

    /// Address to listen on
    addr: SocketAddr,
}

impl RestApi {
    /// Creates a new REST server for `engine`
    pub fn new(engine: Arc<RegistryEngine>, settings: &ServerSettings) -> Result<Self> {
        let addr = resolve_addr(settings)?;
        let router = create_router(AppState::new(engine), settings);
        Ok(Self { router, addr })
    }

    /// Address the server will listen on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains in-flight requests
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = axum::Server::try_bind(&self.addr)
            .map_err(|e| Error::Config(format!("cannot bind {}: {}", self.addr, e)))?
            .serve(self.router.into_make_service());

        info!("Model registry listening on http://{}", server.local_addr());

        server
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| Error::Internal(format!("server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }
}

/// Resolves once the process receives Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn resolve_addr(settings: &ServerSettings) -> Result<SocketAddr> {
    (settings.host.as_str(), settings.port)
        .to_socket_addrs()
        .map_err(|e| Error::Config(format!("invalid bind address {}: {}", settings.bind_address(), e)))?
        .next()
        .ok_or_else(|| Error::Config(format!("{} resolves to no address", settings.bind_address())))
}
