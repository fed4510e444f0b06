//! Gateway HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::proxy::AuthorityClient;
use super::rate_limit::RateLimits;
use super::router::{create_router, GatewayOptions};
use super::routes::GatewayState;
use crate::auth::SessionAuthority;
use crate::config::Config;
use crate::db::Database;
use crate::{FileShareError, Result};

/// The gateway process.
pub struct GatewayServer {
    addr: SocketAddr,
    state: Arc<GatewayState>,
    limits: Arc<RateLimits>,
    options: GatewayOptions,
}

impl GatewayServer {
    /// Create a gateway from configuration.
    ///
    /// `db` is the store shared with the authority; the gateway only reads
    /// it to check that a token's account still exists.
    pub fn new(config: &Config, db: &Database) -> Result<Self> {
        let addr = format!("{}:{}", config.gateway.host, config.gateway.port)
            .parse()
            .map_err(|e| FileShareError::Config(format!("invalid gateway address: {e}")))?;

        let authority = AuthorityClient::from_config(&config.gateway)?;
        let sessions = SessionAuthority::from_config(&config.session);

        Ok(Self {
            addr,
            state: Arc::new(GatewayState::with_store(db, sessions, authority)),
            limits: Arc::new(RateLimits::from_config(&config.gateway)),
            options: GatewayOptions {
                cors_origins: config.gateway.cors_origins.clone(),
                max_upload_size: (config.storage.max_upload_size_mb * 1024 * 1024) as usize,
            },
        })
    }

    /// Get the configured address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn bind(self) -> Result<(TcpListener, axum::Router)> {
        let listener = TcpListener::bind(self.addr).await?;
        self.limits.clone().start_cleanup_task();

        tracing::info!(
            authority = %self.state.authority.base_url(),
            "Gateway listening on http://{}",
            listener.local_addr()?
        );
        let router = create_router(self.state, self.limits, &self.options);
        Ok((listener, router))
    }

    /// Run the gateway until it fails.
    pub async fn run(self) -> Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Run the gateway in the background and return the bound address.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!("Gateway server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
