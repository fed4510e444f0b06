//! Authority HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::net::TcpListener;

use crate::auth::purge_unverified_accounts;
use crate::config::Config;
use crate::db::Database;
use crate::file::FileStorage;
use crate::{FileShareError, Result};

use super::handlers::AppState;
use super::router::create_router;

/// Time until the next occurrence of `hour`:00 UTC after `now`.
pub fn until_next_hour(now: DateTime<Utc>, hour: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next = now.date_naive().and_time(at).and_utc();
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// The authority process.
pub struct AuthorityServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    purge_hour: Option<u32>,
}

impl AuthorityServer {
    /// Create a server from configuration and opened resources.
    pub fn new(config: &Config, db: Database, storage: FileStorage) -> Result<Self> {
        let addr = format!("{}:{}", config.authority.host, config.authority.port)
            .parse()
            .map_err(|e| FileShareError::Config(format!("invalid authority address: {e}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::from_config(config, db, storage)),
            purge_hour: config
                .authority
                .purge_unverified
                .then_some(config.authority.purge_hour_utc),
        })
    }

    /// Get the configured address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sweep unverified accounts once a day at `hour` UTC.
    fn start_purge_task(state: Arc<AppState>, hour: u32) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(until_next_hour(Utc::now(), hour)).await;

                match purge_unverified_accounts(&state.db, &state.storage).await {
                    Ok(0) => tracing::debug!("No unverified accounts to purge"),
                    Ok(count) => tracing::info!(deleted_count = count, "Purged unverified accounts"),
                    Err(e) => tracing::warn!(error = %e, "Failed to purge unverified accounts"),
                }
            }
        });
    }

    async fn bind(self) -> Result<(TcpListener, axum::Router)> {
        let listener = TcpListener::bind(self.addr).await?;

        if let Some(hour) = self.purge_hour {
            Self::start_purge_task(self.app_state.clone(), hour);
            tracing::info!("Unverified account sweep scheduled at {:02}:00 UTC", hour);
        }

        let router = create_router(self.app_state);
        tracing::info!("Authority listening on http://{}", listener.local_addr()?);
        Ok((listener, router))
    }

    /// Run the server until it fails.
    pub async fn run(self) -> Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful for tests binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Authority server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
