//! Accept loop for FreeSWITCH outbound-socket connections.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    callflow::fetch::DocumentFetcher,
    config::Config,
    error::GatewayResult,
    session::{CallSession, SessionOutcome},
};

/// Listens on `BindTo` and runs one [`CallSession`] task per connection.
pub struct ConnectionListener<F> {
    listener: TcpListener,
    config: Arc<Config>,
    fetcher: Arc<F>,
}

impl<F> ConnectionListener<F>
where
    F: DocumentFetcher + 'static,
{
    pub async fn bind(config: Arc<Config>, fetcher: Arc<F>) -> GatewayResult<Self> {
        let listener = TcpListener::bind(&config.bind_to).await?;
        Ok(Self::from_listener(listener, config, fetcher))
    }

    pub fn from_listener(listener: TcpListener, config: Arc<Config>, fetcher: Arc<F>) -> Self {
        Self {
            listener,
            config,
            fetcher,
        }
    }

    pub fn local_addr(&self) -> GatewayResult<SocketAddr> {
        Ok(self
            .listener
            .local_addr()?)
    }

    /// Accept forever. A failed accept is logged and does not stop the loop;
    /// a failed session ends only its own task.
    pub async fn run(self) -> GatewayResult<()> {
        info!("[LISTEN] Waiting for outbound connections on {}", self.local_addr()?);
        loop {
            let (stream, peer) = match self
                .listener
                .accept()
                .await
            {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("[LISTEN] Accept failed: {}", e);
                    continue;
                }
            };
            debug!("[LISTEN] Accepted connection from {}", peer);

            let config = Arc::clone(&self.config);
            let fetcher = Arc::clone(&self.fetcher);
            tokio::spawn(
                async move { handle_connection(stream, config, fetcher.as_ref()).await }
                    .instrument(info_span!("session", %peer)),
            );
        }
    }
}

/// Run one session to completion on `stream`.
pub async fn handle_connection<S, F>(stream: S, config: Arc<Config>, fetcher: &F)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    F: DocumentFetcher,
{
    let mut session = CallSession::new(stream, config);
    match session
        .run(fetcher)
        .await
    {
        Ok(SessionOutcome::Completed) => info!("[SESSION] Call {} completed", session.uuid()),
        Ok(SessionOutcome::NoRoute) => info!("[SESSION] Call {} had no route", session.uuid()),
        // Already logged by the session.
        Err(_) => {}
    }
}
