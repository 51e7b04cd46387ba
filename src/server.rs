//! HTTP server instance owning its listener and shutdown controller.

use std::fmt::Display;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::{Result, ServiceError};
use crate::shutdown::{Shutdown, ShutdownOutcome, ShutdownState, DEFAULT_GRACE_PERIOD};

/// A bound, not yet serving, HTTP server.
///
/// Each instance owns its socket, so tests can run several side by side on
/// ephemeral ports.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    router: Router,
    shutdown: Shutdown,
}

impl Server {
    /// Bind a listener on `addr`.
    pub async fn bind(addr: SocketAddr, router: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServiceError::Bind { addr, source })?;

        Ok(Self {
            listener,
            router,
            shutdown: Shutdown::new(DEFAULT_GRACE_PERIOD),
        })
    }

    /// Override the drain grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.shutdown = Shutdown::new(grace);
        self
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Port the listener is actually bound to; differs from the requested
    /// one when binding port 0.
    pub fn port(&self) -> Result<u16> {
        Ok(self.local_addr()?.port())
    }

    /// Watch the server's lifecycle state.
    pub fn state(&self) -> watch::Receiver<ShutdownState> {
        self.shutdown.subscribe()
    }

    /// Serve until `signal` resolves, then drain.
    pub async fn run<Sig>(self, signal: Sig) -> ShutdownOutcome
    where
        Sig: Future,
        Sig::Output: Display,
    {
        let Self {
            listener,
            router,
            shutdown,
        } = self;

        let server = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.draining())
            .into_future();

        shutdown.run(signal, server, tokio::time::sleep).await
    }
}
