//! Graceful shutdown state machine.
//!
//! ```text
//! RUNNING --signal--> DRAINING --drained--> STOPPED
//!                         |----close error--> STOPPED (exit 1)
//!                         `----grace timer--> FORCE_KILLED
//! ```
//!
//! The signal source, the server's drain future and the grace timer are
//! all passed in, so the transitions can be driven from tests without
//! sending real signals.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How long in-flight requests get to finish once draining starts.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Lifecycle state of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ShutdownState {
    /// Accepting and serving connections.
    Running,
    /// No longer accepting; waiting for in-flight requests.
    Draining,
    /// Server closed. Terminal.
    Stopped,
    /// Grace period expired with connections still open. Terminal.
    ForceKilled,
}

impl ShutdownState {
    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::ForceKilled)
    }
}

/// How the server ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Drain completed cleanly.
    Stopped,
    /// The server reported an error while closing.
    CloseFailed(String),
    /// The grace period elapsed before the drain completed.
    ForceKilled,
}

impl ShutdownOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Stopped => 0,
            Self::CloseFailed(_) | Self::ForceKilled => 1,
        }
    }

    /// Terminal state this outcome leaves the machine in.
    pub fn state(&self) -> ShutdownState {
        match self {
            Self::Stopped | Self::CloseFailed(_) => ShutdownState::Stopped,
            Self::ForceKilled => ShutdownState::ForceKilled,
        }
    }
}

/// Drives one server instance through its shutdown lifecycle.
#[derive(Debug)]
pub struct Shutdown {
    state: watch::Sender<ShutdownState>,
    grace: Duration,
}

impl Shutdown {
    /// Create a controller in the `Running` state.
    pub fn new(grace: Duration) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self { state, grace }
    }

    /// Grace period allowed for draining.
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Current state.
    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Future that resolves once draining has begun.
    ///
    /// Hand this to the server as its graceful-shutdown trigger.
    pub fn draining(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.state.subscribe();
        async move {
            // A dropped controller also releases the server.
            let _ = rx.wait_for(|state| *state != ShutdownState::Running).await;
        }
    }

    fn transition(&self, next: ShutdownState) {
        let previous = self.state.send_replace(next);
        debug!(from = %previous, to = %next, "shutdown state transition");
    }

    /// Run the machine to a terminal state.
    ///
    /// `server` must be the serving future wired to [`Shutdown::draining`];
    /// it resolves once every in-flight connection has closed. `timer` is
    /// started with the grace period when draining begins.
    pub async fn run<Sig, Srv, E, Tm, TmF>(&self, signal: Sig, server: Srv, timer: Tm) -> ShutdownOutcome
    where
        Sig: Future,
        Sig::Output: Display,
        Srv: Future<Output = Result<(), E>>,
        E: Display,
        Tm: FnOnce(Duration) -> TmF,
        TmF: Future<Output = ()>,
    {
        tokio::pin!(server);

        let received = tokio::select! {
            received = signal => received,
            result = &mut server => {
                let reason = match result {
                    Ok(()) => "server stopped before a shutdown signal".to_string(),
                    Err(e) => e.to_string(),
                };
                error!("Server terminated unexpectedly: {}", reason);
                let outcome = ShutdownOutcome::CloseFailed(reason);
                self.transition(outcome.state());
                return outcome;
            }
        };

        info!("{} received, shutting down gracefully...", received);
        self.transition(ShutdownState::Draining);

        let timer = timer(self.grace);
        let outcome = tokio::select! {
            biased;

            result = &mut server => match result {
                Ok(()) => {
                    info!("Server closed");
                    ShutdownOutcome::Stopped
                }
                Err(e) => {
                    error!("Error during server shutdown: {}", e);
                    ShutdownOutcome::CloseFailed(e.to_string())
                }
            },
            () = timer => {
                warn!(
                    grace_secs = self.grace.as_secs_f64(),
                    "Could not close connections in time, forcefully shutting down"
                );
                ShutdownOutcome::ForceKilled
            }
        };

        self.transition(outcome.state());
        outcome
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}
