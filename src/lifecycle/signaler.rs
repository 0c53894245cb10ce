//! One-shot signal used to run cleanup after a response completes.
//!
//! `signal` never blocks and may be called any number of times; only the
//! first call has an effect. `wait` resolves once signalled, or returns a
//! distinct error when cancelled or when the signalling side went away.

use std::future::Future;

use tokio::sync::watch;

/// Why a wait ended without the signal firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    #[error("wait cancelled before signal")]
    Cancelled,
    #[error("signaler dropped without signalling")]
    Dropped,
}

/// The firing half.
#[derive(Debug)]
pub struct Signaler {
    tx: watch::Sender<bool>,
}

/// The waiting half.
#[derive(Debug)]
pub struct SignalWaiter {
    rx: watch::Receiver<bool>,
}

impl Signaler {
    pub fn new() -> (Self, SignalWaiter) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, SignalWaiter { rx })
    }

    /// Fire the signal. Idempotent and non-blocking.
    pub fn signal(&self) {
        self.tx.send_if_modified(|fired| !std::mem::replace(fired, true));
    }

    pub fn is_signalled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl SignalWaiter {
    /// Wait for the signal or for `cancelled` to resolve, whichever is first.
    pub async fn wait<F>(&mut self, cancelled: F) -> Result<(), SignalError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            res = self.rx.wait_for(|fired| *fired) => res.map(|_| ()).map_err(|_| SignalError::Dropped),
            _ = cancelled => Err(SignalError::Cancelled),
        }
    }
}
