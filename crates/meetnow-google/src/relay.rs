//! Single-slot handoff between the callback listener and the coordinator.
//!
//! One producer (the HTTP handler) and one consumer (the authorizer) are
//! matched exactly once per flow. First push wins; anything after that is
//! dropped so the handler can never be wedged by a stray duplicate
//! callback or a browser refresh.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Creates a connected sender/receiver pair with a one-item slot.
pub fn relay() -> (CodeSender, CodeReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (CodeSender { tx }, CodeReceiver { rx })
}

/// Producer half of the relay, held by the callback listener.
#[derive(Debug, Clone)]
pub struct CodeSender {
    tx: mpsc::Sender<String>,
}

impl CodeSender {
    /// Offers an authorization code to the waiting coordinator.
    ///
    /// Never blocks. Returns false when the slot is already occupied or
    /// nobody is waiting anymore; the code is dropped in both cases.
    pub fn offer(&self, code: impl Into<String>) -> bool {
        match self.tx.try_send(code.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("dropping duplicate authorization code");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("no coordinator waiting for authorization code");
                false
            }
        }
    }
}

/// Consumer half of the relay, held by the coordinator.
#[derive(Debug)]
pub struct CodeReceiver {
    rx: mpsc::Receiver<String>,
}

impl CodeReceiver {
    /// Waits for a code, bounded by `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> AuthResult<String> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(code)) => Ok(code),
            Ok(None) => Err(AuthError::RelayClosed),
            Err(_) => Err(AuthError::RedirectTimeout(timeout)),
        }
    }
}
