// MIT License - Copyright (c) 2026 Peter Wright
// Open/close signal shared between the controller and its worker

use tokio::sync::watch;

/// Connection state requested by the controller.
///
/// `close_count` grows on every close, so a connection attempt notices a
/// close even when it is immediately followed by another open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Desired {
    pub open: bool,
    pub close_count: u64,
}

impl Desired {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.close_count += 1;
    }
}

/// Worker side of the signal, bound to a single connection attempt.
#[derive(Debug, Clone)]
pub struct OpenSignal {
    rx: watch::Receiver<Desired>,
    bound_to: u64,
}

impl OpenSignal {
    /// Bind to the closes seen so far; any later close cancels this attempt.
    pub fn new(rx: watch::Receiver<Desired>) -> Self {
        let bound_to = rx.borrow().close_count;
        Self { rx, bound_to }
    }

    /// Whether the attempt is still wanted.
    pub fn is_open(&self) -> bool {
        let desired = *self.rx.borrow();
        desired.open && desired.close_count == self.bound_to
    }

    /// Resolves once the attempt has been closed, or once the controller is
    /// gone.
    pub async fn closed(&mut self) {
        let bound_to = self.bound_to;
        let _ = self
            .rx
            .wait_for(|d| !d.open || d.close_count != bound_to)
            .await;
    }

    /// Resolves on the next open, close or wake-up from the controller.
    /// Never resolves once the controller is gone.
    pub async fn changed(&mut self) {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
