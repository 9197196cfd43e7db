// Cancellation scope bounding the lifetime of a test chain
use tokio::sync::watch;

/// Owner side of a cancellation scope
#[derive(Debug)]
pub struct ChainContext {
    sender: watch::Sender<bool>,
}

/// Observer side, handed to everything that runs on behalf of the chain
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl ChainContext {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self { sender }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Cancel every in-flight and future operation observing this context
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for ChainContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the context is cancelled or dropped
    pub async fn cancelled(&mut self) {
        let _ = self.receiver.wait_for(|cancelled| *cancelled).await;
    }
}
