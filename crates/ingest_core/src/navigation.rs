use shared::domain::Destination;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Fire-and-forget hand-off to whatever owns screen navigation.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, destination: Destination);
}

/// Logs navigation requests; used where no view layer is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate_to(&self, destination: Destination) {
        info!(destination = %destination, "navigation requested");
    }
}

/// Forwards navigation requests into a channel drained by a view loop.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Destination>,
}

impl ChannelNavigator {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Destination>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate_to(&self, destination: Destination) {
        if self.tx.send(destination).is_err() {
            debug!(destination = %destination, "navigation receiver gone; request dropped");
        }
    }
}
