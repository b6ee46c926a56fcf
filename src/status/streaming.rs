//! Filtered receivers for selective status consumption

use std::sync::Arc;
use tokio::sync::broadcast;

use super::errors::StatusError;
use super::types::StatusEvent;

/// Filtered event receiver wrapper
pub struct FilteredReceiver<F>
where
    F: Fn(&StatusEvent) -> bool + Send + Sync + 'static,
{
    receiver: broadcast::Receiver<StatusEvent>,
    filter: Arc<F>,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&StatusEvent) -> bool + Send + Sync + 'static,
{
    pub fn new(receiver: broadcast::Receiver<StatusEvent>, filter: F) -> Self {
        Self {
            receiver,
            filter: Arc::new(filter),
        }
    }

    /// Receive the next event that passes the filter
    ///
    /// Buffered events that fail the filter are consumed and dropped.
    pub async fn recv(&mut self) -> Result<StatusEvent, StatusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if (self.filter)(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StatusError::Closed);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(StatusError::ReceiverLagged(skipped));
                }
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Result<Option<StatusEvent>, StatusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if (self.filter)(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(StatusError::Closed);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Err(StatusError::ReceiverLagged(skipped));
                }
            }
        }
    }
}
