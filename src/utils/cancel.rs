//! Cancellation utilities
//!
//! A shared flag that stream consumers poll between events.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::streaming::ChatStream;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Consumers observing this handle stop before the
    /// next event.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Wrap a [`ChatStream`] so that it ends once the returned handle is cancelled.
pub fn make_cancellable_stream(stream: ChatStream) -> (ChatStream, CancelHandle) {
    let handle = CancelHandle::new();
    let observer = handle.clone();
    let mut inner = stream;
    let wrapped = async_stream::stream! {
        use futures::StreamExt;
        while let Some(item) = inner.next().await {
            if observer.is_cancelled() {
                tracing::debug!("Stream cancelled");
                break;
            }
            yield item;
        }
    };
    (Box::pin(wrapped), handle)
}
