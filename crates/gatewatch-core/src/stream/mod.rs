// ── Reactive view streams ──
//
// Subscription type for consuming reconciled-view changes from the
// dashboard.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::ReconciledView;

pub use filter::DeviceFilter;

/// A subscription to the reconciled view.
///
/// Provides point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct ViewStream {
    current: Arc<ReconciledView>,
    receiver: watch::Receiver<Arc<ReconciledView>>,
}

impl ViewStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<ReconciledView>>) -> Self {
        let current = Arc::clone(&receiver.borrow());
        Self { current, receiver }
    }

    /// The view captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<ReconciledView> {
        &self.current
    }

    /// The latest view.
    pub fn latest(&self) -> Arc<ReconciledView> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Wait for the next recomputation. Returns `None` once the dashboard
    /// has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<ReconciledView>> {
        self.receiver.changed().await.ok()?;
        let view = Arc::clone(&self.receiver.borrow_and_update());
        self.current = Arc::clone(&view);
        Some(view)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current view first, then every change.
    pub fn into_stream(self) -> ViewWatchStream {
        ViewWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct ViewWatchStream {
    inner: WatchStream<Arc<ReconciledView>>,
}

impl Stream for ViewWatchStream {
    type Item = Arc<ReconciledView>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
