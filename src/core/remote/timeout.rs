//! Deadline wrapper for remote sources.

use super::{RemotePage, RemotePhotoSource};
use crate::core::photo::{Cursor, FeedItem};
use crate::error::RemoteError;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Bounds every fetch of the wrapped source by a fixed deadline
///
/// The fetch runs on a worker thread and the caller waits at most
/// `timeout` for its answer. A worker that outlives its deadline finishes in
/// the background and its result is dropped.
pub struct TimeoutSource<T, S> {
    inner: Arc<S>,
    timeout: Duration,
    _item: PhantomData<fn() -> T>,
}

impl<T, S> TimeoutSource<T, S>
where
    T: FeedItem,
    S: RemotePhotoSource<T> + 'static,
{
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self::from_arc(Arc::new(inner), timeout)
    }

    pub fn from_arc(inner: Arc<S>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            _item: PhantomData,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<T, S> RemotePhotoSource<T> for TimeoutSource<T, S>
where
    T: FeedItem,
    S: RemotePhotoSource<T> + 'static,
{
    fn fetch_page(
        &self,
        cursor: &Cursor,
        count: usize,
    ) -> Result<RemotePage<T::Remote>, RemoteError> {
        let (sender, receiver) = bounded(1);
        let source = Arc::clone(&self.inner);
        let cursor = cursor.clone();

        thread::Builder::new()
            .name(format!("{}-fetch", T::KIND))
            .spawn(move || {
                // Receiver is gone once the deadline passed
                let _ = sender.send(<S as RemotePhotoSource<T>>::fetch_page(&source, &cursor, count));
            })
            .map_err(|e| RemoteError::Transport(format!("failed to start fetch: {e}")))?;

        match receiver.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(kind = %T::KIND, timeout_ms = self.timeout.as_millis() as u64, "remote fetch timed out");
                Err(RemoteError::TimedOut {
                    after: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(RemoteError::Transport(
                "fetch worker exited without a response".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::{GalleryPhoto, GalleryPhotoResponse};

    struct SlowSource {
        delay: Duration,
    }

    impl RemotePhotoSource<GalleryPhoto> for SlowSource {
        fn fetch_page(
            &self,
            _cursor: &Cursor,
            _count: usize,
        ) -> Result<RemotePage<GalleryPhotoResponse>, RemoteError> {
            thread::sleep(self.delay);
            Ok(RemotePage::new(Vec::new()))
        }
    }

    struct PanickingSource;

    impl RemotePhotoSource<GalleryPhoto> for PanickingSource {
        fn fetch_page(
            &self,
            _cursor: &Cursor,
            _count: usize,
        ) -> Result<RemotePage<GalleryPhotoResponse>, RemoteError> {
            panic!("transport blew up");
        }
    }

    #[test]
    fn fast_source_answers_within_deadline() {
        let source = TimeoutSource::new(
            SlowSource {
                delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
        );

        let page = RemotePhotoSource::<GalleryPhoto>::fetch_page(&source, &Cursor::Latest, 10).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn slow_source_times_out() {
        let source = TimeoutSource::new(
            SlowSource {
                delay: Duration::from_millis(500),
            },
            Duration::from_millis(20),
        );

        let result = RemotePhotoSource::<GalleryPhoto>::fetch_page(&source, &Cursor::Latest, 10);
        assert!(matches!(result, Err(RemoteError::TimedOut { after }) if after == Duration::from_millis(20)));
    }

    #[test]
    fn crashed_worker_is_a_transport_error() {
        let source = TimeoutSource::new(PanickingSource, Duration::from_secs(5));

        let result = RemotePhotoSource::<GalleryPhoto>::fetch_page(&source, &Cursor::Latest, 10);
        assert!(matches!(result, Err(RemoteError::Transport(_))));
    }
}
