//! Remote source that replays canned responses, for tests and demos.

use super::{RemotePage, RemotePhotoSource};
use crate::core::photo::{Cursor, FeedItem};
use crate::error::RemoteError;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Remote source answering from a queue of scripted responses
///
/// Every call pops the next response and records the request, so tests can
/// assert both what came back and whether the remote was touched at all.
/// An exhausted script answers with an empty page.
pub struct ScriptedRemoteSource<T: FeedItem> {
    responses: Mutex<VecDeque<Result<Vec<T::Remote>, RemoteError>>>,
    requests: Mutex<Vec<(Cursor, usize)>>,
}

impl<T: FeedItem> ScriptedRemoteSource<T> {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn respond(self, items: Vec<T::Remote>) -> Self {
        self.push(Ok(items));
        self
    }

    /// Queue a failed response
    pub fn fail(self, error: RemoteError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<Vec<T::Remote>, RemoteError>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Number of fetches made so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Cursor and count of every fetch, in call order
    pub fn requests(&self) -> Vec<(Cursor, usize)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl<T: FeedItem> Default for ScriptedRemoteSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FeedItem> RemotePhotoSource<T> for ScriptedRemoteSource<T> {
    fn fetch_page(
        &self,
        cursor: &Cursor,
        count: usize,
    ) -> Result<RemotePage<T::Remote>, RemoteError> {
        self.requests
            .lock()
            .map_err(|_| RemoteError::Transport("request log poisoned".to_string()))?
            .push((cursor.clone(), count));

        let next = self
            .responses
            .lock()
            .map_err(|_| RemoteError::Transport("response script poisoned".to_string()))?
            .pop_front();

        match next {
            Some(Ok(items)) => Ok(RemotePage::new(items)),
            Some(Err(error)) => Err(error),
            None => Ok(RemotePage::new(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::{ReceivedPhoto, ReceivedPhotoResponse};

    fn raw(name: &str) -> ReceivedPhotoResponse {
        ReceivedPhotoResponse {
            photo_name: name.to_string(),
            uploader_user_id: "u".to_string(),
            received_on: 1,
            lon: 0.0,
            lat: 0.0,
        }
    }

    #[test]
    fn replays_responses_then_runs_dry() {
        let source = ScriptedRemoteSource::<ReceivedPhoto>::new()
            .respond(vec![raw("a")])
            .fail(RemoteError::Transport("503".to_string()));

        assert_eq!(source.fetch_page(&Cursor::Latest, 5).unwrap().items.len(), 1);
        assert!(source.fetch_page(&Cursor::Latest, 5).is_err());
        assert!(source.fetch_page(&Cursor::Latest, 5).unwrap().items.is_empty());
        assert_eq!(source.call_count(), 3);
    }
}
