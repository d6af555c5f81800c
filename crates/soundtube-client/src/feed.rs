//! FeedStore: the in-memory track list, refreshed wholesale from
//! `GET /api/sounds/`.

use std::sync::Arc;

use soundtube_proto::protocol::{ReactionCounts, SoundRecord, Track};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::notifier::{ViewEvent, ViewNotifier};
use crate::session::SessionContext;
use crate::transport::{ApiRequest, Transport};

/// Outcome of a feed fetch.  `Unauthenticated` is deliberately distinct from
/// `Empty`: one means "log in to see tracks", the other "nobody uploaded
/// anything yet".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedState {
    #[default]
    Unauthenticated,
    Empty,
    Populated(Vec<Track>),
}

impl FeedState {
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        if tracks.is_empty() {
            FeedState::Empty
        } else {
            FeedState::Populated(tracks)
        }
    }

    pub fn tracks(&self) -> &[Track] {
        match self {
            FeedState::Populated(tracks) => tracks,
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedState::Unauthenticated => "unauthenticated",
            FeedState::Empty => "empty",
            FeedState::Populated(_) => "populated",
        }
    }
}

/// Decode a track list body, normalizing each record independently so one
/// malformed entry does not hide the rest.
pub fn parse_tracks(body: &str) -> Result<Vec<Track>> {
    let records: Vec<serde_json::Value> = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(serde_json::Value::Null) => Vec::new(),
        Ok(other) => {
            return Err(ClientError::UnexpectedResponse(format!(
                "expected a list of tracks, got {}",
                json_kind(&other)
            )))
        }
        Err(e) => return Err(ClientError::UnexpectedResponse(e.to_string())),
    };

    let mut tracks = Vec::with_capacity(records.len());
    for (idx, raw) in records.into_iter().enumerate() {
        match serde_json::from_value::<SoundRecord>(raw) {
            Ok(record) => match record.normalize() {
                Some(track) => tracks.push(track),
                None => warn!("Skipping track record #{} without an id", idx),
            },
            Err(e) => warn!("Skipping malformed track record #{}: {}", idx, e),
        }
    }
    Ok(tracks)
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

pub struct FeedStore {
    session: Arc<SessionContext>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn ViewNotifier>,
    state: FeedState,
}

impl FeedStore {
    pub fn new(
        session: Arc<SessionContext>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn ViewNotifier>,
    ) -> Self {
        Self {
            session,
            transport,
            notifier,
            state: FeedState::default(),
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn tracks(&self) -> &[Track] {
        self.state.tracks()
    }

    pub fn track(&self, id: i64) -> Option<&Track> {
        self.tracks().iter().find(|t| t.id == id)
    }

    /// Fetch the full list.  Without a session no request is made.  On a
    /// fetch or network error the previous state is kept.
    pub async fn refresh(&mut self) -> Result<&FeedState> {
        let Some(token) = self.session.token().await else {
            debug!("Feed refresh skipped: no session");
            self.set_state(FeedState::Unauthenticated);
            return Ok(&self.state);
        };

        let request = ApiRequest::get("/api/sounds/").bearer(Some(&token));
        let response = self.transport.send(request).await?;

        if response.is_unauthorized() {
            // The token is stale.  It is reported, not cleared.
            warn!("Feed refresh rejected with 401; session token looks stale");
            self.set_state(FeedState::Unauthenticated);
            return Ok(&self.state);
        }
        if !response.is_success() {
            warn!("Feed refresh failed: {}", response.status);
            return Err(ClientError::Fetch {
                status: response.status,
                message: response.error_message(),
            });
        }

        let tracks = parse_tracks(&response.body)?;
        info!("Feed refreshed: {} tracks", tracks.len());
        self.set_state(FeedState::from_tracks(tracks));
        Ok(&self.state)
    }

    /// Overwrite one track's counters with authoritative values.  Returns
    /// false when the track is not in the feed.
    pub fn apply_counts(&mut self, track_id: i64, counts: &ReactionCounts) -> bool {
        let FeedState::Populated(tracks) = &mut self.state else {
            return false;
        };
        let Some(track) = tracks.iter_mut().find(|t| t.id == track_id) else {
            return false;
        };
        track.apply_counts(counts);
        self.notifier.notify(&ViewEvent::FeedChanged(self.state.clone()));
        true
    }

    fn set_state(&mut self, state: FeedState) {
        self.state = state;
        self.notifier.notify(&ViewEvent::FeedChanged(self.state.clone()));
    }
}
