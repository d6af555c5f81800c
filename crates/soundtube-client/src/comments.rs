//! CommentStore: the single comment thread currently open in the viewer.
//!
//! Every mutation is followed by a full reload of the open thread.  Nothing
//! is inserted or counted locally; server-assigned ids, timestamps and
//! counters only ever come from the reload.

use std::sync::Arc;

use soundtube_proto::protocol::{Comment, CommentRecord, CreateCommentRequest, ReactionType, Subject};
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::feed::json_kind;
use crate::notifier::{ViewEvent, ViewNotifier};
use crate::reactions::ReactionSynchronizer;
use crate::session::SessionContext;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    pub sound_id: i64,
    /// Server order; never re-sorted.
    pub comments: Vec<Comment>,
}

/// Decode a comment list body.  Malformed entries are skipped individually.
pub fn parse_comments(body: &str) -> Result<Vec<Comment>> {
    let records = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(serde_json::Value::Null) => Vec::new(),
        Ok(other) => {
            return Err(ClientError::UnexpectedResponse(format!(
                "expected a list of comments, got {}",
                json_kind(&other)
            )))
        }
        Err(e) => return Err(ClientError::UnexpectedResponse(e.to_string())),
    };

    Ok(records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let comment = serde_json::from_value::<CommentRecord>(raw)
                .ok()
                .and_then(CommentRecord::normalize);
            if comment.is_none() {
                warn!("Skipping unusable comment record #{}", idx);
            }
            comment
        })
        .collect())
}

pub struct CommentStore {
    session: Arc<SessionContext>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn ViewNotifier>,
    open: Option<CommentThread>,
}

impl CommentStore {
    pub fn new(
        session: Arc<SessionContext>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn ViewNotifier>,
    ) -> Self {
        Self {
            session,
            transport,
            notifier,
            open: None,
        }
    }

    pub fn thread(&self) -> Option<&CommentThread> {
        self.open.as_ref()
    }

    /// Load and bind the thread for `sound_id`, replacing whatever thread was
    /// open.  If loading fails the previous binding stays in place.
    pub async fn open(&mut self, sound_id: i64) -> Result<&CommentThread> {
        let token = self.session.require_token().await?;
        let comments = self.fetch(sound_id, &token).await?;

        if let Some(previous) = &self.open {
            if previous.sound_id != sound_id {
                info!("Switching comment thread {} -> {}", previous.sound_id, sound_id);
            }
        }
        info!("Opened thread for track {} ({} comments)", sound_id, comments.len());
        Ok(self.bind(CommentThread { sound_id, comments }))
    }

    pub fn close(&mut self) {
        if let Some(thread) = self.open.take() {
            self.notifier.notify(&ViewEvent::ThreadClosed {
                sound_id: thread.sound_id,
            });
        }
    }

    /// Reload the open thread from the backend.
    pub async fn reload(&mut self) -> Result<&CommentThread> {
        let token = self.session.require_token().await?;
        let sound_id = self.open_sound_id()?;
        self.reload_with(sound_id, &token).await
    }

    /// Post `text` to the open thread, then reload it.
    pub async fn post(&mut self, text: &str) -> Result<&CommentThread> {
        let token = self.session.require_token().await?;
        let sound_id = self.open_sound_id()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::validation("comment text must not be empty"));
        }

        let request = ApiRequest::post(format!("/api/sounds/{sound_id}/comments"))
            .bearer(Some(&token))
            .json(&CreateCommentRequest { text })?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!("Posting comment on track {} failed: {}", sound_id, response.status);
            return Err(ClientError::remote(&response));
        }
        info!("Posted comment on track {}", sound_id);

        self.reload_with(sound_id, &token).await
    }

    /// React to a comment in the open thread via `reactions`, then reload the
    /// thread, which is the only source of comment counters.
    pub async fn react_to_comment(
        &mut self,
        reactions: &mut ReactionSynchronizer,
        comment_id: i64,
        reaction: ReactionType,
    ) -> Result<&CommentThread> {
        let token = self.session.require_token().await?;
        let sound_id = self.open_sound_id()?;

        reactions
            .set_reaction(Subject::comment(comment_id), reaction)
            .await?;
        self.reload_with(sound_id, &token).await
    }

    fn open_sound_id(&self) -> Result<i64> {
        self.open
            .as_ref()
            .map(|t| t.sound_id)
            .ok_or(ClientError::NoActiveThread)
    }

    async fn reload_with(&mut self, sound_id: i64, token: &str) -> Result<&CommentThread> {
        let comments = self.fetch(sound_id, token).await?;
        Ok(self.bind(CommentThread { sound_id, comments }))
    }

    async fn fetch(&self, sound_id: i64, token: &str) -> Result<Vec<Comment>> {
        let request =
            ApiRequest::get(format!("/api/sounds/{sound_id}/comments")).bearer(Some(token));
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!("Loading comments for track {} failed: {}", sound_id, response.status);
            return Err(ClientError::remote(&response));
        }
        parse_comments(&response.body)
    }

    fn bind(&mut self, thread: CommentThread) -> &CommentThread {
        self.notifier.notify(&ViewEvent::ThreadChanged {
            sound_id: thread.sound_id,
            comments: thread.comments.clone(),
        });
        self.open.insert(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_server_order() {
        let body = r#"[
            {"id": 3, "text": "third", "author_name": "c"},
            {"id": 1, "text": "first", "author_name": "a"},
            {"id": 2, "text": "", "author_name": "b"}
        ]"#;
        let comments = parse_comments(body).unwrap();
        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_parse_rejects_object() {
        assert!(parse_comments(r#"{"id":1}"#).is_err());
    }
}
