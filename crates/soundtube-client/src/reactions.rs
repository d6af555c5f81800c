//! ReactionSynchronizer: like/dislike protocol for tracks and comments.
//!
//! The synchronizer is pessimistic: it never adjusts counters locally.  It
//! always sends exactly the reaction that was asked for (toggle-off is the
//! backend's business) and then re-reads the authoritative counts, since
//! other sessions may be reacting to the same subject concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use soundtube_proto::protocol::{
    ReactionCounts, ReactionType, ReactionsRecord, SetReactionRequest, Subject, SubjectKind,
    UserReaction,
};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::notifier::{ViewEvent, ViewNotifier};
use crate::session::SessionContext;
use crate::transport::{ApiRequest, Transport};

pub struct ReactionSynchronizer {
    session: Arc<SessionContext>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn ViewNotifier>,
    /// Last user reaction the backend reported per subject.
    states: HashMap<Subject, UserReaction>,
}

impl ReactionSynchronizer {
    pub fn new(
        session: Arc<SessionContext>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn ViewNotifier>,
    ) -> Self {
        Self {
            session,
            transport,
            notifier,
            states: HashMap::new(),
        }
    }

    /// The user's reaction on `subject` as of the last authoritative read.
    pub fn state(&self, subject: Subject) -> UserReaction {
        self.states.get(&subject).copied().unwrap_or_default()
    }

    /// Record `reaction` on `subject`, then re-read its counts.
    ///
    /// Tracks return the fresh counts.  Comments have no reaction read path
    /// of their own; their counts come back with the owning thread's reload,
    /// so `None` is returned for them.
    pub async fn set_reaction(
        &mut self,
        subject: Subject,
        reaction: ReactionType,
    ) -> Result<Option<ReactionCounts>> {
        let token = self.session.require_token().await?;

        let request = ApiRequest::put(subject.reactions_path())
            .bearer(Some(&token))
            .json(&SetReactionRequest { reaction })?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!("Setting {} on {} failed: {}", reaction.as_str(), subject, response.status);
            return Err(ClientError::remote(&response));
        }
        info!("Set {} on {}", reaction.as_str(), subject);

        match subject.kind {
            SubjectKind::Track => {
                let counts = self.read_counts(subject.id, &token).await?;
                Ok(Some(counts))
            }
            SubjectKind::Comment => {
                self.notifier.notify(&ViewEvent::ReactionsChanged {
                    subject,
                    counts: None,
                });
                Ok(None)
            }
        }
    }

    /// Remove the user's reaction.  Only a missing session is reported;
    /// remote and network failures are logged and swallowed.
    pub async fn clear_reaction(&mut self, subject: Subject) -> Result<Option<ReactionCounts>> {
        let token = self.session.require_token().await?;

        let request = ApiRequest::delete(subject.reactions_path()).bearer(Some(&token));
        match self.transport.send(request).await {
            Ok(response) if response.is_success() => {
                debug!("Cleared reaction on {}", subject);
            }
            Ok(response) => {
                warn!(
                    "Clearing reaction on {} failed ({}): {}",
                    subject,
                    response.status,
                    response.error_message()
                );
                return Ok(None);
            }
            Err(e) => {
                warn!("Clearing reaction on {} failed: {}", subject, e);
                return Ok(None);
            }
        }

        match subject.kind {
            SubjectKind::Track => match self.read_counts(subject.id, &token).await {
                Ok(counts) => Ok(Some(counts)),
                Err(e) => {
                    warn!("Could not re-read counts for {}: {}", subject, e);
                    Ok(None)
                }
            },
            SubjectKind::Comment => {
                self.states.remove(&subject);
                self.notifier.notify(&ViewEvent::ReactionsChanged {
                    subject,
                    counts: None,
                });
                Ok(None)
            }
        }
    }

    /// Authoritative counters for one track.
    pub async fn fetch_counts(&mut self, track_id: i64) -> Result<ReactionCounts> {
        let token = self.session.require_token().await?;
        self.read_counts(track_id, &token).await
    }

    async fn read_counts(&mut self, track_id: i64, token: &str) -> Result<ReactionCounts> {
        let subject = Subject::track(track_id);
        let request = ApiRequest::get(subject.reactions_path()).bearer(Some(token));
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ClientError::remote(&response));
        }

        let counts = response.json::<ReactionsRecord>()?.normalize();
        self.states.insert(subject, counts.user_reaction);
        self.notifier.notify(&ViewEvent::ReactionsChanged {
            subject,
            counts: Some(counts),
        });
        Ok(counts)
    }
}
