//! SoundClient: owns one of each component and sequences the calls that
//! cross component boundaries (login ⇒ feed refresh, track reaction ⇒ feed
//! counters, comment reaction ⇒ thread reload, upload ⇒ feed refresh).
//!
//! Mutating methods take `&mut self`, so a single client can only have one
//! logical operation in flight; overlapping mutations on the same subject
//! cannot be issued through it.

use std::sync::Arc;

use soundtube_proto::protocol::{ReactionCounts, ReactionType, Subject, SubjectKind};
use soundtube_proto::storage::SessionStorage;
use tracing::warn;

use crate::comments::{CommentStore, CommentThread};
use crate::error::Result;
use crate::feed::{FeedState, FeedStore};
use crate::notifier::{ViewEvent, ViewNotifier};
use crate::reactions::ReactionSynchronizer;
use crate::session::{Session, SessionContext};
use crate::transport::Transport;
use crate::upload::{PendingUpload, UploadOrchestrator, UploadPhase};

pub struct SoundClient {
    session: Arc<SessionContext>,
    feed: FeedStore,
    reactions: ReactionSynchronizer,
    comments: CommentStore,
    uploads: UploadOrchestrator,
    notifier: Arc<dyn ViewNotifier>,
}

impl SoundClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn SessionStorage>,
        notifier: Arc<dyn ViewNotifier>,
    ) -> Self {
        let session = Arc::new(SessionContext::restore(storage, Arc::clone(&transport)));
        Self {
            feed: FeedStore::new(
                Arc::clone(&session),
                Arc::clone(&transport),
                Arc::clone(&notifier),
            ),
            reactions: ReactionSynchronizer::new(
                Arc::clone(&session),
                Arc::clone(&transport),
                Arc::clone(&notifier),
            ),
            comments: CommentStore::new(
                Arc::clone(&session),
                Arc::clone(&transport),
                Arc::clone(&notifier),
            ),
            uploads: UploadOrchestrator::new(
                Arc::clone(&session),
                Arc::clone(&transport),
                Arc::clone(&notifier),
            ),
            session,
            notifier,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn feed(&self) -> &FeedStore {
        &self.feed
    }

    pub fn reactions(&self) -> &ReactionSynchronizer {
        &self.reactions
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    pub fn thread(&self) -> Option<&CommentThread> {
        self.comments.thread()
    }

    pub fn upload_phase(&self) -> UploadPhase {
        self.uploads.phase()
    }

    pub fn pending_upload(&self) -> Option<&PendingUpload> {
        self.uploads.pending()
    }

    // ── Session ──────────────────────────────────────────────────────────────

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        self.session.register(username, email, password).await
    }

    /// Log in and load the feed.  A failed feed load does not undo the login.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        let session = self.session.login(username, password).await?;
        self.notifier.notify(&ViewEvent::SessionChanged {
            user_name: Some(session.user_name.clone()),
        });
        if let Err(e) = self.feed.refresh().await {
            warn!("Logged in but the feed could not be loaded: {}", e);
        }
        Ok(session)
    }

    /// Log out, drop per-user state and show the unauthenticated feed.
    pub async fn logout(&mut self) {
        self.session.logout().await;
        self.comments.close();
        self.uploads.discard();
        self.notifier
            .notify(&ViewEvent::SessionChanged { user_name: None });
        if let Err(e) = self.feed.refresh().await {
            warn!("Feed reset after logout failed: {}", e);
        }
    }

    // ── Feed ─────────────────────────────────────────────────────────────────

    pub async fn refresh_feed(&mut self) -> Result<&FeedState> {
        self.feed.refresh().await
    }

    /// Hydrate one track's counters from the backend.
    pub async fn load_reactions(&mut self, track_id: i64) -> Result<ReactionCounts> {
        let counts = self.reactions.fetch_counts(track_id).await?;
        self.feed.apply_counts(track_id, &counts);
        Ok(counts)
    }

    // ── Reactions ────────────────────────────────────────────────────────────

    /// Record a reaction.  Track counters in the feed are replaced with the
    /// re-read authoritative values; comment reactions reload the open
    /// thread.
    pub async fn set_reaction(
        &mut self,
        subject: Subject,
        reaction: ReactionType,
    ) -> Result<Option<ReactionCounts>> {
        match subject.kind {
            SubjectKind::Track => {
                let counts = self.reactions.set_reaction(subject, reaction).await?;
                if let Some(counts) = &counts {
                    self.feed.apply_counts(subject.id, counts);
                }
                Ok(counts)
            }
            SubjectKind::Comment => {
                self.comments
                    .react_to_comment(&mut self.reactions, subject.id, reaction)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Best-effort removal of a reaction; see
    /// [`ReactionSynchronizer::clear_reaction`].
    pub async fn clear_reaction(&mut self, subject: Subject) -> Result<Option<ReactionCounts>> {
        let counts = self.reactions.clear_reaction(subject).await?;
        match subject.kind {
            SubjectKind::Track => {
                if let Some(counts) = &counts {
                    self.feed.apply_counts(subject.id, counts);
                }
            }
            SubjectKind::Comment => {
                if self.comments.thread().is_some() {
                    if let Err(e) = self.comments.reload().await {
                        warn!("Thread reload after clearing {} failed: {}", subject, e);
                    }
                }
            }
        }
        Ok(counts)
    }

    // ── Comments ─────────────────────────────────────────────────────────────

    pub async fn open_thread(&mut self, sound_id: i64) -> Result<&CommentThread> {
        self.comments.open(sound_id).await
    }

    pub fn close_thread(&mut self) {
        self.comments.close();
    }

    pub async fn post_comment(&mut self, text: &str) -> Result<&CommentThread> {
        self.comments.post(text).await
    }

    // ── Upload ───────────────────────────────────────────────────────────────

    pub fn stage_upload(&mut self, pending: PendingUpload) {
        self.uploads.stage(pending);
    }

    /// Commit the staged upload (metadata, then file), refreshing the feed
    /// on success.
    pub async fn upload(&mut self) -> Result<()> {
        self.uploads.commit(&mut self.feed).await
    }
}
