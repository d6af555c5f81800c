//! ViewNotifier: the port the core calls after every committed state
//! change.  The core never reads anything back from it.

use soundtube_proto::protocol::{Comment, ReactionCounts, Subject};
use tracing::debug;

use crate::feed::FeedState;
use crate::upload::UploadPhase;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Logged in (`Some(name)`) or out (`None`).
    SessionChanged { user_name: Option<String> },
    FeedChanged(FeedState),
    /// `counts` is `None` for comments, whose counters arrive with the next
    /// `ThreadChanged`.
    ReactionsChanged {
        subject: Subject,
        counts: Option<ReactionCounts>,
    },
    ThreadChanged {
        sound_id: i64,
        comments: Vec<Comment>,
    },
    ThreadClosed { sound_id: i64 },
    UploadChanged(UploadPhase),
}

pub trait ViewNotifier: Send + Sync {
    fn notify(&self, event: &ViewEvent);
}

/// Notifier for headless use: events only reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ViewNotifier for LogNotifier {
    fn notify(&self, event: &ViewEvent) {
        match event {
            ViewEvent::FeedChanged(state) => debug!("view: feed changed ({})", state.label()),
            ViewEvent::ThreadChanged { sound_id, comments } => {
                debug!("view: thread {} now has {} comments", sound_id, comments.len())
            }
            other => debug!("view: {:?}", other),
        }
    }
}
