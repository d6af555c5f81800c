//! UploadOrchestrator: creates a track in two sequential phases.
//!
//! ```text
//!  Idle ──phase 1 ok──▶ MetadataSubmitted ──phase 2 ok──▶ Committed
//!   ▲                          │
//!   └──phase 1 failed          └──phase 2 failed──▶ PartialFailure
//! ```
//!
//! The commit is not atomic.  When phase 2 fails, the metadata record from
//! phase 1 stays on the backend without a file; nothing is rolled back.
//! Phase 2 is correlated with phase 1 by the track *name* (the backend's
//! upload endpoint looks the record up by name), not by the id phase 1
//! created, so two tracks sharing a name can receive each other's file.

use std::path::Path;
use std::sync::Arc;

use soundtube_proto::protocol::CreateSoundRequest;
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::feed::FeedStore;
use crate::notifier::{ViewEvent, ViewNotifier};
use crate::session::SessionContext;
use crate::transport::{ApiRequest, FilePart, MultipartForm, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    MetadataSubmitted,
    Committed,
    PartialFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl AudioFile {
    pub fn is_audio(&self) -> bool {
        self.media_type.trim().to_ascii_lowercase().starts_with("audio/")
    }
}

/// Guess an audio media type from a file extension.  `None` for anything
/// that is not a known audio format.
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/aac",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(media_type)
}

/// A track waiting to be committed.  Lives only in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingUpload {
    pub name: String,
    pub album: String,
    pub genre: String,
    file: Option<AudioFile>,
}

impl PendingUpload {
    pub fn new(name: impl Into<String>, album: impl Into<String>, genre: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            album: album.into(),
            genre: genre.into(),
            file: None,
        }
    }

    /// Attach the file to upload.  Non-audio media types are refused here, at
    /// selection time, and the previous selection is dropped.  This is
    /// advisory only: `commit` does not check the media type again.
    pub fn select_file(&mut self, file: AudioFile) -> Result<()> {
        if !file.is_audio() {
            self.file = None;
            return Err(ClientError::validation(format!(
                "'{}' is not an audio file ({})",
                file.file_name, file.media_type
            )));
        }
        self.file = Some(file);
        Ok(())
    }

    pub fn file(&self) -> Option<&AudioFile> {
        self.file.as_ref()
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [("name", &self.name), ("album", &self.album), ("genre", &self.genre)] {
            if value.trim().is_empty() {
                return Err(ClientError::validation(format!("track {field} must not be empty")));
            }
        }
        if self.file.is_none() {
            return Err(ClientError::validation("choose an audio file to upload"));
        }
        Ok(())
    }
}

pub struct UploadOrchestrator {
    session: Arc<SessionContext>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn ViewNotifier>,
    phase: UploadPhase,
    pending: Option<PendingUpload>,
}

impl UploadOrchestrator {
    pub fn new(
        session: Arc<SessionContext>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn ViewNotifier>,
    ) -> Self {
        Self {
            session,
            transport,
            notifier,
            phase: UploadPhase::Idle,
            pending: None,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    /// Stage a new upload, replacing any previous one.
    pub fn stage(&mut self, pending: PendingUpload) {
        self.pending = Some(pending);
        self.set_phase(UploadPhase::Idle);
    }

    pub fn discard(&mut self) {
        self.pending = None;
        self.set_phase(UploadPhase::Idle);
    }

    /// Run both phases for the staged upload.  On full success the pending
    /// upload is cleared and `feed` is refreshed.
    pub async fn commit(&mut self, feed: &mut FeedStore) -> Result<()> {
        let token = self.session.require_token().await?;
        let pending = self
            .pending
            .clone()
            .ok_or_else(|| ClientError::validation("nothing staged for upload"))?;
        pending.validate()?;
        let Some(file) = pending.file.clone() else {
            return Err(ClientError::validation("choose an audio file to upload"));
        };

        let name = pending.name.trim();
        let album = pending.album.trim();
        let genre = pending.genre.trim();
        self.set_phase(UploadPhase::Idle);

        // Phase 1: metadata record.
        let request = ApiRequest::post("/api/sounds/")
            .bearer(Some(&token))
            .json(&CreateSoundRequest { name, album, genre })?;
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Creating track '{}' failed: {}", name, e);
                return Err(e.into());
            }
        };
        if !response.is_success() {
            warn!("Creating track '{}' rejected: {}", name, response.status);
            return Err(ClientError::remote(&response));
        }
        info!("Created track record '{}'", name);
        self.set_phase(UploadPhase::MetadataSubmitted);

        // Phase 2: file payload, correlated by name.
        let form = MultipartForm {
            file: FilePart {
                field: "file".to_string(),
                file_name: file.file_name.clone(),
                media_type: file.media_type.clone(),
                bytes: file.bytes,
            },
            fields: vec![("name".to_string(), name.to_string())],
        };
        let request = ApiRequest::post("/api/sounds/upload")
            .bearer(Some(&token))
            .multipart(form);
        let failure = match self.transport.send(request).await {
            Ok(response) if response.is_success() => None,
            Ok(response) => Some(response.error_message()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(message) = failure {
            warn!("File upload for '{}' failed, record left without audio: {}", name, message);
            self.set_phase(UploadPhase::PartialFailure);
            return Err(ClientError::PartialCommit {
                name: name.to_string(),
                message,
            });
        }

        info!("Uploaded '{}' for track '{}'", file.file_name, name);
        self.pending = None;
        self.set_phase(UploadPhase::Committed);

        if let Err(e) = feed.refresh().await {
            warn!("Track '{}' committed but the feed refresh failed: {}", name, e);
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: UploadPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.notifier.notify(&ViewEvent::UploadChanged(phase));
        }
    }
}
