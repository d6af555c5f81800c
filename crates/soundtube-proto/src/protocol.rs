//! Wire records exchanged with the soundtube backend and the normalized
//! domain types the client keeps in memory.
//!
//! The backend is tolerant about field names (a track may carry `title`
//! instead of `name`, `filename` instead of `file_path`, ...).  Records are
//! deserialized into loose `*Record` structs where every field is optional,
//! then resolved into domain types by a fixed, ordered fallback.  The first
//! present candidate wins; later candidates are never consulted once one is
//! found, so conflicting values are not merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown when a track carries neither `name` nor `title`.
pub const UNTITLED: &str = "Untitled";
/// Shown when a track has no album or genre.
pub const UNKNOWN: &str = "Unknown";
/// Shown when a comment has no resolvable author.
pub const ANONYMOUS: &str = "Anonymous";

// ── Reactions ────────────────────────────────────────────────────────────────

/// A reaction the user can ask the backend to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Dislike,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Like => "like",
            ReactionType::Dislike => "dislike",
        }
    }
}

impl std::str::FromStr for ReactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(ReactionType::Like),
            "dislike" => Ok(ReactionType::Dislike),
            other => Err(format!("unknown reaction type '{other}' (expected like or dislike)")),
        }
    }
}

/// What the current user has expressed on a subject, as reported by the
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserReaction {
    #[default]
    None,
    Liked,
    Disliked,
}

impl UserReaction {
    /// Decode the backend's `user_reaction` field.  Absent, null and unknown
    /// values all mean "no reaction".
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("like") | Some("liked") => UserReaction::Liked,
            Some("dislike") | Some("disliked") => UserReaction::Disliked,
            _ => UserReaction::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Track,
    Comment,
}

/// Something that can be reacted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub kind: SubjectKind,
}

impl Subject {
    pub fn track(id: i64) -> Self {
        Self {
            id,
            kind: SubjectKind::Track,
        }
    }

    pub fn comment(id: i64) -> Self {
        Self {
            id,
            kind: SubjectKind::Comment,
        }
    }

    /// REST path of the subject's reaction resource.
    pub fn reactions_path(&self) -> String {
        match self.kind {
            SubjectKind::Track => format!("/api/sounds/{}/reactions", self.id),
            SubjectKind::Comment => format!("/api/comments/{}/reactions", self.id),
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            SubjectKind::Track => write!(f, "track #{}", self.id),
            SubjectKind::Comment => write!(f, "comment #{}", self.id),
        }
    }
}

/// Authoritative reaction counters for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub likes: u32,
    pub dislikes: u32,
    pub user_reaction: UserReaction,
}

/// Body of `GET /api/sounds/{id}/reactions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionsRecord {
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub dislikes: Option<i64>,
    #[serde(default)]
    pub user_reaction: Option<String>,
}

impl ReactionsRecord {
    pub fn normalize(&self) -> ReactionCounts {
        ReactionCounts {
            likes: non_negative(self.likes),
            dislikes: non_negative(self.dislikes),
            user_reaction: UserReaction::from_wire(self.user_reaction.as_deref()),
        }
    }
}

// ── Tracks ───────────────────────────────────────────────────────────────────

/// A normalized track ("sound" on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub name: String,
    pub album: String,
    pub genre: String,
    /// Relative path of the uploaded audio.  `None` when the file was never
    /// uploaded; such tracks are listed but cannot be played.
    pub file_path: Option<String>,
    pub author_id: Option<i64>,
    pub likes: u32,
    pub dislikes: u32,
    pub user_reaction: UserReaction,
}

impl Track {
    pub fn is_playable(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn counts(&self) -> ReactionCounts {
        ReactionCounts {
            likes: self.likes,
            dislikes: self.dislikes,
            user_reaction: self.user_reaction,
        }
    }

    pub fn apply_counts(&mut self, counts: &ReactionCounts) {
        self.likes = counts.likes;
        self.dislikes = counts.dislikes;
        self.user_reaction = counts.user_reaction;
    }
}

/// One element of `GET /api/sounds/` as the backend may send it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoundRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default, rename = "filePath")]
    pub file_path_camel: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default, rename = "authorID")]
    pub author_id_camel: Option<i64>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub dislikes: Option<i64>,
    #[serde(default)]
    pub user_reaction: Option<String>,
}

impl SoundRecord {
    /// Resolve into a [`Track`].  Returns `None` only when the record has no
    /// id, since such a track cannot be reacted to or commented on.
    pub fn normalize(self) -> Option<Track> {
        let id = self.id?;
        Some(Track {
            id,
            name: first_present([self.name, self.title]).unwrap_or_else(|| UNTITLED.to_string()),
            album: first_present([self.album]).unwrap_or_else(|| UNKNOWN.to_string()),
            genre: first_present([self.genre]).unwrap_or_else(|| UNKNOWN.to_string()),
            file_path: first_present([self.file_path, self.file_path_camel, self.filename]),
            author_id: self.author_id.or(self.author_id_camel),
            likes: non_negative(self.likes),
            dislikes: non_negative(self.dislikes),
            user_reaction: UserReaction::from_wire(self.user_reaction.as_deref()),
        })
    }
}

// ── Comments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author_name: String,
    pub text: String,
    /// `None` when the backend omitted the timestamp or sent one we could
    /// not parse.
    pub created_at: Option<DateTime<Utc>>,
    pub likes: u32,
    pub dislikes: u32,
}

/// One element of `GET /api/sounds/{id}/comments`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, rename = "authorName")]
    pub author_name_camel: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at_camel: Option<String>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub dislikes: Option<i64>,
}

impl CommentRecord {
    /// Resolve into a [`Comment`].  Records without an id or without any
    /// text are rejected.
    pub fn normalize(self) -> Option<Comment> {
        let id = self.id?;
        let text = first_present([self.text, self.content])?;
        let created_at = first_present([self.created_at, self.created_at_camel])
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|ts| ts.with_timezone(&Utc));

        Some(Comment {
            id,
            author_name: first_present([
                self.author_name,
                self.author_name_camel,
                self.username,
                self.author,
            ])
            .unwrap_or_else(|| ANONYMOUS.to_string()),
            text,
            created_at,
            likes: non_negative(self.likes),
            dislikes: non_negative(self.dislikes),
        })
    }
}

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSoundRequest<'a> {
    pub name: &'a str,
    pub album: &'a str,
    pub genre: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetReactionRequest {
    #[serde(rename = "type")]
    pub reaction: ReactionType,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest<'a> {
    pub text: &'a str,
}

/// Extract the session token from a successful login response.
///
/// The backend answers `{"token": "..."}`, but older deployments answered
/// with the bare token, either JSON-quoted or as plain text.
pub fn parse_login_token(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => map
            .get("token")
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        Ok(serde_json::Value::String(token)) => {
            let token = token.trim();
            (!token.is_empty()).then(|| token.to_string())
        }
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Error bodies look like `{"error": "..."}`; anything else is returned as
/// trimmed text.  `None` for an empty body.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message"] {
            if let Some(msg) = map.get(key).and_then(|m| m.as_str()) {
                if !msg.trim().is_empty() {
                    return Some(msg.trim().to_string());
                }
            }
        }
    }
    Some(trimmed.to_string())
}

fn first_present<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

fn non_negative(value: Option<i64>) -> u32 {
    value.unwrap_or(0).clamp(0, u32::MAX as i64) as u32
}
