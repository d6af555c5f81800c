//! Client-side synchronization core for soundtube.
//!
//! All state is reconciled pessimistically with the backend: nothing is
//! inserted or counted locally, every mutation is followed by an
//! authoritative re-read.  Rendering is delegated to a [`ViewNotifier`].

pub mod client;
pub mod comments;
pub mod error;
pub mod feed;
pub mod notifier;
pub mod reactions;
pub mod session;
pub mod transport;
pub mod upload;

pub use client::SoundClient;
pub use error::{ClientError, Result};
pub use feed::FeedState;
pub use notifier::{LogNotifier, ViewEvent, ViewNotifier};
pub use session::{Session, SessionContext};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
pub use upload::{AudioFile, PendingUpload, UploadPhase};
