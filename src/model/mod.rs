//! Model module - credentials, API access and playback state
//!
//! Organized into submodules by responsibility:
//!
//! - `api`: retrying HTTP wrapper and reply classification
//! - `credentials`: OAuth credential lifecycle and persistence
//! - `client`: Spotify player API wrapper
//! - `playback`: playback snapshot and progress extrapolation

pub mod api;
pub mod client;
pub mod credentials;
pub mod playback;

pub use api::{ApiError, ApiReply, ReplyClassifier, RetryingHttpClient};
pub use client::{CurrentlyPlaying, SpotifyApi};
pub use credentials::{Credential, CredentialManager};
pub use playback::{ContentKind, PlaybackSnapshot, ProgressTracker};
