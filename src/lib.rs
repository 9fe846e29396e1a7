//! PolyCore API server
//!
//! Backend for the PolyCore language-learning frontend:
//! - `GET /api/subtitles` runs an external extraction program to fetch a
//!   video's subtitles and falls back to sample data when it fails
//! - the [`sync`] module maps playback time to the subtitle line to
//!   highlight while a video plays

pub mod config;
pub mod config_file;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod http;
pub mod metrics;
pub mod state;
pub mod subtitle;
pub mod sync;
pub mod youtube;

pub use error::{FetchError, Result, ServerError};
pub use fetcher::{AcquisitionResult, SubtitleFetcher};
pub use subtitle::{SubtitleEntry, Transcript};
pub use sync::{PlaybackTracker, SyncController, TimeSyncTable};
