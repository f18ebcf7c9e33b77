//! Audio file handling: download, conversion and transient storage.
//!
//! * [`FileFetcher`]    — HTTP GET of a voice file into local storage.
//! * [`Transcoder`]     — external converter producing PCM WAV.
//! * [`TransientFiles`] — the per-message `.ogg` / `.wav` pair and its
//!   guaranteed removal.

pub mod fetch;
pub mod transcode;
pub mod transient;

pub use fetch::{FetchError, FileFetcher};
pub use transcode::{TranscodeError, Transcoder};
pub use transient::TransientFiles;
