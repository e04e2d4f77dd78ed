// Metadata probing and media type classification for the audit pass
//
// - cli: `yt-dlp --dump-single-json` prober
// - classify: pure reduction of prober output into a MediaType
// - orchestrator: probe + classify with heuristic fallback

mod classify;
mod cli;
mod orchestrator;
mod traits;

pub use classify::{classify_info, fallback_media_type, MediaEntry, MediaMetadata};
pub use cli::YtDlpProber;
pub use orchestrator::MediaAuditor;
pub use traits::{MetadataProber, ProberConfig};
