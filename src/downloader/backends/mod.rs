// Downloader backends

pub mod gallery_dl;
pub mod ytdlp;

pub use gallery_dl::GalleryDlBackend;
pub use ytdlp::YtDlpBackend;
