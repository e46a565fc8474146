//! Message vocabulary exchanged with the spectra analyzer server
//!
//! Each channel lives in its own Socket.IO namespace. Field names follow the
//! wire format exactly, including the camel-case and hyphenated keys the
//! server expects (`wSize`, `use-datalink`, `only-transformation`).

mod analyzer;
mod downloader;

pub use analyzer::{
    AnalyzerRequest, DirectoryEntry, DirectoryInfo, FileAnalyzed, SliderChange, ANALYZE_FILE,
    ANALYZER_NAMESPACE, CHANGE_PATH, DIRECTORY_INFO, FILE_ANALYZED, ONLY_TRANSFORMATION_CHANGED,
    SLIDER_CHANGED, TRANSFORMATION_UPDATED,
};
pub use downloader::{
    DataLinkOption, DataLinkParam, DownloadRequest, DownloaderRequest, SpectrumDownloaded,
    SpectrumRef, VotableParsed, DOWNLOADER_NAMESPACE, DOWNLOAD_SPECTRA, SPECTRA_DOWNLOADED,
    SPECTRUM_DOWNLOADED, VOTABLE_PARSED, VOTABLE_TEXT, VOTABLE_URL,
};

use serde_json::Value;

/// Outbound message on one of the channels
///
/// Implemented by the per-channel request enums so the transport can frame
/// any of them as a Socket.IO `EVENT` packet.
pub trait Request {
    /// Event name on the wire
    fn event_name(&self) -> &'static str;

    /// Event arguments in emission order
    fn to_args(&self) -> crate::Result<Vec<Value>>;
}
