//! Downloader channel messages
//!
//! VOTABLE submission, DataLink parameter discovery and download progress.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Request;

/// Socket.IO namespace of the downloader channel
pub const DOWNLOADER_NAMESPACE: &str = "/downloader";

// Outbound event names
pub const VOTABLE_TEXT: &str = "votable_text";
pub const VOTABLE_URL: &str = "votable_url";
pub const DOWNLOAD_SPECTRA: &str = "download_spectra";

// Inbound event names
pub const VOTABLE_PARSED: &str = "votable_parsed";
pub const SPECTRUM_DOWNLOADED: &str = "spectrum_downloaded";
pub const SPECTRA_DOWNLOADED: &str = "spectra_downloaded";

/// Spectrum reference as sent by the server: `[row index, display name]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectrumRef(pub u64, pub String);

impl SpectrumRef {
    pub fn index(&self) -> u64 {
        self.0
    }

    pub fn name(&self) -> &str {
        &self.1
    }
}

/// One choice of an enumerated DataLink parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLinkOption {
    pub name: String,
    pub value: String,
}

/// DataLink input parameter descriptor
///
/// `select` parameters offer a fixed set of options, the others are free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLinkParam {
    pub name: String,
    pub select: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<DataLinkOption>,
}

/// `votable_parsed` payload
///
/// Failed parses carry only `success`, `link_known`, `link` and `exception`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotableParsed {
    pub success: bool,
    #[serde(default)]
    pub link_known: bool,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalink_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalink: Option<Vec<DataLinkParam>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spectra: Option<Vec<SpectrumRef>>,
    /// Last download directory known to the server session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

/// `download_spectra` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Selected row indices, as the string values of the spectra list
    pub spectra: Vec<String>,
    #[serde(rename = "use-datalink")]
    pub use_datalink: bool,
    /// Parameter name → chosen value, present only with `use-datalink`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalink: Option<BTreeMap<String, String>>,
    pub directory: String,
}

/// `spectrum_downloaded` payload, one per file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectrumDownloaded {
    pub file_name: String,
    pub url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

/// Outbound downloader messages
#[derive(Debug, Clone, PartialEq)]
pub enum DownloaderRequest {
    /// Raw VOTABLE document
    VotableText(String),
    /// SSAP endpoint URL including query parameters
    VotableUrl(String),
    /// Start downloading the selected spectra
    DownloadSpectra(DownloadRequest),
}

impl Request for DownloaderRequest {
    fn event_name(&self) -> &'static str {
        match self {
            DownloaderRequest::VotableText(_) => VOTABLE_TEXT,
            DownloaderRequest::VotableUrl(_) => VOTABLE_URL,
            DownloaderRequest::DownloadSpectra(_) => DOWNLOAD_SPECTRA,
        }
    }

    fn to_args(&self) -> crate::Result<Vec<Value>> {
        let arg = match self {
            DownloaderRequest::VotableText(text) => Value::String(text.clone()),
            DownloaderRequest::VotableUrl(url) => Value::String(url.clone()),
            DownloaderRequest::DownloadSpectra(request) => serde_json::to_value(request)?,
        };
        Ok(vec![arg])
    }
}
