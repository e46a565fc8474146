//! Analyzer channel messages
//!
//! Directory browsing and live file analysis.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Request;

/// Socket.IO namespace of the analyzer channel
pub const ANALYZER_NAMESPACE: &str = "/analyzer";

// Outbound event names
pub const CHANGE_PATH: &str = "change_path";
pub const SLIDER_CHANGED: &str = "slider_changed";
pub const ANALYZE_FILE: &str = "analyze_file";
pub const ONLY_TRANSFORMATION_CHANGED: &str = "only_transformation_changed";

// Inbound event names
pub const DIRECTORY_INFO: &str = "directory_info";
pub const FILE_ANALYZED: &str = "file_analyzed";
pub const TRANSFORMATION_UPDATED: &str = "transformation_updated";

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// True for regular files, false for directories (including `..`)
    pub is_file: bool,
    /// Entry name as displayed in the listing
    pub name: String,
    /// Absolute path to request when the row is clicked
    pub path: String,
    /// Human readable size, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Human readable modification time, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// Set when the server wants this file analyzed right away
    #[serde(default)]
    pub selected: bool,
}

/// `directory_info` payload
///
/// An invalid path only carries `invalid` and the normalized `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryInfo {
    pub invalid: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub directory: Vec<DirectoryEntry>,
}

/// `file_analyzed` payload
///
/// When `invalid` is set every other field is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAnalyzed {
    pub invalid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Base64 PNG of the raw spectrum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spectrum_img: Option<String>,
    /// Base64 PNG of the continuous wavelet transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwt_img: Option<String>,
    /// Base64 PNG of the reduced spectrum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation_img: Option<String>,
    /// Frequency shift parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq0: Option<u32>,
    /// Window size parameter
    #[serde(rename = "wSize", default, skip_serializing_if = "Option::is_none")]
    pub w_size: Option<u32>,
    /// Number of wavelet scales
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<u32>,
}

/// `slider_changed` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderChange {
    pub freq0: u32,
    #[serde(rename = "wSize")]
    pub w_size: u32,
    /// Only sent once the user has touched the "show only transformation" option
    #[serde(
        rename = "only-transformation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub only_transformation: Option<bool>,
}

/// Outbound analyzer messages
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerRequest {
    /// List a directory (or the directory of a file)
    ChangePath(String),
    /// Transformation parameters moved
    SliderChanged(SliderChange),
    /// Analyze a spectrum file
    AnalyzeFile(String),
    /// Toggle between full and transformation-only plot
    OnlyTransformationChanged(bool),
}

impl Request for AnalyzerRequest {
    fn event_name(&self) -> &'static str {
        match self {
            AnalyzerRequest::ChangePath(_) => CHANGE_PATH,
            AnalyzerRequest::SliderChanged(_) => SLIDER_CHANGED,
            AnalyzerRequest::AnalyzeFile(_) => ANALYZE_FILE,
            AnalyzerRequest::OnlyTransformationChanged(_) => ONLY_TRANSFORMATION_CHANGED,
        }
    }

    fn to_args(&self) -> crate::Result<Vec<Value>> {
        let arg = match self {
            AnalyzerRequest::ChangePath(path) | AnalyzerRequest::AnalyzeFile(path) => {
                Value::String(path.clone())
            }
            AnalyzerRequest::SliderChanged(change) => serde_json::to_value(change)?,
            AnalyzerRequest::OnlyTransformationChanged(flag) => Value::Bool(*flag),
        };
        Ok(vec![arg])
    }
}
