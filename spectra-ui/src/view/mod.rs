//! View controllers
//!
//! Each channel has one controller owning every piece of UI state for that
//! channel. User actions mutate the state and queue outbound requests;
//! inbound server messages overwrite the state through the dispatch table.

pub mod analyzer;
pub mod downloader;

pub use analyzer::{AnalyzerCommand, AnalyzerView};
pub use downloader::{DownloaderCommand, DownloaderView};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use spectra_common::protocol::Request;
use spectra_common::{Error, Result};

use crate::dispatch::Dispatcher;

/// Alert shown when the channel drops
pub const DISCONNECTED_ALERT: &str = "Disconnected from the server. Please refresh the page.";

/// Behaviour shared by the analyzer and downloader controllers
pub trait ViewController: Sized {
    /// Outbound message type of the channel
    type Request: Request;
    /// User action type accepted by the controller
    type Command;

    /// Socket.IO namespace of the channel
    const NAMESPACE: &'static str;

    /// Inbound event table for this controller
    fn dispatcher() -> Dispatcher<Self>;

    /// Apply one user action
    fn apply(&mut self, command: Self::Command) -> Result<()>;

    /// Drain queued outbound requests in emission order
    fn take_outbox(&mut self) -> Vec<Self::Request>;

    /// Drain pending user-visible alerts
    fn take_alerts(&mut self) -> Vec<String>;

    /// The channel is gone for good
    fn disconnected(&mut self);

    /// Images currently displayed, keyed by slot name
    fn images(&self) -> Vec<(&'static str, Option<&ImageSource>)> {
        Vec::new()
    }
}

/// Base64 encoded PNG as received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    base64: String,
}

impl ImageSource {
    pub fn new(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
        }
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    /// `data:` URI as used for an `<img src>`
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.base64)
    }

    /// Raw PNG bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.base64.trim())
            .map_err(|e| Error::InvalidInput(format!("image payload is not base64: {}", e)))
    }
}

/// Range input: value always within `min..=max`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slider {
    pub id: &'static str,
    pub label: &'static str,
    pub min: u32,
    pub max: u32,
    pub value: u32,
}

impl Slider {
    pub fn new(id: &'static str, label: &'static str, min: u32, max: u32) -> Self {
        Self {
            id,
            label,
            min,
            max,
            value: min,
        }
    }

    /// Set the value, clamped into range
    pub fn set_value(&mut self, value: u32) {
        self.value = value.clamp(self.min, self.max.max(self.min));
    }

    /// Move the upper bound, pulling the value down with it
    pub fn set_max(&mut self, max: u32) {
        self.max = max.max(self.min);
        if self.value > self.max {
            self.value = self.max;
        }
    }
}

/// Styling of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Fail,
}

impl StatusClass {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusClass::Success => "success",
            StatusClass::Fail => "fail",
        }
    }
}

/// Text plus styling, e.g. query status or download outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    pub text: String,
    pub class: StatusClass,
}

impl StatusText {
    pub fn new(text: impl Into<String>, class: StatusClass) -> Self {
        Self {
            text: text.into(),
            class,
        }
    }
}

/// One `<option>` of a select box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slider_clamps_value() {
        let mut slider = Slider::new("freq0", "Frequency shift:", 0, 50);
        slider.set_value(70);
        assert_eq!(slider.value, 50);
    }

    #[test]
    fn test_slider_shrinking_max_pulls_value() {
        let mut slider = Slider::new("wSize", "Window size:", 0, 50);
        slider.set_value(30);
        slider.set_max(12);
        assert_eq!(slider.max, 12);
        assert_eq!(slider.value, 12);
    }

    #[test]
    fn test_image_data_uri() {
        let image = ImageSource::new("iVBORw0KGgo=");
        assert_eq!(image.data_uri(), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(&image.decode().unwrap()[1..4], b"PNG");
    }

    #[test]
    fn test_image_rejects_garbage() {
        assert!(ImageSource::new("***").decode().is_err());
    }
}
