//! Analyzer view controller
//!
//! Directory browser on the left, analysis of the selected spectrum on the
//! right: raw spectrum plot, CWT plot, and the reduced spectrum controlled by
//! two sliders (frequency shift and window size).

use spectra_common::protocol::{
    AnalyzerRequest, DirectoryEntry, DirectoryInfo, FileAnalyzed, SliderChange,
    ANALYZER_NAMESPACE, DIRECTORY_INFO, FILE_ANALYZED, TRANSFORMATION_UPDATED,
};
use spectra_common::{Error, Result};
use tracing::debug;

use super::{ImageSource, Slider, ViewController, DISCONNECTED_ALERT};
use crate::dispatch::Dispatcher;

/// Upper slider bound before any spectrum has been analyzed
const INITIAL_SLIDER_MAX: u32 = 50;

/// User actions on the analyzer page
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerCommand {
    /// Type a path into the path field and follow it
    FollowPath(String),
    /// Click a listing row
    OpenRow(usize),
    SetFreq0(u32),
    SetWindowSize(u32),
    /// "Show only transformation" checkbox
    OnlyTransformation(bool),
}

/// Listing row tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn tag(self) -> &'static str {
        match self {
            EntryKind::File => "F",
            EntryKind::Directory => "D",
        }
    }
}

/// One rendered row of the directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    /// `row<index>`
    pub id: String,
    pub kind: EntryKind,
    pub name: String,
    /// Empty for directories
    pub modified: String,
    /// Empty for directories
    pub size: String,
    pub selected: bool,
}

impl ListingRow {
    fn from_entry(index: usize, entry: &DirectoryEntry) -> Self {
        let (kind, modified, size) = if entry.is_file {
            (
                EntryKind::File,
                entry.modified.clone().unwrap_or_default(),
                entry.size.clone().unwrap_or_default(),
            )
        } else {
            (EntryKind::Directory, String::new(), String::new())
        };
        Self {
            id: format!("row{}", index),
            kind,
            name: entry.name.clone(),
            modified,
            size,
            selected: entry.selected,
        }
    }
}

/// All analyzer page state
#[derive(Debug, Clone)]
pub struct AnalyzerView {
    /// Contents of the path text field
    pub path_field: String,
    pub listing: Vec<ListingRow>,
    /// Spinner shown while a file is being analyzed
    pub progress_visible: bool,
    /// Spinner shown while a transformation is recomputed
    pub slider_progress_visible: bool,
    pub analysis_visible: bool,
    pub invalid_visible: bool,
    pub spectrum_name: String,
    pub spectrum_plot: Option<ImageSource>,
    pub cwt_plot: Option<ImageSource>,
    pub transformation_plot: Option<ImageSource>,
    pub freq0: Slider,
    pub w_size: Slider,
    /// Number of wavelet scales of the analyzed spectrum
    pub scales: Option<u32>,
    /// `None` until the user touches the checkbox
    pub only_transformation: Option<bool>,
    loaded_directory_path: String,
    loaded_directory: Vec<DirectoryEntry>,
    alerts: Vec<String>,
    outbox: Vec<AnalyzerRequest>,
}

impl Default for AnalyzerView {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerView {
    pub fn new() -> Self {
        Self {
            path_field: String::new(),
            listing: Vec::new(),
            progress_visible: false,
            slider_progress_visible: false,
            analysis_visible: false,
            invalid_visible: false,
            spectrum_name: String::new(),
            spectrum_plot: None,
            cwt_plot: None,
            transformation_plot: None,
            freq0: Slider::new("freq0", "Frequency shift:", 0, INITIAL_SLIDER_MAX),
            w_size: Slider::new("wSize", "Window size:", 0, INITIAL_SLIDER_MAX),
            scales: None,
            only_transformation: None,
            loaded_directory_path: String::new(),
            loaded_directory: Vec::new(),
            alerts: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// Path of the directory currently listed
    pub fn loaded_directory_path(&self) -> &str {
        &self.loaded_directory_path
    }

    // ---------------------------------------------------------------------
    // User actions
    // ---------------------------------------------------------------------

    pub fn follow_path(&mut self, path: &str) {
        self.path_field = path.to_string();
        self.outbox.push(AnalyzerRequest::ChangePath(path.to_string()));
    }

    pub fn row_clicked(&mut self, index: usize) -> Result<()> {
        let entry = self.loaded_directory.get(index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "no row {} in a listing of {} entries",
                index,
                self.loaded_directory.len()
            ))
        })?;
        self.outbox
            .push(AnalyzerRequest::ChangePath(entry.path.clone()));
        Ok(())
    }

    pub fn set_freq0(&mut self, value: u32) -> Result<()> {
        self.require_analysis()?;
        self.freq0.set_value(value);
        if let Some(scales) = self.scales {
            self.w_size.set_max(remaining_scales(scales, self.freq0.value));
        }
        self.notify_slider_changed();
        Ok(())
    }

    pub fn set_w_size(&mut self, value: u32) -> Result<()> {
        self.require_analysis()?;
        self.w_size.set_value(value);
        if let Some(scales) = self.scales {
            self.freq0.set_max(remaining_scales(scales, self.w_size.value));
        }
        self.notify_slider_changed();
        Ok(())
    }

    pub fn set_only_transformation(&mut self, flag: bool) -> Result<()> {
        self.require_analysis()?;
        self.only_transformation = Some(flag);
        self.slider_progress_visible = true;
        self.outbox
            .push(AnalyzerRequest::OnlyTransformationChanged(flag));
        Ok(())
    }

    fn require_analysis(&self) -> Result<()> {
        if self.analysis_visible {
            Ok(())
        } else {
            Err(Error::InvalidInput(
                "no spectrum has been analyzed yet".to_string(),
            ))
        }
    }

    fn notify_slider_changed(&mut self) {
        self.slider_progress_visible = true;
        self.outbox.push(AnalyzerRequest::SliderChanged(SliderChange {
            freq0: self.freq0.value,
            w_size: self.w_size.value,
            only_transformation: self.only_transformation,
        }));
    }

    // ---------------------------------------------------------------------
    // Server messages
    // ---------------------------------------------------------------------

    pub fn on_directory_info(&mut self, info: DirectoryInfo) {
        if info.invalid {
            self.alerts
                .push(format!("The path {} is invalid", info.path));
            self.path_field = self.loaded_directory_path.clone();
            return;
        }

        self.listing = info
            .directory
            .iter()
            .enumerate()
            .map(|(index, entry)| ListingRow::from_entry(index, entry))
            .collect();
        for entry in info.directory.iter().filter(|entry| entry.selected) {
            self.progress_visible = true;
            self.outbox
                .push(AnalyzerRequest::AnalyzeFile(entry.path.clone()));
        }

        debug!(
            "Listed {} ({} entries)",
            info.path,
            info.directory.len()
        );
        self.loaded_directory_path = info.path;
        self.loaded_directory = info.directory;
        self.path_field = self.loaded_directory_path.clone();
    }

    pub fn on_file_analyzed(&mut self, result: FileAnalyzed) {
        self.progress_visible = false;
        if result.invalid {
            self.analysis_visible = false;
            self.invalid_visible = true;
            return;
        }

        self.invalid_visible = false;
        self.analysis_visible = true;
        self.spectrum_name = result.file_name.unwrap_or_default();
        self.spectrum_plot = result.spectrum_img.map(ImageSource::new);
        self.cwt_plot = result.cwt_img.map(ImageSource::new);
        self.transformation_plot = result.transformation_img.map(ImageSource::new);
        self.scales = result.scales;

        let freq0 = result.freq0.unwrap_or(0);
        let w_size = result.w_size.unwrap_or(0);
        let (freq0_max, w_size_max) = match self.scales {
            Some(scales) => (
                remaining_scales(scales, w_size),
                remaining_scales(scales, freq0),
            ),
            None => (INITIAL_SLIDER_MAX, INITIAL_SLIDER_MAX),
        };
        self.freq0.set_max(freq0_max);
        self.w_size.set_max(w_size_max);
        self.freq0.set_value(freq0);
        self.w_size.set_value(w_size);
    }

    pub fn on_transformation_updated(&mut self, image: String) {
        self.transformation_plot = Some(ImageSource::new(image));
        self.slider_progress_visible = false;
    }
}

/// Largest value one slider may take given the other: `max(0, scales - 1 - other)`
pub fn remaining_scales(scales: u32, other: u32) -> u32 {
    scales.saturating_sub(1).saturating_sub(other)
}

impl ViewController for AnalyzerView {
    type Request = AnalyzerRequest;
    type Command = AnalyzerCommand;

    const NAMESPACE: &'static str = ANALYZER_NAMESPACE;

    fn dispatcher() -> Dispatcher<Self> {
        Dispatcher::new()
            .on(DIRECTORY_INFO, AnalyzerView::on_directory_info)
            .on(FILE_ANALYZED, AnalyzerView::on_file_analyzed)
            .on(TRANSFORMATION_UPDATED, AnalyzerView::on_transformation_updated)
    }

    fn apply(&mut self, command: AnalyzerCommand) -> Result<()> {
        match command {
            AnalyzerCommand::FollowPath(path) => {
                self.follow_path(&path);
                Ok(())
            }
            AnalyzerCommand::OpenRow(index) => self.row_clicked(index),
            AnalyzerCommand::SetFreq0(value) => self.set_freq0(value),
            AnalyzerCommand::SetWindowSize(value) => self.set_w_size(value),
            AnalyzerCommand::OnlyTransformation(flag) => self.set_only_transformation(flag),
        }
    }

    fn take_outbox(&mut self) -> Vec<AnalyzerRequest> {
        std::mem::take(&mut self.outbox)
    }

    fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    fn disconnected(&mut self) {
        self.alerts.push(DISCONNECTED_ALERT.to_string());
    }

    fn images(&self) -> Vec<(&'static str, Option<&ImageSource>)> {
        vec![
            ("spectrum", self.spectrum_plot.as_ref()),
            ("cwt", self.cwt_plot.as_ref()),
            ("transformation", self.transformation_plot.as_ref()),
        ]
    }
}
