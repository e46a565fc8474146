//! Terminal rendering of the view models

use std::fmt::Write as _;
use std::io::Write;

use crate::images::ImageSink;
use crate::session::Presenter;
use crate::view::analyzer::AnalyzerView;
use crate::view::downloader::{
    ActiveView, DataLinkInput, DownloaderView, ResourceLink, VotInputType,
};
use crate::view::{ImageSource, StatusText, ViewController};

/// Plain-text rendering of a view
pub trait Render {
    fn render(&self) -> String;
}

fn image_line(label: &str, image: Option<&ImageSource>) -> String {
    match image {
        Some(image) => format!("{}: {} base64 chars", label, image.base64().len()),
        None => format!("{}: -", label),
    }
}

fn status(status: &StatusText) -> String {
    format!("{} [{}]", status.text, status.class.as_str())
}

fn link(link: &ResourceLink) -> &str {
    match link {
        ResourceLink::Unknown => "unknown",
        ResourceLink::Link(url) => url,
    }
}

impl Render for AnalyzerView {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== Spectra analyzer ==");
        let _ = writeln!(out, "Path: {}", self.path_field);
        let _ = writeln!(out, "{:>4}  T  {:<40} {:<22} {:>10}", "#", "Name", "Modified", "Size");
        for (index, row) in self.listing.iter().enumerate() {
            let marker = if row.selected { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{:>3}{} {}  {:<40} {:<22} {:>10}",
                index,
                marker,
                row.kind.tag(),
                row.name,
                row.modified,
                row.size
            );
        }
        if self.progress_visible {
            let _ = writeln!(out, "Analyzing...");
        }

        if self.invalid_visible {
            let _ = writeln!(out, "-- The selected file cannot be analyzed --");
        }
        if self.analysis_visible {
            let _ = writeln!(out, "-- {} --", self.spectrum_name);
            let _ = writeln!(out, "{}", image_line("Spectrum", self.spectrum_plot.as_ref()));
            let _ = writeln!(out, "{}", image_line("CWT", self.cwt_plot.as_ref()));
            let _ = writeln!(
                out,
                "{}",
                image_line("Transformation", self.transformation_plot.as_ref())
            );
            for slider in [&self.freq0, &self.w_size] {
                let _ = writeln!(
                    out,
                    "{} {} (0..={})",
                    slider.label, slider.value, slider.max
                );
            }
            if let Some(flag) = self.only_transformation {
                let _ = writeln!(
                    out,
                    "Show only transformation: {}",
                    if flag { "on" } else { "off" }
                );
            }
            if self.slider_progress_visible {
                let _ = writeln!(out, "Recomputing transformation...");
            }
        }
        out
    }
}

impl Render for DownloaderView {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== Spectra downloader ==");
        match self.active_view {
            ActiveView::Votable => self.render_votable(&mut out),
            ActiveView::Download => self.render_download(&mut out),
        }
        out
    }
}

impl DownloaderView {
    fn render_votable(&self, out: &mut String) {
        if !self.votable_selected {
            let hint = match self.input_type {
                VotInputType::Link => "SSAP link: url <address>",
                VotInputType::Upload => "VOTABLE file: upload <path>",
                VotInputType::Direct => "VOTABLE text: direct <text>",
            };
            let _ = writeln!(out, "Input ({}) {}", self.input_type.as_str(), hint);
            if self.progress_visible {
                let _ = writeln!(out, "Processing VOTABLE...");
            }
            return;
        }

        if !self.parse_success {
            let _ = writeln!(out, "Parsing failed");
            let _ = writeln!(out, "Resource: {}", link(&self.resource_url_fail));
            let _ = writeln!(out, "Error: {}", self.error_message);
            return;
        }

        let _ = writeln!(out, "Resource: {}", link(&self.resource_url));
        if let Some(count) = self.record_count {
            let _ = writeln!(out, "Records: {}", count);
        }
        let _ = writeln!(out, "DataLink available: {}", self.datalink_available);
        if let Some(query_status) = &self.query_status {
            let _ = writeln!(out, "Query status: {}", status(query_status));
        }
        let _ = writeln!(out, "Spectra:");
        for option in &self.spectra_select.options {
            let marker = if option.selected { 'x' } else { ' ' };
            let _ = writeln!(out, "  [{}] {:>4} {}", marker, option.value, option.label);
        }

        if let Some(form) = self.datalink_form.as_ref().filter(|_| self.datalink_section_visible) {
            let _ = writeln!(
                out,
                "[{}] Use DataLink protocol",
                if form.use_datalink { 'x' } else { ' ' }
            );
            for field in &form.fields {
                let state = if form.fields_disabled() { " (disabled)" } else { "" };
                match &field.input {
                    DataLinkInput::Text(value) => {
                        let _ = writeln!(out, "  {}: {}{}", field.name, value, state);
                    }
                    DataLinkInput::Select { options, .. } => {
                        let choices: Vec<String> = options
                            .iter()
                            .map(|option| {
                                let marker = if option.selected { "*" } else { "" };
                                format!("{}{}={}", marker, option.label, option.value)
                            })
                            .collect();
                        let _ = writeln!(
                            out,
                            "  {}: {}{}",
                            field.name,
                            choices.join(" | "),
                            state
                        );
                    }
                }
            }
        }
        let _ = writeln!(out, "Directory: {}", self.directory_field);
    }

    fn render_download(&self, out: &mut String) {
        let _ = writeln!(out, "Target directory: {}", self.directory_field);
        for row in &self.download_log {
            let _ = writeln!(
                out,
                "{}  {:<32} {:<8} {}  {}",
                row.received_at.format("%H:%M:%S"),
                row.file_name,
                row.state().text,
                row.url,
                row.problem
            );
        }
        if self.download_progress_visible {
            let _ = writeln!(out, "Downloading...");
        }
        if let Some(download_status) = &self.download_status {
            let _ = writeln!(out, "{}", status(download_status));
        }
    }
}

/// Presenter printing to a writer (stdout in the binary)
pub struct TerminalPresenter<W: Write> {
    out: W,
    images: Option<ImageSink>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, images: Option<ImageSink>) -> Self {
        Self { out, images }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<C, W> Presenter<C> for TerminalPresenter<W>
where
    C: ViewController + Render,
    W: Write,
{
    fn present(&mut self, view: &C) {
        let mut text = view.render();
        if let Some(sink) = self.images.as_mut() {
            for path in sink.sync(&view.images()) {
                let _ = writeln!(text, "Saved {}", path.display());
            }
        }
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    fn alert(&mut self, message: &str) {
        let _ = writeln!(self.out, "!! {}", message);
        let _ = self.out.flush();
    }
}
