//! Test helper modules for spectra-ui integration tests
//!
//! - MockServer: scripted Socket.IO server over an axum WebSocket route
//! - RecordingPresenter: presenter that keeps every alert

pub mod mock_server;

pub use mock_server::{MockServer, Reply};

use spectra_ui::Presenter;

/// Presenter recording what the session showed
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub presented: usize,
    pub alerts: Vec<String>,
}

impl<C> Presenter<C> for RecordingPresenter {
    fn present(&mut self, _view: &C) {
        self.presented += 1;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}
