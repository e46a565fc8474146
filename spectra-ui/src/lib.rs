//! Spectra UI client library
//!
//! Terminal client for the spectra analyzer and spectra downloader
//! services. Each service is reached over one Socket.IO namespace; a view
//! controller owns the UI state of that namespace and the session loop
//! connects the two.

pub mod commands;
pub mod dispatch;
pub mod images;
pub mod render;
pub mod session;
pub mod transport;
pub mod view;

pub use session::{run_session, Presenter, SessionEnd};
pub use transport::{Channel, ChannelEvent};
