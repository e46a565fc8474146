//! # Spectra Analyzer Common Library
//!
//! Shared code for the spectra analyzer client modules including:
//! - Wire message vocabulary for the analyzer and downloader channels
//! - Engine.IO / Socket.IO packet codec
//! - Configuration loading
//! - Cookie jar persistence

pub mod config;
pub mod cookies;
pub mod error;
pub mod packet;
pub mod protocol;

pub use error::{Error, Result};
