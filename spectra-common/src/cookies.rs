//! Client-side cookie jar
//!
//! The browser client kept the last download directory in a cookie so the
//! server could offer it again on the next visit. The jar keeps the same
//! cookies in a small TOML file and replays them in the `Cookie` header of
//! every socket handshake.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Cookie holding the last used download directory
pub const LAST_DIRECTORY: &str = "last-directory";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieFile {
    #[serde(default)]
    cookies: BTreeMap<String, String>,
}

/// Persistent name → value cookie store
///
/// Values are kept encoded the way `encodeURIComponent` encodes them, exactly
/// as they travel on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieJar {
    path: Option<PathBuf>,
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// In-memory jar that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the jar stored at `path`; a missing or unreadable file yields an empty jar
    pub fn load(path: &Path) -> Self {
        let cookies = match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<CookieFile>(&content) {
                Ok(file) => file.cookies,
                Err(e) => {
                    warn!("Discarding unreadable cookie file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) => {
                debug!("No cookie file at {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path.to_path_buf()),
            cookies,
        }
    }

    /// Decoded value of a cookie
    pub fn get(&self, name: &str) -> Option<String> {
        let raw = self.cookies.get(name)?;
        match urlencoding::decode(raw) {
            Ok(value) => Some(value.into_owned()),
            Err(_) => Some(raw.clone()),
        }
    }

    /// Set a cookie and persist the jar
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.cookies
            .insert(name.to_string(), encode_component(value));
        self.save()
    }

    /// `Cookie` request header value, `None` when the jar is empty
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", urlencoding::encode(name), value))
            .collect();
        Some(pairs.join("; "))
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = CookieFile {
            cookies: self.cookies.clone(),
        };
        let content = toml::to_string(&file)
            .map_err(|e| Error::Config(format!("Cannot serialize cookies: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Percent-encode like `encodeURIComponent`, which leaves `! ' ( ) *` alone
fn encode_component(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}
