//! Writes displayed plots to disk
//!
//! The terminal cannot show the PNG payloads inline, so each image slot is
//! mirrored to `<images_dir>/<slot>.png` whenever its payload changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use spectra_common::Result;
use tracing::{debug, warn};

use crate::view::ImageSource;

pub struct ImageSink {
    dir: PathBuf,
    written: HashMap<&'static str, String>,
}

impl ImageSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.png", slot))
    }

    /// Write every slot whose payload changed since the last call
    ///
    /// Returns the paths written.
    pub fn sync(&mut self, images: &[(&'static str, Option<&ImageSource>)]) -> Vec<PathBuf> {
        let mut written = Vec::new();
        for (slot, image) in images {
            let Some(image) = image else {
                continue;
            };
            if self.written.get(slot).map(String::as_str) == Some(image.base64()) {
                continue;
            }
            match self.write(slot, image) {
                Ok(path) => {
                    self.written.insert(*slot, image.base64().to_string());
                    written.push(path);
                }
                Err(e) => warn!("Cannot write {} image: {}", slot, e),
            }
        }
        written
    }

    fn write(&self, slot: &str, image: &ImageSource) -> Result<PathBuf> {
        let bytes = image.decode()?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(slot);
        std::fs::write(&path, bytes)?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &str = "iVBORw0KGgo=";

    #[test]
    fn test_writes_only_changed_slots() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSink::new(dir.path().join("plots"));
        let image = ImageSource::new(PNG_SIGNATURE);

        let first = sink.sync(&[("spectrum", Some(&image)), ("cwt", None)]);
        assert_eq!(first, vec![sink.path_for("spectrum")]);
        assert!(sink.path_for("spectrum").exists());
        assert!(!sink.path_for("cwt").exists());

        let second = sink.sync(&[("spectrum", Some(&image))]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_bad_payload_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSink::new(dir.path());
        let bad = ImageSource::new("not base64!");
        assert!(sink.sync(&[("transformation", Some(&bad))]).is_empty());
    }
}
