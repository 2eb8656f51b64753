//! File outbox: one alert payload per line for a downstream delivery worker.

use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use setupflow_core::domain::AlertPayload;
use setupflow_core::store::{Notifier, NotifyError};

pub struct JsonlOutbox {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlOutbox {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Notifier for JsonlOutbox {
    fn notify(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let json = serde_json::to_string(payload).map_err(|e| NotifyError(e.to_string()))?;
        let mut file = self.file.lock();
        writeln!(file, "{json}")
            .and_then(|_| file.flush())
            .map_err(|e| NotifyError(format!("{}: {e}", self.path.display())))?;
        debug!(alert_id = %payload.alert_id, "alert queued");
        Ok(())
    }
}
