//! JSON-file accessory host for `sleepiq run`.
//!
//! Keeps the registered accessory set in `accessories.json` so the next
//! run restores the same handles, and echoes characteristic changes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use sleepiq_core::{
    AccessoryHandle, AccessoryHost, CachedAccessory, Characteristic, CharacteristicValue,
};

use crate::cli::OutputFormat;
use crate::output;

/// How `notify` calls are echoed to stdout.
pub struct Echo {
    pub format: OutputFormat,
    pub color: bool,
}

pub struct FileHost {
    path: PathBuf,
    accessories: Mutex<Vec<CachedAccessory>>,
    echo: Option<Echo>,
}

#[derive(Serialize)]
struct ChangeLine<'a> {
    time: String,
    accessory: &'a str,
    characteristic: Characteristic,
    value: CharacteristicValue,
}

impl FileHost {
    pub fn new(path: impl Into<PathBuf>, echo: Option<Echo>) -> Self {
        Self {
            path: path.into(),
            accessories: Mutex::new(Vec::new()),
            echo,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accessories currently registered.
    #[cfg(test)]
    pub fn accessories(&self) -> Vec<CachedAccessory> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CachedAccessory>> {
        self.accessories.lock().expect("file host lock poisoned")
    }

    /// Parse the cache file. Entries that do not parse are dropped one by
    /// one; a missing file is an empty cache.
    fn read_cache(&self) -> Vec<CachedAccessory> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read accessory cache");
                return Vec::new();
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "accessory cache is not a JSON list");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(cached) => Some(cached),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable cached accessory");
                    None
                }
            })
            .collect()
    }

    fn persist(&self, accessories: &[CachedAccessory]) {
        if let Err(e) = self.write_cache(accessories) {
            warn!(path = %self.path.display(), error = %e, "could not save accessory cache");
        }
    }

    fn write_cache(&self, accessories: &[CachedAccessory]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(accessories)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn echo_change(
        &self,
        echo: &Echo,
        handle: &AccessoryHandle,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        let time = Local::now().format("%H:%M:%S").to_string();
        let line = match echo.format {
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(
                &ChangeLine {
                    time,
                    accessory: &handle.display_name,
                    characteristic,
                    value,
                },
                true,
            ),
            OutputFormat::Table | OutputFormat::Plain => format!(
                "{} {} {characteristic} = {value}",
                output::muted(&time, echo.color),
                output::accent(&handle.display_name, echo.color),
            ),
        };
        output::print_output(&line, false);
    }
}

impl AccessoryHost for FileHost {
    fn restore(&self) -> Vec<CachedAccessory> {
        let cached = self.read_cache();
        debug!(path = %self.path.display(), count = cached.len(), "loaded accessory cache");
        *self.lock() = cached.clone();
        cached
    }

    fn register(&self, accessory: &CachedAccessory) {
        let mut accessories = self.lock();
        accessories.retain(|a| a.handle.uuid != accessory.handle.uuid);
        accessories.push(accessory.clone());
        self.persist(&accessories);
    }

    fn unregister(&self, handle: &AccessoryHandle) {
        let mut accessories = self.lock();
        accessories.retain(|a| a.handle.uuid != handle.uuid);
        self.persist(&accessories);
    }

    fn notify(
        &self,
        handle: &AccessoryHandle,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        info!(accessory = %handle.display_name, %characteristic, %value, "accessory changed");
        if let Some(ref echo) = self.echo {
            self.echo_change(echo, handle, characteristic, value);
        }
    }
}
