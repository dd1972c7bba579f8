use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::warn;

pub type ControlValues = BTreeMap<String, i64>;

const STATE_SUBDIR: &str = "v4l2-ctrls";

/// Last-applied control values of one device, stored as a flat JSON object.
#[derive(Debug, Clone)]
pub struct ControlStore {
    path: PathBuf,
}

impl ControlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_device(state_dir: &Path, device: &str) -> Self {
        Self::new(state_file(state_dir, device))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, unreadable or malformed state is an empty map. Entries that
    /// are not integers are skipped.
    pub async fn load(&self) -> ControlValues {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return ControlValues::new(),
            Err(err) => {
                warn!("failed to read {}: {err}", self.path.display());
                return ControlValues::new();
            }
        };

        let Ok(Value::Object(entries)) = serde_json::from_slice::<Value>(&raw) else {
            warn!("ignoring malformed state file {}", self.path.display());
            return ControlValues::new();
        };

        entries
            .into_iter()
            .filter_map(|(name, value)| value.as_i64().map(|value| (name, value)))
            .collect()
    }

    /// Replaces the stored values with `values`.
    pub async fn save(&self, values: &ControlValues) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut body = serde_json::to_vec_pretty(values)?;
        body.push(b'\n');
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, body)
            .await
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }
}

/// `$XDG_STATE_HOME/v4l2-ctrls`, else `~/.local/state/v4l2-ctrls`.
pub fn default_state_dir() -> PathBuf {
    let state_home = std::env::var_os("XDG_STATE_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs_next::home_dir().map(|home| home.join(".local").join("state")))
        .unwrap_or_else(|| PathBuf::from(".local/state"));
    state_home.join(STATE_SUBDIR)
}

/// `/dev/video11` → `<state_dir>/video11.json`.
pub fn state_file(state_dir: &Path, device: &str) -> PathBuf {
    let name = Path::new(device)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| device.replace('/', "_"));
    state_dir.join(format!("{name}.json"))
}
