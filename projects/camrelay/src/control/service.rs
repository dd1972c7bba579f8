use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::v4l2::{
    Control, ControlError, ControlStore, ControlValues, CtlRunner, V4l2Device,
};

use super::bindings::{CameraBinding, CameraBindings};

/// Control operations addressed by camera id, with applied values persisted
/// per device.
pub struct ControlService {
    bindings: CameraBindings,
    runner: Arc<dyn CtlRunner>,
    state_dir: PathBuf,
    persist_lock: Mutex<()>,
}

impl ControlService {
    pub fn new(bindings: CameraBindings, runner: Arc<dyn CtlRunner>, state_dir: PathBuf) -> Self {
        Self {
            bindings,
            runner,
            state_dir,
            persist_lock: Mutex::new(()),
        }
    }

    pub fn cameras(&self) -> &CameraBindings {
        &self.bindings
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// `None` or an empty id selects the first camera.
    pub fn resolve(&self, cam: Option<&str>) -> Result<&CameraBinding, ControlError> {
        match cam.map(str::trim).filter(|cam| !cam.is_empty()) {
            Some(cam) => self
                .bindings
                .get(cam)
                .ok_or_else(|| ControlError::UnknownCamera(cam.to_string())),
            None => self.bindings.first().ok_or(ControlError::NoDevices),
        }
    }

    pub fn store_for(&self, binding: &CameraBinding) -> ControlStore {
        ControlStore::for_device(&self.state_dir, &binding.device)
    }

    pub async fn list(&self, cam: Option<&str>) -> Result<Vec<Control>, ControlError> {
        let binding = self.resolve(cam)?;
        self.device(binding).list_controls().await
    }

    pub async fn get(
        &self,
        cam: Option<&str>,
        names: Option<&[String]>,
    ) -> Result<ControlValues, ControlError> {
        let binding = self.resolve(cam)?;
        self.device(binding).get_values(names).await
    }

    /// Applies `changes` and merges what was applied into the camera's stored
    /// values. Sets are serialized so the stored values follow the order the
    /// device saw. A failed save is logged; the device already holds the values.
    pub async fn set(
        &self,
        cam: Option<&str>,
        changes: &Map<String, Value>,
    ) -> Result<ControlValues, ControlError> {
        let binding = self.resolve(cam)?;
        let _guard = self.persist_lock.lock().await;
        let applied = self.device(binding).set_controls(changes).await?;

        let store = self.store_for(binding);
        let mut stored = store.load().await;
        stored.extend(applied.iter().map(|(name, value)| (name.clone(), *value)));
        if let Err(err) = store.save(&stored).await {
            warn!("failed to persist controls for camera {}: {err:#}", binding.cam);
        }

        Ok(applied)
    }

    pub async fn info(&self, cam: Option<&str>) -> Result<String, ControlError> {
        let binding = self.resolve(cam)?;
        self.device(binding).info().await
    }

    /// Re-applies every camera's stored values. Returns how many cameras were
    /// restored; failures are logged and skipped.
    pub async fn restore_all(&self) -> usize {
        let mut restored = 0;
        for binding in self.bindings.iter() {
            let stored = self.store_for(binding).load().await;
            if stored.is_empty() {
                continue;
            }

            let changes: Map<String, Value> = stored
                .into_iter()
                .map(|(name, value)| (name, Value::from(value)))
                .collect();
            match self.device(binding).set_controls(&changes).await {
                Ok(applied) => {
                    info!(
                        "restored {} control(s) on camera {} ({})",
                        applied.len(),
                        binding.cam,
                        binding.device
                    );
                    restored += 1;
                }
                Err(err) => warn!(
                    "failed to restore controls on camera {} ({}): {err}",
                    binding.cam, binding.device
                ),
            }
        }
        restored
    }

    fn device<'a>(&'a self, binding: &'a CameraBinding) -> V4l2Device<'a, dyn CtlRunner> {
        V4l2Device::new(self.runner.as_ref(), &binding.device)
    }
}
