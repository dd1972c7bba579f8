use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraBinding {
    pub cam: String,
    pub device: String,
    /// Path prefix of this camera's streams behind the reverse proxy.
    pub prefix: String,
}

impl CameraBinding {
    fn new(position: usize, cam: String, device: String) -> Self {
        Self {
            cam,
            device,
            prefix: stream_prefix(position),
        }
    }
}

/// `/webcam/` for the first camera, `/webcam<n>/` for the n-th after it.
fn stream_prefix(position: usize) -> String {
    match position {
        0 | 1 => "/webcam/".to_string(),
        n => format!("/webcam{n}/"),
    }
}

/// Ordered camera id to device path table, fixed after startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraBindings {
    entries: Vec<CameraBinding>,
}

impl CameraBindings {
    /// Numbers devices `1..=n` in the given order.
    pub fn from_devices<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = devices
            .into_iter()
            .enumerate()
            .map(|(idx, device)| CameraBinding::new(idx + 1, (idx + 1).to_string(), device.into()))
            .collect();
        Self { entries }
    }

    /// Parses a comma-separated list of `id=/dev/path` or bare paths. A bare
    /// path takes its 1-based position as id; repeated ids keep the first.
    pub fn parse(list: &str) -> Self {
        let mut entries: Vec<CameraBinding> = Vec::new();
        let items = list.split(',').map(str::trim).filter(|item| !item.is_empty());

        for (idx, item) in items.enumerate() {
            let (cam, device) = match item.split_once('=') {
                Some((cam, device)) => (cam.trim().to_string(), device.trim().to_string()),
                None => ((idx + 1).to_string(), item.to_string()),
            };
            if cam.is_empty() || device.is_empty() {
                warn!("ignoring malformed device binding {item:?}");
                continue;
            }
            if entries.iter().any(|entry| entry.cam == cam) {
                warn!("ignoring duplicate binding for camera {cam}");
                continue;
            }
            entries.push(CameraBinding::new(entries.len() + 1, cam, device));
        }

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CameraBinding> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&CameraBinding> {
        self.entries.first()
    }

    pub fn get(&self, cam: &str) -> Option<&CameraBinding> {
        self.entries.iter().find(|entry| entry.cam == cam)
    }
}
