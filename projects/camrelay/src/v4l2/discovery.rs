use anyhow::Result;
use tracing::{debug, warn};

use super::{parse::parse_listed_devices, runner::CtlRunner};

pub const DEFAULT_DEVICE_LIMIT: usize = 8;
const PREFERRED_DEVICE: &str = "/dev/v4l-subdev2";

/// Finds controllable devices: what the utility lists, else whatever
/// `/dev/v4l-subdev*` and `/dev/video*` nodes exist.
pub async fn detect_devices(runner: &dyn CtlRunner, limit: usize) -> Vec<String> {
    let mut devices = match runner.run(&["--list-devices"]).await {
        Ok(output) if output.success() => parse_listed_devices(&output.stdout),
        Ok(output) => {
            debug!("device listing failed: {}", output.failure_message("no output"));
            Vec::new()
        }
        Err(err) => {
            warn!("device listing unavailable: {err:#}");
            Vec::new()
        }
    };

    if devices.is_empty() {
        devices = match probe_dev_nodes("/dev").await {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!("failed to scan /dev for video nodes: {err:#}");
                Vec::new()
            }
        };
    }

    prioritize(devices, limit)
}

/// Subdevices first, the preferred sensor subdevice at the very front.
pub fn prioritize(devices: Vec<String>, limit: usize) -> Vec<String> {
    let (mut ordered, others): (Vec<String>, Vec<String>) = devices
        .into_iter()
        .partition(|device| device.contains("/dev/v4l-subdev"));
    ordered.extend(others);

    if let Some(pos) = ordered.iter().position(|device| device == PREFERRED_DEVICE) {
        let preferred = ordered.remove(pos);
        ordered.insert(0, preferred);
    }

    ordered.truncate(limit);
    ordered
}

async fn probe_dev_nodes(dev_dir: &str) -> Result<Vec<String>> {
    let mut subdevs = Vec::new();
    let mut videos = Vec::new();
    let mut dir = tokio::fs::read_dir(dev_dir).await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("v4l-subdev") {
            subdevs.push(format!("{dev_dir}/{name}"));
        } else if name.starts_with("video") {
            videos.push(format!("{dev_dir}/{name}"));
        }
    }
    subdevs.sort();
    videos.sort();

    subdevs.extend(videos);
    Ok(subdevs)
}
