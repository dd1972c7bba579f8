//! Camera controls through the `v4l2-ctl` utility.

pub mod device;
pub mod discovery;
pub mod error;
pub mod parse;
pub mod persistence;
pub mod runner;

pub use device::V4l2Device;
pub use discovery::{DEFAULT_DEVICE_LIMIT, detect_devices};
pub use error::ControlError;
pub use parse::{Control, MenuItem};
pub use persistence::{ControlStore, ControlValues, default_state_dir};
pub use runner::{CtlOutput, CtlRunner, V4l2Ctl};
