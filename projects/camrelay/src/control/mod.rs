pub mod bindings;
pub mod rpc;
pub mod service;

pub use bindings::{CameraBinding, CameraBindings};
pub use rpc::register_methods;
pub use service::ControlService;
