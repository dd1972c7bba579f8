//! Camera stream relay and V4L2 control services.

pub mod app_state;
pub mod config;
pub mod control;
pub mod core;
pub mod rpc;
pub mod stream;
pub mod v4l2;
pub mod web;
