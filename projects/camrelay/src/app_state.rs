use std::sync::Arc;

use crate::{
    config::{ControlConfig, StreamConfig},
    control::ControlService,
};

pub struct StreamState {
    pub config: StreamConfig,
}

impl StreamState {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }
}

pub struct ControlState {
    pub service: Arc<ControlService>,
    pub title: String,
    pub stream_url_base: String,
}

impl ControlState {
    pub fn new(service: Arc<ControlService>, config: &ControlConfig) -> Self {
        Self {
            service,
            title: config.title.clone(),
            stream_url_base: config.stream_url_base.clone(),
        }
    }
}
