pub mod control_handlers;
pub mod pages;
pub mod routes;
pub mod stream_handlers;

pub use routes::{build_control_router, build_stream_router};
