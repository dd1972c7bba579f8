use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    rpc::{HandlerError, HandlerResult, MethodTable, Params},
    v4l2::ControlError,
};

use super::service::ControlService;

impl From<ControlError> for HandlerError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Internal(err) => HandlerError::Internal(err),
            other => HandlerError::Application(other.to_string()),
        }
    }
}

/// Exposes `list`, `get`, `set` and `info` on the control socket.
pub fn register_methods(methods: &mut MethodTable, service: Arc<ControlService>) {
    let svc = service.clone();
    methods.register("list", move |params: Params| {
        let svc = svc.clone();
        async move { list(&svc, params).await }
    });

    let svc = service.clone();
    methods.register("get", move |params: Params| {
        let svc = svc.clone();
        async move { get(&svc, params).await }
    });

    let svc = service.clone();
    methods.register("set", move |params: Params| {
        let svc = svc.clone();
        async move { set(&svc, params).await }
    });

    let svc = service;
    methods.register("info", move |params: Params| {
        let svc = svc.clone();
        async move { info(&svc, params).await }
    });
}

async fn list(service: &ControlService, params: Params) -> HandlerResult {
    let cam = cam_param(&params)?;
    let controls = service.list(cam.as_deref()).await?;
    Ok(json!({ "controls": controls }))
}

async fn get(service: &ControlService, params: Params) -> HandlerResult {
    let cam = cam_param(&params)?;
    let names = match params.get("controls") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| HandlerError::application("controls must be a list of names"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => return Err(HandlerError::application("controls must be a list of names")),
    };

    let values = service.get(cam.as_deref(), names.as_deref()).await?;
    Ok(json!({ "values": values }))
}

async fn set(service: &ControlService, params: Params) -> HandlerResult {
    let cam = cam_param(&params)?;
    let changes = match params.get("controls") {
        Some(Value::Object(changes)) => changes,
        None | Some(Value::Null) => return Err(HandlerError::application("No controls provided")),
        Some(_) => return Err(HandlerError::application("controls must be an object")),
    };

    let applied = service.set(cam.as_deref(), changes).await?;
    Ok(json!({ "ok": true, "applied": applied }))
}

async fn info(service: &ControlService, params: Params) -> HandlerResult {
    let cam = cam_param(&params)?;
    let info = service.info(cam.as_deref()).await?;
    Ok(json!({ "info": info }))
}

/// `cam` may be given as a string or a number.
fn cam_param(params: &Params) -> Result<Option<String>, HandlerError> {
    match params.get("cam") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(cam)) => Ok(Some(cam.clone())),
        Some(Value::Number(cam)) => Ok(Some(cam.to_string())),
        Some(_) => Err(HandlerError::application("cam must be a string or number")),
    }
}
