use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
};

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

pub type Params = Map<String, Value>;
pub type HandlerResult = Result<Value, HandlerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ApplicationError,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ApplicationError => -32000,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(Self::ParseError),
            -32600 => Some(Self::InvalidRequest),
            -32601 => Some(Self::MethodNotFound),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::InternalError),
            -32000 => Some(Self::ApplicationError),
            _ => None,
        }
    }
}

/// Failure reported by a method handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Expected failure of the operation itself; reported as `-32000`.
    #[error("{0}")]
    Application(String),
    /// Anything else; reported as `-32603`.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, params: Params) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, params: Params) -> HandlerResult {
        (self)(params).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub id: Value,
}

impl Response {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            outcome: Outcome::Result(result),
            id,
        }
    }

    pub fn error(id: Value, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            outcome: Outcome::Error(ErrorObject {
                code: code.code(),
                message: message.into(),
            }),
            id,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(err) => ErrorCode::from_code(err.code),
        }
    }
}

/// Method name to handler bindings.
///
/// Filled in before serving starts; the server then shares it behind an `Arc`
/// and only ever reads it.
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<String, Arc<dyn Handler>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier handler with the same name.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.methods.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Handles one raw request line.
    pub async fn handle_raw(&self, raw: &[u8]) -> Response {
        match serde_json::from_slice::<Value>(raw.trim_ascii()) {
            Ok(value) => self.handle_value(value).await,
            Err(err) => Response::error(
                Value::Null,
                ErrorCode::ParseError,
                format!("Parse error: {err}"),
            ),
        }
    }

    /// Validates and dispatches one parsed request. The first failing check
    /// decides the error code.
    pub async fn handle_value(&self, request: Value) -> Response {
        let Value::Object(mut request) = request else {
            return Response::error(Value::Null, ErrorCode::InvalidRequest, "Invalid Request");
        };
        let id = request.remove("id").unwrap_or(Value::Null);

        if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Response::error(
                id,
                ErrorCode::InvalidRequest,
                "Invalid Request: jsonrpc must be '2.0'",
            );
        }

        let Some(Value::String(method)) = request.remove("method") else {
            return Response::error(
                id,
                ErrorCode::InvalidRequest,
                "Invalid Request: method must be string",
            );
        };

        let Some(handler) = self.methods.get(&method) else {
            return Response::error(
                id,
                ErrorCode::MethodNotFound,
                format!("Method not found: {method}"),
            );
        };

        // Positional params are not mapped onto names.
        let params = match request.remove("params") {
            None | Some(Value::Null) | Some(Value::Array(_)) => Params::new(),
            Some(Value::Object(params)) => params,
            Some(_) => {
                return Response::error(
                    id,
                    ErrorCode::InvalidParams,
                    "Invalid params: must be object, array, or null",
                );
            }
        };

        let called = AssertUnwindSafe(handler.call(params)).catch_unwind().await;
        match called {
            Ok(Ok(Value::Object(result))) if result.contains_key("error") => {
                let message = match &result["error"] {
                    Value::String(message) => message.clone(),
                    other => other.to_string(),
                };
                Response::error(id, ErrorCode::ApplicationError, message)
            }
            Ok(Ok(result)) => Response::result(id, result),
            Ok(Err(HandlerError::Application(message))) => {
                Response::error(id, ErrorCode::ApplicationError, message)
            }
            Ok(Err(HandlerError::Internal(err))) => Response::error(
                id,
                ErrorCode::InternalError,
                format!("Internal error: {err:#}"),
            ),
            Err(panic) => Response::error(
                id,
                ErrorCode::InternalError,
                format!("Internal error: {}", panic_message(panic.as_ref())),
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "handler panicked"
    }
}
