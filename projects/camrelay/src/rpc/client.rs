use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::{net::UnixStream, time::timeout};

use super::{
    protocol::{ErrorCode, JSONRPC_VERSION},
    wire::{self, MAX_MESSAGE_BYTES, WireError},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RpcClientError {
    #[error("failed to connect to {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] WireError),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Protocol(String),
    #[error("RPC error {code}: {message}")]
    Remote { code: i64, message: String },
}

impl RpcClientError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Remote { code, .. } => ErrorCode::from_code(*code),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct RequestLine<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
}

/// One connection per call; request ids increase per client instance.
#[derive(Debug)]
pub struct RpcClient {
    socket_path: PathBuf,
    next_id: AtomicU64,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            next_id: AtomicU64::new(1),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Calls `method` and returns its `result`. `Value::Null` params are sent
    /// as an empty object.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let request = RequestLine {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: &params,
            id,
        };

        let raw = timeout(self.timeout, self.exchange(&request))
            .await
            .map_err(|_| RpcClientError::Timeout(self.timeout))??;

        parse_response(&raw, id)
    }

    async fn exchange(&self, request: &RequestLine<'_>) -> Result<Vec<u8>, RpcClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| RpcClientError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        wire::write_message(&mut stream, request).await?;
        let raw = wire::read_message(&mut stream, MAX_MESSAGE_BYTES).await?;
        Ok(raw.unwrap_or_default())
    }
}

fn parse_response(raw: &[u8], expected_id: u64) -> Result<Value, RpcClientError> {
    if raw.trim_ascii().is_empty() {
        return Err(RpcClientError::Protocol(
            "connection closed without a response".to_string(),
        ));
    }

    let response: Value = serde_json::from_slice(raw)
        .map_err(|err| RpcClientError::Protocol(err.to_string()))?;
    let Value::Object(mut response) = response else {
        return Err(RpcClientError::Protocol(
            "response is not a JSON object".to_string(),
        ));
    };

    if let Some(error) = response.remove("error") {
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .unwrap_or(ErrorCode::InternalError.code());
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(RpcClientError::Remote { code, message });
    }

    match response.get("id") {
        Some(Value::Number(id)) if id.as_u64() == Some(expected_id) => {}
        other => {
            return Err(RpcClientError::Protocol(format!(
                "response id {other:?} does not match request id {expected_id}"
            )));
        }
    }

    Ok(response.remove("result").unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::rpc::protocol::ErrorCode;

    use super::{RpcClient, RpcClientError, parse_response};

    #[test]
    fn returns_result_of_matching_response() {
        let result = parse_response(br#"{"jsonrpc":"2.0","result":{"x":1},"id":4}"#, 4)
            .expect("response should parse");
        assert_eq!(result, json!({"x": 1}));
    }

    #[test]
    fn surfaces_remote_error_code_and_message() {
        let err = parse_response(
            br#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found: nope"},"id":1}"#,
            1,
        )
        .expect_err("error response should fail");
        assert_eq!(err.code(), Some(ErrorCode::MethodNotFound));
        assert_eq!(err.to_string(), "RPC error -32601: Method not found: nope");
    }

    #[test]
    fn rejects_empty_and_mismatched_responses() {
        assert!(matches!(
            parse_response(b"", 1),
            Err(RpcClientError::Protocol(_))
        ));
        assert!(matches!(
            parse_response(br#"{"jsonrpc":"2.0","result":1,"id":2}"#, 1),
            Err(RpcClientError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn connect_failure_is_a_transport_error() {
        let client = RpcClient::new("/nonexistent/camrelay-rpc.sock");
        let err = client
            .call("list", json!(null))
            .await
            .expect_err("call should fail without a server");
        assert!(matches!(err, RpcClientError::Connect { .. }));
    }
}
