use std::{
    fs,
    future::Future,
    io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::{
    io::AsyncWriteExt,
    net::{UnixListener, UnixStream},
    time::{sleep, timeout},
};
use tracing::{debug, info, warn};

use super::{
    protocol::{ErrorCode, Handler, MethodTable, Response},
    wire::{self, MAX_MESSAGE_BYTES, WireError},
};

const READ_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
const SOCKET_MODE: u32 = 0o666;

/// JSON-RPC server over a Unix stream socket: one request line and one
/// response line per connection.
pub struct RpcServer {
    socket_path: PathBuf,
    methods: MethodTable,
    read_timeout: Duration,
}

impl RpcServer {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            methods: MethodTable::new(),
            read_timeout: READ_TIMEOUT,
        }
    }

    /// How long a connection may take to deliver its request line.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.methods.register(name, handler);
        self
    }

    pub fn methods_mut(&mut self) -> &mut MethodTable {
        &mut self.methods
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Binds the socket, replacing a stale socket file left by an earlier run.
    /// Registration is closed from here on.
    pub fn bind(self) -> Result<BoundRpcServer> {
        match fs::remove_file(&self.socket_path) {
            Ok(()) => debug!("removed stale socket {}", self.socket_path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to remove stale socket {}", self.socket_path.display())
                });
            }
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("failed to bind {}", self.socket_path.display()))?;
        let socket_file = SocketFile(self.socket_path.clone());
        fs::set_permissions(&self.socket_path, fs::Permissions::from_mode(SOCKET_MODE))
            .with_context(|| format!("failed to chmod {}", self.socket_path.display()))?;

        info!(
            "JSON-RPC server listening on {} (methods: {})",
            self.socket_path.display(),
            self.methods.method_names().join(", ")
        );

        Ok(BoundRpcServer {
            listener,
            methods: Arc::new(self.methods),
            read_timeout: self.read_timeout,
            _socket_file: socket_file,
        })
    }

    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        self.bind()?.run(shutdown).await;
        Ok(())
    }
}

pub struct BoundRpcServer {
    listener: UnixListener,
    methods: Arc<MethodTable>,
    read_timeout: Duration,
    _socket_file: SocketFile,
}

impl BoundRpcServer {
    /// Accepts connections until `shutdown` resolves. Each connection runs on
    /// its own task; a failing connection never stops the loop.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("JSON-RPC server shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let methods = Arc::clone(&self.methods);
                        let read_timeout = self.read_timeout;
                        tokio::spawn(async move {
                            handle_connection(stream, &methods, read_timeout).await;
                        });
                    }
                    Err(err) => {
                        warn!("JSON-RPC accept failed: {err}");
                        sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }
}

/// Removes the socket file when the server goes away, however it stops.
struct SocketFile(PathBuf);

impl Drop for SocketFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.0) {
            Ok(()) => debug!("removed socket {}", self.0.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove socket {}: {err}", self.0.display()),
        }
    }
}

async fn handle_connection(mut stream: UnixStream, methods: &MethodTable, read_timeout: Duration) {
    let response = match timeout(read_timeout, wire::read_message(&mut stream, MAX_MESSAGE_BYTES)).await
    {
        Err(_) => {
            warn!("JSON-RPC client sent no request within {read_timeout:?}");
            Response::error(
                Value::Null,
                ErrorCode::InvalidRequest,
                "Invalid Request: read timed out",
            )
        }
        Ok(Err(WireError::TooLarge { limit })) => {
            warn!("JSON-RPC request exceeds {limit} bytes");
            Response::error(
                Value::Null,
                ErrorCode::InvalidRequest,
                format!("Invalid Request: request exceeds {limit} bytes"),
            )
        }
        Ok(Err(WireError::Io(err))) => {
            warn!("JSON-RPC connection error: {err}");
            Response::error(
                Value::Null,
                ErrorCode::InternalError,
                format!("Internal error: {err}"),
            )
        }
        Ok(Ok(None)) => {
            debug!("JSON-RPC client closed without a request");
            return;
        }
        Ok(Ok(Some(request))) => methods.handle_raw(&request).await,
    };

    if let Some(code) = response.error_code() {
        debug!("JSON-RPC request failed with {}", code.code());
    }
    if let Err(err) = wire::write_message(&mut stream, &response).await {
        warn!("failed to write JSON-RPC response: {err}");
        return;
    }
    let _ = stream.shutdown().await;
}
