use std::sync::Arc;

use anyhow::{Context, bail};
use camrelay::{
    app_state::ControlState,
    config::{ControlConfig, LogConfig},
    control::{CameraBindings, ControlService, register_methods},
    core::logging::init_logging,
    rpc::{RpcClient, RpcServer},
    v4l2::{DEFAULT_DEVICE_LIMIT, V4l2Ctl, detect_devices},
    web::build_control_router,
};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--list-devices") => return list_devices().await,
        Some("--rpc-call") => return rpc_call(&args[1..]).await,
        Some(other) => bail!("unknown argument: {other}"),
        None => {}
    }

    let _log_guard = init_logging("v4l2-ctrls", &LogConfig::from_env())?;
    let config = ControlConfig::from_env()?;
    let runner = Arc::new(V4l2Ctl::new(config.ctl_timeout));

    let bindings = match config.devices.as_deref() {
        Some(list) => CameraBindings::parse(list),
        None => CameraBindings::from_devices(detect_devices(runner.as_ref(), DEFAULT_DEVICE_LIMIT).await),
    };
    if bindings.is_empty() {
        warn!("no V4L2 devices found; set V4L2_DEVICES to bind cameras explicitly");
    }
    for binding in bindings.iter() {
        info!("camera {} -> {}", binding.cam, binding.device);
    }

    let service = Arc::new(ControlService::new(
        bindings,
        runner,
        config.state_dir.clone(),
    ));
    if config.restore {
        let restored = service.restore_all().await;
        info!(
            "restored persisted controls for {restored} camera(s) from {}",
            service.state_dir().display()
        );
    }

    let (rpc_stop_tx, rpc_stop_rx) = oneshot::channel::<()>();
    let rpc_task = match config.rpc_socket.as_ref() {
        Some(path) => {
            let mut server = RpcServer::new(path);
            register_methods(server.methods_mut(), service.clone());
            let bound = server.bind()?;
            Some(tokio::spawn(bound.run(async move {
                let _ = rpc_stop_rx.await;
            })))
        }
        None => {
            info!("CTRLS_RPC_SOCKET not set; JSON-RPC control socket disabled");
            None
        }
    };

    let camera_count = service.cameras().len();
    let app = build_control_router(Arc::new(ControlState::new(service, &config)));
    info!(
        "v4l2-ctrls listening on {} for {camera_count} camera(s)",
        config.bind_addr
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = rpc_stop_tx.send(());
    if let Some(task) = rpc_task {
        if let Err(err) = task.await {
            warn!("JSON-RPC server task failed: {err}");
        }
    }

    info!("v4l2-ctrls stopped");
    Ok(())
}

async fn list_devices() -> anyhow::Result<()> {
    let config = ControlConfig::from_env()?;
    let runner = V4l2Ctl::new(config.ctl_timeout);
    let devices = detect_devices(&runner, DEFAULT_DEVICE_LIMIT).await;
    println!("{}", serde_json::to_string_pretty(&devices)?);
    Ok(())
}

/// `--rpc-call <method> [params-json]` against `CTRLS_RPC_SOCKET`.
async fn rpc_call(args: &[String]) -> anyhow::Result<()> {
    let Some(method) = args.first() else {
        bail!("usage: v4l2-ctrls --rpc-call <method> [params-json]");
    };
    let params = match args.get(1) {
        Some(raw) => serde_json::from_str::<Value>(raw)
            .with_context(|| format!("params must be JSON: {raw}"))?,
        None => Value::Null,
    };

    let config = ControlConfig::from_env()?;
    let socket = config
        .rpc_socket
        .context("CTRLS_RPC_SOCKET must be set for --rpc-call")?;

    let result = RpcClient::new(socket).call(method, params).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
