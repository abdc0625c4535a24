//! rsynergy client entry point.
//!
//! Wires configuration, the key tables, the uinput device, the cursor
//! probe, the dispatcher, and the session together, then runs the session
//! to completion.  The single optional CLI argument is a config-file path;
//! everything else comes from the TOML file.
//!
//! Exit codes: 0 normal stop, 2 configuration error, 3 transport failure,
//! 4 uinput permission failure, 5 unsupported protocol.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use rsynergy_core::{KeyCodeTables, ProtocolError, ScreenDescriptor};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rsynergy_client::application::dispatcher::{DispatchSettings, Dispatcher};
use rsynergy_client::infrastructure::config::{self, ClientConfig, ConfigError};
use rsynergy_client::infrastructure::cursor::CompositorCursor;
use rsynergy_client::infrastructure::device::{DeviceError, VirtualInput};
use rsynergy_client::infrastructure::screen;
use rsynergy_client::infrastructure::session::{Session, SessionConfig, SessionError};

const DEVICE_NAME: &str = "rsynergy virtual input";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // eprintln rather than tracing: a config failure can happen
            // before the subscriber exists.
            eprintln!("rsynergy: {err:#}");
            exit_code_for(&err)
        }
    }
}

async fn run() -> anyhow::Result<()> {
    // Config first: the log level default lives there.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = config::load_config(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone())),
        )
        .init();

    cfg.validate()?;
    info!(
        server = %cfg.server,
        port = cfg.port,
        client_name = %cfg.client_name,
        "rsynergy client starting"
    );

    // Screen dimensions: configuration wins, otherwise probe once.
    let (width, height) = match (cfg.screen_width, cfg.screen_height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            let probed = screen::probe_screen_size();
            info!(width = probed.0, height = probed.1, "probed screen size");
            probed
        }
    };
    let descriptor = ScreenDescriptor::with_size(width, height);

    let tables = Arc::new(KeyCodeTables::new());
    let device = build_device(&cfg, &tables)?;
    let mut dispatcher = Dispatcher::new(
        device,
        Box::new(CompositorCursor::new()),
        Arc::clone(&tables),
        descriptor,
        DispatchSettings {
            abs_mouse_move: cfg.abs_mouse_move,
            mouse_move_threshold: Duration::from_millis(cfg.mouse_move_threshold),
            mouse_pos_sync_freq: cfg.mouse_pos_sync_freq,
        },
    );

    // Ctrl-C flips the shutdown flag; the session drains and closes.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut session = Session::new(SessionConfig::from_client_config(&cfg));
    session.run(&mut dispatcher, shutdown_rx).await?;

    info!("rsynergy client stopped");
    Ok(())
}

#[cfg(target_os = "linux")]
fn build_device(
    cfg: &ClientConfig,
    tables: &KeyCodeTables,
) -> anyhow::Result<Box<dyn VirtualInput>> {
    use rsynergy_client::infrastructure::device::uinput::UinputDevice;

    let device = UinputDevice::create(DEVICE_NAME, tables, cfg.abs_mouse_move)?;
    Ok(Box::new(device))
}

#[cfg(not(target_os = "linux"))]
fn build_device(
    _cfg: &ClientConfig,
    _tables: &KeyCodeTables,
) -> anyhow::Result<Box<dyn VirtualInput>> {
    anyhow::bail!("input injection requires a Linux host with uinput")
}

/// Maps the typed failure onto the documented exit codes.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if err.downcast_ref::<ConfigError>().is_some() {
        return ExitCode::from(2);
    }
    if let Some(device) = err.downcast_ref::<DeviceError>() {
        return ExitCode::from(if device.is_permission() { 4 } else { 1 });
    }
    if let Some(session) = err.downcast_ref::<SessionError>() {
        return ExitCode::from(match session {
            SessionError::Protocol(ProtocolError::UnsupportedVersion { .. }) => 5,
            SessionError::Device(device) if device.is_permission() => 4,
            SessionError::Device(_) => 1,
            SessionError::Transport(_)
            | SessionError::ConnectTimeout { .. }
            | SessionError::Tls(_)
            | SessionError::HandshakeTimeout
            | SessionError::Handshake(_)
            | SessionError::HeartbeatTimeout(_)
            | SessionError::Eof
            | SessionError::Rejected(_) => 3,
            SessionError::Protocol(_) => 3,
        });
    }
    ExitCode::FAILURE
}
