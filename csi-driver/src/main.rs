//! IBM Power Virtual Server CSI Node Plugin
//!
//! Serves the CSI Identity and Node services on a Unix domain socket for
//! the kubelet.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::UnixListener;
use tokio::signal;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use csi_driver::csi::identity_server::IdentityServer;
use csi_driver::csi::node_server::NodeServer;
use csi_driver::identity::{DRIVER_NAME, DRIVER_VERSION};
use csi_driver::{DriverOptions, IdentityService, NodeService, metrics};

/// CLI arguments for the node plugin
#[derive(Parser, Debug)]
#[command(name = "powervs-csi-node")]
#[command(about = "IBM Power Virtual Server CSI node plugin")]
#[command(version)]
struct Args {
    /// CSI endpoint (unix socket)
    #[arg(
        long,
        env = "CSI_ENDPOINT",
        default_value = "unix:///var/lib/csi/sockets/pluginproxy/csi.sock"
    )]
    endpoint: String,

    /// Kubernetes node name (defaults to the hostname)
    #[arg(long, env = "CSI_NODE_NAME")]
    node_name: Option<String>,

    /// Maximum number of volumes attachable to this node (negative means unset)
    #[arg(long, env = "CSI_VOLUME_ATTACH_LIMIT", allow_negative_numbers = true)]
    volume_attach_limit: Option<i64>,

    /// JSON file with this node's labels (serviceInstanceId, nodeInstanceId, region)
    #[arg(
        long = "node-labels",
        env = "CSI_NODE_LABELS_FILE",
        default_value = "/etc/powervs-csi/node-labels.json"
    )]
    node_labels: PathBuf,

    /// JSON catalog of instances and images
    #[arg(
        long,
        env = "CSI_CLOUD_CATALOG",
        default_value = "/etc/powervs-csi/catalog.json"
    )]
    cloud_catalog: PathBuf,

    /// Polls of /dev/disk/by-id before a WWN lookup fails
    #[arg(long, env = "CSI_DEVICE_WAIT_ATTEMPTS", default_value = "5")]
    device_wait_attempts: u32,

    /// Delay between /dev/disk/by-id polls in milliseconds
    #[arg(long, env = "CSI_DEVICE_WAIT_INTERVAL_MS", default_value = "1000")]
    device_wait_interval_ms: u64,

    /// Address for the Prometheus metrics endpoint (disabled if unset)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let node_name = match args.node_name {
        Some(name) => name,
        None => hostname::get()?.to_string_lossy().to_string(),
    };

    let options = DriverOptions {
        endpoint: args.endpoint,
        node_name,
        node_labels_path: args.node_labels,
        cloud_catalog_path: args.cloud_catalog,
        volume_attach_limit: args.volume_attach_limit,
        device_wait_attempts: args.device_wait_attempts,
        device_wait_interval: Duration::from_millis(args.device_wait_interval_ms),
    };

    info!(
        driver_name = %DRIVER_NAME,
        version = %DRIVER_VERSION,
        endpoint = %options.endpoint,
        node_name = %options.node_name,
        max_volumes_per_node = options.max_volumes_per_node(),
        "Starting PowerVS CSI node plugin"
    );

    if let Some(addr) = args.metrics_addr {
        metrics::init_metrics(addr)?;
    }

    let socket_path = options.socket_path()?;
    let node = NodeService::from_environment(options)?;

    if socket_path.exists() {
        info!(path = %socket_path.display(), "Removing stale socket");
        std::fs::remove_file(&socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(&socket_path)?;
    info!(path = %socket_path.display(), "gRPC server listening");

    Server::builder()
        .add_service(IdentityServer::new(IdentityService::new()))
        .add_service(NodeServer::new(node))
        .serve_with_incoming_shutdown(UnixListenerStream::new(listener), async {
            shutdown_signal().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    if let Err(e) = std::fs::remove_file(&socket_path) {
        tracing::warn!(error = %e, path = %socket_path.display(), "Failed to remove socket");
    }

    info!("PowerVS CSI node plugin shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM, SIGINT, or SIGHUP)
async fn shutdown_signal() {
    use signal::unix::{Signal, SignalKind, signal};

    fn install(kind: SignalKind, name: &str) -> Option<Signal> {
        match signal(kind) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::error!("Failed to install {} handler: {}", name, e);
                None
            }
        }
    }

    // Handlers that failed to install never fire
    async fn recv(sig: &mut Option<Signal>) {
        match sig {
            Some(s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    let mut sigterm = install(SignalKind::terminate(), "SIGTERM");
    let mut sigint = install(SignalKind::interrupt(), "SIGINT");
    let mut sighup = install(SignalKind::hangup(), "SIGHUP");

    tokio::select! {
        _ = recv(&mut sigterm) => {
            info!("Received SIGTERM");
        }
        _ = recv(&mut sigint) => {
            info!("Received SIGINT");
        }
        _ = recv(&mut sighup) => {
            info!("Received SIGHUP, shutting down");
        }
    }
}
