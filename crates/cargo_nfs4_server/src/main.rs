use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use nfs4_server::config::NfsServerConfig;
use nfs4_server::memfs::MemFs;
use nfs4_server::tcp::NFSTcpListener;
use nfs4_server::vfs::{NfsFileSystem, ReadOnlyAdapter};
use tracing::info;

mod logging;
mod memfs;
mod mirror;

// To mount the server on Linux:
// mount -t nfs4 -o vers=4.0,proto=tcp,port=11112 127.0.0.1:/ mnt/

/// CLI tool for the nfs4_server
#[derive(Parser, Debug)]
#[command(name = "nfs4_server", version, about = "A simple NFSv4.0 server", long_about = None)]
struct Args {
    /// Path to the directory to serve
    path: Option<PathBuf>,

    /// IP address to bind the server to
    #[arg(short = 'i', long, default_value = "0.0.0.0")]
    bind_ip: String,

    /// Port to bind the server to
    #[arg(short = 'p', long, default_value_t = 11112)]
    bind_port: u16,

    /// Serve the export as read-only
    #[arg(short, long)]
    readonly: bool,

    /// Use an in-memory filesystem instead of a directory
    #[arg(long)]
    memfs: bool,

    /// Log level (default is "info")
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Shorthand for `--log-level debug`
    #[arg(short, long)]
    debug: bool,

    /// Log file path
    #[arg(long)]
    log_file: Option<String>,

    /// Disable console logging
    #[arg(long)]
    quiet: bool,

    /// Lease time granted to clients, in seconds
    #[arg(long, default_value_t = 90)]
    lease_time: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { args.log_level.as_str() };
    let _guards = logging::init_logging(log_level, args.log_file.as_deref(), !args.quiet)?;

    let config = NfsServerConfig::default().with_lease_time(Duration::from_secs(args.lease_time));
    let bind_addr = format!("{}:{}", args.bind_ip, args.bind_port);

    match (args.memfs, args.path.as_deref()) {
        (true, Some(_)) => bail!("--memfs and a directory cannot be used together"),
        (true, None) => {
            info!("Serving an in-memory filesystem");
            let fs = MemFs::new(memfs::default_config(args.readonly))?;
            serve(&bind_addr, fs, config, args.readonly).await
        }
        (false, Some(path)) => {
            let path = path
                .canonicalize()
                .with_context(|| format!("cannot serve {}", path.display()))?;
            if !path.is_dir() {
                bail!("{} is not a directory", path.display());
            }
            info!("Serving {}", path.display());
            serve(&bind_addr, mirror::MirrorFs::new(path), config, args.readonly).await
        }
        (false, None) => bail!("either a directory or --memfs is required"),
    }
}

async fn serve<T>(
    bind_addr: &str,
    fs: T,
    config: NfsServerConfig,
    readonly: bool,
) -> anyhow::Result<()>
where
    T: NfsFileSystem + 'static,
{
    if readonly {
        run(bind_addr, ReadOnlyAdapter::new(fs), config).await
    } else {
        run(bind_addr, fs, config).await
    }
}

async fn run<T>(bind_addr: &str, fs: T, config: NfsServerConfig) -> anyhow::Result<()>
where
    T: NfsFileSystem + 'static,
{
    let listener = NFSTcpListener::bind_with_config(bind_addr, fs, config)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    let stop = listener.stop_handle();
    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, shutting down");
        stop.notify_one();
    })
    .context("failed to install the Ctrl-C handler")?;

    listener.handle_forever().await?;
    Ok(())
}
