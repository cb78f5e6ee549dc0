//! TCP front end of the server.
//!
//! ```no_run
//! use nfs4_server::memfs::{MemFs, MemFsConfig};
//! use nfs4_server::tcp::NFSTcpListener;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let mut config = MemFsConfig::default();
//!     config.add_file("/a.txt", "hello world\n".as_bytes());
//!
//!     let listener = NFSTcpListener::bind("0.0.0.0:11112", MemFs::new(config)?).await?;
//!     listener.handle_forever().await?;
//!     Ok(())
//! }
//! ```

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::cleaner::Cleaner;
use crate::config::NfsServerConfig;
use crate::context::RPCContext;
use crate::rpcwire::messages::HandleResult;
use crate::rpcwire::{handle_rpc, read_record, write_fragment};
use crate::vfs::NfsFileSystem;

/// Accepts NFS connections and serves each one on its own task.
#[derive(Debug)]
pub struct NFSTcpListener<T: NfsFileSystem> {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: NfsServerConfig,
    context: RPCContext<T>,
    stop: Arc<Notify>,
}

impl<T: NfsFileSystem + 'static> NFSTcpListener<T> {
    /// Binds to `ipstr` (`ip:port`) with the default [`NfsServerConfig`].
    pub async fn bind(ipstr: &str, fs: T) -> io::Result<Self> {
        Self::bind_with_config(ipstr, fs, NfsServerConfig::default()).await
    }

    pub async fn bind_with_config(ipstr: &str, fs: T, config: NfsServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(ipstr).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {local_addr}");

        let context = RPCContext::new(Arc::new(fs), &config);
        Ok(Self {
            listener,
            local_addr,
            config,
            context,
            stop: Arc::new(Notify::new()),
        })
    }

    /// Gets the true listening port. Useful if the bound port number is 0.
    #[must_use]
    pub const fn get_listen_port(&self) -> u16 {
        self.local_addr.port()
    }

    #[must_use]
    pub const fn get_listen_ip(&self) -> IpAddr {
        self.local_addr.ip()
    }

    /// Notifying the returned handle makes [`Self::handle_forever`] return.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.stop)
    }

    /// Serves connections until the stop handle is notified.
    pub async fn handle_forever(&self) -> io::Result<()> {
        let tracker_stop = Arc::new(Notify::new());
        let lease_stop = Arc::new(Notify::new());
        tokio::spawn(
            Cleaner::new(
                "transactions",
                Arc::clone(&self.context.transaction_tracker),
                self.config.cleanup_interval,
                Arc::clone(&tracker_stop),
            )
            .run(),
        );
        tokio::spawn(
            Cleaner::new(
                "leases",
                Arc::clone(&self.context.clients),
                self.config.cleanup_interval,
                Arc::clone(&lease_stop),
            )
            .run(),
        );

        let result = self.accept_loop().await;
        tracker_stop.notify_one();
        lease_stop.notify_one();
        result
    }

    async fn accept_loop(&self) -> io::Result<()> {
        loop {
            let (socket, peer) = tokio::select! {
                () = self.stop.notified() => {
                    info!("Shutting down listener on {}", self.local_addr);
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted?,
            };
            info!("Accepting connection from {peer}");
            socket.set_nodelay(true)?;

            let context = self
                .context
                .for_connection(self.local_addr.port(), peer.to_string());
            tokio::spawn(async move {
                if let Err(e) = process_socket(socket, context).await {
                    error!("Error handling client {peer}: {e:?}");
                }
            });
        }
    }
}

/// Serves one connection. Records are handled one at a time and each reply
/// is written before the next record is read.
pub async fn process_socket<IO, T>(mut socket: IO, mut context: RPCContext<T>) -> anyhow::Result<()>
where
    IO: AsyncRead + AsyncWrite + Unpin,
    T: NfsFileSystem,
{
    while let Some(record) = read_record(&mut socket).await? {
        match handle_rpc(record, &mut context).await? {
            HandleResult::Reply(reply) => write_fragment(&mut socket, &reply).await?,
            HandleResult::NoReply => debug!("dropping retransmitted request"),
        }
    }
    debug!(client = %context.client_addr, "connection finished");
    Ok(())
}
