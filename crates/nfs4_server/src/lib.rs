#![cfg_attr(docsrs, feature(doc_cfg))]
//! An `NFSv4.0` server library.
//!
//! The server speaks ONC RPC over TCP and exports a single tree provided by an
//! implementation of [`vfs::NfsFileSystem`]. Backends work with paths relative to
//! the export root; the engine hands out filehandles, tracks clients and open
//! state, and translates attributes.
//!
//! ```no_run
//! use nfs4_server::memfs::{MemFs, MemFsConfig};
//! use nfs4_server::tcp::NFSTcpListener;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let memfs = MemFs::new(MemFsConfig::default())?;
//!     let listener = NFSTcpListener::bind("127.0.0.1:11112", memfs).await?;
//!     listener.handle_forever().await?;
//!     Ok(())
//! }
//! ```
//!
//! Mount it on Linux with
//! `mount -t nfs4 -o vers=4.0,proto=tcp,port=11112 127.0.0.1:/ /mnt`.

mod attr;
mod cleaner;
pub mod config;
mod context;
mod filehandle;
mod nfs_handlers;
mod rpcwire;
mod state;
mod threshold_logger;
mod transaction_tracker;
pub(crate) mod units;

pub mod tcp;
pub mod vfs;

#[cfg(feature = "fs_util")]
#[cfg_attr(docsrs, doc(cfg(feature = "fs_util")))]
pub mod fs_util;

#[cfg(feature = "memfs")]
#[cfg_attr(docsrs, doc(cfg(feature = "memfs")))]
pub mod memfs;

pub use nfs4_types;

/// Reexport for test purposes
#[doc(hidden)]
#[cfg(feature = "__test_reexports")]
pub mod test_reexports {
    pub use crate::config::NfsServerConfig;
    pub use crate::context::RPCContext;
    pub use crate::transaction_tracker::TransactionTracker;

    pub async fn process_socket<IO, T>(
        socket: IO,
        context: RPCContext<T>,
    ) -> Result<(), anyhow::Error>
    where
        IO: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + 'static,
        T: crate::vfs::NfsFileSystem + 'static,
    {
        crate::tcp::process_socket(socket, context).await
    }
}
