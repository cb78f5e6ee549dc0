use std::fmt;
use std::sync::Arc;

use nfs4_types::nfs4::verifier4;
use nfs4_types::rpc::auth_unix;

use crate::config::NfsServerConfig;
use crate::filehandle::FileHandleTable;
use crate::state::ClientRegistry;
use crate::transaction_tracker::TransactionTracker;

/// Everything a request needs: the caller, the backend and the server-wide
/// tables shared by all connections.
pub struct RPCContext<T> {
    pub local_port: u16,
    pub client_addr: String,
    pub auth: auth_unix,
    pub vfs: Arc<T>,
    pub fh_table: Arc<FileHandleTable>,
    pub clients: Arc<ClientRegistry>,
    pub transaction_tracker: Arc<TransactionTracker>,
    /// Changes with every server run so clients notice lost unstable writes.
    pub write_verifier: verifier4,
}

impl<T> RPCContext<T> {
    pub fn new(vfs: Arc<T>, config: &NfsServerConfig) -> Self {
        let fh_table = FileHandleTable::new();
        let write_verifier = fh_table.generation().to_be_bytes();
        Self {
            local_port: 0,
            client_addr: String::new(),
            auth: auth_unix::default(),
            vfs,
            fh_table: Arc::new(fh_table),
            clients: Arc::new(ClientRegistry::new(config.lease_time)),
            transaction_tracker: Arc::new(TransactionTracker::new(
                config.transaction_retention,
                config.max_in_flight,
                config.trim_limit,
            )),
            write_verifier,
        }
    }

    /// A copy of the context for a newly accepted connection.
    #[must_use]
    pub fn for_connection(&self, local_port: u16, client_addr: String) -> Self {
        Self {
            local_port,
            client_addr,
            ..self.clone()
        }
    }
}

#[allow(clippy::missing_fields_in_debug)]
impl<T> fmt::Debug for RPCContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RPCContext")
            .field("local_port", &self.local_port)
            .field("client_addr", &self.client_addr)
            .field("auth", &self.auth)
            .field("handles", &self.fh_table.len())
            .field("clients", &self.clients)
            .finish()
    }
}

impl<T> Clone for RPCContext<T> {
    fn clone(&self) -> Self {
        Self {
            local_port: self.local_port,
            client_addr: self.client_addr.clone(),
            auth: self.auth.clone(),
            vfs: Arc::clone(&self.vfs),
            fh_table: Arc::clone(&self.fh_table),
            clients: Arc::clone(&self.clients),
            transaction_tracker: Arc::clone(&self.transaction_tracker),
            write_verifier: self.write_verifier,
        }
    }
}
