//! Test harness: a server on one end of an in-memory duplex stream and a
//! minimal RPC client on the other. The served file system is a [`MemFs`]
//! unless another backend is passed to [`TestContext::with_vfs`].

mod rpc_client;

use std::sync::Arc;

use nfs4_server::memfs::{MemFs, MemFsConfig};
use nfs4_server::test_reexports::{NfsServerConfig, RPCContext, process_socket};
use nfs4_server::vfs::NfsFileSystem;
use nfs4_types::nfs4::{
    self, COMPOUND4args, COMPOUND4res, GETATTR4args, LOOKUP4args, OPEN4args, PUTFH4args,
    bitmap4, cb_client4, clientaddr4, clientid4, createhow4, fattr4, nfs_argop4, nfs_client_id4,
    nfs_fh4, nfs_resop4, open_claim4, open_owner4, openflag4,
};
use nfs4_types::xdr_codec::Opaque;
pub use rpc_client::{RpcClient, nfs4_call};

pub struct TestContext<T = MemFs> {
    server_handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    client: RpcClient,
    vfs: Arc<T>,
}

impl TestContext<MemFs> {
    pub fn setup() -> Self {
        let mut config = MemFsConfig::default();

        config.add_file("/a.txt", "hello world\n");
        config.add_file("/b.txt", "Greetings to xet data\n");
        config.add_dir("/another_dir");
        config.add_file("/another_dir/thisworks.txt", "i hope\n");

        Self::setup_with_config(config, tracing::Level::DEBUG)
    }

    pub fn setup_with_config(fs_config: MemFsConfig, log_level: tracing::Level) -> Self {
        init_logging(log_level);
        Self::with_vfs(MemFs::new(fs_config).unwrap())
    }
}

impl<T: NfsFileSystem + 'static> TestContext<T> {
    pub fn with_vfs(vfs: T) -> Self {
        let vfs = Arc::new(vfs);
        let context = RPCContext::new(Arc::clone(&vfs), &NfsServerConfig::default())
            .for_connection(2049, "127.0.0.1:700".to_string());

        let (server, client) = tokio::io::duplex(1024 * 1024);
        let server_handle = tokio::task::spawn(process_socket(server, context));

        Self {
            server_handle,
            client: RpcClient::new(client),
            vfs,
        }
    }

    pub const fn client(&mut self) -> &mut RpcClient {
        &mut self.client
    }

    /// The exported file system, for changes made behind the server's back.
    pub fn vfs(&self) -> &T {
        &self.vfs
    }

    pub async fn compound(&mut self, argarray: Vec<nfs_argop4>) -> anyhow::Result<COMPOUND4res> {
        self.client
            .compound(COMPOUND4args {
                tag: Opaque::from("test"),
                minorversion: nfs4::MINOR_VERSION,
                argarray,
            })
            .await
    }

    /// Runs `ops` after PUTROOTFH and returns their results.
    pub async fn from_root(&mut self, ops: Vec<nfs_argop4>) -> anyhow::Result<COMPOUND4res> {
        let mut argarray = vec![nfs_argop4::PUTROOTFH];
        argarray.extend(ops);
        let mut res = self.compound(argarray).await?;
        res.resarray.remove(0);
        Ok(res)
    }

    /// Filehandle of a path relative to the root.
    pub async fn handle(&mut self, path: &str) -> anyhow::Result<nfs_fh4> {
        let mut ops: Vec<_> = path
            .split('/')
            .filter(|name| !name.is_empty())
            .map(lookup)
            .collect();
        ops.push(nfs_argop4::GETFH);
        let res = self.from_root(ops).await?;
        match res.resarray.last() {
            Some(nfs_resop4::GETFH(nfs4::Nfs4Result::Ok(resok))) => Ok(resok.object.clone()),
            _ => anyhow::bail!("cannot get a handle for {path}: {:?}", res.status),
        }
    }

    /// SETCLIENTID followed by SETCLIENTID_CONFIRM.
    pub async fn confirmed_client(&mut self, name: &str) -> anyhow::Result<clientid4> {
        let res = self
            .compound(vec![nfs_argop4::SETCLIENTID(nfs4::SETCLIENTID4args {
                client: nfs_client_id4 {
                    verifier: [1; 8],
                    id: Opaque::from(name),
                },
                callback: cb_client4 {
                    cb_program: 0x4000_0000,
                    cb_location: clientaddr4 {
                        r_netid: "tcp".to_string(),
                        r_addr: "127.0.0.1.3.1".to_string(),
                    },
                },
                callback_ident: 1,
            })])
            .await?;
        let Some(nfs_resop4::SETCLIENTID(nfs4::SETCLIENTID4res::Ok(resok))) =
            res.resarray.into_iter().next()
        else {
            anyhow::bail!("SETCLIENTID failed: {:?}", res.status);
        };

        let res = self
            .compound(vec![nfs_argop4::SETCLIENTID_CONFIRM(
                nfs4::SETCLIENTID_CONFIRM4args {
                    clientid: resok.clientid,
                    setclientid_confirm: resok.setclientid_confirm,
                },
            )])
            .await?;
        anyhow::ensure!(res.status.is_ok(), "SETCLIENTID_CONFIRM failed: {:?}", res.status);
        Ok(resok.clientid)
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        let Self {
            server_handle,
            client,
            ..
        } = self;

        drop(client);

        server_handle.await?
    }
}

pub fn lookup(name: &str) -> nfs_argop4 {
    nfs_argop4::LOOKUP(LOOKUP4args {
        objname: Opaque::from(name),
    })
}

pub fn putfh(object: &nfs_fh4) -> nfs_argop4 {
    nfs_argop4::PUTFH(PUTFH4args {
        object: object.clone(),
    })
}

pub fn getattr(attrs: &[u32]) -> nfs_argop4 {
    nfs_argop4::GETATTR(GETATTR4args {
        attr_request: bitmap4::from_attrs(attrs),
    })
}

pub fn open_owner(clientid: clientid4) -> open_owner4 {
    open_owner4 {
        clientid,
        owner: Opaque::from("test owner"),
    }
}

/// OPEN with UNCHECKED4 create of `name` in the current directory.
pub fn open_create(clientid: clientid4, seqid: u32, name: &str) -> nfs_argop4 {
    nfs_argop4::OPEN(OPEN4args {
        seqid,
        share_access: nfs4::OPEN4_SHARE_ACCESS_BOTH,
        share_deny: nfs4::OPEN4_SHARE_DENY_NONE,
        owner: open_owner(clientid),
        openhow: openflag4::OPEN4_CREATE(createhow4::UNCHECKED4(fattr4::default())),
        claim: open_claim4::CLAIM_NULL(Opaque::from(name)),
    })
}

/// Reads a single `uint64_t` attribute such as size or fileid from an
/// attribute list holding only that attribute.
pub fn single_u64(attrs: &fattr4) -> Option<u64> {
    let bytes: [u8; 8] = attrs.attr_vals.0.as_ref().try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

static LOGGING: std::sync::Once = std::sync::Once::new();

pub fn init_logging(level: tracing::Level) {
    LOGGING.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    });
}
