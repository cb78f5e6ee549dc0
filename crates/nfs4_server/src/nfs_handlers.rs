//! The NFSv4 program: NULL and COMPOUND.
//!
//! A COMPOUND runs its operations in order against a per-request
//! [`CompoundState`] and stops at the first operation that fails. The reply
//! holds the results up to and including the failed one.

mod attr_ops;
mod dir_ops;
mod fh_ops;
mod io_ops;
mod readdir;
mod state_ops;

use std::path::PathBuf;

use nfs4_types::nfs4::{
    self as nfs, COMPOUND4args, COMPOUND4res, change_info4, changeid4, component4, nfs_argop4,
    nfs_resop4, nfsstat4,
};
use nfs4_types::rpc::accept_stat_data;
use nfs4_types::xdr_codec::{Unpack, Void};
use tracing::{debug, trace, warn};

use crate::attr::MAX_NAME_LENGTH;
use crate::context::RPCContext;
use crate::filehandle::HandleId;
use crate::rpcwire::messages::{HandleResult, IncomingRpcMessage};
use crate::vfs::{FileAttr, NfsFileSystem};

const NFSPROC4_NULL: u32 = 0;
const NFSPROC4_COMPOUND: u32 = 1;

pub async fn handle_nfs<T: NfsFileSystem>(
    message: IncomingRpcMessage,
    context: &RPCContext<T>,
) -> anyhow::Result<HandleResult> {
    let call = message.body();
    let xid = message.xid();
    debug!("handle_nfs({xid}, {call:?})");

    if call.vers != nfs::VERSION {
        warn!("Invalid NFS Version number {} != {}", call.vers, nfs::VERSION);
        return message.into_error_reply(accept_stat_data::PROG_MISMATCH {
            low: nfs::VERSION,
            high: nfs::VERSION,
        });
    }

    match call.proc {
        NFSPROC4_NULL => message.into_success_reply(&Void),
        NFSPROC4_COMPOUND => {
            let args = match COMPOUND4args::unpack(&mut message.args()) {
                Ok((args, _)) => args,
                Err(err) => {
                    warn!("Undecodable COMPOUND arguments, xid: {xid}: {err}");
                    return message.into_error_reply(accept_stat_data::GARBAGE_ARGS);
                }
            };
            let res = compound(context, args).await;
            debug!("{xid} --> {:?}", res.status);
            message.into_success_reply(&res)
        }
        proc => {
            warn!("Unknown NFSv4 procedure {proc}");
            message.into_error_reply(accept_stat_data::PROC_UNAVAIL)
        }
    }
}

/// Filehandles a COMPOUND operates on.
#[derive(Debug, Default)]
pub(crate) struct CompoundState {
    current: Option<HandleId>,
    saved: Option<HandleId>,
}

impl CompoundState {
    pub(crate) fn current(&self) -> Result<HandleId, nfsstat4> {
        self.current.ok_or(nfsstat4::NFS4ERR_NOFILEHANDLE)
    }

    pub(crate) fn set_current(&mut self, id: HandleId) {
        self.current = Some(id);
    }
}

pub(crate) async fn compound<T: NfsFileSystem>(
    context: &RPCContext<T>,
    args: COMPOUND4args,
) -> COMPOUND4res {
    if args.minorversion != nfs::MINOR_VERSION {
        warn!("Unsupported NFSv4 minor version {}", args.minorversion);
        return COMPOUND4res {
            status: nfsstat4::NFS4ERR_MINOR_VERS_MISMATCH,
            tag: args.tag,
            resarray: Vec::new(),
        };
    }

    let mut state = CompoundState::default();
    let mut status = nfsstat4::NFS4_OK;
    let mut resarray = Vec::with_capacity(args.argarray.len());
    for op in args.argarray {
        let res = execute(context, &mut state, op).await;
        status = res.status();
        resarray.push(res);
        if status != nfsstat4::NFS4_OK {
            break;
        }
    }

    COMPOUND4res {
        status,
        tag: args.tag,
        resarray,
    }
}

async fn execute<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
    op: nfs_argop4,
) -> nfs_resop4 {
    trace!("op {op:?}");
    let res = match op {
        nfs_argop4::ACCESS(args) => {
            nfs_resop4::ACCESS(attr_ops::access(context, state, &args).await.into())
        }
        nfs_argop4::CLOSE(args) => {
            nfs_resop4::CLOSE(state_ops::close(context, state, &args).into())
        }
        nfs_argop4::COMMIT(args) => {
            nfs_resop4::COMMIT(io_ops::commit(context, state, &args).await.into())
        }
        nfs_argop4::CREATE(args) => {
            nfs_resop4::CREATE(dir_ops::create(context, state, args).await.into())
        }
        nfs_argop4::DELEGPURGE(_) => nfs_resop4::DELEGPURGE(nfsstat4::NFS4ERR_NOTSUPP),
        nfs_argop4::DELEGRETURN(_) => nfs_resop4::DELEGRETURN(nfsstat4::NFS4ERR_BAD_STATEID),
        nfs_argop4::GETATTR(args) => {
            nfs_resop4::GETATTR(attr_ops::getattr(context, state, &args).await.into())
        }
        nfs_argop4::GETFH => nfs_resop4::GETFH(fh_ops::getfh(context, state).into()),
        nfs_argop4::LINK(_) => nfs_resop4::LINK(nfsstat4::NFS4ERR_NOTSUPP),
        nfs_argop4::LOCK(_) => nfs_resop4::LOCK(nfsstat4::NFS4ERR_NOTSUPP),
        nfs_argop4::LOCKT(_) => nfs_resop4::LOCKT(nfsstat4::NFS4ERR_NOTSUPP),
        nfs_argop4::LOCKU(_) => nfs_resop4::LOCKU(nfsstat4::NFS4ERR_NOTSUPP),
        nfs_argop4::LOOKUP(args) => {
            nfs_resop4::LOOKUP(status(fh_ops::lookup(context, state, &args).await))
        }
        nfs_argop4::LOOKUPP => nfs_resop4::LOOKUPP(status(fh_ops::lookupp(context, state).await)),
        nfs_argop4::NVERIFY(args) => {
            nfs_resop4::NVERIFY(status(attr_ops::nverify(context, state, &args).await))
        }
        nfs_argop4::OPEN(args) => nfs_resop4::OPEN(state_ops::open(context, state, args).await.into()),
        nfs_argop4::OPENATTR(_) => nfs_resop4::OPENATTR(nfsstat4::NFS4ERR_NOTSUPP),
        nfs_argop4::OPEN_CONFIRM(args) => {
            nfs_resop4::OPEN_CONFIRM(state_ops::open_confirm(context, state, &args).into())
        }
        nfs_argop4::OPEN_DOWNGRADE(args) => {
            nfs_resop4::OPEN_DOWNGRADE(state_ops::open_downgrade(context, state, &args).into())
        }
        nfs_argop4::PUTFH(args) => nfs_resop4::PUTFH(status(fh_ops::putfh(context, state, &args))),
        nfs_argop4::PUTPUBFH => nfs_resop4::PUTPUBFH(status(fh_ops::putrootfh(state))),
        nfs_argop4::PUTROOTFH => nfs_resop4::PUTROOTFH(status(fh_ops::putrootfh(state))),
        nfs_argop4::READ(args) => nfs_resop4::READ(io_ops::read(context, state, &args).await.into()),
        nfs_argop4::READDIR(args) => {
            nfs_resop4::READDIR(readdir::readdir(context, state, &args).await.into())
        }
        nfs_argop4::READLINK => {
            nfs_resop4::READLINK(dir_ops::readlink(context, state).await.into())
        }
        nfs_argop4::REMOVE(args) => {
            nfs_resop4::REMOVE(dir_ops::remove(context, state, &args).await.into())
        }
        nfs_argop4::RENAME(args) => {
            nfs_resop4::RENAME(dir_ops::rename(context, state, &args).await.into())
        }
        nfs_argop4::RENEW(args) => nfs_resop4::RENEW(status(state_ops::renew(context, &args))),
        nfs_argop4::RESTOREFH => nfs_resop4::RESTOREFH(status(fh_ops::restorefh(state))),
        nfs_argop4::SAVEFH => nfs_resop4::SAVEFH(status(fh_ops::savefh(state))),
        nfs_argop4::SECINFO(args) => {
            nfs_resop4::SECINFO(dir_ops::secinfo(context, state, &args).await.into())
        }
        nfs_argop4::SETATTR(args) => {
            nfs_resop4::SETATTR(attr_ops::setattr(context, state, &args).await)
        }
        nfs_argop4::SETCLIENTID(args) => {
            nfs_resop4::SETCLIENTID(state_ops::setclientid(context, &args))
        }
        nfs_argop4::SETCLIENTID_CONFIRM(args) => nfs_resop4::SETCLIENTID_CONFIRM(status(
            state_ops::setclientid_confirm(context, &args),
        )),
        nfs_argop4::VERIFY(args) => {
            nfs_resop4::VERIFY(status(attr_ops::verify(context, state, &args).await))
        }
        nfs_argop4::WRITE(args) => {
            nfs_resop4::WRITE(io_ops::write(context, state, &args).await.into())
        }
        nfs_argop4::RELEASE_LOCKOWNER(args) => nfs_resop4::RELEASE_LOCKOWNER(status(
            state_ops::release_lockowner(context, &args),
        )),
        nfs_argop4::ILLEGAL => nfs_resop4::ILLEGAL(nfsstat4::NFS4ERR_OP_ILLEGAL),
    };
    if res.status() != nfsstat4::NFS4_OK {
        debug!("op failed: {:?}", res.status());
    }
    res
}

fn status(result: Result<(), nfsstat4>) -> nfsstat4 {
    result.err().unwrap_or(nfsstat4::NFS4_OK)
}

/// A filesystem object reached through a filehandle.
#[derive(Debug)]
pub(crate) struct Object {
    pub(crate) id: HandleId,
    pub(crate) path: PathBuf,
    pub(crate) attr: FileAttr,
}

impl Object {
    /// Fails with `NFS4ERR_NOTDIR` unless the object is a directory.
    pub(crate) fn expect_dir(&self) -> Result<(), nfsstat4> {
        if self.attr.is_dir() {
            Ok(())
        } else {
            Err(nfsstat4::NFS4ERR_NOTDIR)
        }
    }
}

/// Resolves `id` and fetches its attributes. A handle whose object vanished
/// behind our back is invalidated together with its open state.
pub(crate) async fn stat_object<T: NfsFileSystem>(
    context: &RPCContext<T>,
    id: HandleId,
) -> Result<Object, nfsstat4> {
    let path = context.fh_table.resolve(id)?;
    match context.vfs.getattr(&path).await {
        Ok(attr) => {
            if context.fh_table.check_fileid(id, attr.fileid).is_err() {
                debug!("{id} now names fileid {}, invalidating", attr.fileid);
                forget_path(context, &path);
                return Err(nfsstat4::NFS4ERR_STALE);
            }
            Ok(Object { id, path, attr })
        }
        Err(nfsstat4::NFS4ERR_NOENT) => {
            debug!("{id} vanished, invalidating");
            forget_path(context, &path);
            Err(nfsstat4::NFS4ERR_STALE)
        }
        Err(stat) => Err(stat),
    }
}

pub(crate) async fn current_object<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
) -> Result<Object, nfsstat4> {
    stat_object(context, state.current()?).await
}

/// Drops the handles and opens of `path` and everything below it.
pub(crate) fn forget_path<T>(context: &RPCContext<T>, path: &std::path::Path) {
    let removed = context.fh_table.remove(path);
    context.clients.forget_files(&removed);
}

/// Checks a directory entry name supplied by a client.
pub(crate) fn check_name(name: &component4) -> Result<&str, nfsstat4> {
    if name.is_empty() {
        return Err(nfsstat4::NFS4ERR_INVAL);
    }
    if name.len() > MAX_NAME_LENGTH as usize {
        return Err(nfsstat4::NFS4ERR_NAMETOOLONG);
    }
    let name = name.as_utf8().ok_or(nfsstat4::NFS4ERR_INVAL)?;
    if name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(nfsstat4::NFS4ERR_BADNAME);
    }
    Ok(name)
}

/// Change info of a directory modified by the current operation.
pub(crate) async fn change_info<T: NfsFileSystem>(
    context: &RPCContext<T>,
    dir: &Object,
) -> change_info4 {
    let before: changeid4 = dir.attr.change;
    let after = context
        .vfs
        .getattr(&dir.path)
        .await
        .map_or(before, |attr| attr.change);
    change_info4 {
        atomic: false,
        before,
        after,
    }
}

#[cfg(test)]
mod tests {
    use nfs4_types::xdr_codec::Opaque;

    use super::*;

    #[test]
    fn names() {
        assert_eq!(check_name(&Opaque::from("a.txt")), Ok("a.txt"));
        assert_eq!(check_name(&Opaque::from("")), Err(nfsstat4::NFS4ERR_INVAL));
        assert_eq!(check_name(&Opaque::from("..")), Err(nfsstat4::NFS4ERR_BADNAME));
        assert_eq!(check_name(&Opaque::from("a/b")), Err(nfsstat4::NFS4ERR_BADNAME));
        assert_eq!(
            check_name(&Opaque::from(vec![0xff, 0xfe])),
            Err(nfsstat4::NFS4ERR_INVAL)
        );
        assert_eq!(
            check_name(&Opaque::from("x".repeat(256).as_str())),
            Err(nfsstat4::NFS4ERR_NAMETOOLONG)
        );
    }

    #[test]
    fn missing_current_filehandle() {
        let mut state = CompoundState::default();
        assert_eq!(state.current(), Err(nfsstat4::NFS4ERR_NOFILEHANDLE));
        state.set_current(HandleId::ROOT);
        assert_eq!(state.current(), Ok(HandleId::ROOT));
    }
}
