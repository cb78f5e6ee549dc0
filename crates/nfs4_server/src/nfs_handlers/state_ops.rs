//! Client registration and open state.

use std::time::Instant;

use nfs4_types::nfs4::{
    CLOSE4args, OPEN_CONFIRM4args, OPEN_CONFIRM4resok, OPEN_DOWNGRADE4args, OPEN_DOWNGRADE4resok,
    OPEN4_RESULT_CONFIRM, OPEN4_RESULT_LOCKTYPE_POSIX, OPEN4_SHARE_ACCESS_WRITE, OPEN4args,
    OPEN4resok, RELEASE_LOCKOWNER4args, RENEW4args, SETCLIENTID_CONFIRM4args, SETCLIENTID4args,
    SETCLIENTID4res, SETCLIENTID4resok, bitmap4, component4, createhow4, nfs_ftype4, nfsstat4,
    open_claim4, open_delegation_type4, openflag4, stateid4,
};
use tracing::debug;

use super::{CompoundState, change_info, check_name, current_object};
use crate::attr::decode_settable;
use crate::context::RPCContext;
use crate::vfs::{CreateMode, FileAttr, NfsFileSystem, SetAttributes, VFSCapabilities};

pub(super) fn setclientid<T>(context: &RPCContext<T>, args: &SETCLIENTID4args) -> SETCLIENTID4res {
    let (clientid, setclientid_confirm) =
        context
            .clients
            .set_client_id(&args.client.id, args.client.verifier, Instant::now());
    debug!("setclientid from {} --> {clientid:#x}", context.client_addr);
    SETCLIENTID4res::Ok(SETCLIENTID4resok {
        clientid,
        setclientid_confirm,
    })
}

pub(super) fn setclientid_confirm<T>(
    context: &RPCContext<T>,
    args: &SETCLIENTID_CONFIRM4args,
) -> Result<(), nfsstat4> {
    context
        .clients
        .confirm_client_id(args.clientid, args.setclientid_confirm, Instant::now())
}

pub(super) fn renew<T>(context: &RPCContext<T>, args: &RENEW4args) -> Result<(), nfsstat4> {
    context.clients.renew(args.clientid, Instant::now())
}

pub(super) fn release_lockowner<T>(
    context: &RPCContext<T>,
    args: &RELEASE_LOCKOWNER4args,
) -> Result<(), nfsstat4> {
    context
        .clients
        .release_lock_owner(args.lock_owner.clientid, Instant::now())
}

/// Errors after which the seqid of an OPEN is not consumed (RFC 7530,
/// section 9.1.7).
const fn keeps_seqid(status: nfsstat4) -> bool {
    matches!(
        status,
        nfsstat4::NFS4ERR_STALE_CLIENTID
            | nfsstat4::NFS4ERR_STALE_STATEID
            | nfsstat4::NFS4ERR_BAD_STATEID
            | nfsstat4::NFS4ERR_BAD_SEQID
            | nfsstat4::NFS4ERR_BADXDR
            | nfsstat4::NFS4ERR_RESOURCE
            | nfsstat4::NFS4ERR_NOFILEHANDLE
            | nfsstat4::NFS4ERR_MOVED
    )
}

pub(super) async fn open<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
    args: OPEN4args,
) -> Result<OPEN4resok, nfsstat4> {
    let open_claim4::CLAIM_NULL(ref name) = args.claim else {
        debug!("open with unsupported claim {:?}", args.claim);
        return Err(nfsstat4::NFS4ERR_NOTSUPP);
    };
    context.clients.check_open(
        &args.owner,
        args.seqid,
        args.share_access,
        args.share_deny,
        Instant::now(),
    )?;

    let result = open_file(context, state, &args, name).await;
    if let Err(status) = result
        && !keeps_seqid(status)
    {
        context.clients.open_failed(&args.owner, args.seqid, Instant::now());
    }
    result
}

/// The part of OPEN that runs once the owner's seqid is known to be good.
async fn open_file<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
    args: &OPEN4args,
    name: &component4,
) -> Result<OPEN4resok, nfsstat4> {
    let dir = current_object(context, state).await?;
    if dir.attr.is_symlink() {
        return Err(nfsstat4::NFS4ERR_SYMLINK);
    }
    dir.expect_dir()?;
    let name = check_name(name)?;

    let (attr, attrset) = match &args.openhow {
        openflag4::OPEN4_NOCREATE => {
            if args.share_access & OPEN4_SHARE_ACCESS_WRITE != 0
                && context.vfs.capabilities() == VFSCapabilities::ReadOnly
            {
                return Err(nfsstat4::NFS4ERR_ROFS);
            }
            (context.vfs.lookup(&dir.path, name).await?, bitmap4::default())
        }
        openflag4::OPEN4_CREATE(how) => {
            let (mode, attrs, attrset) = match how {
                createhow4::UNCHECKED4(attrs) => {
                    let (attrs, attrset) = decode_settable(attrs)?;
                    (CreateMode::Unchecked, attrs, attrset)
                }
                createhow4::GUARDED4(attrs) => {
                    let (attrs, attrset) = decode_settable(attrs)?;
                    (CreateMode::Guarded, attrs, attrset)
                }
                createhow4::EXCLUSIVE4(verifier) => (
                    CreateMode::Exclusive(*verifier),
                    SetAttributes::default(),
                    bitmap4::default(),
                ),
            };
            let attr = context.vfs.create(&dir.path, name, mode, attrs).await?;
            (attr, attrset)
        }
    };
    expect_regular(&attr)?;

    let cinfo = change_info(context, &dir).await;
    let id = context.fh_table.intern_child(dir.id, name, attr.fileid)?;
    let grant = context.clients.open(
        &args.owner,
        args.seqid,
        id,
        args.share_access,
        args.share_deny,
        Instant::now(),
    )?;

    let mut rflags = OPEN4_RESULT_LOCKTYPE_POSIX;
    if grant.confirm_required {
        rflags |= OPEN4_RESULT_CONFIRM;
    }
    debug!(
        "open {:?}/{name} --> {id}, stateid seqid {}",
        dir.path, grant.stateid.seqid
    );
    state.set_current(id);
    Ok(OPEN4resok {
        stateid: grant.stateid,
        cinfo,
        rflags,
        attrset,
        delegation: open_delegation_type4::OPEN_DELEGATE_NONE,
    })
}

fn expect_regular(attr: &FileAttr) -> Result<(), nfsstat4> {
    match attr.ftype {
        nfs_ftype4::NF4REG => Ok(()),
        nfs_ftype4::NF4DIR => Err(nfsstat4::NFS4ERR_ISDIR),
        nfs_ftype4::NF4LNK => Err(nfsstat4::NFS4ERR_SYMLINK),
        _ => Err(nfsstat4::NFS4ERR_INVAL),
    }
}

pub(super) fn open_confirm<T>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &OPEN_CONFIRM4args,
) -> Result<OPEN_CONFIRM4resok, nfsstat4> {
    let file = state.current()?;
    let open_stateid = context
        .clients
        .open_confirm(&args.open_stateid, args.seqid, file, Instant::now())?;
    Ok(OPEN_CONFIRM4resok { open_stateid })
}

pub(super) fn open_downgrade<T>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &OPEN_DOWNGRADE4args,
) -> Result<OPEN_DOWNGRADE4resok, nfsstat4> {
    let file = state.current()?;
    let open_stateid = context.clients.open_downgrade(
        &args.open_stateid,
        args.seqid,
        args.share_access,
        args.share_deny,
        file,
        Instant::now(),
    )?;
    Ok(OPEN_DOWNGRADE4resok { open_stateid })
}

pub(super) fn close<T>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &CLOSE4args,
) -> Result<stateid4, nfsstat4> {
    let file = state.current()?;
    context
        .clients
        .close(&args.open_stateid, args.seqid, file, Instant::now())
}
