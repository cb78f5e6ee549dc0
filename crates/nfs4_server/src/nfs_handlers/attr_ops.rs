use std::time::Instant;

use nfs4_types::nfs4::{
    ACCESS4_DELETE, ACCESS4_EXECUTE, ACCESS4_EXTEND, ACCESS4_LOOKUP, ACCESS4_MODIFY, ACCESS4_READ,
    ACCESS4args, ACCESS4resok, GETATTR4args, GETATTR4resok, NVERIFY4args,
    OPEN4_SHARE_ACCESS_WRITE, SETATTR4args, SETATTR4res, VERIFY4args, bitmap4, fattr4, nfs_fh4,
    nfsstat4,
};
use nfs4_types::rpc::auth_unix;
use tracing::debug;

use super::{CompoundState, Object, current_object};
use crate::attr::{AttrSource, attrs_match, decode_settable, encode_attrs, needs_fsstat};
use crate::context::RPCContext;
use crate::filehandle::HandleId;
use crate::vfs::{FileAttr, FsStat, NfsFileSystem, VFSCapabilities};

const DIR_ACCESS: u32 = ACCESS4_READ | ACCESS4_LOOKUP | ACCESS4_MODIFY | ACCESS4_EXTEND | ACCESS4_DELETE;
const FILE_ACCESS: u32 = ACCESS4_READ | ACCESS4_MODIFY | ACCESS4_EXTEND | ACCESS4_EXECUTE;
const WRITE_ACCESS: u32 = ACCESS4_MODIFY | ACCESS4_EXTEND | ACCESS4_DELETE;

/// Space usage is only queried when one of the requested attributes needs it.
pub(super) async fn fsstat_for<T: NfsFileSystem>(
    context: &RPCContext<T>,
    request: &bitmap4,
) -> Result<FsStat, nfsstat4> {
    if needs_fsstat(request) {
        context.vfs.fsstat().await
    } else {
        Ok(FsStat::default())
    }
}

/// Encodes `request` for an object. `id` is only needed when the
/// filehandle attribute is requested.
pub(super) fn encode_for<T>(
    context: &RPCContext<T>,
    id: Option<HandleId>,
    attr: &FileAttr,
    fsstat: &FsStat,
    request: &bitmap4,
) -> Result<fattr4, nfsstat4> {
    let handle = id.map_or_else(nfs_fh4::default, |id| context.fh_table.encode(id));
    encode_attrs(
        request,
        &AttrSource {
            attr,
            handle: &handle,
            fsstat,
            lease_time: context.clients.lease_seconds(),
        },
    )
}

async fn encode_object<T: NfsFileSystem>(
    context: &RPCContext<T>,
    object: &Object,
    request: &bitmap4,
) -> Result<fattr4, nfsstat4> {
    let fsstat = fsstat_for(context, request).await?;
    encode_for(context, Some(object.id), &object.attr, &fsstat, request)
}

pub(super) async fn getattr<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &GETATTR4args,
) -> Result<GETATTR4resok, nfsstat4> {
    let object = current_object(context, state).await?;
    let obj_attributes = encode_object(context, &object, &args.attr_request).await?;
    Ok(GETATTR4resok { obj_attributes })
}

pub(super) async fn setattr<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &SETATTR4args,
) -> SETATTR4res {
    match setattr_impl(context, state, args).await {
        Ok(attrsset) => SETATTR4res {
            status: nfsstat4::NFS4_OK,
            attrsset,
        },
        Err(status) => SETATTR4res {
            status,
            attrsset: bitmap4::default(),
        },
    }
}

async fn setattr_impl<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &SETATTR4args,
) -> Result<bitmap4, nfsstat4> {
    let object = current_object(context, state).await?;
    let (changes, attrsset) = decode_settable(&args.obj_attributes)?;

    if changes.size.is_some() {
        if object.attr.is_dir() {
            return Err(nfsstat4::NFS4ERR_ISDIR);
        }
        if object.attr.is_symlink() {
            return Err(nfsstat4::NFS4ERR_INVAL);
        }
        context.clients.check_stateid(
            &args.stateid,
            object.id,
            OPEN4_SHARE_ACCESS_WRITE,
            Instant::now(),
        )?;
    }
    if changes.is_empty() {
        return Ok(attrsset);
    }

    debug!("setattr {:?} {changes:?}", object.path);
    context.vfs.setattr(&object.path, changes).await?;
    Ok(attrsset)
}

pub(super) async fn verify<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &VERIFY4args,
) -> Result<(), nfsstat4> {
    if compare(context, state, &args.obj_attributes).await? {
        Ok(())
    } else {
        Err(nfsstat4::NFS4ERR_NOT_SAME)
    }
}

pub(super) async fn nverify<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &NVERIFY4args,
) -> Result<(), nfsstat4> {
    if compare(context, state, &args.obj_attributes).await? {
        Err(nfsstat4::NFS4ERR_SAME)
    } else {
        Ok(())
    }
}

async fn compare<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    supplied: &fattr4,
) -> Result<bool, nfsstat4> {
    let object = current_object(context, state).await?;
    let fsstat = fsstat_for(context, &supplied.attrmask).await?;
    let handle = context.fh_table.encode(object.id);
    attrs_match(
        supplied,
        &AttrSource {
            attr: &object.attr,
            handle: &handle,
            fsstat: &fsstat,
            lease_time: context.clients.lease_seconds(),
        },
    )
}

pub(super) async fn access<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &ACCESS4args,
) -> Result<ACCESS4resok, nfsstat4> {
    let object = current_object(context, state).await?;
    let applicable = if object.attr.is_dir() {
        DIR_ACCESS
    } else {
        FILE_ACCESS
    };
    let supported = args.access & applicable;

    let mut allowed = allowed_by_mode(&object.attr, &context.auth);
    if context.vfs.capabilities() == VFSCapabilities::ReadOnly {
        allowed &= !WRITE_ACCESS;
    }
    Ok(ACCESS4resok {
        supported,
        access: supported & allowed,
    })
}

/// Access bits the mode of `attr` grants to the caller.
fn allowed_by_mode(attr: &FileAttr, auth: &auth_unix) -> u32 {
    if auth.uid == 0 {
        return DIR_ACCESS | FILE_ACCESS;
    }
    let shift = if auth.uid == attr.uid {
        6
    } else if auth.gid == attr.gid || auth.gids.contains(&attr.gid) {
        3
    } else {
        0
    };
    let bits = (attr.mode >> shift) & 0o7;

    let mut allowed = 0;
    if bits & 0o4 != 0 {
        allowed |= ACCESS4_READ;
    }
    if bits & 0o2 != 0 {
        allowed |= WRITE_ACCESS;
    }
    if bits & 0o1 != 0 {
        allowed |= ACCESS4_EXECUTE | ACCESS4_LOOKUP;
    }
    allowed
}
