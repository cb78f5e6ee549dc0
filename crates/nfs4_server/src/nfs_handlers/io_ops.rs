use std::time::Instant;

use nfs4_types::nfs4::{
    COMMIT4args, COMMIT4resok, OPEN4_SHARE_ACCESS_WRITE, READ4args, READ4resok, WRITE4args,
    WRITE4resok, nfs_ftype4, nfsstat4, stable_how4,
};
use nfs4_types::xdr_codec::Opaque;
use tracing::debug;

use super::{CompoundState, Object, current_object};
use crate::attr::MAX_IO_SIZE;
use crate::context::RPCContext;
use crate::vfs::NfsFileSystem;

/// Only regular files carry data.
fn expect_file(object: &Object) -> Result<(), nfsstat4> {
    match object.attr.ftype {
        nfs_ftype4::NF4REG => Ok(()),
        nfs_ftype4::NF4DIR => Err(nfsstat4::NFS4ERR_ISDIR),
        _ => Err(nfsstat4::NFS4ERR_INVAL),
    }
}

pub(super) async fn read<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &READ4args,
) -> Result<READ4resok, nfsstat4> {
    let object = current_object(context, state).await?;
    expect_file(&object)?;
    // any open may read, write-only ones included
    context
        .clients
        .check_stateid(&args.stateid, object.id, 0, Instant::now())?;

    let count = args.count.min(MAX_IO_SIZE);
    let (data, eof) = context.vfs.read(&object.path, args.offset, count).await?;
    debug!("read {:?} offset {} --> {} bytes, eof {eof}", object.path, args.offset, data.len());
    Ok(READ4resok {
        eof,
        data: Opaque::owned(data),
    })
}

pub(super) async fn write<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &WRITE4args,
) -> Result<WRITE4resok, nfsstat4> {
    let object = current_object(context, state).await?;
    expect_file(&object)?;
    context.clients.check_stateid(
        &args.stateid,
        object.id,
        OPEN4_SHARE_ACCESS_WRITE,
        Instant::now(),
    )?;
    if args.data.len() > MAX_IO_SIZE as usize {
        return Err(nfsstat4::NFS4ERR_INVAL);
    }

    context
        .vfs
        .write(&object.path, args.offset, &args.data)
        .await?;
    debug!("write {:?} offset {} <-- {} bytes", object.path, args.offset, args.data.len());
    Ok(WRITE4resok {
        count: u32::try_from(args.data.len()).map_err(|_| nfsstat4::NFS4ERR_INVAL)?,
        // the backend has written the data once `write` returns
        committed: stable_how4::FILE_SYNC4,
        writeverf: context.write_verifier,
    })
}

pub(super) async fn commit<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &COMMIT4args,
) -> Result<COMMIT4resok, nfsstat4> {
    let object = current_object(context, state).await?;
    expect_file(&object)?;
    debug!("commit {:?} offset {} count {}", object.path, args.offset, args.count);
    context.vfs.commit(&object.path).await?;
    Ok(COMMIT4resok {
        writeverf: context.write_verifier,
    })
}
