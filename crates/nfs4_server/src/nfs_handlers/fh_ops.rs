//! Operations that move the current and saved filehandles.

use nfs4_types::nfs4::{GETFH4resok, LOOKUP4args, PUTFH4args, nfsstat4};
use tracing::debug;

use super::{CompoundState, check_name, current_object};
use crate::context::RPCContext;
use crate::filehandle::HandleId;
use crate::vfs::NfsFileSystem;

pub(super) fn putfh<T>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
    args: &PUTFH4args,
) -> Result<(), nfsstat4> {
    let id = context.fh_table.decode(&args.object)?;
    state.set_current(id);
    Ok(())
}

/// PUTROOTFH, and PUTPUBFH which serves the same single export.
pub(super) fn putrootfh(state: &mut CompoundState) -> Result<(), nfsstat4> {
    state.set_current(HandleId::ROOT);
    Ok(())
}

pub(super) fn getfh<T>(
    context: &RPCContext<T>,
    state: &CompoundState,
) -> Result<GETFH4resok, nfsstat4> {
    let id = state.current()?;
    Ok(GETFH4resok {
        object: context.fh_table.encode(id),
    })
}

pub(super) fn savefh(state: &mut CompoundState) -> Result<(), nfsstat4> {
    state.saved = Some(state.current()?);
    Ok(())
}

pub(super) fn restorefh(state: &mut CompoundState) -> Result<(), nfsstat4> {
    state.current = Some(state.saved.ok_or(nfsstat4::NFS4ERR_RESTOREFH)?);
    Ok(())
}

pub(super) async fn lookup<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
    args: &LOOKUP4args,
) -> Result<(), nfsstat4> {
    let dir = current_object(context, state).await?;
    if dir.attr.is_symlink() {
        return Err(nfsstat4::NFS4ERR_SYMLINK);
    }
    dir.expect_dir()?;
    let name = check_name(&args.objname)?;

    let attr = context.vfs.lookup(&dir.path, name).await?;
    let id = context.fh_table.intern_child(dir.id, name, attr.fileid)?;
    debug!("lookup {:?}/{name} --> {id}", dir.path);
    state.set_current(id);
    Ok(())
}

pub(super) async fn lookupp<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
) -> Result<(), nfsstat4> {
    let object = current_object(context, state).await?;
    object.expect_dir()?;
    let parent = context
        .fh_table
        .parent(object.id)?
        .ok_or(nfsstat4::NFS4ERR_NOENT)?;
    state.set_current(parent);
    Ok(())
}
