//! Operations that change or inspect directory contents.

use nfs4_types::nfs4::{
    CREATE4args, CREATE4resok, READLINK4resok, REMOVE4args, REMOVE4resok, RENAME4args,
    RENAME4resok, SECINFO4args, SECINFO4resok, createtype4, nfsstat4, secinfo4,
};
use nfs4_types::xdr_codec::Opaque;
use tracing::debug;

use super::{
    CompoundState, change_info, check_name, current_object, forget_path, stat_object,
};
use crate::attr::decode_settable;
use crate::context::RPCContext;
use crate::vfs::NfsFileSystem;

/// CREATE makes everything but regular files, which are created by OPEN.
pub(super) async fn create<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
    args: CREATE4args,
) -> Result<CREATE4resok, nfsstat4> {
    let dir = current_object(context, state).await?;
    dir.expect_dir()?;
    let name = check_name(&args.objname)?;
    let (attrs, attrset) = decode_settable(&args.createattrs)?;

    let attr = match args.objtype {
        createtype4::NF4DIR => context.vfs.mkdir(&dir.path, name, attrs).await?,
        createtype4::NF4LNK(target) => {
            let target = target.as_utf8().ok_or(nfsstat4::NFS4ERR_INVAL)?;
            context.vfs.symlink(&dir.path, name, target, attrs).await?
        }
        other => {
            debug!("create of unsupported type {other:?}");
            return Err(nfsstat4::NFS4ERR_BADTYPE);
        }
    };

    let cinfo = change_info(context, &dir).await;
    let id = context.fh_table.intern_child(dir.id, name, attr.fileid)?;
    debug!("created {:?}/{name} --> {id}", dir.path);
    state.set_current(id);
    Ok(CREATE4resok { cinfo, attrset })
}

pub(super) async fn remove<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &REMOVE4args,
) -> Result<REMOVE4resok, nfsstat4> {
    let dir = current_object(context, state).await?;
    dir.expect_dir()?;
    let name = check_name(&args.target)?;

    context.vfs.remove(&dir.path, name).await?;
    forget_path(context, &dir.path.join(name));
    debug!("removed {:?}/{name}", dir.path);

    Ok(REMOVE4resok {
        cinfo: change_info(context, &dir).await,
    })
}

/// Moves SAVED_FH/oldname to CURRENT_FH/newname.
pub(super) async fn rename<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &RENAME4args,
) -> Result<RENAME4resok, nfsstat4> {
    let source_id = state.saved.ok_or(nfsstat4::NFS4ERR_NOFILEHANDLE)?;
    let target = current_object(context, state).await?;
    let source = stat_object(context, source_id).await?;
    source.expect_dir()?;
    target.expect_dir()?;
    let oldname = check_name(&args.oldname)?;
    let newname = check_name(&args.newname)?;

    let from = source.path.join(oldname);
    let to = target.path.join(newname);
    if from == to {
        // still fails if the name does not exist
        context.vfs.lookup(&source.path, oldname).await?;
        let cinfo = change_info(context, &source).await;
        return Ok(RENAME4resok {
            source_cinfo: cinfo,
            target_cinfo: cinfo,
        });
    }
    if to.starts_with(&from) {
        return Err(nfsstat4::NFS4ERR_INVAL);
    }

    context
        .vfs
        .rename(&source.path, oldname, &target.path, newname)
        .await?;
    let displaced = context.fh_table.rename(&from, &to)?;
    context.clients.forget_files(&displaced);
    debug!("renamed {from:?} --> {to:?}");

    Ok(RENAME4resok {
        source_cinfo: change_info(context, &source).await,
        target_cinfo: change_info(context, &target).await,
    })
}

pub(super) async fn readlink<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
) -> Result<READLINK4resok, nfsstat4> {
    let object = current_object(context, state).await?;
    if !object.attr.is_symlink() {
        return Err(nfsstat4::NFS4ERR_INVAL);
    }
    let link = context.vfs.readlink(&object.path).await?;
    Ok(READLINK4resok {
        link: Opaque::owned(link),
    })
}

/// Every object is served with the same flavors. As RFC 7530 requires,
/// SECINFO consumes the current filehandle.
pub(super) async fn secinfo<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &mut CompoundState,
    args: &SECINFO4args,
) -> Result<SECINFO4resok, nfsstat4> {
    let dir = current_object(context, state).await?;
    dir.expect_dir()?;
    let name = check_name(&args.name)?;
    context.vfs.lookup(&dir.path, name).await?;

    state.current = None;
    Ok(SECINFO4resok {
        flavors: vec![secinfo4::AUTH_SYS, secinfo4::AUTH_NONE],
    })
}
