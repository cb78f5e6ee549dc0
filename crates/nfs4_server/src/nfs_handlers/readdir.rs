use nfs4_types::nfs4::{
    FATTR4_FILEHANDLE, READDIR4args, READDIR4resok, dirlist4, entry4, nfs_cookie4, nfsstat4,
    verifier4,
};
use nfs4_types::xdr_codec::{BoundedList, List, Opaque, Pack};
use tracing::debug;

use super::attr_ops::{encode_for, fsstat_for};
use super::{CompoundState, current_object};
use crate::context::RPCContext;
use crate::vfs::{NextResult, NfsFileSystem, ReadDirIterator};

/// Encoded size of the READDIR4resok parts around the entry list: the
/// cookie verifier and the eof flag.
const RESOK_OVERHEAD: usize = 8 + 4;

/// Entry list bounded by both READDIR limits. `maxcount` limits the encoded
/// reply, `dircount` the names and cookies alone (0 leaves it unbounded).
struct BoundedEntryList {
    entries: BoundedList<entry4>,
    dircount: usize,
    accumulated_dircount: usize,
}

impl BoundedEntryList {
    fn new(dircount: usize, maxcount: usize) -> Self {
        Self {
            entries: BoundedList::new(maxcount.saturating_sub(RESOK_OVERHEAD)),
            dircount,
            accumulated_dircount: 0,
        }
    }

    fn try_push(&mut self, entry: entry4) -> Result<(), entry4> {
        let added_dircount = size_of::<nfs_cookie4>() + entry.name.packed_size();
        if self.dircount > 0 && self.accumulated_dircount + added_dircount > self.dircount {
            return Err(entry);
        }

        self.entries.try_push(entry)?;
        self.accumulated_dircount += added_dircount;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_inner(self) -> List<entry4> {
        self.entries.into_inner()
    }
}

/// The verifier of a listing is the directory's change attribute, so a
/// cookie handed out before the directory changed is refused.
const fn cookie_verifier(change: u64) -> verifier4 {
    change.to_be_bytes()
}

pub(super) async fn readdir<T: NfsFileSystem>(
    context: &RPCContext<T>,
    state: &CompoundState,
    args: &READDIR4args,
) -> Result<READDIR4resok, nfsstat4> {
    let dir = current_object(context, state).await?;
    dir.expect_dir()?;

    let cookieverf = cookie_verifier(dir.attr.change);
    if args.cookie != 0 && args.cookieverf != cookieverf {
        debug!("readdir {:?}: stale cookie verifier", dir.path);
        return Err(nfsstat4::NFS4ERR_NOT_SAME);
    }

    let fsstat = fsstat_for(context, &args.attr_request).await?;
    let want_handles = args.attr_request.contains(FATTR4_FILEHANDLE);
    let mut entries = BoundedEntryList::new(args.dircount as usize, args.maxcount as usize);
    let mut iter = context.vfs.readdir(&dir.path, args.cookie).await?;

    let eof = loop {
        let entry = match iter.next().await {
            NextResult::Ok(entry) => entry,
            NextResult::Eof => break true,
            NextResult::Err(stat) => return Err(stat),
        };

        let id = if want_handles {
            Some(context.fh_table.intern_child(dir.id, &entry.name, entry.attr.fileid)?)
        } else {
            None
        };
        let attrs = encode_for(context, id, &entry.attr, &fsstat, &args.attr_request)?;
        let entry = entry4 {
            cookie: entry.cookie,
            name: Opaque::from(entry.name.as_str()),
            attrs,
        };
        if entries.try_push(entry).is_err() {
            if entries.is_empty() {
                return Err(nfsstat4::NFS4ERR_TOOSMALL);
            }
            break false;
        }
    };

    let entries = entries.into_inner();
    debug!(
        "readdir {:?} cookie {} --> {} entries, eof {eof}",
        dir.path,
        args.cookie,
        entries.0.len()
    );
    Ok(READDIR4resok {
        cookieverf,
        reply: dirlist4 { entries, eof },
    })
}

#[cfg(test)]
mod tests {
    use nfs4_types::nfs4::fattr4;

    use super::*;

    fn entry(name: &str) -> entry4 {
        entry4 {
            cookie: 3,
            name: Opaque::from(name),
            attrs: fattr4::default(),
        }
    }

    #[test]
    fn dircount_limits_names() {
        // cookie (8) + name length (4) + "abcd" (4)
        let mut list = BoundedEntryList::new(16, 4096);
        assert!(list.try_push(entry("abcd")).is_ok());
        assert!(list.try_push(entry("e")).is_err());
        assert_eq!(list.into_inner().0.len(), 1);
    }

    #[test]
    fn maxcount_limits_reply() {
        let mut list = BoundedEntryList::new(0, RESOK_OVERHEAD + 4);
        assert!(list.try_push(entry("a")).is_err());
        assert!(list.is_empty());
    }
}
