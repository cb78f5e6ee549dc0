//! Translation between backend attributes and `fattr4`.
//!
//! `fattr4` carries a bitmap and the XDR encoding of the selected values in
//! ascending attribute order. Owners and groups are sent as decimal id
//! strings.

use std::io::{Cursor, Read};

use nfs4_types::nfs4::{
    FATTR4_CANSETTIME, FATTR4_CASE_INSENSITIVE, FATTR4_CASE_PRESERVING, FATTR4_CHANGE,
    FATTR4_CHOWN_RESTRICTED, FATTR4_FH_EXPIRE_TYPE, FATTR4_FILEHANDLE, FATTR4_FILEID,
    FATTR4_FILES_AVAIL, FATTR4_FILES_FREE, FATTR4_FILES_TOTAL, FATTR4_FSID, FATTR4_HOMOGENEOUS,
    FATTR4_LEASE_TIME, FATTR4_LINK_SUPPORT, FATTR4_MAXFILESIZE, FATTR4_MAXLINK, FATTR4_MAXNAME,
    FATTR4_MAXREAD, FATTR4_MAXWRITE, FATTR4_MODE, FATTR4_MOUNTED_ON_FILEID, FATTR4_NAMED_ATTR,
    FATTR4_NO_TRUNC, FATTR4_NUMLINKS, FATTR4_OWNER, FATTR4_OWNER_GROUP, FATTR4_RAWDEV,
    FATTR4_RDATTR_ERROR, FATTR4_SIZE, FATTR4_SPACE_AVAIL, FATTR4_SPACE_FREE, FATTR4_SPACE_TOTAL,
    FATTR4_SPACE_USED, FATTR4_SUPPORTED_ATTRS, FATTR4_SYMLINK_SUPPORT, FATTR4_TIME_ACCESS,
    FATTR4_TIME_ACCESS_SET, FATTR4_TIME_DELTA, FATTR4_TIME_METADATA, FATTR4_TIME_MODIFY,
    FATTR4_TIME_MODIFY_SET, FATTR4_TYPE, FATTR4_UNIQUE_HANDLES, FH4_PERSISTENT, bitmap4, fattr4,
    fsid4, nfs_fh4, nfsstat4, nfstime4, settime4,
};
use nfs4_types::xdr_codec::{Opaque, Pack, Unpack};

use crate::units::MEBIBYTE;
use crate::vfs::{FileAttr, FsStat, SetAttributes, SetTime};

/// Largest READ and WRITE payload the server accepts.
pub const MAX_IO_SIZE: u32 = MEBIBYTE;
pub const MAX_NAME_LENGTH: u32 = 255;

const EXPORT_FSID: fsid4 = fsid4 {
    major: 0x6e66_7334,
    minor: 0,
};

/// Attributes the server can report or set.
const SUPPORTED_ATTRS: &[u32] = &[
    FATTR4_SUPPORTED_ATTRS,
    FATTR4_TYPE,
    FATTR4_FH_EXPIRE_TYPE,
    FATTR4_CHANGE,
    FATTR4_SIZE,
    FATTR4_LINK_SUPPORT,
    FATTR4_SYMLINK_SUPPORT,
    FATTR4_NAMED_ATTR,
    FATTR4_FSID,
    FATTR4_UNIQUE_HANDLES,
    FATTR4_LEASE_TIME,
    FATTR4_RDATTR_ERROR,
    FATTR4_CANSETTIME,
    FATTR4_CASE_INSENSITIVE,
    FATTR4_CASE_PRESERVING,
    FATTR4_CHOWN_RESTRICTED,
    FATTR4_FILEHANDLE,
    FATTR4_FILEID,
    FATTR4_FILES_AVAIL,
    FATTR4_FILES_FREE,
    FATTR4_FILES_TOTAL,
    FATTR4_HOMOGENEOUS,
    FATTR4_MAXFILESIZE,
    FATTR4_MAXLINK,
    FATTR4_MAXNAME,
    FATTR4_MAXREAD,
    FATTR4_MAXWRITE,
    FATTR4_MODE,
    FATTR4_NO_TRUNC,
    FATTR4_NUMLINKS,
    FATTR4_OWNER,
    FATTR4_OWNER_GROUP,
    FATTR4_RAWDEV,
    FATTR4_SPACE_AVAIL,
    FATTR4_SPACE_FREE,
    FATTR4_SPACE_TOTAL,
    FATTR4_SPACE_USED,
    FATTR4_TIME_ACCESS,
    FATTR4_TIME_ACCESS_SET,
    FATTR4_TIME_DELTA,
    FATTR4_TIME_METADATA,
    FATTR4_TIME_MODIFY,
    FATTR4_TIME_MODIFY_SET,
    FATTR4_MOUNTED_ON_FILEID,
];

const SETTABLE_ATTRS: &[u32] = &[
    FATTR4_SIZE,
    FATTR4_MODE,
    FATTR4_OWNER,
    FATTR4_OWNER_GROUP,
    FATTR4_TIME_ACCESS_SET,
    FATTR4_TIME_MODIFY_SET,
];

const WRITE_ONLY_ATTRS: &[u32] = &[FATTR4_TIME_ACCESS_SET, FATTR4_TIME_MODIFY_SET];

const FSSTAT_ATTRS: &[u32] = &[
    FATTR4_FILES_AVAIL,
    FATTR4_FILES_FREE,
    FATTR4_FILES_TOTAL,
    FATTR4_SPACE_AVAIL,
    FATTR4_SPACE_FREE,
    FATTR4_SPACE_TOTAL,
];

#[must_use]
pub fn supported_attrs() -> bitmap4 {
    bitmap4::from_attrs(SUPPORTED_ATTRS)
}

#[must_use]
pub fn is_supported(attr: u32) -> bool {
    SUPPORTED_ATTRS.contains(&attr)
}

/// True if encoding `request` needs [`FsStat`] values.
#[must_use]
pub fn needs_fsstat(request: &bitmap4) -> bool {
    FSSTAT_ATTRS.iter().any(|attr| request.contains(*attr))
}

/// Everything an attribute value can be derived from.
#[derive(Debug, Clone, Copy)]
pub struct AttrSource<'a> {
    pub attr: &'a FileAttr,
    pub handle: &'a nfs_fh4,
    pub fsstat: &'a FsStat,
    pub lease_time: u32,
}

/// Encodes the requested attributes the server supports. Unsupported and
/// write-only attributes are left out of the reply bitmap.
pub fn encode_attrs(request: &bitmap4, source: &AttrSource<'_>) -> Result<fattr4, nfsstat4> {
    let mut attrmask = bitmap4::default();
    let mut vals = Vec::new();

    for attr in request.iter() {
        if !is_supported(attr) || WRITE_ONLY_ATTRS.contains(&attr) {
            continue;
        }
        encode_attr(attr, source, &mut vals).map_err(|_| nfsstat4::NFS4ERR_SERVERFAULT)?;
        attrmask.insert(attr);
    }

    Ok(fattr4 {
        attrmask,
        attr_vals: Opaque::owned(vals),
    })
}

fn encode_attr(
    attr: u32,
    source: &AttrSource<'_>,
    out: &mut Vec<u8>,
) -> nfs4_types::xdr_codec::Result<usize> {
    let file = source.attr;
    let fsstat = source.fsstat;
    match attr {
        FATTR4_SUPPORTED_ATTRS => supported_attrs().pack(out),
        FATTR4_TYPE => file.ftype.pack(out),
        FATTR4_FH_EXPIRE_TYPE => FH4_PERSISTENT.pack(out),
        FATTR4_CHANGE => file.change.pack(out),
        FATTR4_SIZE => file.size.pack(out),
        FATTR4_LINK_SUPPORT | FATTR4_NAMED_ATTR | FATTR4_CASE_INSENSITIVE => false.pack(out),
        FATTR4_SYMLINK_SUPPORT
        | FATTR4_UNIQUE_HANDLES
        | FATTR4_CANSETTIME
        | FATTR4_CASE_PRESERVING
        | FATTR4_CHOWN_RESTRICTED
        | FATTR4_HOMOGENEOUS
        | FATTR4_NO_TRUNC => true.pack(out),
        FATTR4_FSID => EXPORT_FSID.pack(out),
        FATTR4_LEASE_TIME => source.lease_time.pack(out),
        FATTR4_RDATTR_ERROR => nfsstat4::NFS4_OK.pack(out),
        FATTR4_FILEHANDLE => source.handle.pack(out),
        FATTR4_FILEID | FATTR4_MOUNTED_ON_FILEID => file.fileid.pack(out),
        FATTR4_FILES_AVAIL => fsstat.avail_files.pack(out),
        FATTR4_FILES_FREE => fsstat.free_files.pack(out),
        FATTR4_FILES_TOTAL => fsstat.total_files.pack(out),
        FATTR4_MAXFILESIZE => (u64::MAX >> 1).pack(out),
        FATTR4_MAXLINK => 1u32.pack(out),
        FATTR4_MAXNAME => MAX_NAME_LENGTH.pack(out),
        FATTR4_MAXREAD | FATTR4_MAXWRITE => u64::from(MAX_IO_SIZE).pack(out),
        FATTR4_MODE => (file.mode & 0o7777).pack(out),
        FATTR4_NUMLINKS => file.nlink.pack(out),
        FATTR4_OWNER => Opaque::from(file.uid.to_string().as_str()).pack(out),
        FATTR4_OWNER_GROUP => Opaque::from(file.gid.to_string().as_str()).pack(out),
        FATTR4_RAWDEV => file.rdev.pack(out),
        FATTR4_SPACE_AVAIL => fsstat.avail_bytes.pack(out),
        FATTR4_SPACE_FREE => fsstat.free_bytes.pack(out),
        FATTR4_SPACE_TOTAL => fsstat.total_bytes.pack(out),
        FATTR4_SPACE_USED => file.used.pack(out),
        FATTR4_TIME_ACCESS => file.atime.pack(out),
        FATTR4_TIME_DELTA => nfstime4 {
            seconds: 0,
            nseconds: 1,
        }
        .pack(out),
        FATTR4_TIME_METADATA => file.ctime.pack(out),
        FATTR4_TIME_MODIFY => file.mtime.pack(out),
        _ => Ok(0),
    }
}

/// Decodes the attributes of SETATTR, CREATE and OPEN.
///
/// Returns the changes and the bitmap of attributes that will be applied.
/// Unknown attributes are `NFS4ERR_ATTRNOTSUPP`, known but read-only ones
/// `NFS4ERR_INVAL`.
pub fn decode_settable(attrs: &fattr4) -> Result<(SetAttributes, bitmap4), nfsstat4> {
    let mut input = Cursor::new(attrs.attr_vals.as_ref());
    let mut changes = SetAttributes::default();

    for attr in attrs.attrmask.iter() {
        if !is_supported(attr) {
            return Err(nfsstat4::NFS4ERR_ATTRNOTSUPP);
        }
        if !SETTABLE_ATTRS.contains(&attr) {
            return Err(nfsstat4::NFS4ERR_INVAL);
        }
        match attr {
            FATTR4_SIZE => changes.size = Some(unpack(&mut input)?),
            FATTR4_MODE => changes.mode = Some(unpack::<u32>(&mut input)? & 0o7777),
            FATTR4_OWNER => changes.uid = Some(parse_id(&unpack(&mut input)?)?),
            FATTR4_OWNER_GROUP => changes.gid = Some(parse_id(&unpack(&mut input)?)?),
            FATTR4_TIME_ACCESS_SET => changes.atime = unpack::<settime4>(&mut input)?.into(),
            FATTR4_TIME_MODIFY_SET => changes.mtime = unpack::<settime4>(&mut input)?.into(),
            _ => return Err(nfsstat4::NFS4ERR_INVAL),
        }
    }

    if input.position() != attrs.attr_vals.len() as u64 {
        return Err(nfsstat4::NFS4ERR_BADXDR);
    }
    Ok((changes, attrs.attrmask.clone()))
}

fn unpack<T: Unpack>(input: &mut impl Read) -> Result<T, nfsstat4> {
    T::unpack(input)
        .map(|(value, _)| value)
        .map_err(|_| nfsstat4::NFS4ERR_BADXDR)
}

/// Owners are numeric ids; `name@domain` forms are not mapped.
fn parse_id(owner: &Opaque<'static>) -> Result<u32, nfsstat4> {
    owner
        .as_utf8()
        .and_then(|owner| owner.parse().ok())
        .ok_or(nfsstat4::NFS4ERR_BADOWNER)
}

impl From<settime4> for SetTime {
    fn from(time: settime4) -> Self {
        match time {
            settime4::SET_TO_SERVER_TIME4 => Self::ServerTime,
            settime4::SET_TO_CLIENT_TIME4(time) => Self::ClientTime(time),
        }
    }
}

/// Compares client supplied attributes with the current ones for VERIFY and
/// NVERIFY. Returns `true` when every supplied value matches.
pub fn attrs_match(supplied: &fattr4, source: &AttrSource<'_>) -> Result<bool, nfsstat4> {
    for attr in supplied.attrmask.iter() {
        if !is_supported(attr) {
            return Err(nfsstat4::NFS4ERR_ATTRNOTSUPP);
        }
        if attr == FATTR4_RDATTR_ERROR || WRITE_ONLY_ATTRS.contains(&attr) {
            return Err(nfsstat4::NFS4ERR_INVAL);
        }
    }

    let current = encode_attrs(&supplied.attrmask, source)?;
    Ok(current.attr_vals == supplied.attr_vals)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use nfs4_types::nfs4::{FATTR4_ACL, nfs_ftype4, specdata4};

    use super::*;

    fn file_attr() -> FileAttr {
        FileAttr {
            ftype: nfs_ftype4::NF4REG,
            mode: 0o100_644,
            nlink: 1,
            uid: 1000,
            gid: 100,
            size: 11,
            used: 4096,
            rdev: specdata4::default(),
            fileid: 42,
            change: 7,
            atime: nfstime4::default(),
            mtime: nfstime4::default(),
            ctime: nfstime4::default(),
        }
    }

    fn encode(request: &[u32]) -> fattr4 {
        let attr = file_attr();
        let handle = nfs_fh4::default();
        let fsstat = FsStat::default();
        let source = AttrSource {
            attr: &attr,
            handle: &handle,
            fsstat: &fsstat,
            lease_time: 90,
        };
        encode_attrs(&bitmap4::from_attrs(request), &source).unwrap()
    }

    #[test]
    fn encodes_in_attribute_order() {
        let attrs = encode(&[FATTR4_SIZE, FATTR4_TYPE, FATTR4_MODE]);
        assert_eq!(
            attrs.attrmask,
            bitmap4::from_attrs(&[FATTR4_TYPE, FATTR4_SIZE, FATTR4_MODE])
        );
        assert_eq!(
            attrs.attr_vals.as_ref(),
            [0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 11, 0, 0, 0x01, 0xa4]
        );
    }

    #[test]
    fn skips_unsupported_and_write_only() {
        let attrs = encode(&[FATTR4_ACL, FATTR4_TIME_MODIFY_SET, FATTR4_OWNER]);
        assert_eq!(attrs.attrmask, bitmap4::from_attrs(&[FATTR4_OWNER]));
        assert_eq!(attrs.attr_vals.as_ref(), [0, 0, 0, 4, b'1', b'0', b'0', b'0']);
    }

    #[test]
    fn decodes_settable_attributes() {
        let mut vals = Vec::new();
        5u64.pack(&mut vals).unwrap();
        0o755u32.pack(&mut vals).unwrap();
        settime4::SET_TO_SERVER_TIME4.pack(&mut vals).unwrap();
        let attrs = fattr4 {
            attrmask: bitmap4::from_attrs(&[FATTR4_SIZE, FATTR4_MODE, FATTR4_TIME_MODIFY_SET]),
            attr_vals: Opaque::owned(vals),
        };

        let (changes, applied) = decode_settable(&attrs).unwrap();
        assert_eq!(changes.size, Some(5));
        assert_eq!(changes.mode, Some(0o755));
        assert_eq!(changes.mtime, SetTime::ServerTime);
        assert_eq!(changes.atime, SetTime::DontChange);
        assert_eq!(applied, attrs.attrmask);
    }

    #[test]
    fn rejects_unsettable_attributes() {
        let unsupported = fattr4 {
            attrmask: bitmap4::from_attrs(&[FATTR4_ACL]),
            attr_vals: Opaque::default(),
        };
        assert_eq!(
            decode_settable(&unsupported),
            Err(nfsstat4::NFS4ERR_ATTRNOTSUPP)
        );

        let mut vals = Vec::new();
        nfs_ftype4::NF4DIR.pack(&mut vals).unwrap();
        let read_only = fattr4 {
            attrmask: bitmap4::from_attrs(&[FATTR4_TYPE]),
            attr_vals: Opaque::owned(vals),
        };
        assert_eq!(decode_settable(&read_only), Err(nfsstat4::NFS4ERR_INVAL));

        let truncated = fattr4 {
            attrmask: bitmap4::from_attrs(&[FATTR4_SIZE]),
            attr_vals: Opaque::owned(vec![0, 0, 0, 1]),
        };
        assert_eq!(decode_settable(&truncated), Err(nfsstat4::NFS4ERR_BADXDR));

        let mut vals = Vec::new();
        Opaque::from("nobody@example").pack(&mut vals).unwrap();
        let named_owner = fattr4 {
            attrmask: bitmap4::from_attrs(&[FATTR4_OWNER]),
            attr_vals: Opaque::owned(vals),
        };
        assert_eq!(decode_settable(&named_owner), Err(nfsstat4::NFS4ERR_BADOWNER));
    }

    #[test]
    fn verify_compares_encoded_values() {
        let attr = file_attr();
        let handle = nfs_fh4::default();
        let fsstat = FsStat::default();
        let source = AttrSource {
            attr: &attr,
            handle: &handle,
            fsstat: &fsstat,
            lease_time: 90,
        };

        let same = encode(&[FATTR4_SIZE, FATTR4_FILEID]);
        assert_eq!(attrs_match(&same, &source), Ok(true));

        let mut vals = Vec::new();
        12u64.pack(&mut vals).unwrap();
        let different = fattr4 {
            attrmask: bitmap4::from_attrs(&[FATTR4_SIZE]),
            attr_vals: Opaque::owned(vals),
        };
        assert_eq!(attrs_match(&different, &source), Ok(false));

        let write_only = fattr4 {
            attrmask: bitmap4::from_attrs(&[FATTR4_TIME_ACCESS_SET]),
            attr_vals: Opaque::default(),
        };
        assert_eq!(attrs_match(&write_only, &source), Err(nfsstat4::NFS4ERR_INVAL));
    }
}
