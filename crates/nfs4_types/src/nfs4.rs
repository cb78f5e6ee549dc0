#![allow(
    non_camel_case_types,
    clippy::large_enum_variant,
    clippy::upper_case_acronyms
)]

//! This module contains the definitions of the NFSv4.0 protocol as defined in RFC 7530.

use std::io::{Cursor, Read, Write};

use nfs4_macros::XdrCodec;

use crate::xdr_codec::{List, Opaque, Pack, Result, Unpack};

pub const PROGRAM: u32 = 100_003;
pub const VERSION: u32 = 4;
pub const MINOR_VERSION: u32 = 0;

pub const NFS4_FHSIZE: usize = 128;
pub const NFS4_VERIFIER_SIZE: usize = 8;
pub const NFS4_OTHER_SIZE: usize = 12;

pub const ACCESS4_READ: u32 = 0x0000_0001;
pub const ACCESS4_LOOKUP: u32 = 0x0000_0002;
pub const ACCESS4_MODIFY: u32 = 0x0000_0004;
pub const ACCESS4_EXTEND: u32 = 0x0000_0008;
pub const ACCESS4_DELETE: u32 = 0x0000_0010;
pub const ACCESS4_EXECUTE: u32 = 0x0000_0020;

pub const MODE4_SUID: u32 = 0x800;
pub const MODE4_SGID: u32 = 0x400;
pub const MODE4_SVTX: u32 = 0x200;
pub const MODE4_RUSR: u32 = 0x100;
pub const MODE4_WUSR: u32 = 0x080;
pub const MODE4_XUSR: u32 = 0x040;
pub const MODE4_RGRP: u32 = 0x020;
pub const MODE4_WGRP: u32 = 0x010;
pub const MODE4_XGRP: u32 = 0x008;
pub const MODE4_ROTH: u32 = 0x004;
pub const MODE4_WOTH: u32 = 0x002;
pub const MODE4_XOTH: u32 = 0x001;

pub const OPEN4_SHARE_ACCESS_READ: u32 = 0x0000_0001;
pub const OPEN4_SHARE_ACCESS_WRITE: u32 = 0x0000_0002;
pub const OPEN4_SHARE_ACCESS_BOTH: u32 = 0x0000_0003;
pub const OPEN4_SHARE_DENY_NONE: u32 = 0x0000_0000;
pub const OPEN4_SHARE_DENY_BOTH: u32 = 0x0000_0003;

pub const OPEN4_RESULT_CONFIRM: u32 = 0x0000_0002;
pub const OPEN4_RESULT_LOCKTYPE_POSIX: u32 = 0x0000_0004;

pub const FH4_PERSISTENT: u32 = 0x0000_0000;
pub const FH4_NOEXPIRE_WITH_OPEN: u32 = 0x0000_0001;
pub const FH4_VOLATILE_ANY: u32 = 0x0000_0002;
pub const FH4_VOL_MIGRATION: u32 = 0x0000_0004;
pub const FH4_VOL_RENAME: u32 = 0x0000_0008;

pub const FATTR4_SUPPORTED_ATTRS: u32 = 0;
pub const FATTR4_TYPE: u32 = 1;
pub const FATTR4_FH_EXPIRE_TYPE: u32 = 2;
pub const FATTR4_CHANGE: u32 = 3;
pub const FATTR4_SIZE: u32 = 4;
pub const FATTR4_LINK_SUPPORT: u32 = 5;
pub const FATTR4_SYMLINK_SUPPORT: u32 = 6;
pub const FATTR4_NAMED_ATTR: u32 = 7;
pub const FATTR4_FSID: u32 = 8;
pub const FATTR4_UNIQUE_HANDLES: u32 = 9;
pub const FATTR4_LEASE_TIME: u32 = 10;
pub const FATTR4_RDATTR_ERROR: u32 = 11;
pub const FATTR4_ACL: u32 = 12;
pub const FATTR4_ACLSUPPORT: u32 = 13;
pub const FATTR4_ARCHIVE: u32 = 14;
pub const FATTR4_CANSETTIME: u32 = 15;
pub const FATTR4_CASE_INSENSITIVE: u32 = 16;
pub const FATTR4_CASE_PRESERVING: u32 = 17;
pub const FATTR4_CHOWN_RESTRICTED: u32 = 18;
pub const FATTR4_FILEHANDLE: u32 = 19;
pub const FATTR4_FILEID: u32 = 20;
pub const FATTR4_FILES_AVAIL: u32 = 21;
pub const FATTR4_FILES_FREE: u32 = 22;
pub const FATTR4_FILES_TOTAL: u32 = 23;
pub const FATTR4_FS_LOCATIONS: u32 = 24;
pub const FATTR4_HIDDEN: u32 = 25;
pub const FATTR4_HOMOGENEOUS: u32 = 26;
pub const FATTR4_MAXFILESIZE: u32 = 27;
pub const FATTR4_MAXLINK: u32 = 28;
pub const FATTR4_MAXNAME: u32 = 29;
pub const FATTR4_MAXREAD: u32 = 30;
pub const FATTR4_MAXWRITE: u32 = 31;
pub const FATTR4_MIMETYPE: u32 = 32;
pub const FATTR4_MODE: u32 = 33;
pub const FATTR4_NO_TRUNC: u32 = 34;
pub const FATTR4_NUMLINKS: u32 = 35;
pub const FATTR4_OWNER: u32 = 36;
pub const FATTR4_OWNER_GROUP: u32 = 37;
pub const FATTR4_QUOTA_AVAIL_HARD: u32 = 38;
pub const FATTR4_QUOTA_AVAIL_SOFT: u32 = 39;
pub const FATTR4_QUOTA_USED: u32 = 40;
pub const FATTR4_RAWDEV: u32 = 41;
pub const FATTR4_SPACE_AVAIL: u32 = 42;
pub const FATTR4_SPACE_FREE: u32 = 43;
pub const FATTR4_SPACE_TOTAL: u32 = 44;
pub const FATTR4_SPACE_USED: u32 = 45;
pub const FATTR4_SYSTEM: u32 = 46;
pub const FATTR4_TIME_ACCESS: u32 = 47;
pub const FATTR4_TIME_ACCESS_SET: u32 = 48;
pub const FATTR4_TIME_BACKUP: u32 = 49;
pub const FATTR4_TIME_CREATE: u32 = 50;
pub const FATTR4_TIME_DELTA: u32 = 51;
pub const FATTR4_TIME_METADATA: u32 = 52;
pub const FATTR4_TIME_MODIFY: u32 = 53;
pub const FATTR4_TIME_MODIFY_SET: u32 = 54;
pub const FATTR4_MOUNTED_ON_FILEID: u32 = 55;

pub type clientid4 = u64;
pub type seqid4 = u32;
pub type count4 = u32;
pub type offset4 = u64;
pub type length4 = u64;
pub type nfs_cookie4 = u64;
pub type changeid4 = u64;
pub type verifier4 = [u8; NFS4_VERIFIER_SIZE];
pub type utf8string = Opaque<'static>;
pub type utf8str_cs = utf8string;
pub type component4 = utf8string;
pub type linktext4 = utf8string;
pub type attrlist4 = Opaque<'static>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, XdrCodec)]
#[repr(u32)]
pub enum nfsstat4 {
    NFS4_OK = 0,
    NFS4ERR_PERM = 1,
    NFS4ERR_NOENT = 2,
    NFS4ERR_IO = 5,
    NFS4ERR_NXIO = 6,
    NFS4ERR_ACCESS = 13,
    NFS4ERR_EXIST = 17,
    NFS4ERR_XDEV = 18,
    NFS4ERR_NOTDIR = 20,
    NFS4ERR_ISDIR = 21,
    NFS4ERR_INVAL = 22,
    NFS4ERR_FBIG = 27,
    NFS4ERR_NOSPC = 28,
    NFS4ERR_ROFS = 30,
    NFS4ERR_MLINK = 31,
    NFS4ERR_NAMETOOLONG = 63,
    NFS4ERR_NOTEMPTY = 66,
    NFS4ERR_DQUOT = 69,
    NFS4ERR_STALE = 70,
    NFS4ERR_BADHANDLE = 10001,
    NFS4ERR_BAD_COOKIE = 10003,
    NFS4ERR_NOTSUPP = 10004,
    NFS4ERR_TOOSMALL = 10005,
    NFS4ERR_SERVERFAULT = 10006,
    NFS4ERR_BADTYPE = 10007,
    NFS4ERR_DELAY = 10008,
    NFS4ERR_SAME = 10009,
    NFS4ERR_DENIED = 10010,
    NFS4ERR_EXPIRED = 10011,
    NFS4ERR_LOCKED = 10012,
    NFS4ERR_GRACE = 10013,
    NFS4ERR_FHEXPIRED = 10014,
    NFS4ERR_SHARE_DENIED = 10015,
    NFS4ERR_WRONGSEC = 10016,
    NFS4ERR_CLID_INUSE = 10017,
    NFS4ERR_RESOURCE = 10018,
    NFS4ERR_MOVED = 10019,
    NFS4ERR_NOFILEHANDLE = 10020,
    NFS4ERR_MINOR_VERS_MISMATCH = 10021,
    NFS4ERR_STALE_CLIENTID = 10022,
    NFS4ERR_STALE_STATEID = 10023,
    NFS4ERR_OLD_STATEID = 10024,
    NFS4ERR_BAD_STATEID = 10025,
    NFS4ERR_BAD_SEQID = 10026,
    NFS4ERR_NOT_SAME = 10027,
    NFS4ERR_LOCK_RANGE = 10028,
    NFS4ERR_SYMLINK = 10029,
    NFS4ERR_RESTOREFH = 10030,
    NFS4ERR_LEASE_MOVED = 10031,
    NFS4ERR_ATTRNOTSUPP = 10032,
    NFS4ERR_NO_GRACE = 10033,
    NFS4ERR_RECLAIM_BAD = 10034,
    NFS4ERR_RECLAIM_CONFLICT = 10035,
    NFS4ERR_BADXDR = 10036,
    NFS4ERR_LOCKS_HELD = 10037,
    NFS4ERR_OPENMODE = 10038,
    NFS4ERR_BADOWNER = 10039,
    NFS4ERR_BADCHAR = 10040,
    NFS4ERR_BADNAME = 10041,
    NFS4ERR_BAD_RANGE = 10042,
    NFS4ERR_LOCK_NOTSUPP = 10043,
    NFS4ERR_OP_ILLEGAL = 10044,
    NFS4ERR_DEADLOCK = 10045,
    NFS4ERR_FILE_OPEN = 10046,
    NFS4ERR_ADMIN_REVOKED = 10047,
    NFS4ERR_CB_PATH_DOWN = 10048,
}

impl nfsstat4 {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::NFS4_OK)
    }
}

impl std::fmt::Display for nfsstat4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} ({})", *self as u32)
    }
}

impl std::error::Error for nfsstat4 {}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, XdrCodec)]
#[repr(u32)]
pub enum nfs_ftype4 {
    NF4REG = 1,
    NF4DIR = 2,
    NF4BLK = 3,
    NF4CHR = 4,
    NF4LNK = 5,
    NF4SOCK = 6,
    NF4FIFO = 7,
    NF4ATTRDIR = 8,
    NF4NAMEDATTR = 9,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, XdrCodec)]
#[repr(u32)]
pub enum nfs_opnum4 {
    OP_ACCESS = 3,
    OP_CLOSE = 4,
    OP_COMMIT = 5,
    OP_CREATE = 6,
    OP_DELEGPURGE = 7,
    OP_DELEGRETURN = 8,
    OP_GETATTR = 9,
    OP_GETFH = 10,
    OP_LINK = 11,
    OP_LOCK = 12,
    OP_LOCKT = 13,
    OP_LOCKU = 14,
    OP_LOOKUP = 15,
    OP_LOOKUPP = 16,
    OP_NVERIFY = 17,
    OP_OPEN = 18,
    OP_OPENATTR = 19,
    OP_OPEN_CONFIRM = 20,
    OP_OPEN_DOWNGRADE = 21,
    OP_PUTFH = 22,
    OP_PUTPUBFH = 23,
    OP_PUTROOTFH = 24,
    OP_READ = 25,
    OP_READDIR = 26,
    OP_READLINK = 27,
    OP_REMOVE = 28,
    OP_RENAME = 29,
    OP_RENEW = 30,
    OP_RESTOREFH = 31,
    OP_SAVEFH = 32,
    OP_SECINFO = 33,
    OP_SETATTR = 34,
    OP_SETCLIENTID = 35,
    OP_SETCLIENTID_CONFIRM = 36,
    OP_VERIFY = 37,
    OP_WRITE = 38,
    OP_RELEASE_LOCKOWNER = 39,
    OP_ILLEGAL = 10044,
}

impl TryFrom<u32> for nfs_opnum4 {
    type Error = crate::xdr_codec::Error;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Self::unpack(&mut Cursor::new(value.to_be_bytes())).map(|(op, _)| op)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum stable_how4 {
    UNSTABLE4 = 0,
    DATA_SYNC4 = 1,
    FILE_SYNC4 = 2,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum open_delegation_type4 {
    OPEN_DELEGATE_NONE = 0,
    OPEN_DELEGATE_READ = 1,
    OPEN_DELEGATE_WRITE = 2,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum nfs_lock_type4 {
    READ_LT = 1,
    WRITE_LT = 2,
    READW_LT = 3,
    WRITEW_LT = 4,
}

/// Attribute bitmap. Bit `n` lives in word `n / 32`.
#[derive(Clone, Debug, Default, PartialEq, Eq, XdrCodec)]
pub struct bitmap4(pub Vec<u32>);

impl bitmap4 {
    #[must_use]
    pub fn from_attrs(attrs: &[u32]) -> Self {
        let mut bitmap = Self::default();
        for &attr in attrs {
            bitmap.insert(attr);
        }
        bitmap
    }

    #[must_use]
    pub fn contains(&self, attr: u32) -> bool {
        self.0
            .get((attr / 32) as usize)
            .is_some_and(|word| word & (1 << (attr % 32)) != 0)
    }

    pub fn insert(&mut self, attr: u32) {
        let word = (attr / 32) as usize;
        if self.0.len() <= word {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1 << (attr % 32);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|word| *word == 0)
    }

    /// Set attribute numbers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().zip(0u32..).flat_map(|(word, index)| {
            (0..32u32)
                .filter(move |bit| word & (1 << bit) != 0)
                .map(move |bit| index * 32 + bit)
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, XdrCodec)]
pub struct nfstime4 {
    pub seconds: i64,
    pub nseconds: u32,
}

impl From<std::time::SystemTime> for nfstime4 {
    fn from(time: std::time::SystemTime) -> Self {
        match time.duration_since(std::time::UNIX_EPOCH) {
            Ok(since) => Self {
                seconds: i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
                nseconds: since.subsec_nanos(),
            },
            Err(before) => {
                let before = before.duration();
                let mut seconds = -i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                let mut nseconds = before.subsec_nanos();
                if nseconds > 0 {
                    seconds -= 1;
                    nseconds = 1_000_000_000 - nseconds;
                }
                Self { seconds, nseconds }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, XdrCodec)]
pub enum settime4 {
    #[xdr(0)]
    SET_TO_SERVER_TIME4,
    #[xdr(1)]
    SET_TO_CLIENT_TIME4(nfstime4),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, XdrCodec)]
pub struct fsid4 {
    pub major: u64,
    pub minor: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, XdrCodec)]
pub struct specdata4 {
    pub specdata1: u32,
    pub specdata2: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, XdrCodec)]
pub struct change_info4 {
    pub atomic: bool,
    pub before: changeid4,
    pub after: changeid4,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, XdrCodec)]
pub struct fattr4 {
    pub attrmask: bitmap4,
    pub attr_vals: attrlist4,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, XdrCodec)]
pub struct stateid4 {
    pub seqid: seqid4,
    pub other: [u8; NFS4_OTHER_SIZE],
}

impl stateid4 {
    /// The anonymous stateid (all zeros).
    pub const ANONYMOUS: Self = Self {
        seqid: 0,
        other: [0; NFS4_OTHER_SIZE],
    };

    /// The READ bypass stateid (all bits set).
    pub const READ_BYPASS: Self = Self {
        seqid: u32::MAX,
        other: [0xff; NFS4_OTHER_SIZE],
    };

    #[must_use]
    pub fn is_special(&self) -> bool {
        *self == Self::ANONYMOUS || *self == Self::READ_BYPASS
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, XdrCodec)]
pub struct nfs_fh4 {
    pub data: Opaque<'static>,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct nfs_client_id4 {
    pub verifier: verifier4,
    pub id: Opaque<'static>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, XdrCodec)]
pub struct clientaddr4 {
    pub r_netid: String,
    pub r_addr: String,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct cb_client4 {
    pub cb_program: u32,
    pub cb_location: clientaddr4,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, XdrCodec)]
pub struct state_owner4 {
    pub clientid: clientid4,
    pub owner: Opaque<'static>,
}

pub type open_owner4 = state_owner4;
pub type lock_owner4 = state_owner4;

// Operation arguments

#[derive(Clone, Debug, XdrCodec)]
pub struct ACCESS4args {
    pub access: u32,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct CLOSE4args {
    pub seqid: seqid4,
    pub open_stateid: stateid4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct COMMIT4args {
    pub offset: offset4,
    pub count: count4,
}

#[derive(Clone, Debug, XdrCodec)]
pub enum createtype4 {
    #[xdr(1)]
    NF4REG,
    #[xdr(2)]
    NF4DIR,
    #[xdr(3)]
    NF4BLK(specdata4),
    #[xdr(4)]
    NF4CHR(specdata4),
    #[xdr(5)]
    NF4LNK(linktext4),
    #[xdr(6)]
    NF4SOCK,
    #[xdr(7)]
    NF4FIFO,
    #[xdr(8)]
    NF4ATTRDIR,
    #[xdr(9)]
    NF4NAMEDATTR,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct CREATE4args {
    pub objtype: createtype4,
    pub objname: component4,
    pub createattrs: fattr4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct DELEGPURGE4args {
    pub clientid: clientid4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct DELEGRETURN4args {
    pub deleg_stateid: stateid4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct GETATTR4args {
    pub attr_request: bitmap4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct LINK4args {
    pub newname: component4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct open_to_lock_owner4 {
    pub open_seqid: seqid4,
    pub open_stateid: stateid4,
    pub lock_seqid: seqid4,
    pub lock_owner: lock_owner4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct exist_lock_owner4 {
    pub lock_stateid: stateid4,
    pub lock_seqid: seqid4,
}

#[derive(Clone, Debug, XdrCodec)]
pub enum locker4 {
    #[xdr(1)]
    open_owner(open_to_lock_owner4),
    #[xdr(0)]
    lock_owner(exist_lock_owner4),
}

#[derive(Clone, Debug, XdrCodec)]
pub struct LOCK4args {
    pub locktype: nfs_lock_type4,
    pub reclaim: bool,
    pub offset: offset4,
    pub length: length4,
    pub locker: locker4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct LOCKT4args {
    pub locktype: nfs_lock_type4,
    pub offset: offset4,
    pub length: length4,
    pub owner: lock_owner4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct LOCKU4args {
    pub locktype: nfs_lock_type4,
    pub seqid: seqid4,
    pub lock_stateid: stateid4,
    pub offset: offset4,
    pub length: length4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct LOOKUP4args {
    pub objname: component4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct NVERIFY4args {
    pub obj_attributes: fattr4,
}

#[derive(Clone, Debug, XdrCodec)]
pub enum createhow4 {
    #[xdr(0)]
    UNCHECKED4(fattr4),
    #[xdr(1)]
    GUARDED4(fattr4),
    #[xdr(2)]
    EXCLUSIVE4(verifier4),
}

#[derive(Clone, Debug, XdrCodec)]
pub enum openflag4 {
    #[xdr(0)]
    OPEN4_NOCREATE,
    #[xdr(1)]
    OPEN4_CREATE(createhow4),
}

#[derive(Clone, Debug, XdrCodec)]
pub struct open_claim_delegate_cur4 {
    pub delegate_stateid: stateid4,
    pub file: component4,
}

#[derive(Clone, Debug, XdrCodec)]
pub enum open_claim4 {
    #[xdr(0)]
    CLAIM_NULL(component4),
    #[xdr(1)]
    CLAIM_PREVIOUS(open_delegation_type4),
    #[xdr(2)]
    CLAIM_DELEGATE_CUR(open_claim_delegate_cur4),
    #[xdr(3)]
    CLAIM_DELEGATE_PREV(component4),
}

#[derive(Clone, Debug, XdrCodec)]
pub struct OPEN4args {
    pub seqid: seqid4,
    pub share_access: u32,
    pub share_deny: u32,
    pub owner: open_owner4,
    pub openhow: openflag4,
    pub claim: open_claim4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct OPENATTR4args {
    pub createdir: bool,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct OPEN_CONFIRM4args {
    pub open_stateid: stateid4,
    pub seqid: seqid4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct OPEN_DOWNGRADE4args {
    pub open_stateid: stateid4,
    pub seqid: seqid4,
    pub share_access: u32,
    pub share_deny: u32,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct PUTFH4args {
    pub object: nfs_fh4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct READ4args {
    pub stateid: stateid4,
    pub offset: offset4,
    pub count: count4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct READDIR4args {
    pub cookie: nfs_cookie4,
    pub cookieverf: verifier4,
    pub dircount: count4,
    pub maxcount: count4,
    pub attr_request: bitmap4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct REMOVE4args {
    pub target: component4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct RENAME4args {
    pub oldname: component4,
    pub newname: component4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct RENEW4args {
    pub clientid: clientid4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct SECINFO4args {
    pub name: component4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct SETATTR4args {
    pub stateid: stateid4,
    pub obj_attributes: fattr4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct SETCLIENTID4args {
    pub client: nfs_client_id4,
    pub callback: cb_client4,
    pub callback_ident: u32,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct SETCLIENTID_CONFIRM4args {
    pub clientid: clientid4,
    pub setclientid_confirm: verifier4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct VERIFY4args {
    pub obj_attributes: fattr4,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct WRITE4args {
    pub stateid: stateid4,
    pub offset: offset4,
    pub stable: stable_how4,
    pub data: Opaque<'static>,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct RELEASE_LOCKOWNER4args {
    pub lock_owner: lock_owner4,
}

#[derive(Clone, Debug, XdrCodec)]
pub enum nfs_argop4 {
    #[xdr(3)]
    ACCESS(ACCESS4args),
    #[xdr(4)]
    CLOSE(CLOSE4args),
    #[xdr(5)]
    COMMIT(COMMIT4args),
    #[xdr(6)]
    CREATE(CREATE4args),
    #[xdr(7)]
    DELEGPURGE(DELEGPURGE4args),
    #[xdr(8)]
    DELEGRETURN(DELEGRETURN4args),
    #[xdr(9)]
    GETATTR(GETATTR4args),
    #[xdr(10)]
    GETFH,
    #[xdr(11)]
    LINK(LINK4args),
    #[xdr(12)]
    LOCK(LOCK4args),
    #[xdr(13)]
    LOCKT(LOCKT4args),
    #[xdr(14)]
    LOCKU(LOCKU4args),
    #[xdr(15)]
    LOOKUP(LOOKUP4args),
    #[xdr(16)]
    LOOKUPP,
    #[xdr(17)]
    NVERIFY(NVERIFY4args),
    #[xdr(18)]
    OPEN(OPEN4args),
    #[xdr(19)]
    OPENATTR(OPENATTR4args),
    #[xdr(20)]
    OPEN_CONFIRM(OPEN_CONFIRM4args),
    #[xdr(21)]
    OPEN_DOWNGRADE(OPEN_DOWNGRADE4args),
    #[xdr(22)]
    PUTFH(PUTFH4args),
    #[xdr(23)]
    PUTPUBFH,
    #[xdr(24)]
    PUTROOTFH,
    #[xdr(25)]
    READ(READ4args),
    #[xdr(26)]
    READDIR(READDIR4args),
    #[xdr(27)]
    READLINK,
    #[xdr(28)]
    REMOVE(REMOVE4args),
    #[xdr(29)]
    RENAME(RENAME4args),
    #[xdr(30)]
    RENEW(RENEW4args),
    #[xdr(31)]
    RESTOREFH,
    #[xdr(32)]
    SAVEFH,
    #[xdr(33)]
    SECINFO(SECINFO4args),
    #[xdr(34)]
    SETATTR(SETATTR4args),
    #[xdr(35)]
    SETCLIENTID(SETCLIENTID4args),
    #[xdr(36)]
    SETCLIENTID_CONFIRM(SETCLIENTID_CONFIRM4args),
    #[xdr(37)]
    VERIFY(VERIFY4args),
    #[xdr(38)]
    WRITE(WRITE4args),
    #[xdr(39)]
    RELEASE_LOCKOWNER(RELEASE_LOCKOWNER4args),
    #[xdr(10044)]
    ILLEGAL,
}

// Operation results

/// Result of an operation whose success arm carries `T` and whose error arms are void.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Nfs4Result<T> {
    Ok(T),
    Err(nfsstat4),
}

impl<T> Nfs4Result<T> {
    #[must_use]
    pub const fn status(&self) -> nfsstat4 {
        match self {
            Self::Ok(_) => nfsstat4::NFS4_OK,
            Self::Err(status) => *status,
        }
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Err(_) => None,
        }
    }
}

impl<T> From<std::result::Result<T, nfsstat4>> for Nfs4Result<T> {
    fn from(result: std::result::Result<T, nfsstat4>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(status) => Self::Err(status),
        }
    }
}

impl<T: Pack> Pack for Nfs4Result<T> {
    fn packed_size(&self) -> usize {
        4 + match self {
            Self::Ok(value) => value.packed_size(),
            Self::Err(_) => 0,
        }
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        match self {
            Self::Ok(value) => Ok(nfsstat4::NFS4_OK.pack(out)? + value.pack(out)?),
            Self::Err(status) => status.pack(out),
        }
    }
}

impl<T: Unpack> Unpack for Nfs4Result<T> {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let (status, len) = nfsstat4::unpack(input)?;
        if status != nfsstat4::NFS4_OK {
            return Ok((Self::Err(status), len));
        }
        let (value, value_len) = T::unpack(input)?;
        Ok((Self::Ok(value), len + value_len))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct ACCESS4resok {
    pub supported: u32,
    pub access: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct CREATE4resok {
    pub cinfo: change_info4,
    pub attrset: bitmap4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct GETATTR4resok {
    pub obj_attributes: fattr4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct GETFH4resok {
    pub object: nfs_fh4,
}

/// Delegations are never granted, so only the `OPEN_DELEGATE_NONE`
/// discriminant of `open_delegation4` is ever encoded.
#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct OPEN4resok {
    pub stateid: stateid4,
    pub cinfo: change_info4,
    pub rflags: u32,
    pub attrset: bitmap4,
    pub delegation: open_delegation_type4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct OPEN_CONFIRM4resok {
    pub open_stateid: stateid4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct OPEN_DOWNGRADE4resok {
    pub open_stateid: stateid4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct READ4resok {
    pub eof: bool,
    pub data: Opaque<'static>,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct entry4 {
    pub cookie: nfs_cookie4,
    pub name: component4,
    pub attrs: fattr4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct dirlist4 {
    pub entries: List<entry4>,
    pub eof: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct READDIR4resok {
    pub cookieverf: verifier4,
    pub reply: dirlist4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct READLINK4resok {
    pub link: linktext4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct REMOVE4resok {
    pub cinfo: change_info4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct RENAME4resok {
    pub source_cinfo: change_info4,
    pub target_cinfo: change_info4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct rpcsec_gss_info {
    pub oid: Opaque<'static>,
    pub qop: u32,
    pub service: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub enum secinfo4 {
    #[xdr(0)]
    AUTH_NONE,
    #[xdr(1)]
    AUTH_SYS,
    #[xdr(6)]
    RPCSEC_GSS(rpcsec_gss_info),
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct SECINFO4resok {
    pub flavors: Vec<secinfo4>,
}

/// SETATTR reports the applied attributes even when it fails.
#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct SETATTR4res {
    pub status: nfsstat4,
    pub attrsset: bitmap4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct SETCLIENTID4resok {
    pub clientid: clientid4,
    pub setclientid_confirm: verifier4,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SETCLIENTID4res {
    Ok(SETCLIENTID4resok),
    ClientInUse(clientaddr4),
    Err(nfsstat4),
}

impl SETCLIENTID4res {
    #[must_use]
    pub const fn status(&self) -> nfsstat4 {
        match self {
            Self::Ok(_) => nfsstat4::NFS4_OK,
            Self::ClientInUse(_) => nfsstat4::NFS4ERR_CLID_INUSE,
            Self::Err(status) => *status,
        }
    }
}

impl Pack for SETCLIENTID4res {
    fn packed_size(&self) -> usize {
        4 + match self {
            Self::Ok(resok) => resok.packed_size(),
            Self::ClientInUse(addr) => addr.packed_size(),
            Self::Err(_) => 0,
        }
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        let len = self.status().pack(out)?;
        Ok(len
            + match self {
                Self::Ok(resok) => resok.pack(out)?,
                Self::ClientInUse(addr) => addr.pack(out)?,
                Self::Err(_) => 0,
            })
    }
}

impl Unpack for SETCLIENTID4res {
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let (status, len) = nfsstat4::unpack(input)?;
        match status {
            nfsstat4::NFS4_OK => {
                let (resok, resok_len) = SETCLIENTID4resok::unpack(input)?;
                Ok((Self::Ok(resok), len + resok_len))
            }
            nfsstat4::NFS4ERR_CLID_INUSE => {
                let (addr, addr_len) = clientaddr4::unpack(input)?;
                Ok((Self::ClientInUse(addr), len + addr_len))
            }
            status => Ok((Self::Err(status), len)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct WRITE4resok {
    pub count: count4,
    pub committed: stable_how4,
    pub writeverf: verifier4,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct COMMIT4resok {
    pub writeverf: verifier4,
}

pub type ACCESS4res = Nfs4Result<ACCESS4resok>;
pub type CLOSE4res = Nfs4Result<stateid4>;
pub type COMMIT4res = Nfs4Result<COMMIT4resok>;
pub type CREATE4res = Nfs4Result<CREATE4resok>;
pub type GETATTR4res = Nfs4Result<GETATTR4resok>;
pub type GETFH4res = Nfs4Result<GETFH4resok>;
pub type OPEN4res = Nfs4Result<OPEN4resok>;
pub type OPEN_CONFIRM4res = Nfs4Result<OPEN_CONFIRM4resok>;
pub type OPEN_DOWNGRADE4res = Nfs4Result<OPEN_DOWNGRADE4resok>;
pub type READ4res = Nfs4Result<READ4resok>;
pub type READDIR4res = Nfs4Result<READDIR4resok>;
pub type READLINK4res = Nfs4Result<READLINK4resok>;
pub type REMOVE4res = Nfs4Result<REMOVE4resok>;
pub type RENAME4res = Nfs4Result<RENAME4resok>;
pub type SECINFO4res = Nfs4Result<SECINFO4resok>;
pub type WRITE4res = Nfs4Result<WRITE4resok>;

/// Operations whose result is a bare status carry `nfsstat4` directly. The
/// server never succeeds at LINK, LOCK, LOCKT, LOCKU and OPENATTR, so their
/// success arms are not modelled.
#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub enum nfs_resop4 {
    #[xdr(3)]
    ACCESS(ACCESS4res),
    #[xdr(4)]
    CLOSE(CLOSE4res),
    #[xdr(5)]
    COMMIT(COMMIT4res),
    #[xdr(6)]
    CREATE(CREATE4res),
    #[xdr(7)]
    DELEGPURGE(nfsstat4),
    #[xdr(8)]
    DELEGRETURN(nfsstat4),
    #[xdr(9)]
    GETATTR(GETATTR4res),
    #[xdr(10)]
    GETFH(GETFH4res),
    #[xdr(11)]
    LINK(nfsstat4),
    #[xdr(12)]
    LOCK(nfsstat4),
    #[xdr(13)]
    LOCKT(nfsstat4),
    #[xdr(14)]
    LOCKU(nfsstat4),
    #[xdr(15)]
    LOOKUP(nfsstat4),
    #[xdr(16)]
    LOOKUPP(nfsstat4),
    #[xdr(17)]
    NVERIFY(nfsstat4),
    #[xdr(18)]
    OPEN(OPEN4res),
    #[xdr(19)]
    OPENATTR(nfsstat4),
    #[xdr(20)]
    OPEN_CONFIRM(OPEN_CONFIRM4res),
    #[xdr(21)]
    OPEN_DOWNGRADE(OPEN_DOWNGRADE4res),
    #[xdr(22)]
    PUTFH(nfsstat4),
    #[xdr(23)]
    PUTPUBFH(nfsstat4),
    #[xdr(24)]
    PUTROOTFH(nfsstat4),
    #[xdr(25)]
    READ(READ4res),
    #[xdr(26)]
    READDIR(READDIR4res),
    #[xdr(27)]
    READLINK(READLINK4res),
    #[xdr(28)]
    REMOVE(REMOVE4res),
    #[xdr(29)]
    RENAME(RENAME4res),
    #[xdr(30)]
    RENEW(nfsstat4),
    #[xdr(31)]
    RESTOREFH(nfsstat4),
    #[xdr(32)]
    SAVEFH(nfsstat4),
    #[xdr(33)]
    SECINFO(SECINFO4res),
    #[xdr(34)]
    SETATTR(SETATTR4res),
    #[xdr(35)]
    SETCLIENTID(SETCLIENTID4res),
    #[xdr(36)]
    SETCLIENTID_CONFIRM(nfsstat4),
    #[xdr(37)]
    VERIFY(nfsstat4),
    #[xdr(38)]
    WRITE(WRITE4res),
    #[xdr(39)]
    RELEASE_LOCKOWNER(nfsstat4),
    #[xdr(10044)]
    ILLEGAL(nfsstat4),
}

impl nfs_resop4 {
    /// Status of the operation; the compound stops at the first one that is not OK.
    #[must_use]
    pub const fn status(&self) -> nfsstat4 {
        match self {
            Self::ACCESS(res) => res.status(),
            Self::CLOSE(res) => res.status(),
            Self::COMMIT(res) => res.status(),
            Self::CREATE(res) => res.status(),
            Self::GETATTR(res) => res.status(),
            Self::GETFH(res) => res.status(),
            Self::OPEN(res) => res.status(),
            Self::OPEN_CONFIRM(res) => res.status(),
            Self::OPEN_DOWNGRADE(res) => res.status(),
            Self::READ(res) => res.status(),
            Self::READDIR(res) => res.status(),
            Self::READLINK(res) => res.status(),
            Self::REMOVE(res) => res.status(),
            Self::RENAME(res) => res.status(),
            Self::SECINFO(res) => res.status(),
            Self::WRITE(res) => res.status(),
            Self::SETATTR(res) => res.status,
            Self::SETCLIENTID(res) => res.status(),
            Self::DELEGPURGE(status)
            | Self::DELEGRETURN(status)
            | Self::LINK(status)
            | Self::LOCK(status)
            | Self::LOCKT(status)
            | Self::LOCKU(status)
            | Self::LOOKUP(status)
            | Self::LOOKUPP(status)
            | Self::NVERIFY(status)
            | Self::OPENATTR(status)
            | Self::PUTFH(status)
            | Self::PUTPUBFH(status)
            | Self::PUTROOTFH(status)
            | Self::RENEW(status)
            | Self::RESTOREFH(status)
            | Self::SAVEFH(status)
            | Self::SETCLIENTID_CONFIRM(status)
            | Self::VERIFY(status)
            | Self::RELEASE_LOCKOWNER(status)
            | Self::ILLEGAL(status) => *status,
        }
    }
}

#[derive(Clone, Debug)]
pub struct COMPOUND4args {
    pub tag: utf8str_cs,
    pub minorversion: u32,
    pub argarray: Vec<nfs_argop4>,
}

impl Pack for COMPOUND4args {
    fn packed_size(&self) -> usize {
        self.tag.packed_size() + 4 + self.argarray.packed_size()
    }

    fn pack(&self, out: &mut impl Write) -> Result<usize> {
        Ok(self.tag.pack(out)? + self.minorversion.pack(out)? + self.argarray.pack(out)?)
    }
}

impl Unpack for COMPOUND4args {
    /// Operation numbers outside the NFSv4.0 set become a trailing
    /// [`nfs_argop4::ILLEGAL`]; the rest of the array cannot be interpreted and
    /// is left unread.
    fn unpack(input: &mut impl Read) -> Result<(Self, usize)> {
        let (tag, mut len) = utf8str_cs::unpack(input)?;
        let (minorversion, n) = u32::unpack(input)?;
        len += n;
        let (count, n) = u32::unpack(input)?;
        len += n;

        let mut argarray = Vec::new();
        if minorversion != MINOR_VERSION {
            return Ok((
                Self {
                    tag,
                    minorversion,
                    argarray,
                },
                len,
            ));
        }

        for _ in 0..count {
            let (opnum, n) = u32::unpack(input)?;
            len += n;
            if nfs_opnum4::try_from(opnum).is_err() {
                argarray.push(nfs_argop4::ILLEGAL);
                break;
            }
            // put the operation number back in front of its arguments
            let mut op_input = Cursor::new(opnum.to_be_bytes()).chain(input.by_ref());
            let (op, n) = nfs_argop4::unpack(&mut op_input)?;
            len += n - 4;
            argarray.push(op);
        }

        Ok((
            Self {
                tag,
                minorversion,
                argarray,
            },
            len,
        ))
    }
}

#[derive(Clone, Debug, XdrCodec)]
pub struct COMPOUND4res {
    pub status: nfsstat4,
    pub tag: utf8str_cs,
    pub resarray: Vec<nfs_resop4>,
}
