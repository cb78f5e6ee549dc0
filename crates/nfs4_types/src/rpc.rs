#![allow(
    non_camel_case_types,
    clippy::large_enum_variant,
    clippy::upper_case_acronyms
)]

//! This module contains the definitions of the ONC RPC protocol as defined in RFC 5531.

use std::io::{Read, Write};

use nfs4_macros::XdrCodec;

use crate::xdr_codec::{Opaque, Pack, Result, Unpack};

pub const RPC_VERSION_2: u32 = 2;

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum msg_type {
    CALL = 0,
    REPLY = 1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum reply_stat {
    MSG_ACCEPTED = 0,
    MSG_DENIED = 1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum accept_stat {
    SUCCESS = 0,
    PROG_UNAVAIL = 1,
    PROG_MISMATCH = 2,
    PROC_UNAVAIL = 3,
    GARBAGE_ARGS = 4,
    SYSTEM_ERR = 5,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum reject_stat {
    RPC_MISMATCH = 0,
    AUTH_ERROR = 1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum auth_stat {
    AUTH_OK = 0,
    AUTH_BADCRED = 1,
    AUTH_REJECTEDCRED = 2,
    AUTH_BADVERF = 3,
    AUTH_REJECTEDVERF = 4,
    AUTH_TOOWEAK = 5,
    AUTH_INVALIDRESP = 6,
    AUTH_FAILED = 7,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, XdrCodec)]
#[repr(u32)]
pub enum auth_flavor {
    AUTH_NULL = 0,
    AUTH_UNIX = 1,
    AUTH_SHORT = 2,
    AUTH_DES = 3,
    AUTH_KERB = 4,
    RPCSEC_GSS = 6,
}

#[derive(Clone, Debug, PartialEq, Eq, XdrCodec)]
pub struct opaque_auth {
    pub flavor: auth_flavor,
    pub body: Opaque<'static>,
}

impl Default for opaque_auth {
    fn default() -> Self {
        Self {
            flavor: auth_flavor::AUTH_NULL,
            body: Opaque::borrowed(&[]),
        }
    }
}

/// Body of an `AUTH_SYS` (`AUTH_UNIX`) credential.
#[derive(Clone, Debug, Default, XdrCodec)]
pub struct auth_unix {
    pub stamp: u32,
    pub machinename: Opaque<'static>,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct call_body {
    pub rpcvers: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: opaque_auth,
    pub verf: opaque_auth,
}

#[derive(Clone, Debug, XdrCodec)]
pub struct accepted_reply {
    pub verf: opaque_auth,
    pub reply_data: accept_stat_data,
}

/// `accepted_reply.reply_data`. The results of a successful call follow the
/// header and are not part of this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum accept_stat_data {
    SUCCESS,
    PROG_UNAVAIL,
    PROG_MISMATCH { low: u32, high: u32 },
    PROC_UNAVAIL,
    GARBAGE_ARGS,
    SYSTEM_ERR,
}

impl accept_stat_data {
    const fn stat(&self) -> accept_stat {
        match self {
            Self::SUCCESS => accept_stat::SUCCESS,
            Self::PROG_UNAVAIL => accept_stat::PROG_UNAVAIL,
            Self::PROG_MISMATCH { .. } => accept_stat::PROG_MISMATCH,
            Self::PROC_UNAVAIL => accept_stat::PROC_UNAVAIL,
            Self::GARBAGE_ARGS => accept_stat::GARBAGE_ARGS,
            Self::SYSTEM_ERR => accept_stat::SYSTEM_ERR,
        }
    }
}

impl Pack for accept_stat_data {
    fn packed_size(&self) -> usize {
        match self {
            Self::PROG_MISMATCH { .. } => 12,
            _ => 4,
        }
    }

    fn pack(&self, w: &mut impl Write) -> Result<usize> {
        let mut len = self.stat().pack(w)?;
        if let Self::PROG_MISMATCH { low, high } = self {
            len += low.pack(w)? + high.pack(w)?;
        }
        Ok(len)
    }
}

impl Unpack for accept_stat_data {
    fn unpack(r: &mut impl Read) -> Result<(Self, usize)> {
        let (stat, len) = accept_stat::unpack(r)?;
        let data = match stat {
            accept_stat::SUCCESS => Self::SUCCESS,
            accept_stat::PROG_UNAVAIL => Self::PROG_UNAVAIL,
            accept_stat::PROG_MISMATCH => {
                let (low, _) = u32::unpack(r)?;
                let (high, _) = u32::unpack(r)?;
                return Ok((Self::PROG_MISMATCH { low, high }, len + 8));
            }
            accept_stat::PROC_UNAVAIL => Self::PROC_UNAVAIL,
            accept_stat::GARBAGE_ARGS => Self::GARBAGE_ARGS,
            accept_stat::SYSTEM_ERR => Self::SYSTEM_ERR,
        };
        Ok((data, len))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum rejected_reply {
    RPC_MISMATCH { low: u32, high: u32 },
    AUTH_ERROR(auth_stat),
}

impl rejected_reply {
    #[must_use]
    pub const fn rpc_mismatch(low: u32, high: u32) -> Self {
        Self::RPC_MISMATCH { low, high }
    }

    #[must_use]
    pub const fn auth_error(auth_stat: auth_stat) -> Self {
        Self::AUTH_ERROR(auth_stat)
    }
}

impl Pack for rejected_reply {
    fn packed_size(&self) -> usize {
        match self {
            Self::RPC_MISMATCH { .. } => 12,
            Self::AUTH_ERROR(_) => 8,
        }
    }

    fn pack(&self, w: &mut impl Write) -> Result<usize> {
        let len = match self {
            Self::RPC_MISMATCH { low, high } => {
                reject_stat::RPC_MISMATCH.pack(w)? + low.pack(w)? + high.pack(w)?
            }
            Self::AUTH_ERROR(auth_stat) => reject_stat::AUTH_ERROR.pack(w)? + auth_stat.pack(w)?,
        };
        Ok(len)
    }
}

impl Unpack for rejected_reply {
    fn unpack(r: &mut impl Read) -> Result<(Self, usize)> {
        let (reject_stat, len) = reject_stat::unpack(r)?;
        match reject_stat {
            reject_stat::RPC_MISMATCH => {
                let (low, _) = u32::unpack(r)?;
                let (high, _) = u32::unpack(r)?;
                Ok((Self::RPC_MISMATCH { low, high }, len + 8))
            }
            reject_stat::AUTH_ERROR => {
                let (auth_stat, auth_len) = auth_stat::unpack(r)?;
                Ok((Self::AUTH_ERROR(auth_stat), len + auth_len))
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum reply_body {
    MSG_ACCEPTED(accepted_reply),
    MSG_DENIED(rejected_reply),
}

impl Pack for reply_body {
    fn packed_size(&self) -> usize {
        4 + match self {
            Self::MSG_ACCEPTED(accepted) => accepted.packed_size(),
            Self::MSG_DENIED(rejected) => rejected.packed_size(),
        }
    }

    fn pack(&self, w: &mut impl Write) -> Result<usize> {
        let len = match self {
            Self::MSG_ACCEPTED(accepted) => reply_stat::MSG_ACCEPTED.pack(w)? + accepted.pack(w)?,
            Self::MSG_DENIED(rejected) => reply_stat::MSG_DENIED.pack(w)? + rejected.pack(w)?,
        };
        Ok(len)
    }
}

impl Unpack for reply_body {
    fn unpack(r: &mut impl Read) -> Result<(Self, usize)> {
        let (reply_stat, len) = reply_stat::unpack(r)?;
        match reply_stat {
            reply_stat::MSG_ACCEPTED => {
                let (body, body_len) = accepted_reply::unpack(r)?;
                Ok((Self::MSG_ACCEPTED(body), len + body_len))
            }
            reply_stat::MSG_DENIED => {
                let (body, body_len) = rejected_reply::unpack(r)?;
                Ok((Self::MSG_DENIED(body), len + body_len))
            }
        }
    }
}

#[derive(Clone, Debug, XdrCodec)]
pub struct rpc_msg {
    pub xid: u32,
    pub body: msg_body,
}

#[derive(Clone, Debug)]
pub enum msg_body {
    CALL(call_body),
    REPLY(reply_body),
}

impl Pack for msg_body {
    fn packed_size(&self) -> usize {
        4 + match self {
            Self::CALL(call) => call.packed_size(),
            Self::REPLY(reply) => reply.packed_size(),
        }
    }

    fn pack(&self, w: &mut impl Write) -> Result<usize> {
        let len = match self {
            Self::CALL(call) => msg_type::CALL.pack(w)? + call.pack(w)?,
            Self::REPLY(reply) => msg_type::REPLY.pack(w)? + reply.pack(w)?,
        };
        Ok(len)
    }
}

impl Unpack for msg_body {
    fn unpack(r: &mut impl Read) -> Result<(Self, usize)> {
        let (msg_type, len) = msg_type::unpack(r)?;
        match msg_type {
            msg_type::CALL => {
                let (body, body_len) = call_body::unpack(r)?;
                Ok((Self::CALL(body), len + body_len))
            }
            msg_type::REPLY => {
                let (body, body_len) = reply_body::unpack(r)?;
                Ok((Self::REPLY(body), len + body_len))
            }
        }
    }
}

/// Record marking header (RFC 5531 section 11).
///
/// The highest bit flags the last fragment of a record, the remaining 31 bits
/// carry the fragment length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct fragment_header(u32);

impl fragment_header {
    const LAST_FRAGMENT: u32 = 1 << 31;

    /// Largest payload a single fragment can carry.
    pub const MAX_FRAGMENT_LENGTH: u32 = Self::LAST_FRAGMENT - 1;

    /// Returns `None` when `length` does not fit into 31 bits.
    #[must_use]
    pub const fn new(length: u32, last: bool) -> Option<Self> {
        if length > Self::MAX_FRAGMENT_LENGTH {
            return None;
        }
        Some(Self(if last { length | Self::LAST_FRAGMENT } else { length }))
    }

    #[must_use]
    pub const fn eof(self) -> bool {
        self.0 & Self::LAST_FRAGMENT != 0
    }

    #[must_use]
    pub const fn fragment_length(self) -> u32 {
        self.0 & Self::MAX_FRAGMENT_LENGTH
    }

    #[must_use]
    pub const fn into_xdr_buf(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<[u8; 4]> for fragment_header {
    fn from(buf: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(buf))
    }
}
