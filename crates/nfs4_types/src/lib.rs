//! ONC RPC and NFSv4.0 type definitions together with the XDR codec used to
//! put them on the wire.
//!
//! * [`xdr_codec`] holds the [`Pack`](xdr_codec::Pack) and
//!   [`Unpack`](xdr_codec::Unpack) traits and the `XdrCodec` derive.
//! * [`rpc`] describes RPC call and reply messages (RFC 5531).
//! * [`nfs4`] describes the NFSv4.0 program, its COMPOUND procedure and every
//!   operation argument and result (RFC 7530).

extern crate self as nfs4_types;

pub mod nfs4;
pub mod rpc;
pub mod xdr_codec;
