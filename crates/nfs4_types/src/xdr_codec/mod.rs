//! XDR (RFC 4506) encoding used by the RPC and NFSv4 definitions.
//!
//! Every protocol type implements [`Pack`] and [`Unpack`], usually through the
//! [`XdrCodec`] derive macro. Both traits report the number of bytes they
//! consumed or produced so callers can enforce reply size limits.

pub(crate) mod error;
pub(crate) mod list;
pub(crate) mod opaque;
pub(crate) mod primitives;
pub(crate) mod traits;
pub(crate) mod util;
pub(crate) mod void;

/// Derive macro that implements [`Pack`] and [`Unpack`] traits.
pub use nfs4_macros::XdrCodec;

pub use self::error::Error;
pub use self::list::{BoundedList, List};
pub use self::opaque::Opaque;
pub use self::traits::{Pack, Unpack};
pub use self::util::{add_padding, get_padding};
pub use self::void::Void;

pub type Result<T> = std::result::Result<T, Error>;
