use std::io::{Cursor, ErrorKind};
use std::time::Instant;

use anyhow::{anyhow, bail};
use nfs4_types::nfs4;
use nfs4_types::rpc::{
    RPC_VERSION_2, accept_stat_data, auth_flavor, auth_stat, auth_unix, fragment_header,
};
use nfs4_types::xdr_codec::Unpack;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};

use crate::context::RPCContext;
use crate::nfs_handlers;
use crate::transaction_tracker::{TransactionError, TransactionLock};
use crate::units::MEBIBYTE;
use crate::vfs::NfsFileSystem;

pub(crate) mod messages;

use messages::{HandleResult, IncomingRpcMessage};

// Information from RFC 5531
// https://datatracker.ietf.org/doc/html/rfc5531

/// Upper bound for a reassembled record. Large enough for a maximal WRITE.
const MAX_RECORD_SIZE: usize = 4 * MEBIBYTE as usize;

pub(crate) async fn handle_rpc<T: NfsFileSystem>(
    record: Vec<u8>,
    context: &mut RPCContext<T>,
) -> anyhow::Result<HandleResult> {
    let message = IncomingRpcMessage::try_from(record)?;
    let xid = message.xid();
    let call = message.body();

    if call.rpcvers != RPC_VERSION_2 {
        warn!("Invalid RPC version {} != {RPC_VERSION_2}", call.rpcvers);
        return message.into_rpc_mismatch();
    }

    match call.cred.flavor {
        auth_flavor::AUTH_NULL => context.auth = auth_unix::default(),
        auth_flavor::AUTH_UNIX => {
            let parsed = auth_unix::unpack(&mut Cursor::new(call.cred.body.as_ref()));
            match parsed {
                Ok((auth, _)) => {
                    trace!(uid = auth.uid, gid = auth.gid, "AUTH_SYS credential");
                    context.auth = auth;
                }
                Err(err) => {
                    warn!("Malformed AUTH_SYS credential, xid: {xid}: {err}");
                    return message.into_auth_error(auth_stat::AUTH_BADCRED);
                }
            }
        }
        flavor => {
            warn!("Unsupported auth flavor {flavor:?}, xid: {xid}");
            return message.into_auth_error(auth_stat::AUTH_TOOWEAK);
        }
    }

    let _lock = match lock_transaction(context, xid) {
        Ok(lock) => lock,
        Err(TransactionError::Retransmission) => return Ok(HandleResult::NoReply),
        Err(TransactionError::TooManyRequests) => {
            return message.into_error_reply(accept_stat_data::SYSTEM_ERR);
        }
    };

    if call.prog != nfs4::PROGRAM {
        warn!(
            "Unknown RPC Program number {} != {}",
            call.prog,
            nfs4::PROGRAM
        );
        return message.into_error_reply(accept_stat_data::PROG_UNAVAIL);
    }

    nfs_handlers::handle_nfs(message, context).await
}

fn lock_transaction<T>(
    context: &RPCContext<T>,
    xid: u32,
) -> Result<TransactionLock, TransactionError> {
    let transaction =
        context
            .transaction_tracker
            .start_transaction(&context.client_addr, xid, Instant::now());

    match transaction {
        Err(TransactionError::Retransmission) => {
            info!(
                "Retransmission detected, xid: {xid}, client_addr: {}",
                context.client_addr
            );
        }
        Err(TransactionError::TooManyRequests) => {
            warn!(
                "Too many requests, xid: {xid}, client_addr: {}",
                context.client_addr
            );
        }
        Ok(_) => {}
    }
    transaction
}

/// RFC 5531 Section 11
///
/// A record is composed of one or more record fragments. A record fragment
/// is a four-byte header followed by 0 to (2**31) - 1 bytes of fragment
/// data. The highest bit of the header flags the last fragment of the
/// record, the 31 low-order bits carry the length of the fragment data.
async fn read_fragment(
    socket: &mut (impl AsyncRead + Unpin),
    append_to: &mut Vec<u8>,
) -> anyhow::Result<bool> {
    let mut header_buf = [0_u8; 4];
    socket.read_exact(&mut header_buf).await?;
    let fragment_header = fragment_header::from(header_buf);
    let is_last = fragment_header.eof();
    let length = fragment_header.fragment_length() as usize;
    trace!("Reading fragment length:{length}, last:{is_last}");

    let start_offset = append_to.len();
    if start_offset + length > MAX_RECORD_SIZE {
        bail!("RPC record exceeds {MAX_RECORD_SIZE} bytes");
    }
    append_to.resize(start_offset + length, 0);
    socket.read_exact(&mut append_to[start_offset..]).await?;
    Ok(is_last)
}

/// Reads one complete record. Returns `None` when the peer closed the
/// connection between two records.
pub(crate) async fn read_record(
    socket: &mut (impl AsyncRead + Unpin),
) -> anyhow::Result<Option<Vec<u8>>> {
    let mut record = Vec::new();
    let mut first = true;
    loop {
        match read_fragment(socket, &mut record).await {
            Ok(true) => return Ok(Some(record)),
            Ok(false) => first = false,
            Err(err) if first && record.is_empty() && is_eof(&err) => {
                debug!("connection closed by peer");
                return Ok(None);
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_eof(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|err| err.kind() == ErrorKind::UnexpectedEof)
}

/// Writes `buf` as a single last fragment.
pub(crate) async fn write_fragment(
    socket: &mut (impl AsyncWrite + Unpin),
    buf: &[u8],
) -> anyhow::Result<()> {
    let length = u32::try_from(buf.len())
        .ok()
        .and_then(|length| fragment_header::new(length, true))
        .ok_or_else(|| anyhow!("reply of {} bytes does not fit a fragment", buf.len()))?;
    socket.write_all(&length.into_xdr_buf()).await?;
    trace!("Writing fragment length:{}", buf.len());
    socket.write_all(buf).await?;
    socket.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn record_spanning_fragments() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0, 0, 0, 2, 1, 2]).await.unwrap();
        client.write_all(&[0x80, 0, 0, 1, 3]).await.unwrap();
        drop(client);

        assert_eq!(read_record(&mut server).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(read_record(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_record_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0x80, 0, 0, 8, 1, 2]).await.unwrap();
        drop(client);

        assert!(read_record(&mut server).await.is_err());
    }

    #[tokio::test]
    async fn oversized_record_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0xff, 0xff, 0xff, 0xff]).await.unwrap();
        drop(client);

        assert!(read_record(&mut server).await.is_err());
    }

    #[tokio::test]
    async fn reply_is_a_single_last_fragment() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_fragment(&mut server, &[7, 7]).await.unwrap();
        let mut buf = [0; 6];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x80, 0, 0, 2, 7, 7]);
    }
}
