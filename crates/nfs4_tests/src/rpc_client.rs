use anyhow::bail;
use nfs4_types::nfs4::{self, COMPOUND4args, COMPOUND4res};
use nfs4_types::rpc::{
    RPC_VERSION_2, accept_stat_data, call_body, fragment_header, msg_body, opaque_auth,
    reply_body, rpc_msg,
};
use nfs4_types::xdr_codec::{Pack, Unpack};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const NFSPROC4_COMPOUND: u32 = 1;

/// Call header of an NFSv4 procedure.
pub fn nfs4_call(xid: u32, proc: u32) -> rpc_msg {
    rpc_msg {
        xid,
        body: msg_body::CALL(call_body {
            rpcvers: RPC_VERSION_2,
            prog: nfs4::PROGRAM,
            vers: nfs4::VERSION,
            proc,
            cred: opaque_auth::default(),
            verf: opaque_auth::default(),
        }),
    }
}

/// Speaks record-marked RPC over the client end of the duplex stream.
pub struct RpcClient {
    stream: DuplexStream,
    next_xid: u32,
}

impl RpcClient {
    pub(crate) const fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            next_xid: 1,
        }
    }

    pub const fn next_xid(&mut self) -> u32 {
        let xid = self.next_xid;
        self.next_xid += 1;
        xid
    }

    /// Sends one COMPOUND and waits for its result.
    pub async fn compound(&mut self, args: COMPOUND4args) -> anyhow::Result<COMPOUND4res> {
        let xid = self.next_xid();
        self.send_call(&nfs4_call(xid, NFSPROC4_COMPOUND), &args)
            .await?;
        let (msg, res) = self.recv_reply::<COMPOUND4res>().await?;
        if msg.xid != xid {
            bail!("XID mismatch: expected {xid}, got {}", msg.xid);
        }
        match res {
            Some(res) => Ok(res),
            None => bail!("COMPOUND was not accepted: {:?}", msg.body),
        }
    }

    pub async fn send_call<T>(&mut self, msg: &rpc_msg, args: &T) -> anyhow::Result<()>
    where
        T: Pack,
    {
        let total_len = msg.packed_size() + args.packed_size();
        if total_len % 4 != 0 {
            bail!("Total length is not a multiple of 4: {total_len}");
        }

        let mut buf = Vec::with_capacity(total_len + 4);
        let Some(header) = fragment_header::new(u32::try_from(total_len)?, true) else {
            bail!("record too large: {total_len}");
        };
        buf.extend_from_slice(&header.into_xdr_buf());
        msg.pack(&mut buf)?;
        args.pack(&mut buf)?;
        if buf.len() - 4 != total_len {
            bail!(
                "Buffer length does not match total length: {} != {total_len}",
                buf.len() - 4
            );
        }
        self.send_raw(&buf).await
    }

    /// Writes bytes as they are, without adding a record mark.
    pub async fn send_raw(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    /// Reads a reply. The result body is decoded only for accepted calls that
    /// succeeded.
    pub async fn recv_reply<T>(&mut self) -> anyhow::Result<(rpc_msg, Option<T>)>
    where
        T: Unpack,
    {
        let mut buf = [0u8; 4];
        self.stream.read_exact(&mut buf).await?;
        let fragment_header = fragment_header::from(buf);
        if !fragment_header.eof() {
            bail!("Fragment header does not have EOF flag");
        }

        let total_len = fragment_header.fragment_length() as usize;
        let mut buf = vec![0u8; total_len];
        self.stream.read_exact(&mut buf).await?;

        let mut cursor = std::io::Cursor::new(buf);
        let (resp_msg, _) = rpc_msg::unpack(&mut cursor)?;

        let reply = match &resp_msg.body {
            msg_body::REPLY(reply_body::MSG_ACCEPTED(reply)) => reply,
            msg_body::REPLY(reply_body::MSG_DENIED(_)) => return Ok((resp_msg, None)),
            msg_body::CALL(_) => bail!("Unexpected call"),
        };
        if reply.reply_data != accept_stat_data::SUCCESS {
            return Ok((resp_msg, None));
        }

        let (final_value, _) = T::unpack(&mut cursor)?;
        let pos = usize::try_from(cursor.position())?;
        if pos != total_len {
            bail!("Cursor position does not match total length: {pos} != {total_len}");
        }
        Ok((resp_msg, Some(final_value)))
    }
}
