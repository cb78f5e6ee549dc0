use std::io::Cursor;

use anyhow::{anyhow, bail};
use nfs4_types::rpc::{
    RPC_VERSION_2, accept_stat_data, accepted_reply, auth_stat, call_body, msg_body, opaque_auth,
    rejected_reply, reply_body, rpc_msg,
};
use nfs4_types::xdr_codec::{Pack, Unpack, Void};

/// A decoded RPC call header together with the raw record it came from.
///
/// The procedure arguments are left encoded; [`IncomingRpcMessage::args`]
/// hands out a reader positioned right after the header.
#[derive(Debug)]
pub struct IncomingRpcMessage {
    xid: u32,
    body: call_body,
    data: Vec<u8>,
    message_start: usize, // offset of the procedure arguments in `data`
}

impl TryFrom<Vec<u8>> for IncomingRpcMessage {
    type Error = anyhow::Error;

    fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
        let (rpc, pos) = match rpc_msg::unpack(&mut Cursor::new(&data)) {
            Ok(ok) => ok,
            Err(err) => bail!("Failed to unpack RPC message: {err}"),
        };

        let xid = rpc.xid;
        let body = match rpc.body {
            msg_body::CALL(call) => call,
            msg_body::REPLY(_) => bail!("Expected a CALL message, got REPLY. XID: {xid}"),
        };

        Ok(Self {
            xid,
            body,
            data,
            message_start: pos,
        })
    }
}

impl IncomingRpcMessage {
    pub const fn xid(&self) -> u32 {
        self.xid
    }

    pub const fn body(&self) -> &call_body {
        &self.body
    }

    /// The encoded procedure arguments.
    pub fn args(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.get(self.message_start..).unwrap_or_default())
    }

    pub fn into_success_reply(self, message: &impl Pack) -> anyhow::Result<HandleResult> {
        let reply = reply_body::MSG_ACCEPTED(accepted_reply {
            verf: opaque_auth::default(),
            reply_data: accept_stat_data::SUCCESS,
        });
        pack(self.xid, reply, message).map(HandleResult::Reply)
    }

    pub fn into_rpc_mismatch(self) -> anyhow::Result<HandleResult> {
        let reply =
            reply_body::MSG_DENIED(rejected_reply::rpc_mismatch(RPC_VERSION_2, RPC_VERSION_2));
        pack(self.xid, reply, &Void).map(HandleResult::Reply)
    }

    pub fn into_auth_error(self, stat: auth_stat) -> anyhow::Result<HandleResult> {
        let reply = reply_body::MSG_DENIED(rejected_reply::auth_error(stat));
        pack(self.xid, reply, &Void).map(HandleResult::Reply)
    }

    pub fn into_error_reply(self, err: accept_stat_data) -> anyhow::Result<HandleResult> {
        let reply = reply_body::MSG_ACCEPTED(accepted_reply {
            verf: opaque_auth::default(),
            reply_data: err,
        });
        pack(self.xid, reply, &Void).map(HandleResult::Reply)
    }
}

/// Outcome of handling one RPC record.
#[derive(Debug)]
pub enum HandleResult {
    Reply(Vec<u8>),
    /// Retransmissions of a request that is in progress or was already
    /// answered get no second reply.
    NoReply,
}

fn pack(xid: u32, reply: reply_body, message: &impl Pack) -> anyhow::Result<Vec<u8>> {
    let rpc = rpc_msg {
        xid,
        body: msg_body::REPLY(reply),
    };
    let size = rpc
        .packed_size()
        .checked_add(message.packed_size())
        .ok_or_else(|| anyhow!("reply size overflow"))?;

    let mut buf = Vec::with_capacity(size);
    rpc.pack(&mut buf)?;
    message.pack(&mut buf)?;
    Ok(buf)
}
