#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use nfs4_types::nfs4::{
    COMPOUND4args, COMPOUND4res, GETFH4resok, LOOKUP4args, Nfs4Result, READDIR4resok,
    SETCLIENTID4res, SETCLIENTID4resok, change_info4, clientaddr4, dirlist4, entry4, fattr4,
    nfs_argop4, nfs_fh4, nfs_resop4, nfsstat4,
};
use nfs4_types::rpc::{auth_flavor, call_body, msg_body, opaque_auth, rpc_msg};
use nfs4_types::xdr_codec::{List, Opaque, Pack, Unpack};

fn pack<T: Pack>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    let len = value.pack(&mut buf).unwrap();
    assert_eq!(len, value.packed_size());
    assert_eq!(len, buf.len());
    buf
}

#[test]
fn compound_call_decodes() {
    let call = rpc_msg {
        xid: 7,
        body: msg_body::CALL(call_body {
            rpcvers: 2,
            prog: 100_003,
            vers: 4,
            proc: 1,
            cred: opaque_auth::default(),
            verf: opaque_auth::default(),
        }),
    };
    let args = COMPOUND4args {
        tag: Opaque::from(""),
        minorversion: 0,
        argarray: vec![
            nfs_argop4::PUTROOTFH,
            nfs_argop4::LOOKUP(LOOKUP4args {
                objname: Opaque::from("dir"),
            }),
            nfs_argop4::GETFH,
        ],
    };

    let mut buf = pack(&call);
    buf.extend(pack(&args));

    let mut cursor = Cursor::new(buf);
    let (msg, _) = rpc_msg::unpack(&mut cursor).unwrap();
    assert_eq!(msg.xid, 7);
    let msg_body::CALL(body) = msg.body else {
        panic!("expected a call");
    };
    assert_eq!(body.cred.flavor, auth_flavor::AUTH_NULL);

    let (args, _) = COMPOUND4args::unpack(&mut cursor).unwrap();
    assert_eq!(args.argarray.len(), 3);
    let nfs_argop4::LOOKUP(lookup) = &args.argarray[1] else {
        panic!("expected LOOKUP");
    };
    assert_eq!(lookup.objname.as_utf8(), Some("dir"));
}

#[test]
fn minor_version_mismatch_skips_operations() {
    let mut buf = pack(&Opaque::from("t"));
    buf.extend(pack(&1u32));
    buf.extend(pack(&1u32));
    // garbage where the operation should be
    buf.extend([0xff; 3]);

    let (args, _) = COMPOUND4args::unpack(&mut Cursor::new(buf)).unwrap();
    assert_eq!(args.minorversion, 1);
    assert!(args.argarray.is_empty());
}

#[test]
fn compound_reply_layout() {
    let res = COMPOUND4res {
        status: nfsstat4::NFS4ERR_NOENT,
        tag: Opaque::from("ab"),
        resarray: vec![
            nfs_resop4::PUTROOTFH(nfsstat4::NFS4_OK),
            nfs_resop4::LOOKUP(nfsstat4::NFS4ERR_NOENT),
        ],
    };
    let buf = pack(&res);
    assert_eq!(
        buf,
        [
            0, 0, 0, 2, // status
            0, 0, 0, 2, b'a', b'b', 0, 0, // tag
            0, 0, 0, 2, // resarray length
            0, 0, 0, 24, 0, 0, 0, 0, // PUTROOTFH
            0, 0, 0, 15, 0, 0, 0, 2, // LOOKUP
        ]
    );

    let (decoded, len) = COMPOUND4res::unpack(&mut Cursor::new(buf)).unwrap();
    assert_eq!(len, 32);
    assert_eq!(decoded.resarray, res.resarray);
}

#[test]
fn getfh_result_carries_handle() {
    let res = nfs_resop4::GETFH(Nfs4Result::Ok(GETFH4resok {
        object: nfs_fh4 {
            data: Opaque::owned(vec![1; 16]),
        },
    }));
    let buf = pack(&res);
    assert_eq!(buf.len(), 4 + 4 + 4 + 16);
    assert_eq!(buf[8..12], [0, 0, 0, 16]);
    assert_eq!(res.status(), nfsstat4::NFS4_OK);
}

#[test]
fn setclientid_in_use_carries_address() {
    let res = SETCLIENTID4res::ClientInUse(clientaddr4 {
        r_netid: "tcp".to_string(),
        r_addr: "127.0.0.1.8.1".to_string(),
    });
    let buf = pack(&res);
    assert_eq!(buf[..4], [0, 0, 0x27, 0x21]);
    let (decoded, _) = SETCLIENTID4res::unpack(&mut Cursor::new(buf)).unwrap();
    assert_eq!(decoded, res);

    let ok = SETCLIENTID4res::Ok(SETCLIENTID4resok {
        clientid: 0x0102_0304_0506_0708,
        setclientid_confirm: [9; 8],
    });
    assert_eq!(pack(&ok).len(), 4 + 8 + 8);
    assert_eq!(
        pack(&SETCLIENTID4res::Err(nfsstat4::NFS4ERR_SERVERFAULT)),
        [0, 0, 0x27, 0x16]
    );
}

#[test]
fn readdir_entries_are_a_linked_list() {
    let resok = READDIR4resok {
        cookieverf: [0; 8],
        reply: dirlist4 {
            entries: List(vec![entry4 {
                cookie: 3,
                name: Opaque::from("a"),
                attrs: fattr4::default(),
            }]),
            eof: true,
        },
    };
    let buf = pack(&resok);
    // verifier, TRUE, cookie, name, empty bitmap, empty attrs, FALSE, eof
    assert_eq!(buf.len(), 8 + 4 + 8 + 8 + 4 + 4 + 4 + 4);
    assert_eq!(buf[8..12], [0, 0, 0, 1]);
    assert_eq!(buf[buf.len() - 8..], [0, 0, 0, 0, 0, 0, 0, 1]);
}

#[test]
fn change_info_layout() {
    let cinfo = change_info4 {
        atomic: true,
        before: 1,
        after: 2,
    };
    assert_eq!(
        pack(&cinfo),
        [0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2]
    );
}
