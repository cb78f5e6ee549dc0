use nfs4_tests::{TestContext, getattr, lookup, open_create, open_owner, putfh, single_u64};
use nfs4_types::nfs4::{
    CLOSE4args, FATTR4_SIZE, Nfs4Result, OPEN_CONFIRM4args, OPEN4_RESULT_CONFIRM,
    OPEN4_SHARE_ACCESS_READ, OPEN4_SHARE_DENY_NONE, OPEN4args, READ4args, RENEW4args,
    WRITE4args, nfs_argop4, nfs_resop4, nfsstat4, open_claim4, openflag4, stable_how4, stateid4,
};
use nfs4_types::xdr_codec::Opaque;

fn open_stateid(res: &[nfs_resop4]) -> (stateid4, u32) {
    for op in res {
        if let nfs_resop4::OPEN(Nfs4Result::Ok(resok)) = op {
            return (resok.stateid, resok.rflags);
        }
    }
    panic!("no OPEN result in {res:?}");
}

#[tokio::test]
async fn open_write_close() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();
    let clientid = ctx.confirmed_client("open_write_close").await?;

    let res = ctx
        .from_root(vec![open_create(clientid, 1, "new.txt"), nfs_argop4::GETFH])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);
    let (stateid, rflags) = open_stateid(&res.resarray);
    assert_ne!(rflags & OPEN4_RESULT_CONFIRM, 0);
    let Some(nfs_resop4::GETFH(Nfs4Result::Ok(fh))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    let fh = fh.object.clone();

    let confirm = nfs_argop4::OPEN_CONFIRM(OPEN_CONFIRM4args {
        open_stateid: stateid,
        seqid: 2,
    });
    let res = ctx.compound(vec![putfh(&fh), confirm.clone()]).await?;
    let Some(nfs_resop4::OPEN_CONFIRM(Nfs4Result::Ok(confirmed))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    let stateid = confirmed.open_stateid;
    assert_eq!(stateid.seqid, 2);

    // the same seqid again
    let res = ctx.compound(vec![putfh(&fh), confirm]).await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_BAD_SEQID);

    let res = ctx
        .compound(vec![
            putfh(&fh),
            nfs_argop4::WRITE(WRITE4args {
                stateid,
                offset: 0,
                stable: stable_how4::FILE_SYNC4,
                data: Opaque::from("some data"),
            }),
            nfs_argop4::READ(READ4args {
                stateid,
                offset: 5,
                count: 100,
            }),
        ])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);
    let Some(nfs_resop4::WRITE(Nfs4Result::Ok(written))) = res.resarray.get(1) else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_eq!(written.count, 9);
    let Some(nfs_resop4::READ(Nfs4Result::Ok(read))) = res.resarray.get(2) else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_eq!(read.data.as_utf8(), Some("data"));
    assert!(read.eof);

    let res = ctx
        .compound(vec![
            putfh(&fh),
            nfs_argop4::CLOSE(CLOSE4args {
                seqid: 3,
                open_stateid: stateid,
            }),
        ])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);

    // a closed stateid is gone
    let res = ctx
        .compound(vec![
            putfh(&fh),
            nfs_argop4::READ(READ4args {
                stateid,
                offset: 0,
                count: 1,
            }),
        ])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_BAD_STATEID);

    let res = ctx
        .from_root(vec![lookup("new.txt"), getattr(&[FATTR4_SIZE])])
        .await?;
    let Some(nfs_resop4::GETATTR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_eq!(single_u64(&resok.obj_attributes), Some(9));

    ctx.shutdown().await
}

#[tokio::test]
async fn failed_open_consumes_seqid() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();
    let clientid = ctx.confirmed_client("failed_open").await?;

    let res = ctx
        .from_root(vec![open_create(clientid, 1, "another_dir")])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_ISDIR);

    let res = ctx
        .from_root(vec![open_create(clientid, 1, "x.txt")])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_BAD_SEQID);

    let res = ctx
        .from_root(vec![open_create(clientid, 2, "x.txt")])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);

    ctx.shutdown().await
}

#[tokio::test]
async fn open_needs_a_known_client() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let res = ctx
        .from_root(vec![open_create(0x1234, 1, "x.txt")])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_STALE_CLIENTID);

    let res = ctx
        .compound(vec![nfs_argop4::RENEW(RENEW4args { clientid: 0x1234 })])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_STALE_CLIENTID);

    let clientid = ctx.confirmed_client("renewing").await?;
    let res = ctx
        .compound(vec![nfs_argop4::RENEW(RENEW4args { clientid })])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);

    ctx.shutdown().await
}

#[tokio::test]
async fn write_needs_a_write_open() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();
    let clientid = ctx.confirmed_client("read_only_open").await?;

    let res = ctx
        .from_root(vec![nfs_argop4::OPEN(OPEN4args {
            seqid: 1,
            share_access: OPEN4_SHARE_ACCESS_READ,
            share_deny: OPEN4_SHARE_DENY_NONE,
            owner: open_owner(clientid),
            openhow: openflag4::OPEN4_NOCREATE,
            claim: open_claim4::CLAIM_NULL(Opaque::from("a.txt")),
        })])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);
    let (stateid, _) = open_stateid(&res.resarray);

    let fh = ctx.handle("/a.txt").await?;
    let res = ctx
        .compound(vec![
            putfh(&fh),
            nfs_argop4::READ(READ4args {
                stateid,
                offset: 0,
                count: 5,
            }),
            nfs_argop4::WRITE(WRITE4args {
                stateid,
                offset: 0,
                stable: stable_how4::FILE_SYNC4,
                data: Opaque::from("HELLO"),
            }),
        ])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_OPENMODE);
    assert_eq!(res.resarray.len(), 3);

    ctx.shutdown().await
}
