//! The mirror backend driven through COMPOUND requests.

#![allow(clippy::unwrap_used)]

use nfs4_server::nfs4_types::nfs4::{
    CLOSE4args, FATTR4_CHANGE, FATTR4_FILEID, FATTR4_SIZE, FATTR4_TYPE, Nfs4Result,
    OPEN_CONFIRM4args, READ4args, READDIR4args, WRITE4args, bitmap4, nfs_argop4, nfs_fh4,
    nfs_resop4, nfsstat4, stable_how4, stateid4,
};
use nfs4_server::nfs4_types::xdr_codec::Opaque;
use nfs4_tests::{TestContext, getattr, init_logging, lookup, open_create, putfh};
use tempfile::tempdir;

use super::MirrorFs;

const NEW_FILE_CONTENT: &str = "This is a new file created through NFS";

async fn read_file(ctx: &mut TestContext<MirrorFs>, path: &[&str]) -> String {
    let mut ops: Vec<_> = path.iter().map(|name| lookup(name)).collect();
    ops.push(nfs_argop4::READ(READ4args {
        stateid: stateid4::ANONYMOUS,
        offset: 0,
        count: 1024,
    }));
    let res = ctx.from_root(ops).await.unwrap();
    let Some(nfs_resop4::READ(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert!(resok.eof);
    resok.data.as_utf8().unwrap().to_string()
}

async fn root_names(ctx: &mut TestContext<MirrorFs>) -> Vec<String> {
    let res = ctx
        .from_root(vec![nfs_argop4::READDIR(READDIR4args {
            cookie: 0,
            cookieverf: [0; 8],
            dircount: 0,
            maxcount: 8192,
            attr_request: bitmap4::from_attrs(&[FATTR4_TYPE]),
        })])
        .await
        .unwrap();
    let Some(nfs_resop4::READDIR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert!(resok.reply.eof);
    resok
        .reply
        .entries
        .0
        .iter()
        .map(|entry| entry.name.as_utf8().unwrap().to_string())
        .collect()
}

async fn open_and_write(ctx: &mut TestContext<MirrorFs>, name: &str, content: &str) -> nfs_fh4 {
    let clientid = ctx.confirmed_client("mirror").await.unwrap();
    let res = ctx
        .from_root(vec![open_create(clientid, 1, name), nfs_argop4::GETFH])
        .await
        .unwrap();
    let [nfs_resop4::OPEN(Nfs4Result::Ok(opened)), nfs_resop4::GETFH(Nfs4Result::Ok(fh))] =
        res.resarray.as_slice()
    else {
        panic!("unexpected result {:?}", res.resarray);
    };
    let fh = fh.object.clone();

    let res = ctx
        .compound(vec![
            putfh(&fh),
            nfs_argop4::OPEN_CONFIRM(OPEN_CONFIRM4args {
                open_stateid: opened.stateid,
                seqid: 2,
            }),
        ])
        .await
        .unwrap();
    let Some(nfs_resop4::OPEN_CONFIRM(Nfs4Result::Ok(confirmed))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    let stateid = confirmed.open_stateid;

    let res = ctx
        .compound(vec![
            putfh(&fh),
            nfs_argop4::WRITE(WRITE4args {
                stateid,
                offset: 0,
                stable: stable_how4::FILE_SYNC4,
                data: Opaque::from(content),
            }),
            nfs_argop4::CLOSE(CLOSE4args {
                seqid: 3,
                open_stateid: stateid,
            }),
        ])
        .await
        .unwrap();
    assert_eq!(res.status, nfsstat4::NFS4_OK);
    fh
}

#[tokio::test]
async fn serves_a_directory() {
    init_logging(tracing::Level::DEBUG);
    let temp_dir = tempdir().unwrap();
    std::fs::create_dir(temp_dir.path().join("test_dir")).unwrap();
    std::fs::write(
        temp_dir.path().join("test_dir/nested_file.txt"),
        "This is a nested file",
    )
    .unwrap();
    std::fs::write(temp_dir.path().join("test_file.txt"), "This is a test file").unwrap();
    let mut ctx = TestContext::with_vfs(MirrorFs::new(temp_dir.path()));

    assert_eq!(root_names(&mut ctx).await, vec!["test_dir", "test_file.txt"]);
    assert_eq!(read_file(&mut ctx, &["test_file.txt"]).await, "This is a test file");
    assert_eq!(
        read_file(&mut ctx, &["test_dir", "nested_file.txt"]).await,
        "This is a nested file"
    );

    // repeated lookups and attribute reads see the same object
    let handle = ctx.handle("/test_dir/nested_file.txt").await.unwrap();
    assert_eq!(ctx.handle("/test_dir/nested_file.txt").await.unwrap(), handle);
    let attrs = [FATTR4_TYPE, FATTR4_CHANGE, FATTR4_SIZE, FATTR4_FILEID];
    let first = ctx.compound(vec![putfh(&handle), getattr(&attrs)]).await.unwrap();
    let second = ctx.compound(vec![putfh(&handle), getattr(&attrs)]).await.unwrap();
    assert_eq!(first.status, nfsstat4::NFS4_OK);
    assert_eq!(first.resarray, second.resarray);

    open_and_write(&mut ctx, "new_file.txt", NEW_FILE_CONTENT).await;
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("new_file.txt")).unwrap(),
        NEW_FILE_CONTENT
    );
    assert_eq!(
        root_names(&mut ctx).await,
        vec!["new_file.txt", "test_dir", "test_file.txt"]
    );

    ctx.shutdown().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn replaced_file_is_stale() {
    init_logging(tracing::Level::DEBUG);
    let temp_dir = tempdir().unwrap();
    std::fs::write(temp_dir.path().join("file.txt"), "old").unwrap();
    let mut ctx = TestContext::with_vfs(MirrorFs::new(temp_dir.path()));

    let handle = ctx.handle("/file.txt").await.unwrap();
    // keep the old inode alive so the new file cannot reuse its number
    std::fs::rename(temp_dir.path().join("file.txt"), temp_dir.path().join("old.txt")).unwrap();
    std::fs::write(temp_dir.path().join("file.txt"), "new").unwrap();

    let res = ctx
        .compound(vec![putfh(&handle), getattr(&[FATTR4_SIZE])])
        .await
        .unwrap();
    assert_eq!(res.status, nfsstat4::NFS4ERR_STALE);

    ctx.shutdown().await.unwrap();
}
