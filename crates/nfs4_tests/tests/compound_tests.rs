use std::path::Path;

use nfs4_server::memfs::MemFsConfig;
use nfs4_server::vfs::{CreateMode, NfsFileSystem, SetAttributes};
use nfs4_tests::{TestContext, getattr, lookup, putfh, single_u64};
use nfs4_types::nfs4::{
    FATTR4_SIZE, FATTR4_TYPE, Nfs4Result, READ4args, READDIR4args, REMOVE4args, RENAME4args,
    bitmap4, nfs_argop4, nfs_resop4, nfsstat4, stateid4,
};
use nfs4_types::xdr_codec::Opaque;

#[tokio::test]
async fn compound_stops_at_first_error() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let res = ctx
        .compound(vec![
            nfs_argop4::PUTROOTFH,
            lookup("missing.txt"),
            getattr(&[FATTR4_SIZE]),
        ])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_NOENT);
    assert_eq!(res.resarray.len(), 2);
    assert_eq!(res.resarray[0], nfs_resop4::PUTROOTFH(nfsstat4::NFS4_OK));
    assert_eq!(res.resarray[1], nfs_resop4::LOOKUP(nfsstat4::NFS4ERR_NOENT));

    ctx.shutdown().await
}

#[tokio::test]
async fn operations_need_a_filehandle() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let res = ctx.compound(vec![getattr(&[FATTR4_TYPE])]).await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_NOFILEHANDLE);
    assert_eq!(res.resarray.len(), 1);

    ctx.shutdown().await
}

#[tokio::test]
async fn lookup_and_getattr() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let res = ctx
        .from_root(vec![
            lookup("another_dir"),
            lookup("thisworks.txt"),
            getattr(&[FATTR4_SIZE]),
        ])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);
    let Some(nfs_resop4::GETATTR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_eq!(resok.obj_attributes.attrmask, bitmap4::from_attrs(&[FATTR4_SIZE]));
    assert_eq!(single_u64(&resok.obj_attributes), Some(7));

    // LOOKUP of a file below a file
    let res = ctx.from_root(vec![lookup("a.txt"), lookup("x")]).await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_NOTDIR);

    ctx.shutdown().await
}

#[tokio::test]
async fn read_with_anonymous_stateid() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let res = ctx
        .from_root(vec![
            lookup("a.txt"),
            nfs_argop4::READ(READ4args {
                stateid: stateid4::ANONYMOUS,
                offset: 6,
                count: 100,
            }),
        ])
        .await?;
    let Some(nfs_resop4::READ(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_eq!(resok.data.as_utf8(), Some("world\n"));
    assert!(resok.eof);

    let res = ctx
        .from_root(vec![nfs_argop4::READ(READ4args {
            stateid: stateid4::ANONYMOUS,
            offset: 0,
            count: 10,
        })])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_ISDIR);

    ctx.shutdown().await
}

#[tokio::test]
async fn removed_file_handle_is_stale() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let handle = ctx.handle("/b.txt").await?;
    let res = ctx
        .from_root(vec![nfs_argop4::REMOVE(REMOVE4args {
            target: Opaque::from("b.txt"),
        })])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);

    let res = ctx.compound(vec![putfh(&handle)]).await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_STALE);

    let res = ctx
        .compound(vec![putfh(&nfs4_types::nfs4::nfs_fh4 {
            data: Opaque::owned(vec![1, 2, 3]),
        })])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_BADHANDLE);

    ctx.shutdown().await
}

#[tokio::test]
async fn replaced_file_handle_is_stale() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let old = ctx.handle("/a.txt").await?;
    ctx.vfs().remove(Path::new(""), "a.txt").await?;
    ctx.vfs()
        .create(
            Path::new(""),
            "a.txt",
            CreateMode::Guarded,
            SetAttributes::default(),
        )
        .await?;

    let res = ctx.compound(vec![putfh(&old), getattr(&[FATTR4_SIZE])]).await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_STALE);

    // the new file gets a handle of its own
    let new = ctx.handle("/a.txt").await?;
    assert_ne!(new, old);
    let res = ctx.compound(vec![putfh(&new), getattr(&[FATTR4_SIZE])]).await?;
    let Some(nfs_resop4::GETATTR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_eq!(single_u64(&resok.obj_attributes), Some(0));
    let res = ctx.compound(vec![putfh(&old)]).await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_STALE);

    ctx.shutdown().await
}

#[tokio::test]
async fn rename_keeps_handles() -> anyhow::Result<()> {
    let mut ctx = TestContext::setup();

    let handle = ctx.handle("/a.txt").await?;
    let res = ctx
        .from_root(vec![
            nfs_argop4::SAVEFH,
            lookup("another_dir"),
            nfs_argop4::RENAME(RENAME4args {
                oldname: Opaque::from("a.txt"),
                newname: Opaque::from("moved.txt"),
            }),
        ])
        .await?;
    // SAVED_FH is the root, CURRENT_FH the target directory
    assert_eq!(res.status, nfsstat4::NFS4_OK);

    let moved = ctx.handle("/another_dir/moved.txt").await?;
    assert_eq!(moved, handle);
    let res = ctx
        .compound(vec![putfh(&handle), getattr(&[FATTR4_SIZE])])
        .await?;
    let Some(nfs_resop4::GETATTR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_eq!(single_u64(&resok.obj_attributes), Some(12));

    ctx.shutdown().await
}

fn readdir(cookie: u64, cookieverf: [u8; 8], dircount: u32, maxcount: u32) -> nfs_argop4 {
    nfs_argop4::READDIR(READDIR4args {
        cookie,
        cookieverf,
        dircount,
        maxcount,
        attr_request: bitmap4::from_attrs(&[FATTR4_TYPE]),
    })
}

fn big_folder() -> TestContext {
    let mut config = MemFsConfig::default();
    config.add_dir("/big");
    for i in 0..100 {
        config.add_file(&format!("/big/file{i:03}.txt"), i.to_string());
    }
    TestContext::setup_with_config(config, tracing::Level::INFO)
}

#[tokio::test]
async fn readdir_pages_through_a_folder() -> anyhow::Result<()> {
    let mut ctx = big_folder();

    let mut names = Vec::new();
    let mut cookie = 0;
    let mut cookieverf = [0; 8];
    loop {
        let res = ctx
            .from_root(vec![lookup("big"), readdir(cookie, cookieverf, 512, 2048)])
            .await?;
        let Some(nfs_resop4::READDIR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
            panic!("unexpected result {:?}", res.resarray);
        };
        assert!(!resok.reply.entries.0.is_empty());
        for entry in &resok.reply.entries.0 {
            names.push(entry.name.as_utf8().unwrap().to_string());
            cookie = entry.cookie;
        }
        cookieverf = resok.cookieverf;
        if resok.reply.eof {
            break;
        }
    }

    let expected: Vec<_> = (0..100).map(|i| format!("file{i:03}.txt")).collect();
    assert_eq!(names, expected);

    ctx.shutdown().await
}

#[tokio::test]
async fn readdir_reply_too_small() -> anyhow::Result<()> {
    let mut ctx = big_folder();

    let res = ctx
        .from_root(vec![lookup("big"), readdir(0, [0; 8], 0, 16)])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_TOOSMALL);

    ctx.shutdown().await
}

#[tokio::test]
async fn readdir_detects_a_changed_directory() -> anyhow::Result<()> {
    let mut ctx = big_folder();

    let res = ctx
        .from_root(vec![lookup("big"), readdir(0, [0; 8], 0, 1024)])
        .await?;
    let Some(nfs_resop4::READDIR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert!(!resok.reply.eof);
    let cookie = resok.reply.entries.0.last().unwrap().cookie;
    let cookieverf = resok.cookieverf;

    let res = ctx
        .from_root(vec![
            lookup("big"),
            nfs_argop4::REMOVE(REMOVE4args {
                target: Opaque::from("file050.txt"),
            }),
        ])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4_OK);

    let res = ctx
        .from_root(vec![lookup("big"), readdir(cookie, cookieverf, 0, 1024)])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_NOT_SAME);

    let res = ctx
        .from_root(vec![lookup("big"), readdir(0, [0; 8], 0, 1024)])
        .await?;
    let Some(nfs_resop4::READDIR(Nfs4Result::Ok(resok))) = res.resarray.last() else {
        panic!("unexpected result {:?}", res.resarray);
    };
    assert_ne!(resok.cookieverf, cookieverf);

    // reserved cookies
    let res = ctx
        .from_root(vec![lookup("big"), readdir(1, resok.cookieverf, 0, 1024)])
        .await?;
    assert_eq!(res.status, nfsstat4::NFS4ERR_BAD_COOKIE);

    ctx.shutdown().await
}
