// nfs4_types is reachable through nfs4_server

#[test]
fn test_nfs4_types_reexport_from_server() {
    let _handle = nfs4_server::nfs4_types::nfs4::nfs_fh4::default();
    let _auth = nfs4_server::nfs4_types::rpc::opaque_auth::default();

    let _void = nfs4_server::nfs4_types::xdr_codec::Void;
}
