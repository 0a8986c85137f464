//! Health endpoint over a real socket

use std::net::SocketAddr;
use vigil_core::ApiClient;

#[tokio::test]
async fn health_is_read_from_a_bound_server() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let (bound, server) = warp::serve(vigil_cli::server::routes(dir.path().to_path_buf())).bind_ephemeral(addr);
    let task = tokio::spawn(server);

    let client = ApiClient::new(&format!("http://{bound}/")).unwrap();
    let status = client.health().await.unwrap();
    assert!(status.is_ok());
    assert_eq!(status.version, vigil_core::VERSION);

    task.abort();
}
