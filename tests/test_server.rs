//! End-to-end tests over real TCP sockets.

use lantern::config::Config;
use lantern::http::connection::ConnectionSettings;
use lantern::server::listener::serve;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start_server(dir: &TempDir) -> SocketAddr {
    let mut cfg = Config::default();
    cfg.static_files.root = dir.path().to_path_buf();
    let settings = Arc::new(ConnectionSettings::from_config(&cfg).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, settings));
    addr
}

async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn test_get_file_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), b"hello over tcp").unwrap();
    let addr = start_server(&dir).await;

    let out = exchange(addr, b"GET /hello.txt HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    let out = String::from_utf8(out).unwrap();

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("Content-Length: 14\r\n"));
    assert!(out.ends_with("\r\n\r\nhello over tcp"));
}

#[tokio::test]
async fn test_concurrent_connections_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"aaa").unwrap();
    std::fs::write(dir.path().join("b.txt"), b"bbbb").unwrap();
    let addr = start_server(&dir).await;

    // An idle connection does not hold up the others
    let _idle = TcpStream::connect(addr).await.unwrap();

    let (a, b, missing) = tokio::join!(
        exchange(addr, b"GET /a.txt HTTP/1.1\r\nHost: t\r\nConnection: close\r\n\r\n"),
        exchange(addr, b"GET /b.txt HTTP/1.1\r\nHost: t\r\nConnection: close\r\n\r\n"),
        exchange(addr, b"GET /c.txt HTTP/1.1\r\nHost: t\r\n\r\n"),
    );

    assert!(a.ends_with(b"\r\n\r\naaa"));
    assert!(b.ends_with(b"\r\n\r\nbbbb"));
    assert!(missing.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn test_bad_request_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(&dir).await;

    let out = exchange(addr, b"GET / HTTP/2\r\nHost: test\r\n\r\n").await;
    assert!(out.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
}
