/*
 * http_loopback.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the HTTP client, server, and webhook wiring over
 * loopback sockets. No external network is needed; every test binds an
 * ephemeral port (or a Unix socket in a temp directory).
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use telegrafo_core::protocol::http::codec;
use telegrafo_core::protocol::http::server::HttpServer;
use telegrafo_core::protocol::http::{ClientOptions, HttpClient, Method, ParsedRequest, RequestArg};
use telegrafo_core::{TransportError, Url};

fn echo_handler() -> telegrafo_core::protocol::http::RequestHandler {
    Arc::new(|req: &ParsedRequest| (200, String::from_utf8_lossy(&req.body).into_owned()))
}

async fn start_echo_server() -> (std::net::SocketAddr, telegrafo_core::protocol::http::ServerHandle)
{
    let server = HttpServer::bind_tcp("127.0.0.1", 0, echo_handler())
        .await
        .expect("bind failed");
    let addr = server.local_addr().expect("tcp server has an address");
    let handle = server.handle();
    tokio::spawn(server.serve());
    (addr, handle)
}

#[tokio::test]
async fn client_server_round_trip() {
    let (addr, handle) = start_echo_server().await;
    let client = HttpClient::default();
    let url = Url::parse(&format!("http://127.0.0.1:{}/echo", addr.port())).unwrap();

    let args = vec![
        RequestArg::text("email", "test@example.com"),
        RequestArg::text("text", "Hello, world!"),
    ];
    let response = client
        .request(&url, Method::Post, &args, false, None)
        .await
        .expect("request failed");
    assert_eq!(response.status, 200);
    assert_eq!(
        String::from_utf8(response.body).unwrap(),
        "email=test%40example.com&text=Hello%2C%20world%21"
    );

    // Second request goes through the same pool entry.
    let response = client
        .request(&url, Method::Post, &[RequestArg::text("n", "2")], false, None)
        .await
        .expect("second request failed");
    assert_eq!(String::from_utf8(response.body).unwrap(), "n=2");

    handle.stop();
}

#[tokio::test]
async fn multipart_upload_reaches_server_intact() {
    let (addr, handle) = start_echo_server().await;
    let client = HttpClient::default();
    let url = Url::parse(&format!("http://127.0.0.1:{}/upload", addr.port())).unwrap();

    let args = vec![
        RequestArg::text("chat_id", "42"),
        RequestArg::file("document", b"\x00\x01binary payload\xff".to_vec())
            .with_mime_type("application/octet-stream")
            .with_file_name("blob.bin"),
    ];
    let response = client
        .request(&url, Method::Post, &args, false, None)
        .await
        .expect("upload failed");
    let body = String::from_utf8_lossy(&response.body).into_owned();
    assert!(body.contains("Content-Disposition: form-data; name=\"chat_id\""));
    assert!(body.contains(
        "Content-Disposition: form-data; name=\"document\"; filename=\"blob.bin\""
    ));
    assert!(body.contains("Content-Type: application/octet-stream"));

    handle.stop();
}

#[tokio::test]
async fn garbage_request_gets_400_and_other_connections_survive() {
    let (addr, handle) = start_echo_server().await;

    let mut raw = TcpStream::connect(addr).await.unwrap();
    raw.write_all(b"NONSENSE\r\n\r\n").await.unwrap();
    let mut out = Vec::new();
    raw.read_to_end(&mut out).await.unwrap();
    assert!(String::from_utf8_lossy(&out).starts_with("HTTP/1.1 400 Bad Request\r\n"));

    // The accept loop is unaffected: a well-formed request still works.
    let client = HttpClient::default();
    let url = Url::parse(&format!("http://127.0.0.1:{}/ok", addr.port())).unwrap();
    let response = client
        .request(&url, Method::Post, &[RequestArg::text("a", "b")], false, None)
        .await
        .expect("request after bad peer failed");
    assert_eq!(response.status, 200);

    handle.stop();
}

#[tokio::test]
async fn bind_conflict_is_fatal() {
    let server = HttpServer::bind_tcp("127.0.0.1", 0, echo_handler())
        .await
        .unwrap();
    let port = server.local_addr().unwrap().port();
    let second = HttpServer::bind_tcp("127.0.0.1", port, echo_handler()).await;
    assert!(matches!(second, Err(TransportError::Bind(_))));
}

/// Accepts `count` connections; each one answers a single response and is
/// then dropped, so any pooled reuse of it must fail and retry.
async fn serve_then_drop(listener: TcpListener, count: usize, hits: Arc<AtomicUsize>) {
    for _ in 0..count {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut tmp = [0u8; 4096];
        loop {
            if codec::try_parse_request(&buf).unwrap().is_some() {
                break;
            }
            let n = stream.read(&mut tmp).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&tmp[..n]);
        }
        hits.fetch_add(1, Ordering::SeqCst);
        stream
            .write_all(codec::build_response("pong").as_bytes())
            .await
            .unwrap();
        // Drop closes the socket despite the keep-alive response.
    }
}

#[tokio::test]
async fn stale_pooled_connection_is_retried_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    tokio::spawn(serve_then_drop(listener, 2, hits.clone()));

    let client = HttpClient::default();
    let url = Url::parse(&format!("http://127.0.0.1:{}/", addr.port())).unwrap();

    let first = client
        .request(&url, Method::Post, &[RequestArg::text("n", "1")], false, None)
        .await
        .expect("first request failed");
    assert_eq!(first.body, b"pong");

    // The pooled socket is dead by now; the client must notice and retry
    // on a fresh connection without surfacing an error.
    let second = client
        .request(&url, Method::Post, &[RequestArg::text("n", "2")], false, None)
        .await
        .expect("retry on fresh connection failed");
    assert_eq!(second.body, b"pong");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn read_deadline_surfaces_timeout() {
    // Accepts and then never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(stream);
    });

    let client = HttpClient::new(ClientOptions {
        connect_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_millis(200),
    });
    let url = Url::parse(&format!("http://127.0.0.1:{}/", addr.port())).unwrap();
    let err = client
        .request(&url, Method::Get, &[], false, None)
        .await
        .expect_err("request should time out");
    assert!(matches!(err, TransportError::Timeout));
}

#[tokio::test]
async fn webhook_dispatches_matching_path() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let server = telegrafo_core::webhook::bind_tcp(
        "127.0.0.1",
        0,
        "/hook",
        Arc::new(move |body| sink.lock().unwrap().push(body)),
    )
    .await
    .expect("webhook bind failed");
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    tokio::spawn(server.serve());

    let payload = "{\"update_id\":7}";
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST /hook HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        payload.len(),
        payload
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    assert!(String::from_utf8_lossy(&out).starts_with("HTTP/1.1 200 OK\r\n"));

    // Wrong path is answered 404 and never reaches the callback.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /other HTTP/1.1\r\nConnection: close\r\nContent-Length: 2\r\n\r\nxx")
        .await
        .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    assert!(String::from_utf8_lossy(&out).starts_with("HTTP/1.1 404 Not Found\r\n"));

    let got = seen.lock().unwrap();
    assert_eq!(got.as_slice(), [payload.to_string()]);

    handle.stop();
}

#[cfg(unix)]
#[tokio::test]
async fn webhook_over_local_socket() {
    use tokio::net::UnixStream;

    let socket_path = std::env::temp_dir().join(format!("telegrafo-test-{}.sock", std::process::id()));
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let server = telegrafo_core::webhook::bind_local(
        &socket_path,
        "/hook",
        Arc::new(move |body| sink.lock().unwrap().push(body)),
    )
    .await
    .expect("local webhook bind failed");
    let handle = server.handle();
    tokio::spawn(server.serve());

    let mut stream = UnixStream::connect(&socket_path).await.unwrap();
    stream
        .write_all(b"POST /hook HTTP/1.1\r\nConnection: close\r\nContent-Length: 4\r\n\r\nping")
        .await
        .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    assert!(String::from_utf8_lossy(&out).starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(seen.lock().unwrap().as_slice(), ["ping".to_string()]);

    handle.stop();
    let _ = std::fs::remove_file(&socket_path);
}
