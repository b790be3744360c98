use async_trait::async_trait;
use configuration::ServerSettings;
use core_types::{DateRange, ResultSet, Series};
use database::{DbError, SeriesSource};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use web_server::{router, serve, AppState, ConnectionTimeouts};

struct EmptySource;

#[async_trait]
impl SeriesSource for EmptySource {
    async fn fetch_series(&self, _: Series, _: &DateRange) -> Result<ResultSet, DbError> {
        Ok(ResultSet::new())
    }
}

/// A running server plus the switch that stops it.
struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

async fn start(timeouts: ConnectionTimeouts) -> TestServer {
    let settings = ServerSettings {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 8080,
        cors_origin: "http://localhost:5173".to_string(),
        request_timeout_secs: 30,
        read_timeout_secs: 10,
        idle_timeout_secs: 60,
    };
    let app = router(Arc::new(AppState::new(Arc::new(EmptySource))), &settings).unwrap();

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(serve(listener, app, timeouts, async move {
        let _ = stopped.await;
    }));
    TestServer { addr, stop, task }
}

/// Reads until the server closes the connection, failing if it stays open
/// for longer than `limit`.
async fn read_until_closed(stream: &mut TcpStream, limit: Duration) -> String {
    let mut received = Vec::new();
    match tokio::time::timeout(limit, stream.read_to_end(&mut received)).await {
        // A reset also means the server let go of the socket.
        Ok(_) => String::from_utf8_lossy(&received).into_owned(),
        Err(_) => panic!("connection still open after {limit:?}"),
    }
}

#[tokio::test]
async fn incomplete_request_head_is_dropped_after_the_read_timeout() {
    let server = start(ConnectionTimeouts {
        read: Duration::from_millis(200),
        idle: Duration::from_secs(60),
    })
    .await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    // No blank line: the head never completes.
    stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n").await.unwrap();

    let received = read_until_closed(&mut stream, Duration::from_secs(5)).await;
    assert!(!received.contains("200 OK"));
}

#[tokio::test]
async fn quiet_keep_alive_connection_is_closed_after_the_idle_timeout() {
    let server = start(ConnectionTimeouts {
        read: Duration::from_secs(10),
        idle: Duration::from_millis(300),
    })
    .await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();

    // The response arrives, then the server hangs up on its own.
    let received = read_until_closed(&mut stream, Duration::from_secs(5)).await;
    assert!(received.starts_with("HTTP/1.1 200"), "{received}");
    assert!(received.contains(r#"{"message":"Hello World"}"#), "{received}");
}

#[tokio::test]
async fn keep_alive_connection_serves_several_requests_within_the_idle_window() {
    let server = start(ConnectionTimeouts {
        read: Duration::from_secs(10),
        idle: Duration::from_secs(60),
    })
    .await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    for _ in 0..2 {
        stream
            .write_all(b"GET /api/real-gdp?startDate=2020-01-01&endDate=2020-12-31 HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 1024];
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let response = String::from_utf8_lossy(&buf[..n]);
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    }
}

#[tokio::test]
async fn shutdown_closes_idle_connections_and_returns() {
    let server = start(ConnectionTimeouts {
        read: Duration::from_secs(10),
        idle: Duration::from_secs(60),
    })
    .await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));

    server.stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not drain its connections")
        .unwrap();
    read_until_closed(&mut stream, Duration::from_secs(5)).await;
}
