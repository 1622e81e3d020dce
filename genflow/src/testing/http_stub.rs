//! A minimal HTTP server that replays canned responses.

use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A request received by the stub.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedRequest {
    /// Request line and headers.
    pub head: String,
    /// Request body.
    pub body: String,
}

impl CapturedRequest {
    /// Returns the value of header `name`, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// Serves one canned response per connection, in order, then stops.
///
/// Responses carry `Connection: close`, so every client request arrives on
/// its own connection.
#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl StubServer {
    /// Starts a stub answering a single request.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn respond_once(status: u16, body: &str) -> io::Result<Self> {
        Self::respond_sequence(vec![(status, body.to_string())]).await
    }

    /// Starts a stub answering one request per scripted response.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn respond_sequence(responses: Vec<(u16, String)>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            let mut captured = Vec::with_capacity(responses.len());
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                captured.push(read_request(&mut stream).await);
                let reply = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason_phrase(status),
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
            captured
        });

        Ok(Self { addr, handle })
    }

    /// The stub's base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Waits for the scripted responses to be served and returns the requests.
    pub async fn requests(self) -> Vec<CapturedRequest> {
        self.handle.await.unwrap_or_default()
    }

    /// Waits for the first request.
    pub async fn request(self) -> CapturedRequest {
        self.requests().await.into_iter().next().unwrap_or_default()
    }
}

const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

async fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => {
                return CapturedRequest {
                    head: String::from_utf8_lossy(&buf).into_owned(),
                    body: String::new(),
                }
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let partial = CapturedRequest {
        head: head.clone(),
        body: String::new(),
    };
    let content_length: usize = partial
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let body_end = (body_start + content_length).min(buf.len());
    CapturedRequest {
        head,
        body: String::from_utf8_lossy(&buf[body_start..body_end]).into_owned(),
    }
}
