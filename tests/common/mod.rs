//! Shared utilities for integration testing against mock nodes and signers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Request bodies seen by a mock backend, in arrival order.
pub type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

/// Start a programmable mock backend on an ephemeral port.
///
/// The handler receives the request path and JSON body and returns the
/// status code and raw response body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Recorded)
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let seen = recorded.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let Some((path, body)) = read_request(&mut socket).await else {
                            return;
                        };
                        seen.lock().unwrap().push((path.clone(), body.clone()));

                        let (status, body) = f(path, body).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, recorded)
}

/// Start a mock node answering JSON-RPC by method name.
///
/// `answer` returns the `result` value, or `Err((code, message))` for an
/// error envelope.
pub async fn start_mock_node<F>(answer: F) -> (String, Recorded)
where
    F: Fn(&str, &[Value]) -> Result<Value, (i64, String)> + Send + Sync + 'static,
{
    let answer = Arc::new(answer);
    let (addr, recorded) = start_programmable_backend(move |_path, body| {
        let answer = answer.clone();
        async move {
            let method = body["method"].as_str().unwrap_or_default().to_string();
            let params = body["params"].as_array().cloned().unwrap_or_default();
            let envelope = match answer(method.as_str(), params.as_slice()) {
                Ok(result) => json!({ "jsonrpc": "2.0", "id": "", "result": result }),
                Err((code, message)) => json!({
                    "jsonrpc": "2.0",
                    "id": "",
                    "error": { "code": code, "message": message }
                }),
            };
            (200, envelope.to_string())
        }
    })
    .await;
    (format!("http://{}", addr), recorded)
}

/// Start a mock signing daemon that always answers with `status` and `body`.
#[allow(dead_code)]
pub async fn start_mock_signer(status: u16, body: Value) -> (String, Recorded) {
    let body = body.to_string();
    let (addr, recorded) = start_programmable_backend(move |_path, _req| {
        let body = body.clone();
        async move { (status, body) }
    })
    .await;
    (format!("http://{}", addr), recorded)
}

/// Methods called on a mock node, in order.
pub fn methods(recorded: &Recorded) -> Vec<String> {
    recorded
        .lock()
        .unwrap()
        .iter()
        .map(|(_, body)| body["method"].as_str().unwrap_or_default().to_string())
        .collect()
}

async fn read_request(socket: &mut TcpStream) -> Option<(String, Value)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    Some((path, body))
}
