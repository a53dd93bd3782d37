//! Loopback HTTP listener that terminates the OAuth redirect leg.
//!
//! The provider sends the user's browser to `GET /auth?code=...` on a
//! fixed local port. The handler extracts the `code` query parameter
//! (empty string when absent), offers it to the code relay, and answers
//! 200 so the browser tab closes cleanly. It never blocks on the relay.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::relay::CodeSender;

/// Path the provider redirects to.
const CALLBACK_PATH: &str = "/auth";

/// Upper bound on what we read from a callback request.
const MAX_REQUEST_BYTES: usize = 8192;

const RESPONSE_OK: &str = "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
const RESPONSE_NOT_FOUND: &str =
    "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
const RESPONSE_BAD_REQUEST: &str =
    "HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

/// Minimal HTTP server catching the provider's redirect.
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    relay: CodeSender,
}

impl CallbackServer {
    /// Binds the listener on `127.0.0.1:<port>`.
    pub async fn bind(port: u16, relay: CodeSender) -> io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        info!(addr = %listener.local_addr()?, "callback listener bound");
        Ok(Self { listener, relay })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the accept loop and returns the handle used to stop it.
    pub fn spawn(self) -> CallbackHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        CallbackHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "accepted callback connection");
                            let relay = self.relay.clone();
                            connections.spawn(async move {
                                if let Err(e) = handle_connection(stream, relay).await {
                                    warn!(error = %e, "callback connection failed");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept callback connection");
                            // Continue accepting despite errors
                        }
                    }
                }
                _ = shutdown.changed() => {
                    debug!("callback listener shutting down");
                    break;
                }
            }
        }

        // Drain in-flight connections. The owner bounds this via the
        // deadline in `CallbackHandle::stop`.
        while connections.join_next().await.is_some() {}
    }
}

/// Handle to a running [`CallbackServer`].
#[derive(Debug)]
pub struct CallbackHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CallbackHandle {
    /// Stops the listener, draining in-flight connections up to `deadline`.
    ///
    /// Safe to call after the accept loop already exited on its own.
    pub async fn stop(mut self, deadline: Duration) {
        let _ = self.shutdown_tx.send(true);

        if tokio::time::timeout(deadline, &mut self.task).await.is_err() {
            warn!(?deadline, "callback listener did not stop in time, aborting");
            self.task.abort();
        }
    }
}

async fn handle_connection(mut stream: TcpStream, relay: CodeSender) -> io::Result<()> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let response = match parse_request_target(&request) {
        Some(target) => {
            let (route, query) = match target.split_once('?') {
                Some((route, query)) => (route, query),
                None => (target, ""),
            };

            if route == CALLBACK_PATH {
                let code = query_param(query, "code").unwrap_or_default();
                if code.is_empty() {
                    debug!("callback carried no authorization code");
                }
                relay.offer(code);
                RESPONSE_OK
            } else {
                debug!(route, "ignoring request outside the callback path");
                RESPONSE_NOT_FOUND
            }
        }
        None => RESPONSE_BAD_REQUEST,
    };

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Extracts the request target from `GET <target> HTTP/1.1`.
fn parse_request_target(request: &str) -> Option<&str> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;

    if method != "GET" {
        return None;
    }
    Some(target)
}

/// Returns the percent-decoded value of a query parameter, if present.
fn query_param(query: &str, name: &str) -> Option<String> {
    for pair in query.split('&') {
        let mut kv = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (kv.next(), kv.next())
            && key == name
        {
            return Some(urlencoding::decode(value).unwrap_or_default().into_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::relay;

    async fn send_request(addr: SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nhost: localhost\r\n\r\n", target);
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn callback_with_code_reaches_relay() {
        let (tx, mut rx) = relay();
        let server = CallbackServer::bind(0, tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.spawn();

        let response = send_request(addr, "/auth?code=abc123&state=state-token").await;
        assert!(response.starts_with("HTTP/1.1 200"));

        let code = rx.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(code, "abc123");

        handle.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn callback_decodes_percent_encoding() {
        let (tx, mut rx) = relay();
        let server = CallbackServer::bind(0, tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.spawn();

        send_request(addr, "/auth?code=4%2F0Axyz").await;

        let code = rx.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(code, "4/0Axyz");

        handle.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn callback_without_code_forwards_empty_string() {
        let (tx, mut rx) = relay();
        let server = CallbackServer::bind(0, tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.spawn();

        let response = send_request(addr, "/auth").await;
        assert!(response.starts_with("HTTP/1.1 200"));

        let code = rx.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(code, "");

        handle.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn unknown_path_pushes_nothing() {
        let (tx, mut rx) = relay();
        let server = CallbackServer::bind(0, tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.spawn();

        let response = send_request(addr, "/favicon.ico").await;
        assert!(response.starts_with("HTTP/1.1 404"));

        let result = rx.recv_timeout(Duration::from_millis(100)).await;
        assert!(matches!(result, Err(crate::AuthError::RedirectTimeout(_))));

        handle.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn handler_answers_even_without_waiting_consumer() {
        let (tx, rx) = relay();
        let server = CallbackServer::bind(0, tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.spawn();

        // Coordinator long gone; a refreshed browser tab must still get
        // a response instead of hanging the handler.
        drop(rx);
        let response = send_request(addr, "/auth?code=stale").await;
        assert!(response.starts_with("HTTP/1.1 200"));

        handle.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn duplicate_callback_does_not_block_handler() {
        let (tx, mut rx) = relay();
        let server = CallbackServer::bind(0, tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.spawn();

        let first = send_request(addr, "/auth?code=one").await;
        let second = send_request(addr, "/auth?code=two").await;
        assert!(first.starts_with("HTTP/1.1 200"));
        assert!(second.starts_with("HTTP/1.1 200"));

        let code = rx.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(code, "one");

        handle.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn stop_is_bounded() {
        let (tx, _rx) = relay();
        let server = CallbackServer::bind(0, tx).await.unwrap();
        let handle = server.spawn();

        let started = std::time::Instant::now();
        handle.stop(Duration::from_secs(2)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn parse_request_target_rejects_non_get() {
        assert_eq!(
            parse_request_target("GET /auth?code=x HTTP/1.1\r\n"),
            Some("/auth?code=x")
        );
        assert_eq!(parse_request_target("POST /auth HTTP/1.1\r\n"), None);
        assert_eq!(parse_request_target(""), None);
    }

    #[test]
    fn query_param_extraction() {
        assert_eq!(
            query_param("code=abc&state=xyz", "code"),
            Some("abc".to_string())
        );
        assert_eq!(
            query_param("state=xyz&code=abc", "code"),
            Some("abc".to_string())
        );
        assert_eq!(query_param("state=xyz", "code"), None);
        assert_eq!(query_param("", "code"), None);
        assert_eq!(query_param("code=", "code"), Some(String::new()));
    }
}
