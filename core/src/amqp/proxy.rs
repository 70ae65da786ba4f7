//! HTTP CONNECT tunnelling for AMQP over TLS.

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::common::{SampleError, SampleResult};

const MAX_RESPONSE_HEAD: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

pub fn connect_request(target_host: &str, target_port: u16) -> String {
    format!(
        "CONNECT {target_host}:{target_port} HTTP/1.1\r\n\
         Host: {target_host}:{target_port}\r\n\
         Proxy-Connection: Keep-Alive\r\n\r\n"
    )
}

/// Checks the status line of the proxy's reply to CONNECT.
pub fn check_connect_response(head: &str) -> SampleResult<()> {
    let status_line = head.lines().next().unwrap_or_default();
    let mut parts = status_line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    let status = parts.next().and_then(|s| s.parse::<u16>().ok());

    match status {
        Some(code) if version.starts_with("HTTP/1.") && (200..300).contains(&code) => Ok(()),
        _ => Err(SampleError::ConnectionFailed(format!(
            "Proxy refused tunnel: '{status_line}'"
        ))),
    }
}

/// TCP connection to the proxy with an established CONNECT tunnel to the
/// target.
pub async fn open_tunnel(
    proxy: &ProxyEndpoint,
    target_host: &str,
    target_port: u16,
) -> SampleResult<TcpStream> {
    log::info!("Connecting to proxy {proxy}");
    let mut stream = TcpStream::connect((proxy.host.as_str(), proxy.port))
        .await
        .map_err(|e| SampleError::ConnectionFailed(format!("Proxy {proxy} unreachable: {e}")))?;

    stream
        .write_all(connect_request(target_host, target_port).as_bytes())
        .await?;

    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(SampleError::ConnectionFailed(
                "Proxy response header too large".to_string(),
            ));
        }
        let read = stream.read(&mut byte).await?;
        if read == 0 {
            return Err(SampleError::ConnectionFailed(
                "Proxy closed the connection during CONNECT".to_string(),
            ));
        }
        head.push(byte[0]);
    }

    check_connect_response(&String::from_utf8_lossy(&head))?;
    log::debug!("Tunnel to {target_host}:{target_port} established");
    Ok(stream)
}

fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// CONNECT tunnel followed by a TLS handshake with the target.
pub async fn open_tls_tunnel(
    proxy: &ProxyEndpoint,
    target_host: &str,
    target_port: u16,
) -> SampleResult<TlsStream<TcpStream>> {
    let stream = open_tunnel(proxy, target_host, target_port).await?;
    let server_name = ServerName::try_from(target_host.to_string())
        .map_err(|e| SampleError::Configuration(format!("Invalid host name {target_host}: {e}")))?;
    tls_connector()
        .connect(server_name, stream)
        .await
        .map_err(|e| SampleError::ConnectionFailed(format!("TLS handshake failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    #[test]
    fn formats_connect_request() {
        assert_eq!(
            connect_request("contoso.servicebus.windows.net", 5671),
            "CONNECT contoso.servicebus.windows.net:5671 HTTP/1.1\r\n\
             Host: contoso.servicebus.windows.net:5671\r\n\
             Proxy-Connection: Keep-Alive\r\n\r\n"
        );
    }

    #[test]
    fn accepts_success_status() {
        assert_ok!(check_connect_response(
            "HTTP/1.1 200 Connection established\r\n\r\n"
        ));
        assert_ok!(check_connect_response("HTTP/1.0 200 OK\r\nVia: squid\r\n\r\n"));
    }

    #[test]
    fn rejects_failure_status() {
        let err = assert_err!(check_connect_response(
            "HTTP/1.1 407 Proxy Authentication Required\r\n\r\n"
        ));
        assert!(err.to_string().contains("407"));
        assert_err!(check_connect_response("garbage"));
        assert_err!(check_connect_response(""));
    }

    #[test]
    fn endpoint_display() {
        assert_eq!(ProxyEndpoint::new("127.0.0.1", 3128).to_string(), "127.0.0.1:3128");
    }

    #[tokio::test]
    async fn tunnels_through_a_local_proxy() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let proxy = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            socket
                .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                .await
                .unwrap();
            request
        });

        let endpoint = ProxyEndpoint::new("127.0.0.1", port);
        assert_ok!(open_tunnel(&endpoint, "contoso.servicebus.windows.net", 5671).await);
        let request = proxy.await.unwrap();
        assert!(request.starts_with("CONNECT contoso.servicebus.windows.net:5671 HTTP/1.1"));
    }
}
