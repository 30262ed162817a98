//! HTTPS listener: rustls configuration from PEM files and a hyper accept loop
//! that hands decrypted connections to the same axum router as plain HTTP.

use axum::extract::Request;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use rustls::ServerConfig;
use rustls_pemfile::{certs, private_key};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tracing::{debug, info, warn};

use crate::core::error::{ProxyError, ProxyResult};

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Build the server TLS configuration from a certificate chain and private key
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> ProxyResult<Arc<ServerConfig>> {
    let cert_file = File::open(cert_path).map_err(|e| {
        ProxyError::config(format!("Failed to open cert file {}: {}", cert_path.display(), e))
    })?;
    let key_file = File::open(key_path).map_err(|e| {
        ProxyError::config(format!("Failed to open key file {}: {}", key_path.display(), e))
    })?;

    let cert_chain: Vec<_> = certs(&mut BufReader::new(cert_file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProxyError::config(format!("Failed to parse certificates: {}", e)))?;

    if cert_chain.is_empty() {
        return Err(ProxyError::config(format!(
            "No certificates found in {}",
            cert_path.display()
        )));
    }

    let private_key = private_key(&mut BufReader::new(key_file))
        .map_err(|e| ProxyError::config(format!("Failed to parse private key: {}", e)))?
        .ok_or_else(|| {
            ProxyError::config(format!("No private key found in {}", key_path.display()))
        })?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| ProxyError::config(format!("Failed to build TLS config: {}", e)))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    info!("TLS configuration loaded from {}", cert_path.display());
    Ok(Arc::new(config))
}

/// Accept TLS connections until the listener fails or the task is dropped
pub async fn serve_tls(listener: TcpListener, config: Arc<ServerConfig>, app: Router) -> ProxyResult<()> {
    let acceptor = TlsAcceptor::from(config);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(connection) => connection,
            Err(err) => {
                warn!(error = %err, "Failed to accept TLS connection");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let tower_service = app.clone();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    debug!(%peer, error = %err, "TLS handshake failed");
                    return;
                }
            };

            let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                tower_service.clone().call(request)
            });

            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), hyper_service)
                .await
            {
                debug!(%peer, error = %err, "TLS connection closed with error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_cert_file() {
        let err = load_tls_config(
            Path::new("./sslcert/does-not-exist.pem"),
            Path::new("./sslcert/privkey.pem"),
        )
        .unwrap_err();

        assert!(matches!(err, ProxyError::Configuration { .. }));
        assert!(err.to_string().contains("does-not-exist.pem"));
    }

    #[test]
    fn test_failed_accept_backs_off() {
        assert!(ACCEPT_RETRY_DELAY >= Duration::from_millis(10));
        assert!(ACCEPT_RETRY_DELAY <= Duration::from_secs(1));
    }

    #[test]
    fn test_empty_cert_file() {
        let mut cert = NamedTempFile::new().unwrap();
        writeln!(cert, "not a certificate").unwrap();
        let key = NamedTempFile::new().unwrap();

        let err = load_tls_config(cert.path(), key.path()).unwrap_err();
        assert!(err.to_string().contains("No certificates found"));
    }
}
