use std::sync::Arc;

use rustls::pki_types::ServerName;

use super::config::{TlsClientConfig, TlsServerConfig, TlsVersion};
use super::session::TlsSession;
use super::TlsError;

/// Immutable, thread-shareable factory for TLS sessions.
///
/// Owns the native engine configuration (version set, verification mode,
/// trust roots, certificates). Cloning is cheap; one context produces any
/// number of sessions.
#[derive(Clone, Debug)]
pub struct TlsContext {
    inner: Inner,
}

#[derive(Clone, Debug)]
enum Inner {
    Client(Arc<rustls::ClientConfig>),
    Server(Arc<rustls::ServerConfig>),
}

fn protocol_versions(
    versions: &[TlsVersion],
) -> Result<Vec<&'static rustls::SupportedProtocolVersion>, TlsError> {
    if versions.is_empty() {
        return Err(TlsError::EmptyVersionSet);
    }
    Ok(versions
        .iter()
        .map(|v| match v {
            TlsVersion::Tls12 => &rustls::version::TLS12,
            TlsVersion::Tls13 => &rustls::version::TLS13,
        })
        .collect())
}

fn provider(compat_ciphers: bool) -> Arc<rustls::crypto::CryptoProvider> {
    let mut provider = rustls::crypto::ring::default_provider();
    if compat_ciphers {
        provider.cipher_suites = rustls::crypto::ring::ALL_CIPHER_SUITES.to_vec();
    }
    Arc::new(provider)
}

impl TlsContext {
    /// Builds a client context: bundled web-PKI roots plus any PEM
    /// additions from the config. PEM input is validated here, eagerly.
    pub fn client(config: &TlsClientConfig) -> Result<Self, TlsError> {
        let versions = protocol_versions(&config.versions)?;

        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        for pem in &config.extra_roots_pem {
            let mut added = 0;
            for cert in rustls_pemfile::certs(&mut pem.as_bytes()) {
                let cert = cert.map_err(|e| TlsError::InvalidPem {
                    reason: e.to_string(),
                })?;
                roots.add(cert)?;
                added += 1;
            }
            if added == 0 {
                return Err(TlsError::InvalidPem {
                    reason: "no certificates found in added root".to_string(),
                });
            }
        }

        let mut native = rustls::ClientConfig::builder_with_provider(provider(
            config.compat_ciphers,
        ))
        .with_protocol_versions(&versions)?
        .with_root_certificates(roots)
        .with_no_client_auth();
        native.alpn_protocols = config.alpn.clone();

        tracing::debug!(
            versions = ?config.versions,
            alpn = config.alpn.len(),
            "built tls client context"
        );
        Ok(Self {
            inner: Inner::Client(Arc::new(native)),
        })
    }

    /// Builds a server context from a PEM certificate chain and key.
    pub fn server(config: &TlsServerConfig) -> Result<Self, TlsError> {
        let versions = protocol_versions(&config.versions)?;

        let certs = rustls_pemfile::certs(&mut config.cert_pem.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::InvalidPem {
                reason: e.to_string(),
            })?;
        if certs.is_empty() {
            return Err(TlsError::InvalidPem {
                reason: "no certificates found in chain".to_string(),
            });
        }
        let key = rustls_pemfile::private_key(&mut config.key_pem.as_bytes())
            .map_err(|e| TlsError::InvalidPem {
                reason: e.to_string(),
            })?
            .ok_or_else(|| TlsError::InvalidPem {
                reason: "no private key found".to_string(),
            })?;

        let mut native = rustls::ServerConfig::builder_with_provider(provider(
            config.compat_ciphers,
        ))
        .with_protocol_versions(&versions)?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
        native.alpn_protocols = config.alpn.clone();

        tracing::debug!(
            versions = ?config.versions,
            alpn = config.alpn.len(),
            "built tls server context"
        );
        Ok(Self {
            inner: Inner::Server(Arc::new(native)),
        })
    }

    /// Opens a client session toward `server_name` (a DNS name or an IP
    /// literal — the name the peer's certificate must match).
    pub fn client_session(&self, server_name: &str) -> Result<TlsSession, TlsError> {
        let Inner::Client(config) = &self.inner else {
            return Err(TlsError::RoleMismatch);
        };
        let name =
            ServerName::try_from(server_name.to_string()).map_err(|_| TlsError::InvalidServerName {
                name: server_name.to_string(),
            })?;
        let conn = rustls::ClientConnection::new(config.clone(), name)?;
        Ok(TlsSession::new(rustls::Connection::Client(conn)))
    }

    /// Opens a server session.
    pub fn server_session(&self) -> Result<TlsSession, TlsError> {
        let Inner::Server(config) = &self.inner else {
            return Err(TlsError::RoleMismatch);
        };
        let conn = rustls::ServerConnection::new(config.clone())?;
        Ok(TlsSession::new(rustls::Connection::Server(conn)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_context_builds_with_defaults() {
        let ctx = TlsContext::client(&TlsClientConfig::default()).unwrap();
        assert!(ctx.client_session("example.com").is_ok());
    }

    #[test]
    fn client_context_rejects_garbage_roots() {
        let config = TlsClientConfig::new().add_root_pem("not pem at all");
        let err = TlsContext::client(&config).unwrap_err();
        assert!(matches!(err, TlsError::InvalidPem { .. }));
    }

    #[test]
    fn empty_version_set_is_rejected() {
        let config = TlsClientConfig::new().versions(&[]);
        let err = TlsContext::client(&config).unwrap_err();
        assert!(matches!(err, TlsError::EmptyVersionSet));
    }

    #[test]
    fn server_session_on_client_context_is_a_role_mismatch() {
        let ctx = TlsContext::client(&TlsClientConfig::default()).unwrap();
        assert!(matches!(ctx.server_session(), Err(TlsError::RoleMismatch)));
    }

    #[test]
    fn invalid_server_name_is_rejected() {
        let ctx = TlsContext::client(&TlsClientConfig::default()).unwrap();
        let err = ctx.client_session("bad name with spaces").unwrap_err();
        assert!(matches!(err, TlsError::InvalidServerName { .. }));
    }
}
