//! TLS configuration surface.
//!
//! Plain config values with chainable setters; building the native engine
//! configuration happens in [`crate::TlsContext`], which validates PEM
//! input eagerly.

/// TLS protocol versions the crate can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

/// Client-side TLS configuration.
///
/// Defaults: TLS 1.2 + 1.3, no ALPN, default cipher suites, and the
/// bundled web-PKI trust roots.
#[derive(Debug, Clone)]
pub struct TlsClientConfig {
    pub versions: Vec<TlsVersion>,
    pub alpn: Vec<Vec<u8>>,
    pub compat_ciphers: bool,
    pub extra_roots_pem: Vec<String>,
}

impl Default for TlsClientConfig {
    fn default() -> Self {
        Self {
            versions: vec![TlsVersion::Tls12, TlsVersion::Tls13],
            alpn: Vec::new(),
            compat_ciphers: false,
            extra_roots_pem: Vec::new(),
        }
    }
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the negotiable protocol versions.
    pub fn versions(mut self, versions: &[TlsVersion]) -> Self {
        self.versions = versions.to_vec();
        self
    }

    /// Sets the ALPN protocol list, most preferred first.
    pub fn alpn<I, P>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        self.alpn = protocols.into_iter().map(|p| p.as_ref().to_vec()).collect();
        self
    }

    /// Enables the full cipher-suite list instead of the modern default
    /// set, for peers stuck on older stacks.
    pub fn compat_ciphers(mut self, enable: bool) -> Self {
        self.compat_ciphers = enable;
        self
    }

    /// Adds trust roots from PEM text, on top of the bundled web-PKI
    /// roots.
    pub fn add_root_pem(mut self, pem: &str) -> Self {
        self.extra_roots_pem.push(pem.to_string());
        self
    }
}

/// Server-side TLS configuration.
///
/// The certificate chain and private key are PEM text; both are parsed
/// and validated when the [`crate::TlsContext`] is built.
#[derive(Debug, Clone)]
pub struct TlsServerConfig {
    pub versions: Vec<TlsVersion>,
    pub alpn: Vec<Vec<u8>>,
    pub compat_ciphers: bool,
    pub cert_pem: String,
    pub key_pem: String,
}

impl TlsServerConfig {
    pub fn new(cert_pem: &str, key_pem: &str) -> Self {
        Self {
            versions: vec![TlsVersion::Tls12, TlsVersion::Tls13],
            alpn: Vec::new(),
            compat_ciphers: false,
            cert_pem: cert_pem.to_string(),
            key_pem: key_pem.to_string(),
        }
    }

    pub fn versions(mut self, versions: &[TlsVersion]) -> Self {
        self.versions = versions.to_vec();
        self
    }

    pub fn alpn<I, P>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        self.alpn = protocols.into_iter().map(|p| p.as_ref().to_vec()).collect();
        self
    }

    pub fn compat_ciphers(mut self, enable: bool) -> Self {
        self.compat_ciphers = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_defaults_cover_both_versions() {
        let cfg = TlsClientConfig::default();
        assert_eq!(cfg.versions, vec![TlsVersion::Tls12, TlsVersion::Tls13]);
        assert!(cfg.alpn.is_empty());
        assert!(!cfg.compat_ciphers);
    }

    #[test]
    fn alpn_accepts_mixed_sources() {
        let cfg = TlsClientConfig::new().alpn(["h2", "http/1.1"]);
        assert_eq!(cfg.alpn, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }
}
