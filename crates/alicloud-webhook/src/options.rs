//! Contains available options to configure the [WebhookServer][crate::WebhookServer].
use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use crate::constants::{
    DEFAULT_CERT_DIR, DEFAULT_SOCKET_ADDRESS, TLS_CERT_FILE_NAME, TLS_KEY_FILE_NAME,
};

/// Specifies available webhook server options.
///
/// The [`Default`] implementation for this struct contains the following values:
///
/// - The socket binds to 0.0.0.0 on port 443 (HTTPS)
/// - The serving certificate is read from `tls.crt` and `tls.key` inside
///   `/tmp/k8s-webhook-server/serving-certs`.
///
/// ### Example with Custom HTTPS IP Address and Port
///
/// ```
/// use alicloud_webhook::WebhookOptions;
///
/// // Set IP address and port at the same time
/// let options = WebhookOptions::builder()
///     .bind_address([0, 0, 0, 0], 12345)
///     .build();
///
/// // Set IP address only
/// let options = WebhookOptions::builder()
///     .bind_ip([0, 0, 0, 0])
///     .build();
///
/// // Set port only
/// let options = WebhookOptions::builder()
///     .bind_port(12345)
///     .build();
/// ```
#[derive(Debug, Eq, PartialEq)]
pub struct WebhookOptions {
    /// The HTTPS socket address the [`TcpListener`][tokio::net::TcpListener]
    /// binds to.
    pub socket_addr: SocketAddr,

    /// Where to read the serving certificate and its private key from.
    pub tls: TlsOption,
}

impl Default for WebhookOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl WebhookOptions {
    /// Returns the default [`WebhookOptionsBuilder`] which allows to selectively
    /// customize the options. See the documentation for [`WebhookOptions`] for more
    /// information on available functions.
    pub fn builder() -> WebhookOptionsBuilder {
        WebhookOptionsBuilder::default()
    }
}

/// The [`WebhookOptionsBuilder`] which allows to selectively customize the webhook
/// server [`WebhookOptions`].
///
/// Usually, this struct is not constructed manually, but instead by calling
/// [`WebhookOptions::builder()`] or [`WebhookOptionsBuilder::default()`].
#[derive(Debug, Default)]
pub struct WebhookOptionsBuilder {
    socket_addr: Option<SocketAddr>,
    tls: Option<TlsOption>,
}

impl WebhookOptionsBuilder {
    /// Sets the socket address the webhook server uses to bind for HTTPS.
    pub fn bind_address(mut self, bind_ip: impl Into<IpAddr>, bind_port: u16) -> Self {
        self.socket_addr = Some(SocketAddr::new(bind_ip.into(), bind_port));
        self
    }

    /// Sets the IP address of the socket address the webhook server uses to
    /// bind for HTTPS.
    pub fn bind_ip(mut self, bind_ip: impl Into<IpAddr>) -> Self {
        let addr = self.socket_addr.get_or_insert(DEFAULT_SOCKET_ADDRESS);
        addr.set_ip(bind_ip.into());
        self
    }

    /// Sets the port of the socket address the webhook server uses to bind
    /// for HTTPS.
    pub fn bind_port(mut self, bind_port: u16) -> Self {
        let addr = self.socket_addr.get_or_insert(DEFAULT_SOCKET_ADDRESS);
        addr.set_port(bind_port);
        self
    }

    /// Reads `tls.crt` and `tls.key` from `cert_dir`.
    pub fn cert_dir(mut self, cert_dir: impl Into<PathBuf>) -> Self {
        self.tls = Some(TlsOption::CertDir(cert_dir.into()));
        self
    }

    /// Reads the certificate chain and the private key from explicit paths.
    pub fn tls_files(
        mut self,
        certificate_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        self.tls = Some(TlsOption::Files {
            certificate_path: certificate_path.into(),
            private_key_path: private_key_path.into(),
        });
        self
    }

    /// Builds the final [`WebhookOptions`] by using default values for any not
    /// explicitly set option.
    pub fn build(self) -> WebhookOptions {
        WebhookOptions {
            socket_addr: self.socket_addr.unwrap_or(DEFAULT_SOCKET_ADDRESS),
            tls: self.tls.unwrap_or_default(),
        }
    }
}

/// Location of the PEM encoded serving certificate and private key.
///
/// Both are expected to be provisioned from the outside, usually by mounting a
/// secret into the container.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TlsOption {
    /// A directory containing `tls.crt` and `tls.key`.
    CertDir(PathBuf),

    Files {
        certificate_path: PathBuf,
        private_key_path: PathBuf,
    },
}

impl Default for TlsOption {
    fn default() -> Self {
        Self::CertDir(PathBuf::from(DEFAULT_CERT_DIR))
    }
}

impl TlsOption {
    pub fn certificate_path(&self) -> PathBuf {
        match self {
            Self::CertDir(cert_dir) => cert_dir.join(TLS_CERT_FILE_NAME),
            Self::Files {
                certificate_path, ..
            } => certificate_path.clone(),
        }
    }

    pub fn private_key_path(&self) -> PathBuf {
        match self {
            Self::CertDir(cert_dir) => cert_dir.join(TLS_KEY_FILE_NAME),
            Self::Files {
                private_key_path, ..
            } => private_key_path.clone(),
        }
    }

    /// Picks explicit files if both are given, falls back to `cert_dir` (or
    /// the default directory) otherwise.
    pub fn from_parts(
        cert_dir: Option<&Path>,
        certificate_path: Option<&Path>,
        private_key_path: Option<&Path>,
    ) -> Self {
        match (certificate_path, private_key_path) {
            (Some(certificate_path), Some(private_key_path)) => Self::Files {
                certificate_path: certificate_path.to_owned(),
                private_key_path: private_key_path.to_owned(),
            },
            _ => cert_dir.map_or_else(Self::default, |cert_dir| {
                Self::CertDir(cert_dir.to_owned())
            }),
        }
    }
}
