//! Contains various constant definitions, mostly for default ports, IP
//! addresses and certificate locations.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// The default HTTPS port `443`
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// The default IP address [`Ipv4Addr::UNSPECIFIED`] (`0.0.0.0`) the webhook server binds to,
/// which represents binding on all network addresses.
pub const DEFAULT_LISTEN_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// The default socket address `0.0.0.0:443` the webhook server binds to.
pub const DEFAULT_SOCKET_ADDRESS: SocketAddr =
    SocketAddr::new(DEFAULT_LISTEN_ADDRESS, DEFAULT_HTTPS_PORT);

/// The directory the serving certificate is mounted to by default.
pub const DEFAULT_CERT_DIR: &str = "/tmp/k8s-webhook-server/serving-certs";

/// The file name of the PEM encoded certificate chain inside the certificate directory.
pub const TLS_CERT_FILE_NAME: &str = "tls.crt";

/// The file name of the PEM encoded private key inside the certificate directory.
pub const TLS_KEY_FILE_NAME: &str = "tls.key";
