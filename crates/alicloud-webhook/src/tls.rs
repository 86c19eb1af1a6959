//! This module contains structs and functions to easily create a TLS termination
//! server, which can be used in combination with an Axum [`Router`].
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{Router, extract::Request};
use futures_util::pin_mut;
use hyper::{body::Incoming, service::service_fn};
use hyper_util::rt::{TokioExecutor, TokioIo};
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tokio::net::TcpListener;
use tokio_rustls::{
    TlsAcceptor,
    rustls::{
        ServerConfig,
        crypto::ring::default_provider,
        version::{TLS12, TLS13},
    },
};
use tower::{Service, ServiceExt};
use tracing::{Instrument, instrument};

use crate::options::TlsOption;

pub type Result<T, E = TlsServerError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum TlsServerError {
    #[snafu(display("failed to read file {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse PEM encoded certificate chain"))]
    ParseCertificateChain { source: std::io::Error },

    #[snafu(display("no certificate found in PEM data"))]
    NoCertificate,

    #[snafu(display("failed to parse PEM encoded private key"))]
    ParsePrivateKey { source: std::io::Error },

    #[snafu(display("no private key found in PEM data"))]
    NoPrivateKey,

    #[snafu(display("failed to construct TLS server config, bad certificate/key"))]
    InvalidTlsPrivateKey { source: tokio_rustls::rustls::Error },

    #[snafu(display("failed to set safe TLS protocol versions"))]
    SetSafeTlsProtocolVersions { source: tokio_rustls::rustls::Error },

    #[snafu(display("failed to create TCP listener by binding to socket address {socket_addr:?}"))]
    BindTcpListener {
        source: std::io::Error,
        socket_addr: SocketAddr,
    },
}

/// A server which terminates TLS connections and allows clients to communicate
/// via HTTPS with the underlying HTTP router.
pub struct TlsServer {
    config: Arc<ServerConfig>,
    socket_addr: SocketAddr,
    router: Router,
}

impl TlsServer {
    /// Creates a new TLS server serving `router` on `socket_addr`.
    ///
    /// The certificate chain and private key are read once from the location
    /// described by `tls`. Changes to the files require a restart.
    #[instrument(name = "create_tls_server", skip(router))]
    pub async fn new(socket_addr: SocketAddr, router: Router, tls: &TlsOption) -> Result<Self> {
        let certificate_path = tls.certificate_path();
        let private_key_path = tls.private_key_path();

        let certificate_pem = tokio::fs::read(&certificate_path)
            .await
            .context(ReadFileSnafu {
                path: certificate_path,
            })?;
        let private_key_pem = tokio::fs::read(&private_key_path)
            .await
            .context(ReadFileSnafu {
                path: private_key_path,
            })?;

        let config = server_config(&certificate_pem, &private_key_pem)?;
        tracing::debug!("loaded serving certificate");

        Ok(Self {
            config: Arc::new(config),
            socket_addr,
            router,
        })
    }

    /// Runs the TLS server by listening for incoming TCP connections on the
    /// bound socket address. It only accepts TLS connections. Internally each
    /// TLS stream get handled by a Hyper service, which in turn is an Axum
    /// router.
    pub async fn run(self) -> Result<()> {
        let tls_acceptor = TlsAcceptor::from(self.config);
        let tcp_listener =
            TcpListener::bind(self.socket_addr)
                .await
                .context(BindTcpListenerSnafu {
                    socket_addr: self.socket_addr,
                })?;

        tracing::info!(socket_addr = %self.socket_addr, "webhook server listening");

        // To be able to extract the connect info from incoming requests, it is
        // required to turn the router into a Tower service which is capable of
        // doing that. This service is called after the TCP connection has been
        // accepted.
        let mut router = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        pin_mut!(tcp_listener);
        loop {
            let tls_acceptor = tls_acceptor.clone();

            // Wait for new tcp connection
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok((stream, addr)) => (stream, addr),
                Err(err) => {
                    tracing::trace!(%err, "failed to accept incoming TCP connection");
                    continue;
                }
            };

            // Here, the connect info is extracted by calling Tower's Service
            // trait function on `IntoMakeServiceWithConnectInfo`
            let tower_service = match router.call(remote_addr).await {
                Ok(service) => service,
                Err(infallible) => match infallible {},
            };

            let span = tracing::debug_span!("accept tcp connection", %remote_addr);
            tokio::spawn(
                async move {
                    // Wait for tls handshake to happen
                    let tls_stream = match tls_acceptor.accept(tcp_stream).await {
                        Ok(tls_stream) => tls_stream,
                        Err(err) => {
                            tracing::trace!(%err, %remote_addr, "error during tls handshake connection");
                            return;
                        }
                    };

                    // Hyper has its own `AsyncRead` and `AsyncWrite` traits and doesn't use tokio.
                    // `TokioIo` converts between them.
                    let tls_stream = TokioIo::new(tls_stream);

                    // Hyper also has its own `Service` trait and doesn't use tower. We can use
                    // `hyper::service::service_fn` to create a hyper `Service` that calls our app through
                    // `tower::Service::call`.
                    let hyper_service = service_fn(move |request: Request<Incoming>| {
                        // We need to clone here, because oneshot consumes self
                        tower_service.clone().oneshot(request)
                    });

                    hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection_with_upgrades(tls_stream, hyper_service)
                        .await
                        .unwrap_or_else(|err| {
                            tracing::warn!(%err, %remote_addr, "failed to serve connection");
                        });
                }
                .instrument(span),
            );
        }
    }
}

/// Builds the rustls [`ServerConfig`] from a PEM encoded certificate chain and
/// private key.
///
/// Only TLS 1.2 and 1.3 are offered, ALPN announces HTTP/2 and HTTP/1.1.
pub fn server_config(certificate_pem: &[u8], private_key_pem: &[u8]) -> Result<ServerConfig> {
    let certificate_chain = rustls_pemfile::certs(&mut &*certificate_pem)
        .collect::<Result<Vec<_>, _>>()
        .context(ParseCertificateChainSnafu)?;
    ensure!(!certificate_chain.is_empty(), NoCertificateSnafu);

    let private_key = rustls_pemfile::private_key(&mut &*private_key_pem)
        .context(ParsePrivateKeySnafu)?
        .context(NoPrivateKeySnafu)?;

    let tls_provider = default_provider();
    let mut config = ServerConfig::builder_with_provider(tls_provider.into())
        .with_protocol_versions(&[&TLS12, &TLS13])
        .context(SetSafeTlsProtocolVersionsSnafu)?
        .with_no_client_auth()
        .with_single_cert(certificate_chain, private_key)
        .context(InvalidTlsPrivateKeySnafu)?;

    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}
