//! Utility types and functions to easily create ready-to-use admission webhook
//! servers. All webhook servers use HTTPS, the serving certificate is read from
//! PEM files provisioned from the outside. This library is fully compatible
//! with the [`tracing`] crate and emits debug level tracing data.
//!
//! Most users will only use the top-level exported [`WebhookServer`] together
//! with one or more [`webhooks::Webhook`] implementations, for example the
//! [`webhooks::ValidatingWebhook`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use alicloud_webhook::{
//!     WebhookOptions, WebhookServer,
//!     webhooks::{ValidatingWebhook, Webhook},
//! };
//! use kube::core::{
//!     DynamicObject,
//!     admission::{AdmissionRequest, AdmissionResponse},
//! };
//!
//! async fn allow_all(_: Arc<()>, request: AdmissionRequest<DynamicObject>) -> AdmissionResponse {
//!     AdmissionResponse::from(&request)
//! }
//!
//! # async fn run() -> alicloud_webhook::Result<()> {
//! let webhook: Box<dyn Webhook> =
//!     Box::new(ValidatingWebhook::new("/validate", allow_all, Arc::new(())));
//! let server = WebhookServer::new(WebhookOptions::default(), vec![webhook]).await?;
//! server.run().await
//! # }
//! ```
use axum::{Router, routing::get};
use futures_util::{
    FutureExt as _, pin_mut, select,
    future::{Either, select as select_either},
};
use snafu::{ResultExt, Snafu};
use tokio::signal::unix::{SignalKind, signal};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{tls::TlsServer, webhooks::Webhook};

pub mod constants;
pub mod options;
pub mod tls;
pub mod webhooks;

// Selected re-exports
pub use crate::options::{TlsOption, WebhookOptions};

/// A result type alias with the [`WebhookError`] type as the default error type.
pub type Result<T, E = WebhookError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum WebhookError {
    #[snafu(display("failed to create TLS server"))]
    CreateTlsServer { source: tls::TlsServerError },

    #[snafu(display("failed to run TLS server"))]
    RunTlsServer { source: tls::TlsServerError },

    #[snafu(display("failed to register {signal} signal handler"))]
    RegisterSignalHandler {
        source: std::io::Error,
        signal: &'static str,
    },
}

/// A ready-to-use webhook server.
///
/// This server abstracts away lower-level details like TLS termination
/// and other various configurations, validations or middlewares. The routes
/// and their handlers are provided by the registered [`Webhook`]s.
pub struct WebhookServer {
    tls_server: TlsServer,
}

impl WebhookServer {
    /// Creates a new ready-to-use webhook server.
    ///
    /// The server listens on the socket address provided via the [`WebhookOptions`]
    /// and routes requests to the `webhooks`. Additionally, `GET /health`
    /// answers with `ok`.
    ///
    /// To start the server, use the [`WebhookServer::run()`] function. This will
    /// run the server using the Tokio runtime until it is terminated.
    pub async fn new(options: WebhookOptions, webhooks: Vec<Box<dyn Webhook>>) -> Result<Self> {
        tracing::trace!("create new webhook server");

        let router = build_router(&webhooks);

        tracing::debug!("create TLS server");
        let tls_server = TlsServer::new(options.socket_addr, router, &options.tls)
            .await
            .context(CreateTlsServerSnafu)?;

        Ok(Self { tls_server })
    }

    /// Runs the Webhook server and sets up signal handlers for shutting down.
    ///
    /// This does not implement graceful shutdown of the underlying server.
    pub async fn run(self) -> Result<()> {
        let future_server = self.run_server();
        let future_signal = wait_for_shutdown_signal();

        // select requires Future + Unpin
        pin_mut!(future_server);
        pin_mut!(future_signal);

        match select_either(future_server, future_signal).await {
            Either::Left((result, _)) | Either::Right((result, _)) => result,
        }
    }

    /// Runs the webhook server by creating a TCP listener and binding it to
    /// the specified socket address.
    async fn run_server(self) -> Result<()> {
        tracing::debug!("run webhook server");

        self.tls_server.run().await.context(RunTlsServerSnafu)
    }
}

/// Merges the routes of all `webhooks` into a single router.
///
/// Every webhook route is traced, the health route is added below the
/// [`TraceLayer`] so that probes do not flood the logs.
fn build_router(webhooks: &[Box<dyn Webhook>]) -> Router {
    tracing::debug!("create core router and register webhook routes");
    let router = webhooks
        .iter()
        .fold(Router::new(), |router, webhook| webhook.register_routes(router));

    // Use a service builder to provide multiple layers at once. Recommended
    // by the Axum project.
    //
    // See https://docs.rs/axum/latest/axum/middleware/index.html#applying-multiple-middleware
    let service_builder = ServiceBuilder::new().layer(TraceLayer::new_for_http());

    router
        .layer(service_builder)
        .route("/health", get(|| async { "ok" }))
}

async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .context(RegisterSignalHandlerSnafu { signal: "SIGINT" })?;
    let mut sigterm = signal(SignalKind::terminate())
        .context(RegisterSignalHandlerSnafu { signal: "SIGTERM" })?;

    tracing::debug!("created unix signal handlers");

    select! {
        signal = sigint.recv().fuse() => {
            if signal.is_some() {
                tracing::info!("received SIGINT, shutting down");
            }
        },
        signal = sigterm.recv().fuse() => {
            if signal.is_some() {
                tracing::info!("received SIGTERM, shutting down");
            }
        },
    };

    Ok(())
}
