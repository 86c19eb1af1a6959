use std::{marker::PhantomData, sync::Arc};

use axum::{Json, Router, body::Bytes, routing::post};
use kube::{
    Resource,
    core::admission::{
        AdmissionRequest, AdmissionResponse, AdmissionReview, ConvertAdmissionReviewError,
    },
};
use serde::{Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};

use super::Webhook;

#[derive(Debug, Snafu)]
pub enum DecodeReviewError {
    #[snafu(display("failed to deserialize admission review: {source}"))]
    DeserializeReview { source: serde_json::Error },

    #[snafu(display("admission review does not contain a request"))]
    MissingRequest { source: ConvertAdmissionReviewError },
}

/// Validating webhook, which lets you intercept object creations/modifications and allow or deny
/// the object.
///
/// As the webhook is typed with the Resource type `R`, it can only handle a single resource
/// validation. Use multiple [`ValidatingWebhook`] if you need to validate multiple resource kinds.
///
/// Bodies which can not be decoded into an [`AdmissionReview`] containing a request are answered
/// with an [`AdmissionResponse::invalid`] review, the handler is not called for them.
///
/// ### Example usage
///
/// ```
/// use std::sync::Arc;
///
/// use alicloud_webhook::webhooks::{ValidatingWebhook, Webhook};
/// use axum::Router;
/// use kube::core::{
///     DynamicObject,
///     admission::{AdmissionRequest, AdmissionResponse},
/// };
///
/// async fn handler(_state: Arc<()>, request: AdmissionRequest<DynamicObject>) -> AdmissionResponse {
///     AdmissionResponse::from(&request)
/// }
///
/// let webhook = ValidatingWebhook::new("/validate", handler, Arc::new(()));
/// let router = webhook.register_routes(Router::new());
/// ```
pub struct ValidatingWebhook<H, S, R> {
    http_path: String,
    handler: H,
    handler_state: Arc<S>,
    _resource: PhantomData<R>,
}

impl<H, S, R> ValidatingWebhook<H, S, R> {
    /// Creates a webhook serving `handler` on `POST {http_path}`.
    pub fn new(http_path: impl Into<String>, handler: H, handler_state: Arc<S>) -> Self {
        Self {
            http_path: http_path.into(),
            handler,
            handler_state,
            _resource: PhantomData,
        }
    }

    pub fn http_path(&self) -> &str {
        &self.http_path
    }
}

impl<H, S, R, Fut> Webhook for ValidatingWebhook<H, S, R>
where
    H: Fn(Arc<S>, AdmissionRequest<R>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = AdmissionResponse> + Send + 'static,
    R: Resource + Send + Sync + DeserializeOwned + Serialize + 'static,
    S: Send + Sync + 'static,
{
    fn register_routes(&self, router: Router) -> Router {
        let handler_state = self.handler_state.clone();
        let handler = self.handler.clone();
        let handler_fn = move |body: Bytes| async move {
            let request = match decode_request::<R>(&body) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(error = %err, "received malformed admission review");
                    return Json(AdmissionResponse::invalid(format!("bad request: {err}")).into_review());
                }
            };

            let response = handler(handler_state, request).await;
            Json(response.into_review())
        };

        router.route(&self.http_path, post(handler_fn))
    }
}

/// Decodes a raw request body into the contained [`AdmissionRequest`].
pub fn decode_request<R>(body: &[u8]) -> Result<AdmissionRequest<R>, DecodeReviewError>
where
    R: Resource + DeserializeOwned,
{
    let review: AdmissionReview<R> =
        serde_json::from_slice(body).context(DeserializeReviewSnafu)?;
    review.try_into().context(MissingRequestSnafu)
}
