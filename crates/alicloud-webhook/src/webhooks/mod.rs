use axum::Router;
pub use validating_webhook::{DecodeReviewError, ValidatingWebhook, decode_request};

mod validating_webhook;

/// A webhook (such as a validating webhook) needs to implement this trait.
pub trait Webhook {
    /// The webhook can add arbitrary routes to the passed [`Router`] and needs to return the
    /// resulting [`Router`].
    fn register_routes(&self, router: Router) -> Router;
}
