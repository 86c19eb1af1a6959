//! Validating admission webhook for Gardener shoot clusters hosted on
//! Alibaba Cloud.
//!
//! Every `Shoot` created or updated with the `alicloud` provider type is
//! checked before it is persisted: its `InfrastructureConfig` needs to be
//! well-formed, fit into the cluster network and must not change in ways the
//! provisioned cloud resources can not follow.
use std::sync::Arc;

use alicloud_webhook::webhooks::{ValidatingWebhook, Webhook};
use kube::core::DynamicObject;

use crate::validator::{ShootValidator, handle_review};

pub mod cli;
pub mod shoot;
pub mod validator;
pub mod yaml;

/// Name used for the binary and as service name in the logs.
pub const APP_NAME: &str = "gardener-extension-validator-alicloud";

/// The HTTP path shoot admission reviews are posted to.
pub const SHOOT_WEBHOOK_PATH: &str = "/webhooks/validate-shoot-alicloud";

/// Creates the webhook validating shoots on [`SHOOT_WEBHOOK_PATH`].
pub fn shoot_webhook(validator: Arc<ShootValidator>) -> Box<dyn Webhook> {
    Box::new(ValidatingWebhook::<_, _, DynamicObject>::new(
        SHOOT_WEBHOOK_PATH,
        handle_review,
        validator,
    ))
}
