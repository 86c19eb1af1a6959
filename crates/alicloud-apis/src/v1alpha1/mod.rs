//! Version `v1alpha1` of the Alicloud provider configuration.
use const_format::concatcp;

mod infrastructure;

pub use infrastructure::*;

/// The API group of all provider configuration kinds.
pub const GROUP_NAME: &str = "alicloud.provider.extensions.gardener.cloud";

/// The version of the kinds defined in this module.
pub const VERSION: &str = "v1alpha1";

/// The combined `apiVersion` value, `<group>/<version>`.
pub const API_VERSION: &str = concatcp!(GROUP_NAME, "/", VERSION);
