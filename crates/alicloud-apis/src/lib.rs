//! Types and validation for the provider specific configuration of Alicloud
//! shoot clusters.
//!
//! The configuration is stored as a raw, versioned document inside the shoot
//! resource. This crate provides:
//!
//! - the versioned schema types in [`v1alpha1`],
//! - decoding of raw documents into typed kinds in [`kind`],
//! - field path aware validation of the infrastructure configuration in
//!   [`validation`],
//! - CIDR helpers used by the validation in [`cidr`].
//!
//! ```
//! use alicloud_apis::{
//!     kind,
//!     v1alpha1::InfrastructureConfig,
//!     validation::infrastructure::{NetworkRanges, validate_infrastructure_config},
//! };
//!
//! let raw = serde_json::json!({
//!     "apiVersion": "alicloud.provider.extensions.gardener.cloud/v1alpha1",
//!     "kind": "InfrastructureConfig",
//!     "networks": {
//!         "vpc": { "cidr": "10.0.0.0/16" },
//!         "zones": [{ "name": "eu-central-1a", "workers": "10.0.1.0/24" }]
//!     }
//! });
//!
//! let config: InfrastructureConfig = kind::decode(raw).unwrap();
//! assert!(validate_infrastructure_config(&config, &NetworkRanges::default()).is_ok());
//! ```
pub mod cidr;
pub mod kind;
pub mod v1alpha1;
pub mod validation;
