//! The parts of the Gardener `Shoot` resource the validator looks at.
//!
//! Only the fields needed for validation are modelled, everything else is
//! ignored during deserialization.
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Specification of a shoot cluster.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, PartialEq, Serialize)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Shoot",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ShootSpec {
    #[serde(default)]
    pub region: String,

    pub provider: Provider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<Networking>,
}

/// The cloud provider specific part of the shoot.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// The provider type, e.g. `alicloud`.
    #[serde(rename = "type")]
    pub type_: String,

    /// Raw, versioned provider document, an `InfrastructureConfig` for Alicloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_config: Option<Value>,

    #[serde(default)]
    pub workers: Vec<Worker>,
}

/// A worker pool of the shoot.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub name: String,

    /// Availability zones the machines of this pool are spread across.
    #[serde(default)]
    pub zones: Vec<String>,
}

/// The CIDRs of the cluster network.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

impl Shoot {
    /// Returns the provider type of this shoot.
    pub fn provider_type(&self) -> &str {
        &self.spec.provider.type_
    }

    /// Returns the nodes CIDR, treating an empty value as unset.
    pub fn nodes_cidr(&self) -> Option<&str> {
        self.networking_field(|networking| networking.nodes.as_deref())
    }

    pub fn pods_cidr(&self) -> Option<&str> {
        self.networking_field(|networking| networking.pods.as_deref())
    }

    pub fn services_cidr(&self) -> Option<&str> {
        self.networking_field(|networking| networking.services.as_deref())
    }

    fn networking_field<'a>(
        &'a self,
        field: impl FnOnce(&'a Networking) -> Option<&'a str>,
    ) -> Option<&'a str> {
        self.spec
            .networking
            .as_ref()
            .and_then(field)
            .filter(|value| !value.is_empty())
    }
}
