use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{kind::TypedKind, v1alpha1::API_VERSION};

/// The provider specific configuration of the infrastructure of a shoot.
///
/// It describes the networks which should be used (or created) for the
/// cluster. The document is embedded as `spec.provider.infrastructureConfig`
/// into the shoot resource.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    pub api_version: String,
    pub kind: String,

    /// The networks of the infrastructure.
    pub networks: Networks,
}

impl InfrastructureConfig {
    pub fn new(networks: Networks) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: Self::KIND.to_owned(),
            networks,
        }
    }
}

impl TypedKind for InfrastructureConfig {
    const API_VERSION: &'static str = API_VERSION;
    const KIND: &'static str = "InfrastructureConfig";
}

/// Networks specifies the networks for an infrastructure.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Networks {
    /// Whether to create a new or use an existing VPC.
    pub vpc: Vpc,

    /// The network zones of the infrastructure, one per availability zone.
    #[serde(default)]
    pub zones: Vec<Zone>,
}

/// Selects an existing VPC by its [`id`](Vpc::id) or requests the creation of a
/// new one with the given [`cidr`](Vpc::cidr).
///
/// Exactly one of both fields is expected to be set.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vpc {
    /// The ID of an existing VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The CIDR of a VPC to create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
}

impl Vpc {
    pub fn existing(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            cidr: None,
        }
    }

    pub fn create(cidr: impl Into<String>) -> Self {
        Self {
            id: None,
            cidr: Some(cidr.into()),
        }
    }
}

impl Display for Vpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id.as_deref().unwrap_or("<none>");
        let cidr = self.cidr.as_deref().unwrap_or("<none>");
        write!(f, "{{id: {id}, cidr: {cidr}}}")
    }
}

/// A zone with a name and the CIDR used for the worker nodes in it.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// The name of the availability zone.
    pub name: String,

    /// The worker CIDR of this zone.
    ///
    /// Deprecated, use [`workers`](Zone::workers) instead. If both are set,
    /// they need to be equal and `workers` is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,

    /// The worker CIDR of this zone.
    #[serde(default)]
    pub workers: String,

    /// Configuration of the NAT gateway in this zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_gateway: Option<NatGatewayConfig>,
}

impl Zone {
    pub fn new(name: impl Into<String>, workers: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workers: workers.into(),
            ..Default::default()
        }
    }

    /// Returns the authoritative worker CIDR of this zone.
    ///
    /// The canonical `workers` field wins. The deprecated `worker` field is
    /// only consulted if `workers` is empty. Empty values count as unset.
    pub fn worker_cidr(&self) -> Option<&str> {
        if !self.workers.is_empty() {
            return Some(&self.workers);
        }

        self.worker.as_deref().filter(|worker| !worker.is_empty())
    }
}

/// Configuration of the NAT gateway of a zone.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct NatGatewayConfig {
    /// The ID of an externally allocated elastic IP to bind to the NAT gateway.
    #[serde(
        default,
        rename = "eipAllocationID",
        skip_serializing_if = "Option::is_none"
    )]
    pub eip_allocation_id: Option<String>,
}

/// Information about the infrastructure resources created in the cloud.
///
/// This is written by the provisioning controller, it is never part of an
/// admission decision.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    pub api_version: String,
    pub kind: String,

    pub vpc: VpcStatus,
    pub key_pair_name: String,

    /// All machine images which have been used by this infrastructure.
    ///
    /// Usually, the mapping from name/version to the provider specific image is
    /// part of the controller configuration. A version still in use might get
    /// removed from there, so the used images are remembered here to be able
    /// to keep reconciling existing resources. Entries are only ever added.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImage>,
}

impl InfrastructureStatus {
    pub fn new(vpc: VpcStatus, key_pair_name: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: Self::KIND.to_owned(),
            vpc,
            key_pair_name: key_pair_name.into(),
            machine_images: Vec::new(),
        }
    }

    /// Records that `image` is used by this infrastructure.
    ///
    /// Returns `true` if the image was not known before. An already recorded
    /// name/version pair is left untouched.
    pub fn add_machine_image(&mut self, image: MachineImage) -> bool {
        if self
            .find_machine_image(&image.name, &image.version)
            .is_some()
        {
            return false;
        }

        self.machine_images.push(image);
        true
    }

    pub fn find_machine_image(&self, name: &str, version: &str) -> Option<&MachineImage> {
        self.machine_images
            .iter()
            .find(|image| image.name == name && image.version == version)
    }
}

impl TypedKind for InfrastructureStatus {
    const API_VERSION: &'static str = API_VERSION;
    const KIND: &'static str = "InfrastructureStatus";
}

/// Output information about the VPC.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcStatus {
    /// The ID of the VPC.
    pub id: String,

    #[serde(default)]
    pub vswitches: Vec<VSwitch>,

    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
}

/// The purpose a vswitch or security group was created for.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Purpose {
    Nodes,
    Internal,
}

#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct VSwitch {
    pub purpose: Purpose,
    pub id: String,

    /// The name of the zone the vswitch lives in.
    pub zone: String,
}

#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct SecurityGroup {
    pub purpose: Purpose,
    pub id: String,
}

/// A mapping from a machine image name and version to the provider specific
/// image ID.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct MachineImage {
    pub name: String,
    pub version: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn infrastructure_config() -> InfrastructureConfig {
        InfrastructureConfig::new(Networks {
            vpc: Vpc::create("10.0.0.0/16"),
            zones: vec![
                Zone::new("eu-central-1a", "10.0.1.0/24"),
                Zone {
                    nat_gateway: Some(NatGatewayConfig {
                        eip_allocation_id: Some("eip-123".to_owned()),
                    }),
                    ..Zone::new("eu-central-1b", "10.0.2.0/24")
                },
            ],
        })
    }

    #[test]
    fn config_serializes_with_expected_field_names() {
        let value = serde_json::to_value(infrastructure_config()).unwrap();

        assert_eq!(
            value,
            json!({
                "apiVersion": "alicloud.provider.extensions.gardener.cloud/v1alpha1",
                "kind": "InfrastructureConfig",
                "networks": {
                    "vpc": { "cidr": "10.0.0.0/16" },
                    "zones": [
                        { "name": "eu-central-1a", "workers": "10.0.1.0/24" },
                        {
                            "name": "eu-central-1b",
                            "workers": "10.0.2.0/24",
                            "natGateway": { "eipAllocationID": "eip-123" }
                        }
                    ]
                }
            })
        );
    }

    #[test]
    fn config_survives_serialization() {
        let config = infrastructure_config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: InfrastructureConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn absent_optional_fields_stay_absent() {
        let parsed: Zone = serde_json::from_value(json!({"name": "a", "workers": "10.0.1.0/24"}))
            .unwrap();

        assert_eq!(parsed.worker, None);
        assert_eq!(parsed.nat_gateway, None);
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({"name": "a", "workers": "10.0.1.0/24"})
        );
    }

    #[rstest]
    #[case::canonical_only(Some(""), "10.0.1.0/24", Some("10.0.1.0/24"))]
    #[case::deprecated_only(Some("10.0.2.0/24"), "", Some("10.0.2.0/24"))]
    #[case::canonical_wins(Some("10.0.2.0/24"), "10.0.1.0/24", Some("10.0.1.0/24"))]
    #[case::neither(None, "", None)]
    #[case::empty_deprecated(Some(""), "", None)]
    fn worker_cidr_precedence(
        #[case] worker: Option<&str>,
        #[case] workers: &str,
        #[case] expected: Option<&str>,
    ) {
        let zone = Zone {
            worker: worker.map(ToOwned::to_owned),
            ..Zone::new("a", workers)
        };

        assert_eq!(zone.worker_cidr(), expected);
    }

    #[test]
    fn status_deserializes() {
        let status: InfrastructureStatus = serde_json::from_value(json!({
            "apiVersion": "alicloud.provider.extensions.gardener.cloud/v1alpha1",
            "kind": "InfrastructureStatus",
            "vpc": {
                "id": "vpc-1234",
                "vswitches": [
                    { "purpose": "nodes", "id": "vsw-1", "zone": "eu-central-1a" }
                ],
                "securityGroups": [
                    { "purpose": "internal", "id": "sg-1" }
                ]
            },
            "keyPairName": "shoot--foo--bar-ssh-publickey"
        }))
        .unwrap();

        assert_eq!(status.vpc.vswitches[0].purpose, Purpose::Nodes);
        assert_eq!(status.vpc.security_groups[0].purpose, Purpose::Internal);
        assert!(status.machine_images.is_empty());
        assert!(
            !serde_json::to_value(&status)
                .unwrap()
                .as_object()
                .unwrap()
                .contains_key("machineImages")
        );
    }

    #[test]
    fn machine_images_are_only_appended() {
        let mut status = InfrastructureStatus::new(VpcStatus::default(), "key");
        let image = |version: &str, id: &str| MachineImage {
            name: "coreos".to_owned(),
            version: version.to_owned(),
            id: id.to_owned(),
        };

        assert!(status.add_machine_image(image("2023.4.0", "m-1")));
        assert!(status.add_machine_image(image("2135.6.0", "m-2")));
        assert!(!status.add_machine_image(image("2023.4.0", "m-3")));

        assert_eq!(status.machine_images.len(), 2);
        assert_eq!(
            status.find_machine_image("coreos", "2023.4.0").map(|i| i.id.as_str()),
            Some("m-1")
        );
        assert!(status.find_machine_image("coreos", "1.0.0").is_none());
    }

    #[rstest]
    #[case(Purpose::Nodes, "nodes")]
    #[case(Purpose::Internal, "internal")]
    fn purpose_string_form(#[case] purpose: Purpose, #[case] expected: &str) {
        assert_eq!(purpose.to_string(), expected);
        assert_eq!(expected.parse::<Purpose>().unwrap(), purpose);
    }

    #[test]
    fn vpc_display() {
        assert_eq!(
            Vpc::existing("vpc-1").to_string(),
            "{id: vpc-1, cidr: <none>}"
        );
    }
}
