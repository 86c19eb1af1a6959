//! Admission of [`Shoot`]s using Alicloud as their provider.
use std::{
    any::Any,
    collections::HashSet,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use alicloud_apis::{
    kind::{self, DecodeError},
    v1alpha1::InfrastructureConfig,
    validation::{
        self, Error as FieldError, Errors, Path,
        infrastructure::{
            NetworkRanges, validate_infrastructure_config, validate_infrastructure_config_update,
        },
        into_result, merge,
    },
};
use kube::{
    Resource,
    core::{
        DynamicObject,
        admission::{AdmissionRequest, AdmissionResponse, Operation},
    },
};
use snafu::{ResultExt, Snafu};

use crate::shoot::{Shoot, Worker};

/// The provider type of shoots handled by default.
pub const DEFAULT_PROVIDER_TYPE: &str = "alicloud";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to decode spec.provider.infrastructureConfig: {source}"))]
    DecodeInfrastructureConfig { source: DecodeError },

    #[snafu(display("failed to decode the previous spec.provider.infrastructureConfig: {source}"))]
    DecodeOldInfrastructureConfig { source: DecodeError },

    #[snafu(display("{source}"))]
    InvalidShoot { source: Errors },
}

/// The outcome of validating a single admission request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    Allowed { message: String },
    Denied { reason: String },
}

impl Decision {
    pub fn allowed(message: impl Into<String>) -> Self {
        Self::Allowed {
            message: message.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatorOptions {
    /// Shoots with any other provider type are admitted without checks.
    pub provider_type: String,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            provider_type: DEFAULT_PROVIDER_TYPE.to_owned(),
        }
    }
}

/// Validates creations and updates of Alicloud [`Shoot`]s.
///
/// The validator holds no mutable state and can be shared between any
/// number of concurrent requests.
#[derive(Debug, Default)]
pub struct ShootValidator {
    options: ValidatorOptions,
}

impl ShootValidator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    /// Answers a single admission request.
    ///
    /// The request is never rejected with an HTTP error: malformed objects
    /// and even panics during validation end up as a denied response.
    #[tracing::instrument(
        skip_all,
        fields(
            uid = %request.uid,
            operation = ?request.operation,
            name = %request.name,
            namespace = request.namespace.as_deref(),
        )
    )]
    pub fn review(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let response = AdmissionResponse::from(request);

        match catch_panics(|| self.review_request(request)) {
            Decision::Allowed { message } => {
                tracing::debug!(detail = %message, "admission request allowed");
                response
            }
            Decision::Denied { reason } => {
                tracing::info!(%reason, "admission request denied");
                response.deny(reason)
            }
        }
    }

    fn review_request(&self, request: &AdmissionRequest<DynamicObject>) -> Decision {
        if matches!(request.operation, Operation::Delete | Operation::Connect) {
            return Decision::allowed("operation is not validated");
        }

        let expected_group = Shoot::group(&());
        let expected_kind = Shoot::kind(&());
        if request.kind.group != expected_group || request.kind.kind != expected_kind {
            return Decision::denied(format!(
                "wrong object kind, expected {expected_group}/{expected_kind}, got {}/{}",
                request.kind.group, request.kind.kind
            ));
        }

        let Some(object) = &request.object else {
            return Decision::denied("bad request: object is missing");
        };
        let new = match parse_shoot(object) {
            Ok(shoot) => shoot,
            Err(err) => return Decision::denied(format!("bad request: failed to decode shoot: {err}")),
        };

        let old = match (&request.operation, &request.old_object) {
            (Operation::Update, None) => {
                return Decision::denied("bad request: old object is missing on update");
            }
            (Operation::Update, Some(old_object)) => match parse_shoot(old_object) {
                Ok(shoot) => Some(shoot),
                Err(err) => {
                    return Decision::denied(format!(
                        "bad request: failed to decode old shoot: {err}"
                    ));
                }
            },
            _ => None,
        };

        self.validate(&new, old.as_ref())
    }

    /// Validates the `new` shoot, and on updates the transition from `old`.
    pub fn validate(&self, new: &Shoot, old: Option<&Shoot>) -> Decision {
        if !self.is_responsible(new) {
            return Decision::allowed(format!(
                "provider type {:?} is not handled",
                new.provider_type()
            ));
        }

        match self.validate_shoot(new, old) {
            Ok(()) => Decision::allowed("shoot is valid"),
            Err(err) => Decision::denied(err.to_string()),
        }
    }

    fn validate_shoot(&self, new: &Shoot, old: Option<&Shoot>) -> Result<(), Error> {
        let provider_path = Path::new("spec").child("provider");
        let Some(raw_config) = &new.spec.provider.infrastructure_config else {
            return Err(Error::InvalidShoot {
                source: FieldError::required(
                    provider_path.child("infrastructureConfig"),
                    "infrastructure config must be set for alicloud shoots",
                )
                .into(),
            });
        };
        let config: InfrastructureConfig =
            kind::decode(raw_config.clone()).context(DecodeInfrastructureConfigSnafu)?;

        let mut results = Vec::new();

        let nodes = new.nodes_cidr();
        if nodes.is_none() {
            results.push(Err(FieldError::required(
                Path::new("spec").child("networking").child("nodes"),
                "a nodes CIDR must be provided for alicloud shoots",
            )
            .into()));
        }

        let ranges = NetworkRanges {
            nodes,
            pods: new.pods_cidr(),
            services: new.services_cidr(),
        };
        results.push(validate_infrastructure_config(&config, &ranges));
        results.push(validate_worker_zones(
            &new.spec.provider.workers,
            &config,
            &provider_path.child("workers"),
        ));

        // A shoot migrating from another provider has no previous config to compare with.
        if let Some(old) = old.filter(|old| self.is_responsible(old))
            && let Some(old_raw_config) = &old.spec.provider.infrastructure_config
        {
            let old_config: InfrastructureConfig =
                kind::decode(old_raw_config.clone()).context(DecodeOldInfrastructureConfigSnafu)?;
            results.push(validate_infrastructure_config_update(&old_config, &config));
        }

        merge(results).context(InvalidShootSnafu)
    }

    fn is_responsible(&self, shoot: &Shoot) -> bool {
        shoot.provider_type() == self.options.provider_type
    }
}

/// Checks that every worker pool names at least one zone and only zones
/// configured in the infrastructure.
fn validate_worker_zones(
    workers: &[Worker],
    config: &InfrastructureConfig,
    path: &Path,
) -> validation::Result {
    let known_zones: HashSet<&str> = config
        .networks
        .zones
        .iter()
        .map(|zone| zone.name.as_str())
        .collect();

    let mut errors = Vec::new();
    for (i, worker) in workers.iter().enumerate() {
        let zones_path = path.index(i).child("zones");
        if worker.zones.is_empty() {
            errors.push(FieldError::required(
                zones_path.clone(),
                "at least one zone must be configured",
            ));
        }

        for (j, zone) in worker.zones.iter().enumerate() {
            if !known_zones.contains(zone.as_str()) {
                errors.push(FieldError::invalid(
                    zones_path.index(j),
                    zone,
                    "zone is not configured in spec.provider.infrastructureConfig.networks.zones",
                ));
            }
        }
    }

    into_result(errors)
}

fn parse_shoot(object: &DynamicObject) -> Result<Shoot, serde_json::Error> {
    serde_json::to_value(object).and_then(serde_json::from_value)
}

/// Runs `review`, turning a panic into a denial instead of tearing down the
/// connection.
fn catch_panics(review: impl FnOnce() -> Decision) -> Decision {
    catch_unwind(AssertUnwindSafe(review)).unwrap_or_else(|payload| {
        tracing::error!(
            panic = panic_message(payload.as_ref()),
            "validation panicked"
        );
        Decision::denied("internal error while validating the shoot")
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Handler for the shoot validation route, see [`ShootValidator::review`].
pub async fn handle_review(
    validator: Arc<ShootValidator>,
    request: AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    validator.review(&request)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;

    fn infrastructure_config(networks: Value) -> Value {
        json!({
            "apiVersion": "alicloud.provider.extensions.gardener.cloud/v1alpha1",
            "kind": "InfrastructureConfig",
            "networks": networks,
        })
    }

    fn valid_networks() -> Value {
        json!({
            "vpc": { "cidr": "10.250.0.0/16" },
            "zones": [{ "name": "eu-central-1a", "workers": "10.250.1.0/24" }],
        })
    }

    fn shoot(provider_type: &str, infrastructure_config: Option<Value>) -> Value {
        let mut provider = json!({
            "type": provider_type,
            "workers": [{ "name": "cpu-worker", "zones": ["eu-central-1a"] }],
        });
        if let Some(config) = infrastructure_config {
            provider["infrastructureConfig"] = config;
        }

        json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Shoot",
            "metadata": { "name": "crazy-botany", "namespace": "garden-dev" },
            "spec": {
                "region": "eu-central-1",
                "provider": provider,
                "networking": {
                    "type": "calico",
                    "nodes": "10.250.0.0/16",
                    "pods": "100.96.0.0/11",
                    "services": "100.64.0.0/13",
                },
            },
        })
    }

    fn alicloud_shoot(networks: Value) -> Value {
        shoot("alicloud", Some(infrastructure_config(networks)))
    }

    fn request(operation: &str, object: Option<Value>, old_object: Option<Value>) -> Value {
        json!({
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": { "group": "core.gardener.cloud", "version": "v1beta1", "kind": "Shoot" },
            "resource": { "group": "core.gardener.cloud", "version": "v1beta1", "resource": "shoots" },
            "name": "crazy-botany",
            "namespace": "garden-dev",
            "operation": operation,
            "userInfo": { "username": "admin" },
            "object": object,
            "oldObject": old_object,
            "dryRun": false,
        })
    }

    fn review(request: Value) -> AdmissionResponse {
        let review: kube::core::admission::AdmissionReview<DynamicObject> =
            serde_json::from_value(json!({
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "request": request,
            }))
            .unwrap();
        let request: AdmissionRequest<DynamicObject> = review.try_into().unwrap();

        ShootValidator::default().review(&request)
    }

    fn create(object: Value) -> AdmissionResponse {
        review(request("CREATE", Some(object), None))
    }

    fn update(old: Value, new: Value) -> AdmissionResponse {
        review(request("UPDATE", Some(new), Some(old)))
    }

    fn assert_denied(response: &AdmissionResponse, reason: &str) {
        assert!(!response.allowed, "expected a denial containing {reason:?}");
        assert!(
            response.result.message.contains(reason),
            "{:?} does not contain {reason:?}",
            response.result.message
        );
    }

    #[test]
    fn allows_valid_shoot() {
        let response = create(alicloud_shoot(valid_networks()));

        assert!(response.allowed, "{:?}", response.result.message);
        assert_eq!(response.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
    }

    #[test]
    fn denies_vpc_with_id_and_cidr() {
        let response = create(alicloud_shoot(json!({
            "vpc": { "id": "vpc-123", "cidr": "10.250.0.0/16" },
            "zones": [{ "name": "eu-central-1a", "workers": "10.250.1.0/24" }],
        })));

        assert_denied(&response, "networks.vpc");
        assert_denied(&response, "exactly one of id or cidr must be set");
    }

    #[test]
    fn denies_duplicate_zones() {
        let response = create(alicloud_shoot(json!({
            "vpc": { "cidr": "10.250.0.0/16" },
            "zones": [
                { "name": "eu-central-1a", "workers": "10.250.1.0/24" },
                { "name": "eu-central-1a", "workers": "10.250.2.0/24" },
            ],
        })));

        assert_denied(&response, "networks.zones[1].name: Duplicate value: \"eu-central-1a\"");
    }

    #[test]
    fn denies_workers_outside_of_nodes() {
        let response = create(alicloud_shoot(json!({
            "vpc": { "id": "vpc-123" },
            "zones": [{ "name": "eu-central-1a", "workers": "10.251.1.0/24" }],
        })));

        assert_denied(&response, "networks.zones[0].workers");
    }

    #[test]
    fn denies_missing_infrastructure_config() {
        let response = create(shoot("alicloud", None));

        assert_denied(
            &response,
            "spec.provider.infrastructureConfig: Required value",
        );
    }

    #[rstest]
    #[case::wrong_kind(json!({
        "apiVersion": "alicloud.provider.extensions.gardener.cloud/v1alpha1",
        "kind": "ControlPlaneConfig",
    }), "unsupported document")]
    #[case::wrong_version(json!({
        "apiVersion": "alicloud.provider.extensions.gardener.cloud/v1",
        "kind": "InfrastructureConfig",
        "networks": {},
    }), "unsupported document")]
    #[case::wrong_schema(infrastructure_config(json!({ "zones": "eu-central-1a" })), "failed to decode InfrastructureConfig")]
    fn denies_undecodable_infrastructure_config(#[case] config: Value, #[case] reason: &str) {
        let response = create(shoot("alicloud", Some(config)));

        assert_denied(&response, "spec.provider.infrastructureConfig");
        assert_denied(&response, reason);
    }

    #[rstest]
    #[case::absent(Value::Null)]
    #[case::empty(json!(""))]
    fn denies_missing_nodes(#[case] nodes: Value) {
        let mut object = alicloud_shoot(valid_networks());
        object["spec"]["networking"]["nodes"] = nodes;

        assert_denied(&create(object), "spec.networking.nodes: Required value");
    }

    #[test]
    fn denies_unknown_worker_zone() {
        let mut object = alicloud_shoot(valid_networks());
        object["spec"]["provider"]["workers"][0]["zones"] = json!(["eu-central-1a", "eu-central-1b"]);

        assert_denied(
            &create(object),
            "spec.provider.workers[0].zones[1]: Invalid value: \"eu-central-1b\"",
        );
    }

    #[test]
    fn denies_worker_without_zones() {
        let mut object = alicloud_shoot(valid_networks());
        object["spec"]["provider"]["workers"][0]["zones"] = json!([]);

        assert_denied(&create(object), "spec.provider.workers[0].zones: Required value");
    }

    #[test]
    fn reports_all_errors_at_once() {
        let mut object = alicloud_shoot(json!({
            "vpc": {},
            "zones": [{ "name": "eu-central-1a", "workers": "10.250.1.0/24" }],
        }));
        object["spec"]["provider"]["workers"][0]["zones"] = json!([]);

        let response = create(object);
        assert_denied(&response, "networks.vpc");
        assert_denied(&response, "spec.provider.workers[0].zones");
    }

    #[test]
    fn allows_other_provider_types() {
        let response = create(shoot("aws", None));

        assert!(response.allowed);
    }

    #[test]
    fn allows_configured_provider_type() {
        let validator = ShootValidator::new(ValidatorOptions {
            provider_type: "alicloud-china".to_owned(),
        });
        let new: Shoot = serde_json::from_value(shoot("alicloud-china", None)).unwrap();
        let other: Shoot = serde_json::from_value(shoot("alicloud", None)).unwrap();

        assert!(matches!(
            validator.validate(&new, None),
            Decision::Denied { .. }
        ));
        assert!(matches!(
            validator.validate(&other, None),
            Decision::Allowed { .. }
        ));
    }

    #[test]
    fn allows_valid_update() {
        let old = alicloud_shoot(valid_networks());
        let mut new = alicloud_shoot(valid_networks());
        new["spec"]["provider"]["workers"] = json!([
            { "name": "cpu-worker", "zones": ["eu-central-1a"] },
            { "name": "gpu-worker", "zones": ["eu-central-1a"] },
        ]);

        let response = update(old, new);
        assert!(response.allowed, "{:?}", response.result.message);
    }

    #[test]
    fn denies_changed_vpc_cidr() {
        let old = alicloud_shoot(valid_networks());
        let new = alicloud_shoot(json!({
            "vpc": { "cidr": "10.250.0.0/15" },
            "zones": [{ "name": "eu-central-1a", "workers": "10.250.1.0/24" }],
        }));

        assert_denied(&update(old, new), "field is immutable");
    }

    #[test]
    fn denies_removed_zone() {
        let old = alicloud_shoot(json!({
            "vpc": { "cidr": "10.250.0.0/16" },
            "zones": [
                { "name": "eu-central-1a", "workers": "10.250.1.0/24" },
                { "name": "eu-central-1b", "workers": "10.250.2.0/24" },
            ],
        }));
        let new = alicloud_shoot(valid_networks());

        assert_denied(
            &update(old, new),
            "networks.zones: Forbidden: the set of zones is immutable",
        );
    }

    #[test]
    fn denies_added_zone() {
        let old = alicloud_shoot(valid_networks());
        let new = alicloud_shoot(json!({
            "vpc": { "cidr": "10.250.0.0/16" },
            "zones": [
                { "name": "eu-central-1a", "workers": "10.250.1.0/24" },
                { "name": "eu-central-1b", "workers": "10.250.2.0/24" },
            ],
        }));

        assert_denied(
            &update(old, new),
            "networks.zones: Forbidden: the set of zones is immutable",
        );
    }

    #[test]
    fn skips_update_rules_when_migrating_from_other_provider() {
        let old = shoot("aws", None);
        let new = alicloud_shoot(valid_networks());

        assert!(update(old, new).allowed);
    }

    #[test]
    fn denies_undecodable_old_infrastructure_config() {
        let old = shoot(
            "alicloud",
            Some(json!({ "apiVersion": "v1", "kind": "ConfigMap" })),
        );
        let new = alicloud_shoot(valid_networks());

        assert_denied(&update(old, new), "previous spec.provider.infrastructureConfig");
    }

    #[rstest]
    #[case("DELETE")]
    #[case("CONNECT")]
    fn allows_delete_and_connect(#[case] operation: &str) {
        let garbage = json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Shoot",
            "metadata": { "name": "crazy-botany" },
            "spec": "garbage",
        });

        assert!(review(request(operation, None, Some(garbage))).allowed);
    }

    #[test]
    fn denies_wrong_kind() {
        let mut request = request("CREATE", Some(alicloud_shoot(valid_networks())), None);
        request["kind"] = json!({ "group": "", "version": "v1", "kind": "ConfigMap" });

        assert_denied(&review(request), "wrong object kind");
    }

    #[test]
    fn denies_missing_object() {
        assert_denied(&review(request("CREATE", None, None)), "bad request");
    }

    #[test]
    fn denies_update_without_old_object() {
        let new = alicloud_shoot(valid_networks());

        assert_denied(&review(request("UPDATE", Some(new), None)), "bad request");
    }

    #[test]
    fn denies_undecodable_shoot() {
        let mut object = alicloud_shoot(valid_networks());
        object["spec"]["provider"] = json!("alicloud");

        assert_denied(&create(object), "bad request: failed to decode shoot");
    }

    #[test]
    #[allow(clippy::panic)]
    fn turns_panics_into_denials() {
        let decision = catch_panics(|| panic!("boom"));

        assert_eq!(
            decision,
            Decision::denied("internal error while validating the shoot")
        );
    }

    #[tokio::test]
    async fn handler_reviews_request() {
        let review: kube::core::admission::AdmissionReview<DynamicObject> =
            serde_json::from_value(json!({
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "request": request("CREATE", Some(alicloud_shoot(valid_networks())), None),
            }))
            .unwrap();

        let response =
            handle_review(Arc::new(ShootValidator::default()), review.try_into().unwrap()).await;
        assert!(response.allowed);
    }
}
