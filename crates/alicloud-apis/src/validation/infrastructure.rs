//! Validation of the [`InfrastructureConfig`] on creation and on update.
use std::collections::HashSet;

use crate::{
    cidr::Cidr,
    v1alpha1::{InfrastructureConfig, Zone},
    validation::{Error, Path, Result, into_result, validate_immutable},
};

/// The CIDRs of the cluster network the infrastructure needs to fit into.
///
/// All of them are optional, checks involving an absent range are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetworkRanges<'a> {
    pub nodes: Option<&'a str>,
    pub pods: Option<&'a str>,
    pub services: Option<&'a str>,
}

impl NetworkRanges<'_> {
    fn cidrs(&self) -> (Option<Cidr>, Option<Cidr>, Option<Cidr>) {
        let networking = Path::new("networking");
        let cidr = |value: Option<&str>, field: &str| {
            value.map(|value| Cidr::new(value, networking.child(field)))
        };

        (
            cidr(self.nodes, "nodes"),
            cidr(self.pods, "pods"),
            cidr(self.services, "services"),
        )
    }
}

/// Validates a new or updated [`InfrastructureConfig`] on its own and against
/// the cluster network `ranges`.
pub fn validate_infrastructure_config(
    config: &InfrastructureConfig,
    ranges: &NetworkRanges<'_>,
) -> Result {
    let mut errors = Vec::new();

    let networks_path = Path::new("networks");
    let zones_path = networks_path.child("zones");
    let zones = &config.networks.zones;

    let (nodes, pods, services) = ranges.cidrs();
    errors.extend(
        [&nodes, &pods, &services]
            .into_iter()
            .flatten()
            .filter_map(Cidr::validate_parse),
    );

    if zones.is_empty() {
        errors.push(Error::required(
            zones_path.clone(),
            "must specify the networks of at least one zone",
        ));
    }

    let mut zone_names = HashSet::new();
    let mut worker_cidrs = Vec::with_capacity(zones.len());

    for (index, zone) in zones.iter().enumerate() {
        let zone_path = zones_path.index(index);
        errors.extend(validate_zone(zone, &zone_path));

        if !zone.name.trim().is_empty() && !zone_names.insert(zone.name.as_str()) {
            errors.push(Error::duplicate(zone_path.child("name"), &zone.name));
        }

        match zone.worker_cidr() {
            Some(workers) => worker_cidrs.push(Cidr::new(workers, zone_path.child("workers"))),
            None => errors.push(Error::required(
                zone_path.child("workers"),
                "a worker CIDR must be provided",
            )),
        }
    }

    errors.extend(worker_cidrs.iter().filter_map(Cidr::validate_parse));
    for (index, worker_cidr) in worker_cidrs.iter().enumerate() {
        errors.extend(worker_cidr.validate_not_overlapping(worker_cidrs.iter().take(index)));
    }

    let vpc = &config.networks.vpc;
    let vpc_path = networks_path.child("vpc");
    match (&vpc.id, &vpc.cidr) {
        (Some(_), Some(_)) | (None, None) => errors.push(Error::invalid(
            vpc_path,
            vpc.to_string(),
            "exactly one of id or cidr must be set",
        )),
        (Some(id), None) => {
            if id.trim().is_empty() {
                errors.push(Error::required(vpc_path.child("id"), "must not be empty"));
            }
        }
        (None, Some(cidr)) => {
            let vpc_cidr = Cidr::new(cidr, vpc_path.child("cidr"));

            if let Some(error) = vpc_cidr.validate_parse() {
                errors.push(error);
            } else {
                errors.extend(vpc_cidr.validate_canonical());
                errors.extend(vpc_cidr.validate_subset(&nodes));
                errors.extend(vpc_cidr.validate_subset(&worker_cidrs));

                for range in [&pods, &services].into_iter().flatten() {
                    errors.extend(range.validate_not_overlapping([&vpc_cidr]));
                }
            }
        }
    }

    for range in [&pods, &services].into_iter().flatten() {
        errors.extend(range.validate_not_overlapping(&worker_cidrs));
    }

    if let Some(nodes) = &nodes {
        errors.extend(nodes.validate_subset(&worker_cidrs));
    }

    into_result(errors)
}

fn validate_zone(zone: &Zone, zone_path: &Path) -> Vec<Error> {
    let mut errors = Vec::new();

    if zone.name.trim().is_empty() {
        errors.push(Error::required(
            zone_path.child("name"),
            "zone name must not be empty",
        ));
    }

    if let Some(worker) = zone.worker.as_deref().filter(|worker| !worker.is_empty())
        && !zone.workers.is_empty()
        && zone.workers != worker
    {
        errors.push(Error::invalid(
            zone_path.child("worker"),
            worker,
            format!(
                "must be equal to workers ({:?}) when both are set",
                zone.workers
            ),
        ));
    }

    let eip_allocation_id = zone
        .nat_gateway
        .as_ref()
        .and_then(|nat_gateway| nat_gateway.eip_allocation_id.as_deref());
    if eip_allocation_id.is_some_and(|id| id.trim().is_empty()) {
        errors.push(Error::required(
            zone_path.child("natGateway").child("eipAllocationID"),
            "must not be empty if set",
        ));
    }

    errors
}

/// Validates the transition from `old` to `new`.
///
/// Cloud resources exist for the VPC and every zone once the infrastructure
/// got provisioned, so the VPC as well as names and worker CIDRs of existing
/// zones are immutable and zones cannot be removed. New zones can be appended.
pub fn validate_infrastructure_config_update(
    old: &InfrastructureConfig,
    new: &InfrastructureConfig,
) -> Result {
    let mut errors = Vec::new();

    let networks_path = Path::new("networks");
    let zones_path = networks_path.child("zones");

    errors.extend(validate_immutable(
        &new.networks.vpc,
        &old.networks.vpc,
        &networks_path.child("vpc"),
    ));

    let old_zones = &old.networks.zones;
    let new_zones = &new.networks.zones;

    if old_zones.len() != new_zones.len() {
        errors.push(Error::forbidden(
            zones_path,
            format!(
                "the set of zones is immutable, it was {:?}, now {:?}",
                zone_names(old_zones),
                zone_names(new_zones)
            ),
        ));
        return into_result(errors);
    }

    for (index, (old_zone, new_zone)) in old_zones.iter().zip(new_zones).enumerate() {
        let zone_path = zones_path.index(index);

        errors.extend(validate_immutable(
            new_zone.name.as_str(),
            old_zone.name.as_str(),
            &zone_path.child("name"),
        ));
        errors.extend(validate_immutable(
            new_zone.worker_cidr().unwrap_or_default(),
            old_zone.worker_cidr().unwrap_or_default(),
            &zone_path.child("workers"),
        ));
    }

    into_result(errors)
}

fn zone_names(zones: &[Zone]) -> Vec<&str> {
    zones.iter().map(|zone| zone.name.as_str()).collect()
}
