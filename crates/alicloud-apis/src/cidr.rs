//! Helpers to validate CIDR ranges and their relation to each other.
use ipnetwork::IpNetwork;

use crate::validation::{Error, Path};

/// A CIDR value taken from a document, remembering where it came from.
///
/// Parsing happens once on construction. Relational checks silently skip
/// values which failed to parse, [`Cidr::validate_parse`] reports those.
#[derive(Clone, Debug)]
pub struct Cidr {
    path: Path,
    value: String,
    network: Option<IpNetwork>,
}

impl Cidr {
    pub fn new(value: impl Into<String>, path: Path) -> Self {
        let value = value.into();
        let network = parse(&value);

        Self {
            path,
            value,
            network,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn network(&self) -> Option<IpNetwork> {
        self.network
    }

    pub fn validate_parse(&self) -> Option<Error> {
        self.network
            .is_none()
            .then(|| Error::invalid(self.path.clone(), &self.value, "invalid CIDR address"))
    }

    /// The address part needs to be the network address, e.g. `10.0.0.0/16`
    /// instead of `10.0.1.0/16`.
    pub fn validate_canonical(&self) -> Option<Error> {
        let network = self.network?;

        (network.ip() != network.network()).then(|| {
            Error::invalid(
                self.path.clone(),
                &self.value,
                format!("must be valid canonical CIDR, e.g. {}/{}", network.network(), network.prefix()),
            )
        })
    }

    /// Every CIDR in `others` needs to be fully contained in this one. The errors
    /// are reported on the path of the offending other CIDR.
    pub fn validate_subset<'a>(&self, others: impl IntoIterator<Item = &'a Cidr>) -> Vec<Error> {
        let Some(network) = self.network else {
            return Vec::new();
        };

        others
            .into_iter()
            .filter(|other| other.network.is_some_and(|inner| !is_subset(&network, &inner)))
            .map(|other| {
                Error::invalid(
                    other.path.clone(),
                    &other.value,
                    format!("must be a subset of {} ({:?})", self.path, self.value),
                )
            })
            .collect()
    }

    /// This CIDR must not overlap with any CIDR in `others`. The errors are
    /// reported on the path of this CIDR, citing the other one.
    pub fn validate_not_overlapping<'a>(
        &self,
        others: impl IntoIterator<Item = &'a Cidr>,
    ) -> Vec<Error> {
        let Some(network) = self.network else {
            return Vec::new();
        };

        others
            .into_iter()
            .filter(|other| other.network.is_some_and(|rhs| overlaps(&network, &rhs)))
            .map(|other| {
                Error::invalid(
                    self.path.clone(),
                    &self.value,
                    format!("must not overlap with {} ({:?})", other.path, other.value),
                )
            })
            .collect()
    }
}

/// Parses `value` as CIDR in `address/prefix-length` notation.
///
/// The prefix length is mandatory and must be a decimal number, a plain IP
/// address or a dotted netmask suffix is not accepted.
pub fn parse(value: &str) -> Option<IpNetwork> {
    let (address, prefix) = value.split_once('/')?;
    if !(1..=3).contains(&prefix.len()) || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    IpNetwork::new(address.parse().ok()?, prefix.parse().ok()?).ok()
}

/// Returns whether `inner` lies completely within `outer`.
pub fn is_subset(outer: &IpNetwork, inner: &IpNetwork) -> bool {
    outer.is_ipv4() == inner.is_ipv4()
        && outer.prefix() <= inner.prefix()
        && outer.contains(inner.network())
}

/// Returns whether the two ranges share at least one address.
pub fn overlaps(lhs: &IpNetwork, rhs: &IpNetwork) -> bool {
    lhs.is_ipv4() == rhs.is_ipv4() && (lhs.contains(rhs.network()) || rhs.contains(lhs.network()))
}
