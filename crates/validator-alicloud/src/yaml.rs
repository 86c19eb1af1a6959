//! Printing of the provider config schemas as YAML.
use std::io::Write;

use alicloud_apis::v1alpha1::{InfrastructureConfig, InfrastructureStatus};
use serde::ser;
use snafu::{ResultExt, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },
}

/// Serializes `value` as an explicit YAML document, starting with `---`.
pub fn serialize_to_explicit_document<T, W>(mut writer: W, value: &T) -> Result<()>
where
    T: ser::Serialize,
    W: Write,
{
    writer
        .write_all(b"---\n")
        .context(WriteDocumentSeparatorSnafu)?;
    let mut serializer = serde_yaml::Serializer::new(writer);
    serde_yaml::with::singleton_map_recursive::serialize(value, &mut serializer)
        .context(SerializeYamlSnafu)?;
    Ok(())
}

/// Writes the JSON schemas of the `InfrastructureConfig` and the
/// `InfrastructureStatus`, one YAML document each.
pub fn write_schemas<W: Write>(mut writer: W) -> Result<()> {
    serialize_to_explicit_document(&mut writer, &schemars::schema_for!(InfrastructureConfig))?;
    serialize_to_explicit_document(&mut writer, &schemars::schema_for!(InfrastructureStatus))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn writes_explicit_document() {
        let value: BTreeMap<_, _> = [("key", "value")].into();

        let mut buf = Vec::new();
        serialize_to_explicit_document(&mut buf, &value).unwrap();

        assert_eq!(std::str::from_utf8(&buf).unwrap(), "---\nkey: value\n");
    }

    #[test]
    fn writes_both_schemas() {
        let mut buf = Vec::new();
        write_schemas(&mut buf).unwrap();
        let schemas = String::from_utf8(buf).unwrap();

        assert!(schemas.starts_with("---\n"));
        assert_eq!(schemas.matches("---\n").count(), 2);
        assert!(schemas.contains("title: InfrastructureConfig"));
        assert!(schemas.contains("title: InfrastructureStatus"));
        assert!(schemas.contains("eipAllocationID"));
    }
}
