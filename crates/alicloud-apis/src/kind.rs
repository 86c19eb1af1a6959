//! Decoding of raw, versioned provider documents into typed kinds.
//!
//! Provider configuration is embedded into other resources as an opaque JSON
//! document carrying its own `apiVersion` and `kind`. Instead of a process wide
//! registry of known kinds, every kind states its identity via [`TypedKind`]
//! and [`decode`] checks it before deserializing the full document.
use serde::{Deserialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu, ensure};

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

/// A kind with a fixed `apiVersion` and `kind` identity.
pub trait TypedKind: DeserializeOwned {
    const API_VERSION: &'static str;
    const KIND: &'static str;
}

#[derive(Debug, Snafu)]
pub enum DecodeError {
    #[snafu(display("document is empty"))]
    EmptyDocument,

    #[snafu(display("failed to read apiVersion and kind of document: {source}"))]
    DeserializeTypeMeta { source: serde_json::Error },

    #[snafu(display(
        "unsupported document {api_version:?}/{kind:?}, expected {expected_api_version:?}/{expected_kind:?}"
    ))]
    UnsupportedKind {
        api_version: String,
        kind: String,
        expected_api_version: &'static str,
        expected_kind: &'static str,
    },

    #[snafu(display("failed to decode {kind}: {source}"))]
    DeserializeDocument {
        source: serde_json::Error,
        kind: &'static str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeMeta {
    #[serde(default)]
    api_version: String,

    #[serde(default)]
    kind: String,
}

/// Decodes `value` into the typed kind `T`.
///
/// Fails if the document is `null`, if its `apiVersion`/`kind` do not match
/// `T`, or if the document does not match the schema of `T`.
pub fn decode<T: TypedKind>(value: serde_json::Value) -> Result<T> {
    ensure!(!value.is_null(), EmptyDocumentSnafu);

    let type_meta = TypeMeta::deserialize(&value).context(DeserializeTypeMetaSnafu)?;
    ensure!(
        type_meta.api_version == T::API_VERSION && type_meta.kind == T::KIND,
        UnsupportedKindSnafu {
            api_version: type_meta.api_version,
            kind: type_meta.kind,
            expected_api_version: T::API_VERSION,
            expected_kind: T::KIND,
        }
    );

    serde_json::from_value(value).context(DeserializeDocumentSnafu { kind: T::KIND })
}
