//! Field path aware validation errors.
//!
//! This is adapted from Kubernetes, see `apimachinery/pkg/util/validation/field`
//! in the Kubernetes source. Every error carries the [`Path`] of the offending
//! field, so that a rejected request tells the user exactly what to fix.
use std::fmt::Display;

use snafu::Snafu;

pub mod infrastructure;

pub type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// The path of a field inside a document, e.g. `networks.zones[1].name`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Path(String);

impl Path {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the path of the child field `name`.
    pub fn child(&self, name: impl AsRef<str>) -> Self {
        Self(format!("{}.{}", self.0, name.as_ref()))
    }

    /// Returns the path of the list element at `index`.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single validation error.
#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("{path}: Required value: {detail}"))]
    Required { path: Path, detail: String },

    #[snafu(display("{path}: Invalid value: {value:?}: {detail}"))]
    Invalid {
        path: Path,
        value: String,
        detail: String,
    },

    #[snafu(display("{path}: Duplicate value: {value:?}"))]
    Duplicate { path: Path, value: String },

    #[snafu(display("{path}: Forbidden: {detail}"))]
    Forbidden { path: Path, detail: String },
}

impl Error {
    pub fn required(path: Path, detail: impl Into<String>) -> Self {
        Self::Required {
            path,
            detail: detail.into(),
        }
    }

    pub fn invalid(path: Path, value: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Invalid {
            path,
            value: value.into(),
            detail: detail.into(),
        }
    }

    pub fn duplicate(path: Path, value: impl Into<String>) -> Self {
        Self::Duplicate {
            path,
            value: value.into(),
        }
    }

    pub fn forbidden(path: Path, detail: impl Into<String>) -> Self {
        Self::Forbidden {
            path,
            detail: detail.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Required { path, .. }
            | Self::Invalid { path, .. }
            | Self::Duplicate { path, .. }
            | Self::Forbidden { path, .. } => path,
        }
    }
}

/// A collection of errors discovered during validation.
///
/// It is never empty, a successful validation returns [`Ok`] instead.
#[derive(Debug, Eq, PartialEq)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`, an `Errors` value holds at least one error.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether any error is reported for exactly `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.iter().any(|error| error.path().as_str() == path)
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for Errors {
    type IntoIter = std::vec::IntoIter<Error>;
    type Item = Error;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Returns [`Ok`] if no errors were collected, otherwise returns all of them.
pub fn into_result(errors: Vec<Error>) -> Result {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

/// Combines the results of multiple validations, keeping every error.
pub fn merge(results: impl IntoIterator<Item = Result>) -> Result {
    let errors = results
        .into_iter()
        .filter_map(|res| res.err())
        .flatten()
        .collect();
    into_result(errors)
}

/// Returns an error if `new` differs from `old`, naming both values.
pub fn validate_immutable<T>(new: &T, old: &T, path: &Path) -> Option<Error>
where
    T: PartialEq + Display + ?Sized,
{
    (new != old).then(|| {
        Error::invalid(
            path.clone(),
            new.to_string(),
            format!("field is immutable, it was {:?} before", old.to_string()),
        )
    })
}
