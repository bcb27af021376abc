//! Provides `EmodError` and maps other errors to it.
//!
//! Configuration and lookup failures are reported through `EmodError` and are meant to stop the
//! setup phase of a run with a clear diagnostic. Broken internal invariants (for example asking a
//! male gametocyte cohort to act as the female in mating) are not errors: they `panic!`.
use std::fmt::{self, Debug, Display};
use std::io;

#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EmodError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    /// `add_property` was called twice for the same property name.
    DuplicateProperty {
        property: String,
    },
    EmptyValueList {
        property: String,
    },
    /// A scaling sub-matrix is not square with side equal to the number of values.
    ScalingMatrixSize {
        property: String,
        expected: usize,
        rows: usize,
        bad_row: Option<(usize, usize)>,
    },
    /// Simple transmission groups only ever carry a single route.
    SingleRouteOnly {
        existing: String,
        requested: String,
    },
    UnknownRoute(String),
    UnknownProperty(String),
    UnknownPropertyValue {
        property: String,
        value: String,
    },
    BadMapKey {
        map: &'static str,
        key: String,
    },
    AlreadyBuilt,
    NotBuilt,
    InvalidDecayRate {
        route: String,
        rate: f64,
    },
    InvalidParameter {
        name: &'static str,
        message: String,
    },
    EmodError(String),
}

impl From<io::Error> for EmodError {
    fn from(error: io::Error) -> Self {
        EmodError::IoError(error)
    }
}

impl From<serde_json::Error> for EmodError {
    fn from(error: serde_json::Error) -> Self {
        EmodError::JsonError(error)
    }
}

impl From<String> for EmodError {
    fn from(error: String) -> Self {
        EmodError::EmodError(error)
    }
}

impl From<&str> for EmodError {
    fn from(error: &str) -> Self {
        EmodError::EmodError(error.to_string())
    }
}

impl std::error::Error for EmodError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmodError::IoError(e) => Some(e),
            EmodError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for EmodError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmodError::IoError(e) => write!(f, "I/O error: {e}"),
            EmodError::JsonError(e) => write!(f, "JSON error: {e}"),
            EmodError::DuplicateProperty { property } => {
                write!(f, "duplicate property '{property}' in transmission groups")
            }
            EmodError::EmptyValueList { property } => {
                write!(f, "property '{property}' must declare at least one value")
            }
            EmodError::ScalingMatrixSize {
                property,
                expected,
                rows,
                bad_row,
            } => match bad_row {
                Some((row, len)) => write!(
                    f,
                    "scaling matrix for property '{property}' must be {expected}x{expected}, \
                     but row {row} has {len} entries"
                ),
                None => write!(
                    f,
                    "scaling matrix for property '{property}' must be {expected}x{expected}, \
                     but it has {rows} rows"
                ),
            },
            EmodError::SingleRouteOnly {
                existing,
                requested,
            } => write!(
                f,
                "simple transmission groups only support one route \
                 (have '{existing}', got '{requested}')"
            ),
            EmodError::UnknownRoute(route) => write!(f, "unknown transmission route '{route}'"),
            EmodError::UnknownProperty(property) => write!(f, "unknown property '{property}'"),
            EmodError::UnknownPropertyValue { property, value } => {
                write!(f, "unknown value '{value}' for property '{property}'")
            }
            EmodError::BadMapKey { map, key } => write!(f, "bad map key: '{key}' not in {map}"),
            EmodError::AlreadyBuilt => write!(f, "transmission groups have already been built"),
            EmodError::NotBuilt => write!(f, "transmission groups have not been built"),
            EmodError::InvalidDecayRate { route, rate } => write!(
                f,
                "decay rate {rate} for route '{route}' is outside of [0, 1]"
            ),
            EmodError::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            EmodError::EmodError(message) => write!(f, "Error: {message}"),
        }
    }
}
