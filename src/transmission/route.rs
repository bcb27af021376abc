//! Transmission routes and the table that translates between route names and the
//! `TransmissionRoute` enum handed to `Infectable::expose`.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EmodError;

/// A named contact network with its own contagion pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransmissionRoute {
    Contact,
    Environmental,
    /// Used by single-route groups, where exposure is not attributed to any one route.
    All,
}

impl TransmissionRoute {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TransmissionRoute::Contact => "CONTACT",
            TransmissionRoute::Environmental => "ENVIRONMENTAL",
            TransmissionRoute::All => "ALL",
        }
    }
}

impl Display for TransmissionRoute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransmissionRoute {
    type Err = EmodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TransmissionRoute::Contact,
            TransmissionRoute::Environmental,
            TransmissionRoute::All,
        ]
        .into_iter()
        .find(|route| route.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| EmodError::UnknownRoute(s.to_string()))
    }
}

/// Bidirectional route-name / route-enum table.
///
/// Built once at setup and handed to the transmission groups that need it. Names are compared
/// case-insensitively, so `"contact"` and `"CONTACT"` name the same route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTable {
    entries: Vec<(String, TransmissionRoute)>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let mut table = RouteTable::empty();
        table.insert("CONTACT", TransmissionRoute::Contact);
        table.insert("ENVIRONMENTAL", TransmissionRoute::Environmental);
        table
    }
}

impl RouteTable {
    #[must_use]
    pub fn empty() -> Self {
        RouteTable {
            entries: Vec::new(),
        }
    }

    /// Maps `name` to `route`, replacing any previous mapping for that name.
    pub fn insert(&mut self, name: &str, route: TransmissionRoute) {
        let name = name.to_ascii_uppercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = route,
            None => self.entries.push((name, route)),
        }
    }

    pub fn route_for_name(&self, name: &str) -> Result<TransmissionRoute, EmodError> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, route)| *route)
            .ok_or_else(|| EmodError::BadMapKey {
                map: "route_table",
                key: name.to_string(),
            })
    }

    #[must_use]
    pub fn name_for_route(&self, route: TransmissionRoute) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, r)| *r == route)
            .map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
