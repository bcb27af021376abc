//! Kernel configuration read from JSON.
//!
//! ```json
//! {
//!   "Transmission": {
//!     "Group_Type": "MultiRoute",
//!     "Properties": [
//!       { "Property": "RISK", "Values": ["HIGH", "LOW"], "Matrix": [[1.0, 0.5], [0.5, 1.0]] }
//!     ],
//!     "Decay_Rates": { "CONTACT": 1.0, "ENVIRONMENTAL": 0.3 }
//!   },
//!   "Genetics": { "Sporozoite_Life_Expectancy": 10.0 }
//! }
//! ```
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::EmodError;
use crate::genetics::GeneticsParams;
use crate::transmission::{
    create_transmission_groups, PropertyValueList, RouteToContagionDecayMap, ScalingMatrix,
    TransmissionGroupType, TransmissionGroups,
};

fn default_route() -> String {
    "CONTACT".to_string()
}

fn default_strains() -> u32 {
    1
}

/// One transmission-relevant property: its values and how strongly each value mixes with the
/// others on `route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyConfig {
    #[serde(rename = "Property")]
    pub name: String,
    #[serde(rename = "Values")]
    pub values: PropertyValueList,
    #[serde(rename = "Matrix")]
    pub scaling_matrix: ScalingMatrix,
    #[serde(rename = "Route", default = "default_route")]
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransmissionGroupsConfig {
    #[serde(rename = "Group_Type", default)]
    pub group_type: TransmissionGroupType,
    #[serde(rename = "Properties", default)]
    pub properties: Vec<PropertyConfig>,
    #[serde(rename = "Decay_Rates", default)]
    pub decay_rates: RouteToContagionDecayMap,
    #[serde(rename = "Number_Of_Strains", default = "default_strains")]
    pub number_of_strains: u32,
    #[serde(rename = "Number_Of_Substrains", default = "default_strains")]
    pub number_of_substrains: u32,
}

impl Default for TransmissionGroupsConfig {
    fn default() -> Self {
        TransmissionGroupsConfig {
            group_type: TransmissionGroupType::default(),
            properties: Vec::new(),
            decay_rates: BTreeMap::new(),
            number_of_strains: 1,
            number_of_substrains: 1,
        }
    }
}

impl TransmissionGroupsConfig {
    /// Creates the configured variant, adds every property in order and builds it.
    pub fn build(&self) -> Result<Box<dyn TransmissionGroups>, EmodError> {
        let mut groups = create_transmission_groups(self.group_type);
        for property in &self.properties {
            groups.add_property(
                &property.name,
                &property.values,
                &property.scaling_matrix,
                &property.route,
            )?;
        }
        groups.build(
            &self.decay_rates,
            self.number_of_strains,
            self.number_of_substrains,
        )?;
        debug!(
            "built {:?} transmission groups with {} routes",
            self.group_type,
            groups.route_count()
        );
        Ok(groups)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelConfig {
    #[serde(rename = "Transmission", default)]
    pub transmission: TransmissionGroupsConfig,
    #[serde(rename = "Genetics", default)]
    pub genetics: GeneticsParams,
}

impl KernelConfig {
    /// Checks everything that can be checked without building anything.
    pub fn validate(&self) -> Result<(), EmodError> {
        self.genetics.validate()
    }
}

/// Reads and validates a `KernelConfig` from the JSON file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<KernelConfig, EmodError> {
    let path = path.as_ref();
    debug!("loading kernel configuration from {}", path.display());
    let file = File::open(path)?;
    let config: KernelConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}
