use std::collections::BTreeMap;

use log::{debug, trace, warn};

use super::scaling::ScalingMatrixBuilder;
use super::{
    check_decay_rate, ContagionAccumulator, ContagionPopulation, IndividualProperties, Infectable,
    PropertyValueList, RouteIndex, RouteTable, RouteToContagionDecayMap, ScalingMatrix,
    TransmissionGroupMembership, TransmissionGroups,
};
use crate::error::EmodError;
use crate::{HashMap, HashMapExt};

/// Value of the implicit property given to a route that was declared without properties.
pub const DEFAULT_PROPERTY_VALUE: &str = "Default";

/// Transmission groups with an independent contagion pool per named route.
///
/// Routes are indexed in the order they are first seen, either through `add_property` or
/// through the keys of the decay map passed to `build`.
#[derive(Debug, Clone)]
pub struct MultiRouteTransmissionGroups {
    route_table: RouteTable,
    route_names: Vec<String>,
    route_properties: Vec<BTreeMap<String, PropertyValueList>>,
    property_to_route: HashMap<String, RouteIndex>,
    scaling: ScalingMatrixBuilder,
    accumulators: Vec<ContagionAccumulator>,
    built: bool,
}

impl Default for MultiRouteTransmissionGroups {
    fn default() -> Self {
        MultiRouteTransmissionGroups::new()
    }
}

impl MultiRouteTransmissionGroups {
    #[must_use]
    pub fn new() -> Self {
        MultiRouteTransmissionGroups::with_route_table(RouteTable::default())
    }

    /// Uses `route_table` to translate route names into the route reported on exposure.
    #[must_use]
    pub fn with_route_table(route_table: RouteTable) -> Self {
        MultiRouteTransmissionGroups {
            route_table,
            route_names: Vec::new(),
            route_properties: Vec::new(),
            property_to_route: HashMap::new(),
            scaling: ScalingMatrixBuilder::new(),
            accumulators: Vec::new(),
            built: false,
        }
    }

    #[must_use]
    pub fn route_names(&self) -> &[String] {
        &self.route_names
    }

    fn get_or_insert_route(&mut self, route: &str) -> RouteIndex {
        if let Some(index) = self.route_names.iter().position(|name| name == route) {
            return index;
        }
        self.route_names.push(route.to_string());
        self.route_properties.push(BTreeMap::new());
        self.route_names.len() - 1
    }

    /// Registers `route` without any properties of its own. A route that has no property named
    /// after it gets an implicit single-valued one, so that it still has exactly one group.
    pub fn add_route(&mut self, route: &str) -> Result<(), EmodError> {
        if self.built {
            return Err(EmodError::AlreadyBuilt);
        }
        self.get_or_insert_route(route);
        if !self.scaling.has_property(route) {
            self.add_property(
                route,
                &[DEFAULT_PROPERTY_VALUE.to_string()],
                &vec![vec![1.0]],
                route,
            )?;
        }
        Ok(())
    }

    fn decay_rate_for_route(route: &str, decay_rates: &RouteToContagionDecayMap) -> Result<f64, EmodError> {
        match decay_rates.get(route) {
            Some(&rate) => check_decay_rate(route, rate),
            None => {
                warn!("no contagion decay rate configured for route {route}; using 1.0");
                Ok(1.0)
            }
        }
    }
}

impl TransmissionGroups for MultiRouteTransmissionGroups {
    fn add_property(
        &mut self,
        property: &str,
        values: &[String],
        scaling_matrix: &ScalingMatrix,
        route: &str,
    ) -> Result<(), EmodError> {
        if self.built {
            return Err(EmodError::AlreadyBuilt);
        }
        debug!("adding property {property} on route {route}");
        self.scaling.register(property, values, scaling_matrix)?;

        let route_index = self.get_or_insert_route(route);
        self.route_properties[route_index].insert(property.to_string(), values.to_vec());
        self.property_to_route.insert(property.to_string(), route_index);
        Ok(())
    }

    fn build(
        &mut self,
        decay_rates: &RouteToContagionDecayMap,
        number_of_strains: u32,
        number_of_substrains: u32,
    ) -> Result<(), EmodError> {
        if self.built {
            return Err(EmodError::AlreadyBuilt);
        }
        for route in decay_rates.keys() {
            self.add_route(route)?;
        }
        if self.route_names.is_empty() {
            return Err(EmodError::EmodError(
                "cannot build transmission groups without any route".to_string(),
            ));
        }

        let mut accumulators = Vec::with_capacity(self.route_names.len());
        for (route, properties) in self.route_names.iter().zip(&self.route_properties) {
            let scaling_matrix = self.scaling.build_route_matrix(properties)?;
            let decay_rate = Self::decay_rate_for_route(route, decay_rates)?;
            debug!(
                "route {route}: {} groups, decay rate {decay_rate}",
                scaling_matrix.len()
            );
            accumulators.push(ContagionAccumulator::new(scaling_matrix, decay_rate));
        }
        debug!(
            "built {} routes for {number_of_strains} strains x {number_of_substrains} substrains",
            accumulators.len()
        );

        self.accumulators = accumulators;
        self.built = true;
        Ok(())
    }

    /// Every requested route that has been built starts at group 0; properties on those routes
    /// then add their offsets. Properties on routes that were not requested, or that the object
    /// does not know, are ignored.
    fn get_group_membership_for_properties(
        &self,
        routes: &[&str],
        properties: &IndividualProperties,
        membership: &mut TransmissionGroupMembership,
    ) -> Result<(), EmodError> {
        if !self.built {
            return Err(EmodError::NotBuilt);
        }
        for (index, name) in self.route_names.iter().enumerate() {
            if routes.contains(&name.as_str()) {
                membership.insert(index, 0);
            }
        }

        for (property, value) in properties {
            let Some(&route) = self.property_to_route.get(property) else {
                continue;
            };
            if let Some(group) = membership.get_mut(&route) {
                *group += self.scaling.offset(property, value)?;
            }
        }
        trace!("{properties:?} => {membership:?}");
        Ok(())
    }

    /// The summed infection rate over all memberships is reported once per route entry.
    fn expose_to_contagion(
        &self,
        candidate: Option<&mut dyn Infectable>,
        membership: &TransmissionGroupMembership,
        dt: f64,
    ) -> Result<(), EmodError> {
        let total = self.get_total_contagion(membership)?;
        if !(total > 0.0) {
            return Ok(());
        }
        let Some(candidate) = candidate else {
            return Ok(());
        };

        let routes = membership
            .keys()
            .map(|&route| self.route_table.route_for_name(&self.route_names[route]))
            .collect::<Result<Vec<_>, _>>()?;
        let contagion = ContagionPopulation::new(total);
        for route in routes {
            candidate.expose(&contagion, dt, route);
        }
        Ok(())
    }

    fn end_update(&mut self, infectivity_correction: f64) -> Result<(), EmodError> {
        if !self.built {
            return Err(EmodError::NotBuilt);
        }
        for accumulator in &mut self.accumulators {
            accumulator.end_update(infectivity_correction);
        }
        Ok(())
    }

    fn route_count(&self) -> usize {
        self.accumulators.len()
    }

    fn route_index(&self, route: &str) -> Option<RouteIndex> {
        self.route_names.iter().position(|name| name == route)
    }

    fn accumulator(&self, route: RouteIndex) -> Result<&ContagionAccumulator, EmodError> {
        if !self.built {
            return Err(EmodError::NotBuilt);
        }
        self.accumulators.get(route).ok_or_else(|| EmodError::BadMapKey {
            map: "route",
            key: route.to_string(),
        })
    }

    fn accumulator_mut(&mut self, route: RouteIndex) -> Result<&mut ContagionAccumulator, EmodError> {
        if !self.built {
            return Err(EmodError::NotBuilt);
        }
        self.accumulators
            .get_mut(route)
            .ok_or_else(|| EmodError::BadMapKey {
                map: "route",
                key: route.to_string(),
            })
    }
}
