//! Intra-node contagion pooling.
//!
//! Agents are stratified into groups by the values of their transmission-relevant properties.
//! Each simulated day follows a strict phase order:
//!
//! 1. Agents register with [`TransmissionGroups::update_population_size`] and shed with
//!    [`TransmissionGroups::deposit_contagion`].
//! 2. [`TransmissionGroups::end_update`] spreads the shed contagion across groups through the
//!    route's scaling matrix, decays the existing pool, and derives the per-capita infection rate.
//! 3. Agents query [`TransmissionGroups::get_total_contagion`] or are handed to
//!    [`TransmissionGroups::expose_to_contagion`].
//!
//! Two variants implement the protocol: [`SimpleTransmissionGroups`] has exactly one route, while
//! [`MultiRouteTransmissionGroups`] keeps an independent pool per named route.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EmodError;

mod accumulator;
mod multi_route;
mod route;
pub mod scaling;
mod simple;

pub use accumulator::ContagionAccumulator;
pub use multi_route::MultiRouteTransmissionGroups;
pub use route::{RouteTable, TransmissionRoute};
pub use simple::SimpleTransmissionGroups;

/// Index of a route within one transmission-groups object, in registration order.
pub type RouteIndex = usize;
/// Index of a group (stratification cell) within a route.
pub type GroupIndex = usize;
/// The group an agent belongs to on each route it participates in. Iterates in route order.
pub type TransmissionGroupMembership = BTreeMap<RouteIndex, GroupIndex>;
pub type PropertyValueList = Vec<String>;
pub type MatrixRow = Vec<f64>;
/// Square mixing matrix indexed `[sink][source]`.
pub type ScalingMatrix = Vec<MatrixRow>;
pub type RouteToContagionDecayMap = BTreeMap<String, f64>;
/// An agent's property assignments, e.g. `RISK -> HIGH`.
pub type IndividualProperties = BTreeMap<String, String>;

/// Identifies the strain a deposit came from.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContagionStrain {
    pub antigen_id: u32,
    pub genetic_id: u32,
}

/// Single-value contagion view handed to an [`Infectable`] on exposure.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ContagionPopulation {
    pub antigen_id: u32,
    pub genetic_id: u32,
    pub total_contagion: f64,
}

impl ContagionPopulation {
    #[must_use]
    pub fn new(total_contagion: f64) -> Self {
        ContagionPopulation {
            antigen_id: 0,
            genetic_id: 0,
            total_contagion,
        }
    }
}

/// Anything that can be exposed to pooled contagion. Whether an exposure becomes an infection
/// is up to the implementor.
pub trait Infectable {
    fn expose(&mut self, contagion: &ContagionPopulation, dt: f64, route: TransmissionRoute);
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmissionGroupType {
    #[default]
    Simple,
    MultiRoute,
}

/// Constructs an empty, unbuilt transmission-groups object of the requested variant.
#[must_use]
pub fn create_transmission_groups(group_type: TransmissionGroupType) -> Box<dyn TransmissionGroups> {
    match group_type {
        TransmissionGroupType::Simple => Box::new(SimpleTransmissionGroups::new()),
        TransmissionGroupType::MultiRoute => Box::new(MultiRouteTransmissionGroups::new()),
    }
}

/// The contact/contagion protocol shared by both variants.
///
/// The object is single use: properties are added, `build` is called exactly once, and from then
/// on only the per-step operations are valid.
pub trait TransmissionGroups {
    /// Registers `property` with its possible `values` and the `values.len()`-square scaling
    /// matrix between them, on `route`.
    fn add_property(
        &mut self,
        property: &str,
        values: &[String],
        scaling_matrix: &ScalingMatrix,
        route: &str,
    ) -> Result<(), EmodError>;

    /// Aggregates the scaling matrices, stores decay rates and allocates the accumulators.
    fn build(
        &mut self,
        decay_rates: &RouteToContagionDecayMap,
        number_of_strains: u32,
        number_of_substrains: u32,
    ) -> Result<(), EmodError>;

    /// Computes the group an agent with `properties` belongs to on each requested route and
    /// writes it into `membership`.
    fn get_group_membership_for_properties(
        &self,
        routes: &[&str],
        properties: &IndividualProperties,
        membership: &mut TransmissionGroupMembership,
    ) -> Result<(), EmodError>;

    /// Exposes `candidate` to the summed infection rate of its membership, if that rate is
    /// positive.
    fn expose_to_contagion(
        &self,
        candidate: Option<&mut dyn Infectable>,
        membership: &TransmissionGroupMembership,
        dt: f64,
    ) -> Result<(), EmodError>;

    /// Runs the end-of-step update on every route.
    fn end_update(&mut self, infectivity_correction: f64) -> Result<(), EmodError>;

    /// Number of routes; zero before `build`.
    fn route_count(&self) -> usize;

    fn route_index(&self, route: &str) -> Option<RouteIndex>;

    fn accumulator(&self, route: RouteIndex) -> Result<&ContagionAccumulator, EmodError>;

    fn accumulator_mut(&mut self, route: RouteIndex) -> Result<&mut ContagionAccumulator, EmodError>;

    fn update_population_size(
        &mut self,
        membership: &TransmissionGroupMembership,
        size_delta: f64,
        monte_carlo_weight: f64,
    ) -> Result<(), EmodError> {
        let delta = size_delta * monte_carlo_weight;
        for (&route, &group) in membership {
            self.accumulator_mut(route)?.add_population(group, delta)?;
        }
        Ok(())
    }

    /// Adds `amount` to the shed contagion of every group in `membership`.
    fn deposit_contagion(
        &mut self,
        _strain: &ContagionStrain,
        amount: f64,
        membership: &TransmissionGroupMembership,
    ) -> Result<(), EmodError> {
        for (&route, &group) in membership {
            self.accumulator_mut(route)?.deposit(group, amount)?;
        }
        Ok(())
    }

    /// Sum of the infection rates computed at the last `end_update` over `membership`.
    fn get_total_contagion(&self, membership: &TransmissionGroupMembership) -> Result<f64, EmodError> {
        let mut total = 0.0;
        for (&route, &group) in membership {
            total += self.accumulator(route)?.infection_rate(group)?;
        }
        Ok(total)
    }

    /// Scales contagion already shed this step by `factor`.
    fn correct_infectivity_by_group(
        &mut self,
        factor: f64,
        membership: &TransmissionGroupMembership,
    ) -> Result<(), EmodError> {
        for (&route, &group) in membership {
            self.accumulator_mut(route)?.correct_shed(group, factor)?;
        }
        Ok(())
    }

    fn group_count(&self, route: RouteIndex) -> Result<usize, EmodError> {
        Ok(self.accumulator(route)?.group_count())
    }

    fn scaling_matrix(&self, route: RouteIndex) -> Result<&ScalingMatrix, EmodError> {
        Ok(self.accumulator(route)?.scaling_matrix())
    }

    fn decay_rate(&self, route: RouteIndex) -> Result<f64, EmodError> {
        Ok(self.accumulator(route)?.decay_rate())
    }

    fn shed_contagion(&self, route: RouteIndex, group: GroupIndex) -> Result<f64, EmodError> {
        self.accumulator(route)?.shed(group)
    }

    fn current_contagion(&self, route: RouteIndex, group: GroupIndex) -> Result<f64, EmodError> {
        self.accumulator(route)?.current(group)
    }

    fn infection_rate(&self, route: RouteIndex, group: GroupIndex) -> Result<f64, EmodError> {
        self.accumulator(route)?.infection_rate(group)
    }

    fn population_size(&self, route: RouteIndex) -> Result<f64, EmodError> {
        Ok(self.accumulator(route)?.population())
    }

    fn group_population(&self, route: RouteIndex, group: GroupIndex) -> Result<f64, EmodError> {
        self.accumulator(route)?.group_population(group)
    }
}

/// Validates a decay rate read from configuration.
pub(crate) fn check_decay_rate(route: &str, rate: f64) -> Result<f64, EmodError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(EmodError::InvalidDecayRate {
            route: route.to_string(),
            rate,
        });
    }
    Ok(rate)
}
