use std::collections::BTreeMap;

use log::{debug, trace};

use super::scaling::ScalingMatrixBuilder;
use super::{
    check_decay_rate, ContagionAccumulator, ContagionPopulation, IndividualProperties, Infectable,
    PropertyValueList, RouteIndex, RouteToContagionDecayMap, ScalingMatrix, TransmissionGroupMembership,
    TransmissionGroups, TransmissionRoute,
};
use crate::error::EmodError;

/// The only route index a single-route object hands out.
const ROUTE: RouteIndex = 0;

/// Transmission groups with a single route.
///
/// Every property must name the same route. Membership always contains route 0, and exposure is
/// reported as [`TransmissionRoute::All`].
#[derive(Debug, Default, Clone)]
pub struct SimpleTransmissionGroups {
    route_name: Option<String>,
    properties: BTreeMap<String, PropertyValueList>,
    scaling: ScalingMatrixBuilder,
    accumulator: Option<ContagionAccumulator>,
}

impl SimpleTransmissionGroups {
    #[must_use]
    pub fn new() -> Self {
        SimpleTransmissionGroups::default()
    }

    /// The route named by the registered properties, if any were added.
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    fn check_route(&self, route: &str) -> Result<(), EmodError> {
        match &self.route_name {
            Some(existing) if existing != route => Err(EmodError::SingleRouteOnly {
                existing: existing.clone(),
                requested: route.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn is_built(&self) -> bool {
        self.accumulator.is_some()
    }
}

impl TransmissionGroups for SimpleTransmissionGroups {
    fn add_property(
        &mut self,
        property: &str,
        values: &[String],
        scaling_matrix: &ScalingMatrix,
        route: &str,
    ) -> Result<(), EmodError> {
        if self.is_built() {
            return Err(EmodError::AlreadyBuilt);
        }
        debug!("adding property {property} on route {route}");
        self.check_route(route)?;
        self.scaling.register(property, values, scaling_matrix)?;

        self.route_name.get_or_insert_with(|| route.to_string());
        self.properties.insert(property.to_string(), values.to_vec());
        Ok(())
    }

    fn build(
        &mut self,
        decay_rates: &RouteToContagionDecayMap,
        number_of_strains: u32,
        number_of_substrains: u32,
    ) -> Result<(), EmodError> {
        if self.is_built() {
            return Err(EmodError::AlreadyBuilt);
        }
        let scaling_matrix = self.scaling.build_route_matrix(&self.properties)?;

        let decay_rate = match self
            .route_name
            .as_ref()
            .and_then(|name| decay_rates.get(name).map(|rate| (name, *rate)))
        {
            Some((name, rate)) => check_decay_rate(name, rate)?,
            None => 1.0,
        };
        debug!(
            "built single route with {} groups, decay rate {decay_rate}, {number_of_strains} strains \
             x {number_of_substrains} substrains",
            scaling_matrix.len()
        );

        self.accumulator = Some(ContagionAccumulator::new(scaling_matrix, decay_rate));
        Ok(())
    }

    /// Route 0 is always present. The requested route list is not consulted since there is only
    /// one route. Properties that were never added are ignored.
    fn get_group_membership_for_properties(
        &self,
        _routes: &[&str],
        properties: &IndividualProperties,
        membership: &mut TransmissionGroupMembership,
    ) -> Result<(), EmodError> {
        if !self.is_built() {
            return Err(EmodError::NotBuilt);
        }
        let mut group = 0;
        for (property, value) in properties {
            if self.scaling.offsets_for(property).is_some() {
                group += self.scaling.offset(property, value)?;
            }
        }
        trace!("{properties:?} => group {group} on route 0");
        membership.insert(ROUTE, group);
        Ok(())
    }

    fn expose_to_contagion(
        &self,
        candidate: Option<&mut dyn Infectable>,
        membership: &TransmissionGroupMembership,
        dt: f64,
    ) -> Result<(), EmodError> {
        let group = *membership.get(&ROUTE).ok_or_else(|| EmodError::BadMapKey {
            map: "membership",
            key: ROUTE.to_string(),
        })?;
        let rate = self.accumulator(ROUTE)?.infection_rate(group)?;
        if rate > 0.0 {
            if let Some(candidate) = candidate {
                candidate.expose(&ContagionPopulation::new(rate), dt, TransmissionRoute::All);
            }
        }
        Ok(())
    }

    fn end_update(&mut self, infectivity_correction: f64) -> Result<(), EmodError> {
        self.accumulator_mut(ROUTE)?.end_update(infectivity_correction);
        Ok(())
    }

    fn route_count(&self) -> usize {
        usize::from(self.is_built())
    }

    fn route_index(&self, route: &str) -> Option<RouteIndex> {
        (self.is_built() && self.route_name.as_deref().is_none_or(|name| name == route)).then_some(ROUTE)
    }

    fn accumulator(&self, route: RouteIndex) -> Result<&ContagionAccumulator, EmodError> {
        let accumulator = self.accumulator.as_ref().ok_or(EmodError::NotBuilt)?;
        if route != ROUTE {
            return Err(EmodError::BadMapKey {
                map: "route",
                key: route.to_string(),
            });
        }
        Ok(accumulator)
    }

    fn accumulator_mut(&mut self, route: RouteIndex) -> Result<&mut ContagionAccumulator, EmodError> {
        let accumulator = self.accumulator.as_mut().ok_or(EmodError::NotBuilt)?;
        if route != ROUTE {
            return Err(EmodError::BadMapKey {
                map: "route",
                key: route.to_string(),
            });
        }
        Ok(accumulator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;
    use crate::transmission::ContagionStrain;

    fn values(names: &[&str]) -> PropertyValueList {
        names.iter().map(ToString::to_string).collect()
    }

    fn properties(pairs: &[(&str, &str)]) -> IndividualProperties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn risk_groups(decay: f64) -> SimpleTransmissionGroups {
        let mut groups = SimpleTransmissionGroups::new();
        groups
            .add_property(
                "RISK",
                &values(&["LOW", "HIGH"]),
                &vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                "CONTACT",
            )
            .unwrap();
        let mut decay_rates = RouteToContagionDecayMap::new();
        decay_rates.insert("CONTACT".to_string(), decay);
        groups.build(&decay_rates, 1, 1).unwrap();
        groups
    }

    struct Recorder {
        exposures: Vec<(f64, f64, TransmissionRoute)>,
    }

    impl Infectable for Recorder {
        fn expose(&mut self, contagion: &ContagionPopulation, dt: f64, route: TransmissionRoute) {
            self.exposures.push((contagion.total_contagion, dt, route));
        }
    }

    #[test]
    fn deposit_end_update_expose() {
        let mut groups = risk_groups(0.5);
        let mut low = TransmissionGroupMembership::new();
        groups
            .get_group_membership_for_properties(&["CONTACT"], &properties(&[("RISK", "LOW")]), &mut low)
            .unwrap();
        assert_eq!(low.get(&0), Some(&0));

        groups.update_population_size(&low, 10.0, 1.0).unwrap();
        groups
            .deposit_contagion(&ContagionStrain::default(), 5.0, &low)
            .unwrap();
        groups.end_update(1.0).unwrap();
        assert_almost_eq!(groups.current_contagion(0, 0).unwrap(), 5.0, 1e-12);
        assert_almost_eq!(groups.infection_rate(0, 0).unwrap(), 0.5, 1e-12);
        assert_almost_eq!(groups.get_total_contagion(&low).unwrap(), 0.5, 1e-12);

        let mut recorder = Recorder { exposures: Vec::new() };
        groups
            .expose_to_contagion(Some(&mut recorder), &low, 1.0)
            .unwrap();
        assert_eq!(recorder.exposures, vec![(0.5, 1.0, TransmissionRoute::All)]);

        groups.end_update(1.0).unwrap();
        assert_almost_eq!(groups.current_contagion(0, 0).unwrap(), 2.5, 1e-12);
        assert_almost_eq!(groups.infection_rate(0, 0).unwrap(), 0.25, 1e-12);
    }

    #[test]
    fn no_exposure_without_contagion() {
        let groups = risk_groups(1.0);
        let mut high = TransmissionGroupMembership::new();
        groups
            .get_group_membership_for_properties(&[], &properties(&[("RISK", "HIGH")]), &mut high)
            .unwrap();
        assert_eq!(high.get(&0), Some(&1));

        let mut recorder = Recorder { exposures: Vec::new() };
        groups
            .expose_to_contagion(Some(&mut recorder), &high, 1.0)
            .unwrap();
        assert!(recorder.exposures.is_empty());
        groups.expose_to_contagion(None, &high, 1.0).unwrap();
    }

    #[test]
    fn second_route_is_rejected() {
        let mut groups = SimpleTransmissionGroups::new();
        groups
            .add_property("RISK", &values(&["LOW"]), &vec![vec![1.0]], "CONTACT")
            .unwrap();
        let result = groups.add_property("PLACE", &values(&["A"]), &vec![vec![1.0]], "ENVIRONMENTAL");
        assert!(matches!(result, Err(EmodError::SingleRouteOnly { .. })));
        assert_eq!(groups.route_name(), Some("CONTACT"));
    }

    #[test]
    fn unspecified_route_decays_fully() {
        let mut groups = SimpleTransmissionGroups::new();
        groups
            .add_property("RISK", &values(&["LOW"]), &vec![vec![1.0]], "CONTACT")
            .unwrap();
        groups.build(&RouteToContagionDecayMap::new(), 1, 1).unwrap();
        assert_eq!(groups.decay_rate(0).unwrap(), 1.0);
    }

    #[test]
    fn single_use_build() {
        let mut groups = risk_groups(0.5);
        assert!(matches!(
            groups.build(&RouteToContagionDecayMap::new(), 1, 1),
            Err(EmodError::AlreadyBuilt)
        ));
        assert!(matches!(
            groups.add_property("AGE", &values(&["YOUNG"]), &vec![vec![1.0]], "CONTACT"),
            Err(EmodError::AlreadyBuilt)
        ));
    }

    #[test]
    fn unbuilt_queries_fail() {
        let mut groups = SimpleTransmissionGroups::new();
        let mut membership = TransmissionGroupMembership::new();
        assert!(matches!(
            groups.get_group_membership_for_properties(&[], &properties(&[]), &mut membership),
            Err(EmodError::NotBuilt)
        ));
        membership.insert(0, 0);
        assert!(matches!(groups.end_update(1.0), Err(EmodError::NotBuilt)));
        assert!(groups.get_total_contagion(&membership).is_err());
    }

    #[test]
    fn membership_ignores_unknown_properties_but_not_unknown_values() {
        let groups = risk_groups(1.0);
        let mut membership = TransmissionGroupMembership::new();
        groups
            .get_group_membership_for_properties(
                &[],
                &properties(&[("QUALITY_OF_CARE", "GOOD"), ("RISK", "HIGH")]),
                &mut membership,
            )
            .unwrap();
        assert_eq!(membership.get(&0), Some(&1));

        let result = groups.get_group_membership_for_properties(
            &[],
            &properties(&[("RISK", "MEDIUM")]),
            &mut membership,
        );
        assert!(matches!(result, Err(EmodError::UnknownPropertyValue { .. })));
    }

    #[test]
    fn no_properties_is_one_group() {
        let mut groups = SimpleTransmissionGroups::new();
        groups.build(&RouteToContagionDecayMap::new(), 1, 1).unwrap();
        assert_eq!(groups.group_count(0).unwrap(), 1);
        assert_eq!(groups.route_count(), 1);
        assert_eq!(groups.route_index("ANYTHING"), Some(0));
        assert!(matches!(
            groups.group_count(1),
            Err(EmodError::BadMapKey { map: "route", .. })
        ));
    }

    #[test]
    fn correction_and_population_removal() {
        let mut groups = risk_groups(1.0);
        let mut low = TransmissionGroupMembership::new();
        groups
            .get_group_membership_for_properties(&[], &properties(&[("RISK", "LOW")]), &mut low)
            .unwrap();
        groups.update_population_size(&low, 4.0, 2.0).unwrap();
        groups.update_population_size(&low, -4.0, 2.0).unwrap();
        assert_eq!(groups.population_size(0).unwrap(), 0.0);

        groups
            .deposit_contagion(&ContagionStrain::default(), 8.0, &low)
            .unwrap();
        groups.correct_infectivity_by_group(0.5, &low).unwrap();
        assert_almost_eq!(groups.shed_contagion(0, 0).unwrap(), 4.0, 1e-12);

        groups.end_update(1.0).unwrap();
        assert_almost_eq!(groups.current_contagion(0, 0).unwrap(), 4.0, 1e-12);
        // No population, so no force of infection.
        assert_eq!(groups.infection_rate(0, 0).unwrap(), 0.0);
    }
}
