//! Per-route contagion state: shed this step, the decaying pool, and the resulting force of
//! infection for every group.

use log::{debug, trace};

use super::{GroupIndex, ScalingMatrix};
use crate::error::EmodError;
use crate::numeric::dot;

/// Contagion bookkeeping for one route.
///
/// `shed` collects deposits during a step. `end_update` folds them into `current` through the
/// scaling matrix, applies decay, derives `infection_rate`, and clears `shed` for the next step.
#[derive(Debug, Clone)]
pub struct ContagionAccumulator {
    decay_rate: f64,
    scaling_matrix: ScalingMatrix,
    shed: Vec<f64>,
    current: Vec<f64>,
    infection_rate: Vec<f64>,
    population: f64,
    group_population: Vec<f64>,
}

impl ContagionAccumulator {
    #[must_use]
    pub fn new(scaling_matrix: ScalingMatrix, decay_rate: f64) -> Self {
        let groups = scaling_matrix.len();
        ContagionAccumulator {
            decay_rate,
            scaling_matrix,
            shed: vec![0.0; groups],
            current: vec![0.0; groups],
            infection_rate: vec![0.0; groups],
            population: 0.0,
            group_population: vec![0.0; groups],
        }
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.scaling_matrix.len()
    }

    #[must_use]
    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    #[must_use]
    pub fn scaling_matrix(&self) -> &ScalingMatrix {
        &self.scaling_matrix
    }

    fn check_group(&self, group: GroupIndex) -> Result<(), EmodError> {
        if group >= self.group_count() {
            return Err(EmodError::BadMapKey {
                map: "group",
                key: group.to_string(),
            });
        }
        Ok(())
    }

    pub fn deposit(&mut self, group: GroupIndex, amount: f64) -> Result<(), EmodError> {
        self.check_group(group)?;
        self.shed[group] += amount;
        Ok(())
    }

    /// Multiplies the contagion shed into `group` so far this step by `factor`.
    pub fn correct_shed(&mut self, group: GroupIndex, factor: f64) -> Result<(), EmodError> {
        self.check_group(group)?;
        self.shed[group] *= factor;
        Ok(())
    }

    pub fn add_population(&mut self, group: GroupIndex, delta: f64) -> Result<(), EmodError> {
        self.check_group(group)?;
        self.population += delta;
        self.group_population[group] += delta;
        Ok(())
    }

    /// Closes the step. For every sink group the pool decays, then receives the scaled shed
    /// contagion of all source groups times `infectivity_correction`.
    pub fn end_update(&mut self, infectivity_correction: f64) {
        let population = self.population;
        for (sink, row) in self.scaling_matrix.iter().enumerate() {
            let decayed = self.current[sink] * (1.0 - self.decay_rate);
            let incoming = dot(&self.shed, row) * infectivity_correction;
            self.current[sink] = decayed + incoming;
            self.infection_rate[sink] = if population > 0.0 {
                self.current[sink] / population
            } else {
                0.0
            };
            trace!(
                "group {sink}: current {:.6} rate {:.6}",
                self.current[sink],
                self.infection_rate[sink]
            );
        }
        self.shed.fill(0.0);
        debug!(
            "end_update over {} groups, population {population}",
            self.group_count()
        );
    }

    pub fn shed(&self, group: GroupIndex) -> Result<f64, EmodError> {
        self.check_group(group)?;
        Ok(self.shed[group])
    }

    pub fn current(&self, group: GroupIndex) -> Result<f64, EmodError> {
        self.check_group(group)?;
        Ok(self.current[group])
    }

    pub fn infection_rate(&self, group: GroupIndex) -> Result<f64, EmodError> {
        self.check_group(group)?;
        Ok(self.infection_rate[group])
    }

    /// Population summed over all groups; the force-of-infection denominator.
    #[must_use]
    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn group_population(&self, group: GroupIndex) -> Result<f64, EmodError> {
        self.check_group(group)?;
        Ok(self.group_population[group])
    }
}
