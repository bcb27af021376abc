//! Parasite cohorts: counts of genetically identical parasites sharing a life stage.
//!
//! Inside a mosquito a female gametocyte cohort mates with a male one and becomes an oocyst
//! cohort. Once its progress reaches one it bursts into sporozoites, which then die off a little
//! every update and leave the mosquito in batches through `split` when it bites.
mod collection;

pub use collection::CohortCollection;

use std::fmt::{self, Display};

use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::genetics::{GeneticsService, ParasiteGenome, ParasiteIdGenerator};
use crate::random::multinomial;
use crate::transmission::ContagionStrain;

/// Life stage of the parasites in a cohort. Stages only ever move forward:
/// `GametocyteFemale -> Oocyst -> Sporozoite`. Male gametocytes never progress; they are consumed
/// by mating.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParasiteState {
    GametocyteFemale,
    GametocyteMale,
    Oocyst,
    Sporozoite,
}

impl Display for ParasiteState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ParasiteState::GametocyteFemale => "GAMETOCYTE_FEMALE",
            ParasiteState::GametocyteMale => "GAMETOCYTE_MALE",
            ParasiteState::Oocyst => "OOCYST",
            ParasiteState::Sporozoite => "SPOROZOITE",
        };
        f.write_str(name)
    }
}

/// The strain a cohort carries: its genome and the bite that delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct StrainIdentity {
    pub genome: ParasiteGenome,
    pub bite_id: u32,
}

impl StrainIdentity {
    #[must_use]
    pub fn new(genome: ParasiteGenome) -> Self {
        StrainIdentity { genome, bite_id: 0 }
    }

    #[must_use]
    pub fn genetic_id(&self) -> u32 {
        self.genome.id()
    }

    /// The strain as seen by transmission groups when it is deposited.
    #[must_use]
    pub fn contagion_strain(&self) -> ContagionStrain {
        ContagionStrain {
            antigen_id: 0,
            genetic_id: self.genetic_id(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParasiteCohort {
    id: u32,
    state: ParasiteState,
    strain: StrainIdentity,
    male_gametocyte_genome: Option<ParasiteGenome>,
    age: f64,
    progress: f64,
    oocyst_duration: f64,
    population: u32,
}

impl ParasiteCohort {
    #[must_use]
    pub fn new(id: u32, state: ParasiteState, strain: StrainIdentity, age: f64, population: u32) -> Self {
        ParasiteCohort {
            id,
            state,
            strain,
            male_gametocyte_genome: None,
            age,
            progress: 0.0,
            oocyst_duration: 0.0,
            population,
        }
    }

    /// A copy of this cohort, progress included, under a new id.
    #[must_use]
    pub fn clone_with_id(&self, id: u32) -> Self {
        ParasiteCohort { id, ..self.clone() }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ParasiteState {
        self.state
    }

    #[must_use]
    pub fn strain_identity(&self) -> &StrainIdentity {
        &self.strain
    }

    #[must_use]
    pub fn genome(&self) -> &ParasiteGenome {
        &self.strain.genome
    }

    /// Present once the cohort has mated.
    #[must_use]
    pub fn male_gametocyte_genome(&self) -> Option<&ParasiteGenome> {
        self.male_gametocyte_genome.as_ref()
    }

    /// Days since the cohort was created.
    #[must_use]
    pub fn age(&self) -> f64 {
        self.age
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Days spent as an oocyst.
    #[must_use]
    pub fn oocyst_duration(&self) -> f64 {
        self.oocyst_duration
    }

    #[must_use]
    pub fn population(&self) -> u32 {
        self.population
    }

    pub fn set_bite_id(&mut self, bite_id: u32) {
        self.strain.bite_id = bite_id;
    }

    /// Advances the cohort by `dt` days.
    ///
    /// Once progress reaches one, an oocyst cohort bursts into sporozoites. A sporozoite cohort
    /// loses parasites to mortality on every update from then on.
    pub fn update<R: Rng, G: GeneticsService>(
        &mut self,
        rng: &mut R,
        genetics: &G,
        dt: f64,
        progress_delta: f64,
        sporozoite_mortality_modifier: f64,
    ) {
        self.age += dt;
        self.progress += progress_delta;
        if self.state == ParasiteState::Oocyst {
            self.oocyst_duration += dt;
        }
        trace!(
            "cohort {}: state {} progress {} population {} age {}",
            self.id,
            self.state,
            self.progress,
            self.population,
            self.age
        );

        if self.progress < 1.0 {
            return;
        }
        match self.state {
            ParasiteState::Oocyst => {
                self.state = ParasiteState::Sporozoite;
                self.population = genetics.convert_oocysts_to_sporozoites(rng, dt, self.population);
            }
            ParasiteState::Sporozoite => {
                self.oocyst_duration = 0.0;
                let before = self.population;
                self.population = genetics.reduce_sporozoites_due_to_death(
                    rng,
                    dt,
                    self.population,
                    sporozoite_mortality_modifier,
                );
                trace!(
                    "sporozoite cohort {}: {before} -> {} [{}]",
                    self.id,
                    self.population,
                    self.genome().barcode()
                );
            }
            ParasiteState::GametocyteFemale | ParasiteState::GametocyteMale => {}
        }
    }

    /// Whether `other` can be folded into this cohort. Stage and age must match; unless genetics
    /// is imitating the base model, so must the genetic id and the male gametocyte genome.
    #[must_use]
    pub fn can_merge<G: GeneticsService>(&self, other: &ParasiteCohort, genetics: &G) -> bool {
        if self.age != other.age || self.state != other.state {
            return false;
        }
        genetics.is_fpg_simulating_base_model()
            || (self.male_gametocyte_genome == other.male_gametocyte_genome
                && self.strain.genetic_id() == other.strain.genetic_id())
    }

    /// Adds the population of `other` to this cohort if the two are compatible. Returns whether
    /// it did.
    pub fn merge<G: GeneticsService>(&mut self, other: &ParasiteCohort, genetics: &G) -> bool {
        if !self.can_merge(other, genetics) {
            return false;
        }
        self.population += other.population;
        true
    }

    /// Fertilizes this female gametocyte cohort with `males`, turning it into an oocyst cohort.
    ///
    /// # Panics
    ///
    /// If this cohort is not female gametocytes or `males` is not male gametocytes.
    pub fn mate(&mut self, males: &ParasiteCohort) {
        assert_eq!(
            self.state,
            ParasiteState::GametocyteFemale,
            "cohort {} cannot mate as the female",
            self.id
        );
        assert_eq!(
            males.state,
            ParasiteState::GametocyteMale,
            "cohort {} cannot mate as the male",
            males.id
        );
        self.state = ParasiteState::Oocyst;
        self.progress = 0.0;
        self.male_gametocyte_genome = Some(males.genome().clone());
    }

    /// Recombines the female genome with the stored male genome.
    ///
    /// When the genetics service produces four genomes this cohort keeps the first and three new
    /// cohorts, appended to `new_cohorts`, carry the others; the population is spread over the
    /// four with equal probability. When it produces one genome nothing changes.
    ///
    /// # Panics
    ///
    /// If the cohort has not mated, if the service returns any other number of genomes, or if a
    /// single returned genome is not the female genome.
    pub fn recombination<R, G, I>(
        &mut self,
        rng: &mut R,
        genetics: &mut G,
        ids: &mut I,
        new_cohorts: &mut Vec<ParasiteCohort>,
    ) where
        R: Rng,
        G: GeneticsService,
        I: ParasiteIdGenerator + ?Sized,
    {
        let Some(male) = self.male_gametocyte_genome.clone() else {
            panic!("cohort {} recombined before mating", self.id);
        };
        let female = self.genome().clone();
        let mut genomes = genetics.recombination(rng, &female, &male);

        match genomes.len() {
            4 => {
                let populations = multinomial(rng, self.population, &[0.25; 4]);
                let mut siblings: Vec<ParasiteCohort> = genomes
                    .drain(1..)
                    .zip(&populations[1..])
                    .map(|(genome, &population)| {
                        let mut sibling = self.clone_with_id(ids.next_parasite_suid());
                        sibling.strain.genome = genome;
                        sibling.population = population;
                        sibling
                    })
                    .collect();
                self.strain.genome = genomes.remove(0);
                self.population = populations[0];
                new_cohorts.append(&mut siblings);
            }
            1 => {
                assert_eq!(
                    genomes[0].id(),
                    female.id(),
                    "recombination without crossover must return the female genome"
                );
            }
            n => panic!("internal error: recombination produced {n} genomes"),
        }
    }

    /// Moves `num_leaving` parasites, or all of them if there are fewer, into a new cohort with
    /// id `new_id`. The new cohort starts with no progress.
    pub fn split(&mut self, new_id: u32, num_leaving: u32) -> ParasiteCohort {
        let leaving = num_leaving.min(self.population);
        self.population -= leaving;
        ParasiteCohort::new(new_id, self.state, self.strain.clone(), self.age, leaving)
    }
}
