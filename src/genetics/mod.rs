//! Parasite genetics: genomes, the chromosome layout they are stored in, meiotic recombination
//! and the stochastic draws the parasite life cycle needs.
//!
//! [`ParasiteGenetics`] is the concrete service. Cohort code only depends on the
//! [`GeneticsService`] trait so that tests can substitute a deterministic stub, and on
//! [`ParasiteIdGenerator`] for naming the cohorts it creates.
mod genome;
mod layout;
mod params;
mod parasite_genetics;
mod recombination;

pub use genome::{
    calculate_barcode_hashcode, calculate_hashcode, nucleotide_char, nucleotide_value, ParasiteGenome,
    NUCLEOTIDES,
};
pub use layout::{
    chromosome_bounds, find_chromosome, GenomeLayout, LocationIndex, LocationType, CHROMOSOME_ENDS,
    CHROMOSOME_LENGTHS, MAX_LOCATIONS, NUM_CHROMOSOMES,
};
pub use params::{GeneticsParams, SporozoitesPerOocystDistribution};
pub use parasite_genetics::ParasiteGenetics;
pub use recombination::{independent_assortment, meiosis, Chromatid, Crossover, CrossoverModel};

use rand::Rng;

/// The genetics operations the parasite life cycle depends on.
pub trait GeneticsService {
    /// When set, genetics must not change results relative to a model without parasite
    /// genetics: no sporozoite mortality, no recombination and cohorts merge on stage and age
    /// alone.
    fn is_fpg_simulating_base_model(&self) -> bool;

    /// The products of meiosis between `female` and `male`: either exactly four genomes, or only
    /// the female genome when no recombination takes place.
    fn recombination<R: Rng>(
        &mut self,
        rng: &mut R,
        female: &ParasiteGenome,
        male: &ParasiteGenome,
    ) -> Vec<ParasiteGenome>;

    /// Number of sporozoites produced when `num_oocysts` oocysts burst.
    fn convert_oocysts_to_sporozoites<R: Rng>(&self, rng: &mut R, dt: f64, num_oocysts: u32) -> u32;

    /// Number of `num_sporozoites` still alive after `dt` days.
    fn reduce_sporozoites_due_to_death<R: Rng>(
        &self,
        rng: &mut R,
        dt: f64,
        num_sporozoites: u32,
        mortality_modifier: f64,
    ) -> u32;
}

/// Hands out unique parasite cohort ids.
pub trait ParasiteIdGenerator {
    fn next_parasite_suid(&mut self) -> u32;
}

/// Ids unique across `num_tasks` cooperating processes: task `rank` yields `rank + 1`,
/// `rank + 1 + num_tasks`, `rank + 1 + 2 * num_tasks` and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedIdGenerator {
    next: u32,
    num_tasks: u32,
}

impl DistributedIdGenerator {
    /// # Panics
    ///
    /// If `num_tasks` is zero or `rank` is not below it.
    #[must_use]
    pub fn new(rank: u32, num_tasks: u32) -> Self {
        assert!(
            rank < num_tasks,
            "rank {rank} must be less than the number of tasks {num_tasks}"
        );
        DistributedIdGenerator {
            next: rank + 1,
            num_tasks,
        }
    }

    /// # Panics
    ///
    /// When the id space is exhausted.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next = self
            .next
            .checked_add(self.num_tasks)
            .unwrap_or_else(|| panic!("internal error: ran out of ids after {id}"));
        id
    }
}

impl Default for DistributedIdGenerator {
    fn default() -> Self {
        DistributedIdGenerator::new(0, 1)
    }
}

impl ParasiteIdGenerator for DistributedIdGenerator {
    fn next_parasite_suid(&mut self) -> u32 {
        self.next_id()
    }
}
