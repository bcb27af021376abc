//! Meiosis under the obligate chiasma crossover model.
//!
//! Each chromosome of the female and male genomes is duplicated into two sister chromatids. One
//! crossover per chromosome is obligate, at a uniformly chosen location; more crossovers are
//! placed to its left and right at gamma distributed distances until they run off the
//! chromosome. Each crossover swaps everything to its left between one female and one male
//! chromatid. Finally the four chromatids of each chromosome are shuffled (independent
//! assortment) so that every product is equally likely to carry any of them.
//!
//! Only the locations of interest are stored, so a crossover is applied by swapping the sequence
//! indexes between the start of the chromosome and the first location at or after the crossover.

use std::ops::Range;

use log::trace;
use rand::Rng;

use super::genome::ParasiteGenome;
use super::layout::{chromosome_bounds, GenomeLayout, NUM_CHROMOSOMES};
use crate::random::gamma;

/// Base pairs per unit of the crossover gamma distribution.
const CROSSOVER_DISTANCE_SCALE: f64 = 1_500_000.0;

/// Sister chromatid pairings `(female, male)` a crossover may involve.
const CHROMATID_PAIRS: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// All orderings of the four chromatids of a chromosome.
const ASSORTMENTS: [[usize; 4]; 24] = [
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 1, 3],
    [0, 2, 3, 1],
    [0, 3, 1, 2],
    [0, 3, 2, 1],
    [1, 0, 2, 3],
    [1, 0, 3, 2],
    [1, 2, 0, 3],
    [1, 2, 3, 0],
    [1, 3, 0, 2],
    [1, 3, 2, 0],
    [2, 0, 1, 3],
    [2, 0, 3, 1],
    [2, 1, 0, 3],
    [2, 1, 3, 0],
    [2, 3, 0, 1],
    [2, 3, 1, 0],
    [3, 0, 1, 2],
    [3, 0, 2, 1],
    [3, 1, 0, 2],
    [3, 1, 2, 0],
    [3, 2, 0, 1],
    [3, 2, 1, 0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossover {
    pub genome_location: i32,
    /// Which female sister chromatid takes part, 0 or 1.
    pub chromatid_female: usize,
    /// Which male sister chromatid takes part, 0 or 1.
    pub chromatid_male: usize,
    pub is_obligate: bool,
}

/// A working copy of one genome's sequence during meiosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromatid {
    pub nucleotide_sequence: Vec<i32>,
    pub allele_roots: Vec<i32>,
}

impl Chromatid {
    #[must_use]
    pub fn from_genome(genome: &ParasiteGenome) -> Self {
        Chromatid {
            nucleotide_sequence: genome.nucleotide_sequence().to_vec(),
            allele_roots: genome.allele_roots().to_vec(),
        }
    }

    fn has_allele_roots(&self) -> bool {
        self.allele_roots.len() == self.nucleotide_sequence.len()
    }

    fn swap_range(&mut self, other: &mut Chromatid, range: Range<usize>) {
        self.nucleotide_sequence[range.clone()]
            .swap_with_slice(&mut other.nucleotide_sequence[range.clone()]);
        if self.has_allele_roots() && other.has_allele_roots() {
            self.allele_roots[range.clone()].swap_with_slice(&mut other.allele_roots[range]);
        }
    }

    fn copy_range_from(&mut self, source: &Chromatid, range: Range<usize>) {
        self.nucleotide_sequence[range.clone()]
            .copy_from_slice(&source.nucleotide_sequence[range.clone()]);
        if self.has_allele_roots() && source.has_allele_roots() {
            self.allele_roots[range.clone()].copy_from_slice(&source.allele_roots[range]);
        }
    }
}

/// Gamma distributed spacing between crossovers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverModel {
    pub gamma_k: f64,
    pub gamma_theta: f64,
}

impl CrossoverModel {
    /// Distance in base pairs from one crossover to the next.
    pub fn secondary_crossover_distance<R: Rng>(&self, rng: &mut R) -> i32 {
        (gamma(rng, self.gamma_k, self.gamma_theta) * CROSSOVER_DISTANCE_SCALE) as i32
    }

    fn pick_pair<R: Rng>(rng: &mut R) -> (usize, usize) {
        CHROMATID_PAIRS[rng.random_range(0..CHROMATID_PAIRS.len())]
    }

    /// The crossovers on `chromosome`, ordered by location.
    pub fn find_crossovers<R: Rng>(&self, rng: &mut R, chromosome: usize) -> Vec<Crossover> {
        let (min_location, max_location) = chromosome_bounds(chromosome);

        let (chromatid_female, chromatid_male) = Self::pick_pair(rng);
        let obligate = Crossover {
            genome_location: rng.random_range(min_location..=max_location),
            chromatid_female,
            chromatid_male,
            is_obligate: true,
        };

        let mut left = Vec::new();
        let mut bound = obligate.genome_location - 1;
        loop {
            let location = bound.saturating_sub(self.secondary_crossover_distance(rng));
            if location < min_location || location > bound {
                break;
            }
            let (chromatid_female, chromatid_male) = Self::pick_pair(rng);
            left.push(Crossover {
                genome_location: location,
                chromatid_female,
                chromatid_male,
                is_obligate: false,
            });
            bound = location - 1;
        }

        let mut crossovers: Vec<Crossover> = left.into_iter().rev().collect();
        crossovers.push(obligate);

        let mut bound = obligate.genome_location + 1;
        loop {
            let location = bound.saturating_add(self.secondary_crossover_distance(rng));
            if location < bound || location > max_location {
                break;
            }
            let (chromatid_female, chromatid_male) = Self::pick_pair(rng);
            crossovers.push(Crossover {
                genome_location: location,
                chromatid_female,
                chromatid_male,
                is_obligate: false,
            });
            bound = location + 1;
        }
        crossovers
    }
}

/// Produces the four meiotic products of `female` and `male`, ordered as the two female derived
/// chromatids followed by the two male derived ones.
pub fn meiosis<R: Rng>(
    rng: &mut R,
    layout: &GenomeLayout,
    model: &CrossoverModel,
    female: &ParasiteGenome,
    male: &ParasiteGenome,
) -> [Chromatid; 4] {
    let mut chromatids = [
        Chromatid::from_genome(female),
        Chromatid::from_genome(female),
        Chromatid::from_genome(male),
        Chromatid::from_genome(male),
    ];

    for chromosome in 0..NUM_CHROMOSOMES {
        let Some(range) = layout.index_range_on_chromosome(chromosome) else {
            continue;
        };

        let crossovers = model.find_crossovers(rng, chromosome);
        trace!(
            "chromosome {chromosome}: {} crossovers",
            crossovers.len()
        );
        for crossover in &crossovers {
            let Some(index) = layout.convert_crossover_location_to_index(chromosome, crossover.genome_location)
            else {
                continue;
            };
            let (females, males) = chromatids.split_at_mut(2);
            females[crossover.chromatid_female]
                .swap_range(&mut males[crossover.chromatid_male], range.start..index);
        }

        independent_assortment(rng, &mut chromatids, range);
    }
    chromatids
}

/// Reorders the four chromatids within `range` by a uniformly chosen permutation.
pub fn independent_assortment<R: Rng>(rng: &mut R, chromatids: &mut [Chromatid; 4], range: Range<usize>) {
    let order = ASSORTMENTS[rng.random_range(0..ASSORTMENTS.len())];
    if order == [0, 1, 2, 3] {
        return;
    }
    let original = chromatids.clone();
    for (target, &source) in chromatids.iter_mut().zip(order.iter()) {
        target.copy_range_from(&original[source], range.clone());
    }
}
