//! Where the locations of interest sit in the *P. falciparum* genome and which nucleotide
//! sequence index each one maps to.

use std::ops::Range;

use super::params::GeneticsParams;

pub const NUM_CHROMOSOMES: usize = 14;

/// Chromosome lengths in base pairs (Gardner et al., 2002).
pub const CHROMOSOME_LENGTHS: [i32; NUM_CHROMOSOMES] = [
    643_000, 947_000, 1_100_000, 1_200_000, 1_300_000, 1_400_000, 1_400_000, 1_300_000, 1_500_000,
    1_700_000, 2_000_000, 2_300_000, 2_700_000, 3_300_000,
];

/// Cumulative genome location of the last base pair of each chromosome.
pub const CHROMOSOME_ENDS: [i32; NUM_CHROMOSOMES] = {
    let mut ends = [0; NUM_CHROMOSOMES];
    let mut total = 0;
    let mut i = 0;
    while i < NUM_CHROMOSOMES {
        total += CHROMOSOME_LENGTHS[i];
        ends[i] = total;
        i += 1;
    }
    ends
};

/// Largest valid 1-based genome location.
pub const MAX_LOCATIONS: i32 = CHROMOSOME_ENDS[NUM_CHROMOSOMES - 1];

/// Index of the chromosome containing `genome_location`.
#[must_use]
pub fn find_chromosome(genome_location: i32) -> usize {
    debug_assert!((0..=MAX_LOCATIONS).contains(&genome_location));
    CHROMOSOME_ENDS
        .partition_point(|&end| end < genome_location)
        .min(NUM_CHROMOSOMES - 1)
}

/// First and last 1-based genome location on `chromosome`.
#[must_use]
pub fn chromosome_bounds(chromosome: usize) -> (i32, i32) {
    let first = if chromosome == 0 {
        1
    } else {
        CHROMOSOME_ENDS[chromosome - 1] + 1
    };
    (first, CHROMOSOME_ENDS[chromosome])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocationType {
    Barcode,
    DrugResistance,
    Hrp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationIndex {
    pub genome_location: i32,
    pub nucleotide_index: usize,
}

/// Maps configured genome locations to positions in a nucleotide sequence. The sequence holds
/// one value per location, ordered by location.
#[derive(Debug, Clone, Default)]
pub struct GenomeLayout {
    indexes_barcode: Vec<usize>,
    indexes_drug_resistant: Vec<usize>,
    indexes_hrp: Vec<usize>,
    location_indexes_per_chromosome: Vec<Vec<LocationIndex>>,
    num_base_pairs: usize,
}

impl GenomeLayout {
    /// `params` must already be validated.
    #[must_use]
    pub fn new(params: &GeneticsParams) -> Self {
        let mut locations: Vec<(i32, LocationType)> = params
            .barcode_genome_locations
            .iter()
            .map(|&l| (l, LocationType::Barcode))
            .chain(
                params
                    .drug_resistant_genome_locations
                    .iter()
                    .map(|&l| (l, LocationType::DrugResistance)),
            )
            .chain(params.hrp_genome_locations.iter().map(|&l| (l, LocationType::Hrp)))
            .collect();
        locations.sort_unstable();

        let mut layout = GenomeLayout {
            location_indexes_per_chromosome: vec![Vec::new(); NUM_CHROMOSOMES],
            num_base_pairs: locations.len(),
            ..GenomeLayout::default()
        };
        for (nucleotide_index, (genome_location, location_type)) in locations.into_iter().enumerate() {
            match location_type {
                LocationType::Barcode => layout.indexes_barcode.push(nucleotide_index),
                LocationType::DrugResistance => layout.indexes_drug_resistant.push(nucleotide_index),
                LocationType::Hrp => layout.indexes_hrp.push(nucleotide_index),
            }
            layout.location_indexes_per_chromosome[find_chromosome(genome_location)].push(LocationIndex {
                genome_location,
                nucleotide_index,
            });
        }
        layout
    }

    #[must_use]
    pub fn num_base_pairs(&self) -> usize {
        self.num_base_pairs
    }

    #[must_use]
    pub fn indexes_barcode(&self) -> &[usize] {
        &self.indexes_barcode
    }

    #[must_use]
    pub fn indexes_drug_resistant(&self) -> &[usize] {
        &self.indexes_drug_resistant
    }

    #[must_use]
    pub fn indexes_hrp(&self) -> &[usize] {
        &self.indexes_hrp
    }

    #[must_use]
    pub fn location_indexes(&self, chromosome: usize) -> &[LocationIndex] {
        &self.location_indexes_per_chromosome[chromosome]
    }

    #[must_use]
    pub fn chromosome_has_locations_of_interest(&self, chromosome: usize) -> bool {
        !self.location_indexes_per_chromosome[chromosome].is_empty()
    }

    /// Sequence indexes belonging to `chromosome`, or `None` if it has no locations of interest.
    #[must_use]
    pub fn index_range_on_chromosome(&self, chromosome: usize) -> Option<Range<usize>> {
        let indexes = &self.location_indexes_per_chromosome[chromosome];
        let first = indexes.first()?.nucleotide_index;
        let last = indexes.last()?.nucleotide_index;
        Some(first..last + 1)
    }

    /// Sequence index of the first location of interest at or to the right of a crossover at
    /// `genome_location`. `None` if the crossover is off the chromosome or to the right of every
    /// location of interest on it.
    #[must_use]
    pub fn convert_crossover_location_to_index(&self, chromosome: usize, genome_location: i32) -> Option<usize> {
        let (first, last) = chromosome_bounds(chromosome);
        // Location 0 belongs to the first chromosome.
        let first = if chromosome == 0 { 0 } else { first - 1 };
        if genome_location < first || last < genome_location {
            return None;
        }
        let indexes = &self.location_indexes_per_chromosome[chromosome];
        let position = indexes.partition_point(|li| li.genome_location < genome_location);
        indexes.get(position).map(|li| li.nucleotide_index)
    }
}
