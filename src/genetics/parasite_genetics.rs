use log::{debug, trace};
use rand::Rng;

use super::genome::{calculate_hashcode, nucleotide_value, ParasiteGenome};
use super::layout::GenomeLayout;
use super::params::GeneticsParams;
use super::recombination::{meiosis, Chromatid, CrossoverModel};
use super::{DistributedIdGenerator, GeneticsService};
use crate::error::EmodError;
use crate::random::{binomial, expcdf, negative_binomial};
use crate::{HashMap, HashMapExt};

/// The genetics service of a simulation: owns the configuration, the genome layout and the
/// registry of live genomes.
///
/// Genomes with the same content are stored once. Creating a genome whose content is already
/// registered returns the registered genome, id included.
#[derive(Debug)]
pub struct ParasiteGenetics {
    params: GeneticsParams,
    layout: GenomeLayout,
    crossover_model: CrossoverModel,
    genomes: HashMap<i64, ParasiteGenome>,
    genome_ids: DistributedIdGenerator,
}

impl ParasiteGenetics {
    pub fn new(params: GeneticsParams) -> Result<Self, EmodError> {
        Self::with_id_generator(params, DistributedIdGenerator::default())
    }

    /// Like `new`, with genome ids taken from `genome_ids` so that several processes can create
    /// genomes without id collisions.
    pub fn with_id_generator(
        params: GeneticsParams,
        genome_ids: DistributedIdGenerator,
    ) -> Result<Self, EmodError> {
        params.validate()?;
        let layout = GenomeLayout::new(&params);
        debug!(
            "parasite genetics: {} locations of interest ({} barcode, {} drug resistant, {} HRP), base model = {}",
            layout.num_base_pairs(),
            layout.indexes_barcode().len(),
            layout.indexes_drug_resistant().len(),
            layout.indexes_hrp().len(),
            params.enable_fpg_similarity_to_base
        );
        let crossover_model = CrossoverModel {
            gamma_k: params.crossover_gamma_k,
            gamma_theta: params.crossover_gamma_theta,
        };
        Ok(ParasiteGenetics {
            params,
            layout,
            crossover_model,
            genomes: HashMap::new(),
            genome_ids,
        })
    }

    #[must_use]
    pub fn params(&self) -> &GeneticsParams {
        &self.params
    }

    #[must_use]
    pub fn layout(&self) -> &GenomeLayout {
        &self.layout
    }

    #[must_use]
    pub fn num_base_pairs(&self) -> usize {
        self.layout.num_base_pairs()
    }

    /// Number of distinct genomes in the registry.
    #[must_use]
    pub fn genome_count(&self) -> usize {
        self.genomes.len()
    }

    pub fn clear_genome_map(&mut self) {
        self.genomes.clear();
    }

    /// Drops the genomes that nothing outside the registry refers to any more.
    pub fn reduce_genome_map(&mut self) {
        let before = self.genomes.len();
        self.genomes.retain(|_, genome| genome.handle_count() > 1);
        trace!(
            "genome registry reduced from {before} to {}",
            self.genomes.len()
        );
    }

    fn register(&mut self, nucleotide_sequence: Vec<i32>, allele_roots: Vec<i32>) -> ParasiteGenome {
        let hashcode = calculate_hashcode(&nucleotide_sequence, &allele_roots);
        if let Some(existing) = self.genomes.get(&hashcode) {
            return existing.clone();
        }
        let genome = ParasiteGenome::new(
            self.genome_ids.next_id(),
            nucleotide_sequence,
            allele_roots,
            self.layout.indexes_barcode(),
        );
        self.genomes.insert(hashcode, genome.clone());
        genome
    }

    fn fill_values(
        sequence: &mut [i32],
        parameter: &'static str,
        locations_parameter: &str,
        values: &str,
        indexes: &[usize],
    ) -> Result<(), EmodError> {
        let length = values.chars().count();
        if length != indexes.len() {
            return Err(EmodError::InvalidParameter {
                name: parameter,
                message: format!(
                    "'{values}' has {length} characters but '{locations_parameter}' has {} locations",
                    indexes.len()
                ),
            });
        }
        for (c, &index) in values.chars().zip(indexes) {
            sequence[index] = nucleotide_value(parameter, c)?;
        }
        Ok(())
    }

    /// A genome with the given barcode, drug resistance and HRP alleles. Each string must have
    /// one `A`/`C`/`G`/`T` character per configured location of its kind.
    pub fn create_genome_from_barcode(
        &mut self,
        barcode: &str,
        drug_resistant: &str,
        hrp: &str,
    ) -> Result<ParasiteGenome, EmodError> {
        let mut sequence = vec![0; self.layout.num_base_pairs()];
        Self::fill_values(
            &mut sequence,
            "Barcode_String",
            "Barcode_Genome_Locations",
            barcode,
            self.layout.indexes_barcode(),
        )?;
        Self::fill_values(
            &mut sequence,
            "Drug_Resistant_String",
            "Drug_Resistant_Genome_Locations",
            drug_resistant,
            self.layout.indexes_drug_resistant(),
        )?;
        Self::fill_values(
            &mut sequence,
            "HRP_String",
            "HRP_Genome_Locations",
            hrp,
            self.layout.indexes_hrp(),
        )?;
        Ok(self.register(sequence, Vec::new()))
    }

    /// A genome with the given barcode and allele roots. `allele_roots` must be empty or have one
    /// entry per location of interest.
    pub fn create_genome(&mut self, barcode: &str, allele_roots: Vec<i32>) -> Result<ParasiteGenome, EmodError> {
        if !allele_roots.is_empty() && allele_roots.len() != self.layout.num_base_pairs() {
            return Err(EmodError::InvalidParameter {
                name: "Allele_Roots",
                message: format!(
                    "{} roots given for {} locations of interest",
                    allele_roots.len(),
                    self.layout.num_base_pairs()
                ),
            });
        }
        let mut sequence = vec![0; self.layout.num_base_pairs()];
        Self::fill_values(
            &mut sequence,
            "Barcode_String",
            "Barcode_Genome_Locations",
            barcode,
            self.layout.indexes_barcode(),
        )?;
        Ok(self.register(sequence, allele_roots))
    }

    /// The sequence of `genome` with every allele rooted in infection `infection_id`.
    pub fn create_genome_with_root(&mut self, genome: &ParasiteGenome, infection_id: i32) -> ParasiteGenome {
        let sequence = genome.nucleotide_sequence().to_vec();
        let roots = vec![infection_id; sequence.len()];
        self.register(sequence, roots)
    }

    /// Sporozoites a mosquito delivers in one infectious bite, never zero.
    pub fn num_sporozoites_in_bite<R: Rng>(&self, rng: &mut R) -> u32 {
        loop {
            let n = negative_binomial(
                rng,
                self.params.num_sporozoites_in_bite_fail,
                self.params.probability_sporozoite_in_bite_fails,
            );
            if n > 0 {
                return n;
            }
        }
    }

    /// Oocysts a mosquito develops after biting an infectious person, never zero.
    pub fn num_oocysts_from_bite<R: Rng>(&self, rng: &mut R) -> u32 {
        loop {
            let n = negative_binomial(
                rng,
                self.params.num_oocyst_from_bite_fail,
                self.params.probability_oocyst_from_bite_fails,
            );
            if n > 0 {
                return n;
            }
        }
    }

    pub fn secondary_crossover_distance<R: Rng>(&self, rng: &mut R) -> i32 {
        self.crossover_model.secondary_crossover_distance(rng)
    }

    fn child_genome(&mut self, parent: &ParasiteGenome, chromatid: Chromatid) -> ParasiteGenome {
        let hashcode = calculate_hashcode(&chromatid.nucleotide_sequence, &chromatid.allele_roots);
        if hashcode == parent.hashcode() {
            return parent.clone();
        }
        self.register(chromatid.nucleotide_sequence, chromatid.allele_roots)
    }
}

impl GeneticsService for ParasiteGenetics {
    fn is_fpg_simulating_base_model(&self) -> bool {
        self.params.enable_fpg_similarity_to_base
    }

    fn recombination<R: Rng>(
        &mut self,
        rng: &mut R,
        female: &ParasiteGenome,
        male: &ParasiteGenome,
    ) -> Vec<ParasiteGenome> {
        if self.is_fpg_simulating_base_model() || female.id() == male.id() {
            return vec![female.clone()];
        }

        let [f0, f1, m0, m1] = meiosis(rng, &self.layout, &self.crossover_model, female, male);
        vec![
            self.child_genome(female, f0),
            self.child_genome(female, f1),
            self.child_genome(male, m0),
            self.child_genome(male, m1),
        ]
    }

    fn convert_oocysts_to_sporozoites<R: Rng>(&self, rng: &mut R, _dt: f64, num_oocysts: u32) -> u32 {
        let per_oocyst = self.params.sporozoites_per_oocyst.draw(rng);
        // Saturates at u32::MAX.
        (f64::from(num_oocysts) * per_oocyst) as u32
    }

    fn reduce_sporozoites_due_to_death<R: Rng>(
        &self,
        rng: &mut R,
        dt: f64,
        num_sporozoites: u32,
        mortality_modifier: f64,
    ) -> u32 {
        if self.is_fpg_simulating_base_model() {
            return num_sporozoites;
        }
        let p = expcdf(-dt * self.params.sporozoite_mortality_rate()) * mortality_modifier;
        let num_dead = binomial(rng, num_sporozoites, p);
        trace!("{num_dead} of {num_sporozoites} sporozoites died (p = {p})");
        num_sporozoites.saturating_sub(num_dead)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::genetics::SporozoitesPerOocystDistribution;

    fn params() -> GeneticsParams {
        GeneticsParams {
            barcode_genome_locations: vec![100, 200_000, 700_000, 5_000_000],
            drug_resistant_genome_locations: vec![300_000],
            hrp_genome_locations: vec![10_000_000],
            ..GeneticsParams::default()
        }
    }

    #[test]
    fn invalid_params_are_rejected() {
        let bad = GeneticsParams {
            sporozoite_life_expectancy: -1.0,
            ..GeneticsParams::default()
        };
        assert!(matches!(
            ParasiteGenetics::new(bad),
            Err(EmodError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn genome_from_barcode() {
        let mut genetics = ParasiteGenetics::new(params()).unwrap();
        let genome = genetics.create_genome_from_barcode("ACGT", "G", "T").unwrap();
        assert_eq!(genome.barcode(), "ACGT");
        // Sorted by location: 100, 200000, 300000 (drug), 700000, 5000000, 10000000 (hrp)
        assert_eq!(genome.nucleotide_sequence(), [0, 1, 2, 2, 3, 3]);
        assert_eq!(genome.id(), 1);
        assert_eq!(genetics.genome_count(), 1);
    }

    #[test]
    fn barcode_length_and_characters_are_checked() {
        let mut genetics = ParasiteGenetics::new(params()).unwrap();
        assert!(matches!(
            genetics.create_genome_from_barcode("ACG", "G", "T"),
            Err(EmodError::InvalidParameter {
                name: "Barcode_String",
                ..
            })
        ));
        assert!(matches!(
            genetics.create_genome_from_barcode("ACGT", "X", "T"),
            Err(EmodError::InvalidParameter {
                name: "nucleotide",
                ..
            })
        ));
        assert!(genetics.create_genome("ACGT", vec![1, 2]).is_err());
    }

    #[test]
    fn identical_content_shares_an_id() {
        let mut genetics = ParasiteGenetics::new(params()).unwrap();
        let a = genetics.create_genome_from_barcode("ACGT", "A", "A").unwrap();
        let b = genetics.create_genome_from_barcode("ACGT", "A", "A").unwrap();
        let c = genetics.create_genome_from_barcode("TTTT", "A", "A").unwrap();
        assert_eq!(a.id(), b.id());
        assert!(a.shares_storage_with(&b));
        assert_ne!(a.id(), c.id());
        assert_eq!(genetics.genome_count(), 2);

        let rooted = genetics.create_genome_with_root(&a, 7);
        assert!(rooted.allele_roots().iter().all(|&r| r == 7));
        assert_ne!(rooted, a);
        assert_eq!(genetics.genome_count(), 3);
    }

    #[test]
    fn unreferenced_genomes_are_reduced() {
        let mut genetics = ParasiteGenetics::new(params()).unwrap();
        let kept = genetics.create_genome_from_barcode("ACGT", "A", "A").unwrap();
        drop(genetics.create_genome_from_barcode("TTTT", "A", "A").unwrap());
        genetics.reduce_genome_map();
        assert_eq!(genetics.genome_count(), 1);
        genetics.clear_genome_map();
        assert_eq!(genetics.genome_count(), 0);
        assert_eq!(kept.barcode(), "ACGT");
    }

    #[test]
    fn selfing_returns_the_female() {
        let mut genetics = ParasiteGenetics::new(params()).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let female = genetics.create_genome_from_barcode("ACGT", "A", "A").unwrap();
        let products = genetics.recombination(&mut rng, &female, &female.clone());
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id(), female.id());
    }

    #[test]
    fn base_model_skips_recombination_and_mortality() {
        let mut genetics = ParasiteGenetics::new(GeneticsParams {
            enable_fpg_similarity_to_base: true,
            ..params()
        })
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let female = genetics.create_genome_from_barcode("AAAA", "A", "A").unwrap();
        let male = genetics.create_genome_from_barcode("TTTT", "T", "T").unwrap();
        assert_eq!(genetics.recombination(&mut rng, &female, &male), vec![female]);
        assert_eq!(
            genetics.reduce_sporozoites_due_to_death(&mut rng, 1.0, 500, 1.0),
            500
        );
    }

    #[test]
    fn recombination_yields_four_genomes() {
        let mut genetics = ParasiteGenetics::new(params()).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let female = genetics.create_genome_from_barcode("AAAA", "A", "A").unwrap();
        let male = genetics.create_genome_from_barcode("TTTT", "T", "T").unwrap();
        for _ in 0..20 {
            let products = genetics.recombination(&mut rng, &female, &male);
            assert_eq!(products.len(), 4);
            for index in 0..genetics.num_base_pairs() {
                let from_female = products
                    .iter()
                    .filter(|g| g.nucleotide_sequence()[index] == 0)
                    .count();
                assert_eq!(from_female, 2);
            }
            // Products identical to a parent are the parent.
            for product in &products {
                if product.nucleotide_sequence() == female.nucleotide_sequence() {
                    assert_eq!(product.id(), female.id());
                }
            }
        }
    }

    #[test]
    fn sporozoite_mortality() {
        let genetics = ParasiteGenetics::new(params()).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(genetics.reduce_sporozoites_due_to_death(&mut rng, 1.0, 0, 1.0), 0);
        assert_eq!(
            genetics.reduce_sporozoites_due_to_death(&mut rng, 1.0, 1000, 0.0),
            1000
        );
        let survivors = genetics.reduce_sporozoites_due_to_death(&mut rng, 1.0, 10_000, 1.0);
        // 1 - e^-0.1 of them die on average.
        let expected = 10_000.0 * (-0.1f64).exp();
        assert!((f64::from(survivors) - expected).abs() < 300.0, "{survivors}");
    }

    #[test]
    fn oocyst_conversion_floors() {
        let genetics = ParasiteGenetics::new(GeneticsParams {
            sporozoites_per_oocyst: SporozoitesPerOocystDistribution::Constant { value: 2.5 },
            ..params()
        })
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(genetics.convert_oocysts_to_sporozoites(&mut rng, 1.0, 3), 7);
        assert_eq!(genetics.convert_oocysts_to_sporozoites(&mut rng, 1.0, 0), 0);
    }

    #[test]
    fn bite_draws_are_never_zero() {
        let genetics = ParasiteGenetics::new(params()).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..200 {
            assert!(genetics.num_sporozoites_in_bite(&mut rng) > 0);
            assert!(genetics.num_oocysts_from_bite(&mut rng) > 0);
            assert!(genetics.secondary_crossover_distance(&mut rng) >= 0);
        }
    }
}
