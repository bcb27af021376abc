use rand::Rng;

use super::{ParasiteCohort, ParasiteState};
use crate::genetics::{GeneticsService, ParasiteIdGenerator};
use crate::random::sample_single_from_known_length;

/// The parasite cohorts carried by one agent.
///
/// The collection owns its cohorts. When the agent dies or its infection resets, `clear` drops
/// them all at once.
#[derive(Debug, Clone, Default)]
pub struct CohortCollection {
    cohorts: Vec<ParasiteCohort>,
}

impl CohortCollection {
    #[must_use]
    pub fn new() -> Self {
        CohortCollection::default()
    }

    /// Adds `cohort`, folding it into an existing compatible cohort when there is one. Returns
    /// whether it was merged.
    pub fn add<G: GeneticsService>(&mut self, cohort: ParasiteCohort, genetics: &G) -> bool {
        if let Some(existing) = self.cohorts.iter_mut().find(|c| c.can_merge(&cohort, genetics)) {
            existing.merge(&cohort, genetics)
        } else {
            self.cohorts.push(cohort);
            false
        }
    }

    /// Adds `cohort` without attempting to merge it.
    pub fn push(&mut self, cohort: ParasiteCohort) {
        self.cohorts.push(cohort);
    }

    pub fn update_all<R: Rng, G: GeneticsService>(
        &mut self,
        rng: &mut R,
        genetics: &G,
        dt: f64,
        progress_delta: f64,
        sporozoite_mortality_modifier: f64,
    ) {
        for cohort in &mut self.cohorts {
            cohort.update(rng, genetics, dt, progress_delta, sporozoite_mortality_modifier);
        }
    }

    /// Mates every female gametocyte cohort with a male cohort drawn uniformly from `males`, then
    /// recombines it. Cohorts produced by recombination join the collection. Does nothing if
    /// `males` is empty.
    pub fn mate_all<R, G, I>(&mut self, rng: &mut R, genetics: &mut G, ids: &mut I, males: &[ParasiteCohort])
    where
        R: Rng,
        G: GeneticsService,
        I: ParasiteIdGenerator + ?Sized,
    {
        if males.is_empty() {
            return;
        }
        let mut new_cohorts = Vec::new();
        for cohort in &mut self.cohorts {
            if cohort.state() != ParasiteState::GametocyteFemale {
                continue;
            }
            if let Some(male) = sample_single_from_known_length(rng, males.iter()) {
                cohort.mate(male);
                cohort.recombination(rng, genetics, ids, &mut new_cohorts);
            }
        }
        self.cohorts.append(&mut new_cohorts);
    }

    /// Drops cohorts whose population has reached zero.
    pub fn remove_empty(&mut self) {
        self.cohorts.retain(|c| c.population() > 0);
    }

    pub fn clear(&mut self) {
        self.cohorts.clear();
    }

    /// Removes and returns every cohort.
    pub fn take_all(&mut self) -> Vec<ParasiteCohort> {
        std::mem::take(&mut self.cohorts)
    }

    #[must_use]
    pub fn total_population(&self) -> u64 {
        self.cohorts.iter().map(|c| u64::from(c.population())).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParasiteCohort> {
        self.cohorts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ParasiteCohort> {
        self.cohorts.iter_mut()
    }
}

impl FromIterator<ParasiteCohort> for CohortCollection {
    fn from_iter<T: IntoIterator<Item = ParasiteCohort>>(iter: T) -> Self {
        CohortCollection {
            cohorts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cohort::tests::StubGenetics;
    use crate::cohort::StrainIdentity;
    use crate::genetics::{DistributedIdGenerator, ParasiteGenome};

    fn genome(id: u32, value: i32) -> ParasiteGenome {
        ParasiteGenome::new(id, vec![value; 2], vec![], &[0, 1])
    }

    fn cohort(id: u32, state: ParasiteState, genome: ParasiteGenome, population: u32) -> ParasiteCohort {
        ParasiteCohort::new(id, state, StrainIdentity::new(genome), 0.0, population)
    }

    #[test]
    fn add_merges_compatible_cohorts() {
        let genetics = StubGenetics::default();
        let mut collection = CohortCollection::new();
        assert!(!collection.add(cohort(1, ParasiteState::Sporozoite, genome(1, 0), 10), &genetics));
        assert!(collection.add(cohort(2, ParasiteState::Sporozoite, genome(1, 0), 5), &genetics));
        assert!(!collection.add(cohort(3, ParasiteState::Sporozoite, genome(2, 1), 5), &genetics));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.total_population(), 20);

        collection.push(cohort(4, ParasiteState::Sporozoite, genome(1, 0), 1));
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn empty_cohorts_are_removed() {
        let genetics = StubGenetics {
            survivors_per_hundred: 0,
            ..StubGenetics::default()
        };
        let mut rng = SmallRng::seed_from_u64(42);
        let mut collection: CohortCollection = [
            cohort(1, ParasiteState::Sporozoite, genome(1, 0), 10),
            cohort(2, ParasiteState::Oocyst, genome(2, 1), 10),
        ]
        .into_iter()
        .collect();

        collection.update_all(&mut rng, &genetics, 1.0, 1.0, 1.0);
        collection.remove_empty();
        // The sporozoites all died; the oocysts burst into 100 sporozoites.
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.total_population(), 100);

        let taken = collection.take_all();
        assert_eq!(taken.len(), 1);
        assert!(collection.is_empty());
    }

    #[test]
    fn mate_all_mates_females_only() {
        let mut genetics = StubGenetics {
            products: (10..14).map(|id| genome(id, (id - 10) as i32)).collect(),
            ..StubGenetics::default()
        };
        let mut ids = DistributedIdGenerator::new(0, 1);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut collection: CohortCollection = [
            cohort(ids.next_id(), ParasiteState::GametocyteFemale, genome(1, 0), 50),
            cohort(ids.next_id(), ParasiteState::Sporozoite, genome(2, 1), 7),
        ]
        .into_iter()
        .collect();

        collection.mate_all(&mut rng, &mut genetics, &mut ids, &[]);
        assert_eq!(collection.len(), 2);

        let males = [cohort(ids.next_id(), ParasiteState::GametocyteMale, genome(3, 3), 5)];
        collection.mate_all(&mut rng, &mut genetics, &mut ids, &males);
        assert_eq!(collection.len(), 5);
        assert_eq!(collection.total_population(), 57);
        assert_eq!(
            collection
                .iter()
                .filter(|c| c.state() == ParasiteState::Oocyst)
                .count(),
            4
        );

        for cohort in collection.iter_mut() {
            cohort.set_bite_id(1);
        }
        assert!(collection.iter().all(|c| c.strain_identity().bite_id == 1));
        collection.clear();
        assert_eq!(collection.total_population(), 0);
    }
}
