//! Immutable parasite genomes.

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::EmodError;

/// Nucleotide values stored in a sequence.
pub const NUCLEOTIDES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Converts an `A`/`C`/`G`/`T` character into its sequence value.
pub fn nucleotide_value(parameter: &str, c: char) -> Result<i32, EmodError> {
    match c {
        'A' => Ok(0),
        'C' => Ok(1),
        'G' => Ok(2),
        'T' => Ok(3),
        _ => Err(EmodError::InvalidParameter {
            name: "nucleotide",
            message: format!(
                "the character '{c}' in '{parameter}' is invalid; valid values are 'A', 'C', 'G', 'T'"
            ),
        }),
    }
}

#[must_use]
pub fn nucleotide_char(value: i32) -> char {
    usize::try_from(value)
        .ok()
        .and_then(|v| NUCLEOTIDES.get(v))
        .copied()
        .unwrap_or('?')
}

/// Content hash over the sequence, interleaved with the allele roots when every position has one.
#[must_use]
pub fn calculate_hashcode(nucleotide_sequence: &[i32], allele_roots: &[i32]) -> i64 {
    let step = |hash: i64, value: i32| hash.wrapping_mul(31).wrapping_add(i64::from(value));
    if allele_roots.len() == nucleotide_sequence.len() {
        nucleotide_sequence
            .iter()
            .zip(allele_roots)
            .fold(17, |hash, (&n, &r)| step(step(hash, n), r))
    } else {
        nucleotide_sequence.iter().fold(17, |hash, &n| step(hash, n))
    }
}

/// Hash of the barcode positions only.
#[must_use]
pub fn calculate_barcode_hashcode(nucleotide_sequence: &[i32], barcode_indexes: &[usize]) -> i64 {
    barcode_indexes.iter().fold(17i64, |hash, &index| {
        hash.wrapping_mul(31)
            .wrapping_add(i64::from(nucleotide_sequence[index]))
    })
}

#[derive(Debug)]
struct GenomeInner {
    id: u32,
    hashcode: i64,
    barcode_hashcode: i64,
    barcode: String,
    nucleotide_sequence: Vec<i32>,
    allele_roots: Vec<i32>,
}

/// A parasite genome: a nucleotide value at every location of interest, plus optionally the id
/// of the infection each allele descends from.
///
/// Genomes are immutable and cheap to clone; clones share their data. Two genomes are equal when
/// their content hashes are equal, regardless of id.
#[derive(Debug, Clone)]
pub struct ParasiteGenome {
    inner: Arc<GenomeInner>,
}

impl ParasiteGenome {
    /// `barcode_indexes` are the sequence positions that make up the barcode.
    ///
    /// # Panics
    ///
    /// If a barcode index is outside the sequence.
    #[must_use]
    pub fn new(
        id: u32,
        nucleotide_sequence: Vec<i32>,
        allele_roots: Vec<i32>,
        barcode_indexes: &[usize],
    ) -> Self {
        let hashcode = calculate_hashcode(&nucleotide_sequence, &allele_roots);
        let barcode_hashcode = calculate_barcode_hashcode(&nucleotide_sequence, barcode_indexes);
        let barcode = barcode_indexes
            .iter()
            .map(|&index| nucleotide_char(nucleotide_sequence[index]))
            .collect();
        ParasiteGenome {
            inner: Arc::new(GenomeInner {
                id,
                hashcode,
                barcode_hashcode,
                barcode,
                nucleotide_sequence,
                allele_roots,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.inner.id
    }

    #[must_use]
    pub fn hashcode(&self) -> i64 {
        self.inner.hashcode
    }

    #[must_use]
    pub fn barcode_hashcode(&self) -> i64 {
        self.inner.barcode_hashcode
    }

    /// The barcode positions as a string of `A`, `C`, `G` and `T`.
    #[must_use]
    pub fn barcode(&self) -> &str {
        &self.inner.barcode
    }

    #[must_use]
    pub fn nucleotide_sequence(&self) -> &[i32] {
        &self.inner.nucleotide_sequence
    }

    #[must_use]
    pub fn allele_roots(&self) -> &[i32] {
        &self.inner.allele_roots
    }

    #[must_use]
    pub fn has_allele_roots(&self) -> bool {
        self.inner.allele_roots.len() == self.inner.nucleotide_sequence.len()
    }

    /// Whether two handles point at the same stored genome.
    #[must_use]
    pub fn shares_storage_with(&self, other: &ParasiteGenome) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for ParasiteGenome {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage_with(other) || self.hashcode() == other.hashcode()
    }
}

impl Eq for ParasiteGenome {}

impl Hash for ParasiteGenome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hashcode().hash(state);
    }
}

impl Display for ParasiteGenome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "genome {} [{}]", self.id(), self.barcode())
    }
}
