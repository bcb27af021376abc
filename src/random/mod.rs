//! Random number generation.
//!
//! The kernel never owns a global generator. Every stochastic operation takes the generator as
//! an argument (`&mut impl Rng`), so a node, a mosquito population or a test decides which stream
//! a draw comes from. `define_rng!` names an independent stream; all streams are derived from one
//! base seed so that a whole run is reproducible from a single number.
mod macros;
pub mod sampling;

pub use macros::define_rng;
pub use sampling::{
    binomial, expcdf, gamma, multinomial, negative_binomial, sample_single_from_known_length,
};

use log::trace;

use crate::hashing::hash_str;
use crate::rand::SeedableRng;

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;

    /// Creates the generator for this stream. The seed is offset by a stable hash of the stream
    /// name so that streams sharing a base seed are independent.
    fn seeded(base_seed: u64) -> Self::RngType {
        let seed_offset = hash_str(Self::get_name());
        trace!(
            "creating new RNG (seed={}) for stream {}",
            base_seed,
            Self::get_name()
        );
        Self::RngType::seed_from_u64(base_seed.wrapping_add(seed_offset))
    }
}
