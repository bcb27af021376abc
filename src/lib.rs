//! The contagion pooling and parasite cohort core of an agent-based disease model.
//!
//! A simulation advances agents through discrete daily steps. Two pieces of that loop live here:
//! * Transmission groups: agents are stratified by their property values into groups, shed
//!   contagion into the groups they belong to, and are exposed to a per-capita force of infection
//!   derived from everything shed on a route after mixing through a scaling matrix and decay.
//!   See [`transmission`].
//! * Parasite genetics and cohorts: malaria parasites inside a mosquito are tracked as cohorts of
//!   genetically identical parasites that mate, recombine, develop from oocysts into sporozoites,
//!   die off and split when the mosquito bites. See [`cohort`] and [`genetics`].
//!
//! Every stochastic operation takes its random number generator as an argument; see [`random`]
//! for named, reproducible streams. Configuration is read from JSON through [`config`].
pub mod cohort;
pub mod config;
pub mod error;
pub mod genetics;
pub mod hashing;
pub mod log;
pub mod numeric;
pub mod prelude;
pub mod random;
pub mod transmission;

mod macros;

pub use crate::error::EmodError;
pub use crate::hashing::{HashMap, HashMapExt, HashSet, HashSetExt};

// Re-exported for use in `define_rng!` and by models that want the same versions.
pub use paste;
pub use rand;
