pub use crate::cohort::{CohortCollection, ParasiteCohort, ParasiteState, StrainIdentity};
pub use crate::config::{load_config, KernelConfig, PropertyConfig, TransmissionGroupsConfig};
pub use crate::error::EmodError;
pub use crate::genetics::{
    DistributedIdGenerator, GeneticsParams, GeneticsService, ParasiteGenetics, ParasiteGenome,
    ParasiteIdGenerator,
};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::random::RngId;
pub use crate::transmission::{
    create_transmission_groups, ContagionPopulation, ContagionStrain, IndividualProperties, Infectable,
    TransmissionGroupMembership, TransmissionGroupType, TransmissionGroups, TransmissionRoute,
};
pub use crate::{assert_almost_eq, define_rng};
