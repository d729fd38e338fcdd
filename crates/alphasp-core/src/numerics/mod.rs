pub mod cross_section;
pub mod quadrature;

pub use cross_section::{
    CrossSectionCache, CrossSectionGrid, NormalizationBranch, PhotoionizationTable, SpeciesFlags,
    TableError, TransitionLevels,
};
pub use quadrature::{
    Integrand, IntegrationResult, IntegrationStatus, QuadratureFailure, QuadratureStrategy,
    UnknownStrategy, integrate,
};
