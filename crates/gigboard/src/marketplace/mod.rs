pub mod applications;
pub mod directory;
pub mod reputation;

pub use reputation::{ReputationAggregator, ReputationError, ReputationProvider, ReputationSnapshot};
