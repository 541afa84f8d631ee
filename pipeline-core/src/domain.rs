pub mod ids;
pub mod experiment;

pub use ids::*;
pub use experiment::*;
