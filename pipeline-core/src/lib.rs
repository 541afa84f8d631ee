pub mod domain;
pub mod error;
pub mod pagination;
pub mod traits;

pub use domain::*;
pub use error::*;
pub use pagination::*;
pub use traits::*;
