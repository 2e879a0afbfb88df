pub mod ids;
pub mod artifact;
pub mod bucket;
pub mod grouping;
pub mod issue;

pub use ids::*;
pub use artifact::*;
pub use bucket::*;
pub use grouping::*;
pub use issue::*;
