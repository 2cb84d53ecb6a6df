pub mod analyzer;
pub mod factors;
pub mod indicator_set;
pub mod indicators;
pub mod params;
pub mod scoring;


pub use analyzer::*;
pub use factors::*;
pub use indicator_set::*;
pub use indicators::*;
pub use params::*;
pub use scoring::*;
