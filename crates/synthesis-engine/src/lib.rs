pub mod config;
pub mod consensus;
pub mod engine;
pub mod recommendation;
pub mod report;
pub mod types;
pub mod weights;


pub use config::*;
pub use consensus::*;
pub use engine::*;
pub use recommendation::*;
pub use report::*;
pub use types::*;
pub use weights::*;
