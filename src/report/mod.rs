//! Report module - comparing allocations and presenting results

pub mod comparison;
pub mod export;
pub mod summary;

pub use comparison::*;
pub use export::*;
pub use summary::*;
