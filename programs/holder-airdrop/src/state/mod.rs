pub mod mapping;
pub mod plan;
pub mod transfer;

pub use mapping::*;
pub use plan::*;
pub use transfer::*;
