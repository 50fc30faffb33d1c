pub mod airdrop;
pub mod dispatch_transfers;
pub mod fixed_amount;
pub mod guard;
pub mod plan_allocation;
pub mod resolve_recipients;

pub use airdrop::*;
pub use dispatch_transfers::*;
pub use fixed_amount::*;
pub use plan_allocation::*;
pub use resolve_recipients::*;
