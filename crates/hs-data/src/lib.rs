pub mod aggregator;
pub mod ledger;
pub mod loaders;
pub mod storage;

pub use aggregator::*;
pub use ledger::*;
pub use loaders::*;
pub use storage::*;
