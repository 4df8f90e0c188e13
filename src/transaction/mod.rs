pub mod mempool;
pub mod model;
pub mod validation;

pub use mempool::Mempool;
pub use model::{LineItem, Transaction, TxKind};
pub use validation::{ValidationPolicy, validate_block_transactions};
