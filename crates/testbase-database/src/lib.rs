//! Database driver surface for the Testbase harness
//!
//! Everything the rest of the workspace knows about the underlying driver
//! lives here: a narrow row-store interface, a transaction handle that is
//! closed exactly once, and the acquire/begin/destroy driver contract.

pub use sea_orm;

mod driver;
mod handle;
pub mod mock;
mod store;

pub use driver::{ConnectionFactory, DriverError, IsolationDriver, IsolationLevel, SeaOrmDriver};
pub use handle::{HandleError, TransactionHandle};
pub use mock::MemoryStore;
pub use store::{EntityStore, StoreError};
