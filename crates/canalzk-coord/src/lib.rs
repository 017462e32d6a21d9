//! Read-only access to a hierarchical coordination store.
//!
//! [`CoordStore`] opens sessions against one endpoint; a [`CoordSession`]
//! lists children and reads node data. Every call is bounded by the timeout
//! given at connect time. Two backends are provided:
//!
//! - [`ZkStore`]: a ZooKeeper ensemble via `zookeeper-client`.
//! - [`MemStore`]: an in-memory tree with fault injection, for tests.

mod error;
mod mem;
pub mod path;
mod store;
mod zk;

pub use error::{CoordError, CoordResult};
pub use mem::MemStore;
pub use path::join_path;
pub use store::{CoordSession, CoordStore};
pub use zk::ZkStore;
