//! Infrastructure layer: configuration, persistence, cascades and the
//! application services built on them.

pub mod cascade;
pub mod config;
pub mod services;
pub mod store;


pub use cascade::{CascadingDeletionCoordinator, ScheduleDeletion, UserDeletion};
pub use config::{AppConfig, ConfigError};
pub use services::BoardServices;
pub use store::{BoardStore, BoardTx, InMemoryBoardStore, PostgresBoardStore, StoreError, StoreResult, TxStep};
