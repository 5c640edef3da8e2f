pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use connection::{connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult, VerificationResult, DEMO_PRODUCT_ID};
pub use repositories::{InMemoryWorkflowStore, RepositoryError};
pub use store::{SqlWorkflowStore, SqlWorkflowTx};
