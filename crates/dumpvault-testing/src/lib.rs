//! # Dumpvault Testing
//!
//! Test doubles for the backup engine. [`MockDatabase`] implements
//! [`SessionSource`](dumpvault_core::SessionSource) entirely in memory, so
//! backup and restore flows can be exercised without a MySQL server, and
//! [`fixtures`] builds the databases most tests start from.
//!
//! ```rust,no_run
//! use dumpvault_testing::fixtures;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let db = fixtures::shop_database()?;
//! let (service, _dir) = fixtures::service_in_tempdir(db.clone())?;
//! let backup = service.create_backup(fixtures::SHOP).await?;
//! service.restore_backup(&backup.filename).await?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod mock_database;

pub use mock_database::{MockDatabase, MockSession};
