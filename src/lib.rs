//! Vendor-agnostic relational database access layer.
//!
//! One API over several SQL engines: pick a backend with [`BackendKind`],
//! open a handle with [`connect`] (or build a [`Provider`] directly), write
//! statements with named `@parameters`, and map results into your own types.
//!
//! ```ignore
//! use sqlbridge::{BackendKind, connect, impl_record, params};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     name: String,
//!     age: i64,
//! }
//! impl_record!(User { name, age });
//!
//! # async fn run() -> sqlbridge::DbResult<()> {
//! let db = connect(BackendKind::SQLite, "sqlite:app.db?mode=rwc")?;
//! db.execute(
//!     "INSERT INTO users (name, age) VALUES (@Name, @Age)",
//!     &params! { "Name" => "Alice", "Age" => 30i64 },
//! )
//! .await?;
//! let adults: Vec<User> = db
//!     .query("SELECT name, age FROM users WHERE age >= @Min", &params! { "Min" => 18i64 })
//!     .await?;
//! db.close();
//! # Ok(())
//! # }
//! ```
//!
//! Connections are opened per statement and released before the call
//! returns; there is no pool and no cross-statement session state.

pub mod backend;
pub mod driver;
pub mod error;
pub mod facade;
mod macros;
pub mod params;
pub mod provider;
pub mod row;
pub mod value;

pub use backend::BackendKind;
pub use driver::Driver;
pub use error::{DbError, DbResult};
pub use facade::{Database, connect};
pub use params::Params;
pub use provider::{Provider, create_provider};
pub use row::{Record, Row};
pub use value::{FromSql, SqlValue, TypeCategory, categorize_type};
