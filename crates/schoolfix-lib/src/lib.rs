//! `schoolfix-lib` - school facility issue reports.
//!
//! Provides the issue model, its lifecycle rules, and interchangeable
//! stores (a JSON document on disk, a client-local key/value area, and a
//! hosted realtime database) behind one async trait.
//!
//! # Quick Start
//!
//! ```no_run
//! use schoolfix_lib::{Category, IssueDraft, IssueStore, IssueUpdate, JsonFileStore, Status};
//!
//! # async fn demo() -> schoolfix_lib::Result<()> {
//! let store = JsonFileStore::new("data/issues.json");
//!
//! // Report
//! let issue = store
//!     .create(IssueDraft::new("Broken window", "Room 3, back row", Category::Building))
//!     .await?;
//!
//! // Resolve
//! store.update(&issue.id, &IssueUpdate::status(Status::Resolved)).await?;
//!
//! // Summarize
//! let stats = schoolfix_lib::service::stats(&store.list().await?);
//! assert_eq!(stats.status.resolved, 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod model;
pub mod query;
pub mod service;
pub mod store;
pub mod util;
pub mod validation;

pub use error::{Result, StoreError, ValidationError};
pub use model::{Category, Issue, IssueDraft, Priority, Status};
pub use query::{IssueUpdate, ListFilters, SortOrder};
pub use service::{IssueStats, StatusCounts};
pub use store::{
    ChangeFeed, IssueStore, JsonFileStore, LocalStore, MemoryDatabase, RealtimeDatabase,
    RealtimeStore, RestDatabase, StorageArea, Subscription,
};
