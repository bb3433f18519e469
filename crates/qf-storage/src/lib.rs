//! qf-storage: the four-verb object store capability and its OpenDAL binding
//!
//! The transfer protocol only ever needs list / get / put / delete against
//! flat object names, so backends are reduced to the `ObjectStore` trait.
//! `OpendalStore` covers S3-compatible endpoints, Google Cloud Storage, and
//! an in-memory service for tests.

pub mod health;
pub mod operator;
pub mod store;

pub use health::check_bucket;
pub use operator::build_operator;
pub use store::{ObjectStore, OpendalStore, StoreResult};
