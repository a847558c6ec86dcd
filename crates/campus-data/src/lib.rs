//! Remote data service client.
//!
//! Row-oriented access to the hosted tables behind the dashboard (courses, students,
//! certificates, ...). `RestDataClient` speaks PostgREST; `MemoryDataService` evaluates the
//! same queries locally for tests.

pub mod error;
pub mod memory;
pub mod query;
pub mod rest;
pub mod service;

pub use error::{DataError, DataResult};
pub use memory::MemoryDataService;
pub use query::{Filter, FilterOp, Order, Query, Row};
pub use rest::RestDataClient;
pub use service::DataService;
