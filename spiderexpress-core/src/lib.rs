// spiderexpress-core/src/lib.rs

#![allow(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::perf)]

// --- HEXAGONAL LAYOUT ---

// 1. Ports: the Connector/Strategy/Store contracts plug-ins and adapters
// are written against.
pub mod ports;

// 2. Domain: the pure, I/O-free crawl logic (ids, model, router,
// aggregator, strategies). Depends on nothing else in this crate.
pub mod domain;

// 3. Infrastructure: concrete adapters (DuckDB store, YAML config,
// connector/strategy registries). Depends on domain and ports.
pub mod infrastructure;

// 4. Application: the iteration controller and orchestrator that wire
// the above together into a runnable crawl.
pub mod application;

pub mod error;

pub use error::SpiderError;
