pub mod aggregator;
pub mod error;
pub mod ids;
pub mod model;
pub mod router;
pub mod rng;
pub mod strategies;
pub mod value;

pub use error::DomainError;
pub use ids::{LayerName, NodeId};
pub use value::{ColumnType, Record, Value};
