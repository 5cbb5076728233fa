pub mod connector;
pub mod store;
pub mod strategy;

pub use connector::{Connector, ConnectorFrame, ConnectorNode};
pub use store::{LayerFrame, Store};
pub use strategy::{Strategy, StrategyInput, StrategyOutput};
