//! Regression trees and a bagging ensemble over them.
//!
//! `Criterion`, `SplitFinder`, and `Pruner` are each a closed tagged enum
//! dispatched once per node rather than a trait object called once per
//! sample. [`DecisionTreeRegressor`] grows a single tree; [`BaggingRegressor`]
//! bootstraps a forest of them and aggregates by unweighted mean.

pub mod criterion;
pub mod ensemble;
pub mod node;
pub mod pruner;
pub mod rng;
pub mod split_finder;
pub mod trainer;

pub use criterion::Criterion;
pub use ensemble::{BaggingRegressor, EnsembleConfig};
pub use node::Node;
pub use pruner::Pruner;
pub use split_finder::{BinRule, SplitFinder, SplitResult};
pub use trainer::{DecisionTreeRegressor, TreeConfig};
