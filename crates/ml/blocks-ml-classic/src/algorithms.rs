pub mod trees;

pub use trees::{BaggingRegressor, DecisionTreeRegressor};
