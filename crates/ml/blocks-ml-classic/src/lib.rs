/*!
This crate provides a regression decision-tree engine and a bagging ensemble
built on top of it.

Each algorithm is implemented with a focus on:
- Type safety and compile-time guarantees
- Performance optimizations
- Memory efficiency
- Comprehensive testing
- Clear documentation
- Modern Rust idioms

# Available Algorithms

## Tree-based Methods
- [`DecisionTreeRegressor`](algorithms::trees::trainer): single regression tree,
  grown with a choice of split criterion and split finder, optionally pruned.
- [`BaggingRegressor`](algorithms::trees::ensemble): bootstrap-aggregated
  ensemble of [`DecisionTreeRegressor`](algorithms::trees::trainer)s with
  out-of-bag error estimation and feature importance.

# Usage Example

```rust,no_run
use blocks_ml_classic::algorithms::trees::{
    Criterion, DecisionTreeRegressor, Pruner, SplitFinder, TreeConfig,
};

let x = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
let y = vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0];

let config = TreeConfig::new(Criterion::SquaredError, SplitFinder::Exhaustive, Pruner::None);
let mut tree = DecisionTreeRegressor::new(config);
tree.fit(&x, 1, &y).expect("failed to fit tree");

let prediction = tree.predict_one(&[2.5]).expect("failed to predict");
```
*/

pub mod algorithms;
pub mod error;

pub use error::{Error, Result};
