// Service exports
pub mod dataset;
pub mod describer;

pub use dataset::{ColumnMap, DatasetError, DatasetFormat, DatasetLoader, DatasetSource};
pub use describer::{DescribeError, Describer, SCORE_ORDER};
