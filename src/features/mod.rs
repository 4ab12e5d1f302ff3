//! Feature grouping - path-derived partitions of the function corpus.

mod grouper;

pub use grouper::{feature_key, group_features, Feature};
