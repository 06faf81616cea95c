//! Eager loading of navigations
//!
//! Include trees name the navigations to load; the eager loader walks them
//! level by level, issuing one batched query per collection navigation.

pub mod batch_loader;
pub mod eager_loader;
pub mod include;

pub use batch_loader::{load_grouped, within_timeout, KeySource, LoadStats, LoaderConfig};
pub use eager_loader::EagerLoader;
pub use include::{
    CollectionInclude, Include, IncludeLoader, IncludeTree, LoadContext, ReferenceInclude,
};
