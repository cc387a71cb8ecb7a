//! Supporting containers used by the registry

mod arena;
mod flat_map;
mod flat_multimap;

pub use arena::{Arena, ItemId};
pub use flat_map::FlatMap;
pub use flat_multimap::FlatMultiMap;
