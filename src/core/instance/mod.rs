mod catalog;
mod model;

pub use catalog::{InstanceCatalog, InstanceUpdate, JsonInstanceCatalog};
pub use model::{ContentCategory, ContentMetadata, ContentSource, Instance, MemoryBounds};
