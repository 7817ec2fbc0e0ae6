pub mod container_registry;
pub mod data_type_registry;

pub use container_registry::ContainerRegistry;
pub use data_type_registry::{DataTypeRegistry, Encoding};
