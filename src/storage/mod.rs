//! Model implementations shipped with the crate

pub mod in_memory;

pub use in_memory::InMemoryModel;
