pub mod resource;
pub mod store;
