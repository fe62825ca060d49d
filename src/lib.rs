// Client-side store for custom data sources kept on a remote Frappe-style
// backend: a read-through list cache, derived dropdown projections, and
// create / delete / test-connection actions.

pub mod api;
pub mod core;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::api::types::{DataSourceItem, DataSourceRecord, DropdownOption, ListSpec};
pub use crate::api::{DataSourceApi, HttpApi};
pub use crate::core::resource::ListResource;
pub use crate::core::store::DataSourceListStore;
pub use crate::utils::{ApiError, Config};
