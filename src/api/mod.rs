pub mod http;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::utils::ApiError;
use types::{DataSourceRecord, ListSpec};

pub use http::HttpApi;

/// Remote operations the store delegates to. Object-safe so tests and
/// embedders can inject their own client.
#[async_trait]
pub trait DataSourceApi: Send + Sync {
    /// Fetch one page of records for the given query spec.
    async fn fetch_list(&self, spec: &ListSpec) -> Result<Vec<DataSourceRecord>, ApiError>;

    /// Submit a creation request; args are validated by the backend, not here.
    async fn create_custom_data_source(&self, args: Value) -> Result<(), ApiError>;

    /// Delete a document of the given doctype by its unique name.
    async fn delete_data_source(&self, doctype: &str, name: &str) -> Result<(), ApiError>;

    /// Stateless connection check; returns the backend's payload untouched.
    async fn test_connection(&self, args: Value) -> Result<Value, ApiError>;
}
