use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use url::Url;

use crate::utils::{ApiError, Config};

use super::types::{DataSourceRecord, ListSpec};
use super::DataSourceApi;

const CREATE_METHOD: &str = "insights.api.setup.add_custom_database";
const TEST_METHOD: &str = "insights.api.setup.test_custom_database_connection";

/// Reqwest-backed client for a Frappe-style document backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let base = Url::parse(&config.site_url)
            .map_err(|e| ApiError::Config(format!("invalid site url: {}", e)))?;

        let mut headers = HeaderMap::new();
        if let (Some(key), Some(secret)) = (&config.api_key, &config.api_secret) {
            let value = HeaderValue::from_str(&format!("token {}:{}", key, secret))
                .map_err(|e| ApiError::Config(format!("invalid api credentials: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(HttpApi { client, base })
    }

    /// `{base}/api/resource/{doctype}[/{name}]`
    fn resource_url(&self, doctype: &str, name: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Config("site url cannot be a base".to_string()))?;
            segments.extend(["api", "resource", doctype]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }

    /// `{base}/api/method/{method}`
    fn method_url(&self, method: &str) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Config("site url cannot be a base".to_string()))?;
            segments.extend(["api", "method", method]);
        }
        Ok(url)
    }

    /// Turn non-2xx responses into a remote failure carrying whatever error
    /// message can be pulled out of the body.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|payload| {
                payload
                    .get("exception")
                    .or_else(|| payload.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        Err(ApiError::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DataSourceApi for HttpApi {
    async fn fetch_list(&self, spec: &ListSpec) -> Result<Vec<DataSourceRecord>, ApiError> {
        let url = self.resource_url(&spec.doctype, None)?;
        let response = self
            .client
            .get(url)
            .query(&[
                ("fields", serde_json::to_string(&spec.fields)?),
                (
                    "filters",
                    serde_json::to_string(&Value::Object(spec.filters.clone()))?,
                ),
                ("order_by", spec.order_by.clone()),
                ("limit_page_length", spec.page_length.to_string()),
            ])
            .send()
            .await?;
        let envelope: Value = Self::check(response).await?.json().await?;
        let data = envelope
            .get("data")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(serde_json::from_value(data)?)
    }

    async fn create_custom_data_source(&self, args: Value) -> Result<(), ApiError> {
        let url = self.method_url(CREATE_METHOD)?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "database": args }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_data_source(&self, doctype: &str, name: &str) -> Result<(), ApiError> {
        let url = self.resource_url(doctype, Some(name))?;
        let response = self.client.delete(url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn test_connection(&self, args: Value) -> Result<Value, ApiError> {
        let url = self.method_url(TEST_METHOD)?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "database": args }))
            .send()
            .await?;
        let envelope: Value = Self::check(response).await?.json().await?;
        Ok(envelope.get("message").cloned().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> HttpApi {
        let config = Config {
            site_url: "https://analytics.example.com".to_string(),
            api_key: None,
            api_secret: None,
            page_length: 100,
        };
        HttpApi::new(&config).unwrap()
    }

    #[test]
    fn test_resource_url_encodes_doctype() {
        let url = api()
            .resource_url("Insights Custom Data Source", None)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://analytics.example.com/api/resource/Insights%20Custom%20Data%20Source"
        );
    }

    #[test]
    fn test_resource_url_with_name() {
        let url = api()
            .resource_url("Insights Custom Data Source", Some("ds-0001"))
            .unwrap();
        assert!(url.as_str().ends_with("/Insights%20Custom%20Data%20Source/ds-0001"));
    }

    #[test]
    fn test_method_url() {
        let url = api().method_url(CREATE_METHOD).unwrap();
        assert_eq!(
            url.as_str(),
            "https://analytics.example.com/api/method/insights.api.setup.add_custom_database"
        );
    }
}
