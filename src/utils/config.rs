use std::env;

use dotenv::dotenv;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub site_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub page_length: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        Config {
            site_url: env::var("INSIGHTS_SITE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_key: env::var("INSIGHTS_API_KEY").ok(),
            api_secret: env::var("INSIGHTS_API_SECRET").ok(),
            page_length: env::var("INSIGHTS_PAGE_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }

    /// Host component of the configured site URL. When non-empty, it replaces
    /// record titles in the derived list.
    pub fn site_host(&self) -> String {
        Url::parse(&self.site_url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.to_string()))
            .unwrap_or_default()
    }
}
