use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Documents fetched per page when listing data sources.
pub const DEFAULT_PAGE_LENGTH: u32 = 100;

/// One configured custom data source, as returned by the remote listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceRecord {
    /// Unique document key, distinct from the display title.
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub status: String,
    pub database_type: String,
    #[serde(with = "frappe_datetime")]
    pub creation: DateTime<Utc>,
    #[serde(with = "frappe_datetime")]
    pub modified: DateTime<Utc>,
    /// Attributes the backend returns beyond the modeled ones; kept so
    /// callers can filter on fields like `is_site_db`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataSourceRecord {
    /// Look up an attribute by its remote field name.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "name" => Some(Value::String(self.name.clone())),
            "title" => Some(Value::String(self.title.clone())),
            "status" => Some(Value::String(self.status.clone())),
            "database_type" => Some(Value::String(self.database_type.clone())),
            "creation" => Some(Value::String(self.creation.to_rfc3339())),
            "modified" => Some(Value::String(self.modified.to_rfc3339())),
            _ => self.extra.get(key).cloned(),
        }
    }
}

/// A record decorated for display. The two relative-time fields are derived
/// on read and never sent back to the remote.
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceItem {
    #[serde(flatten)]
    pub record: DataSourceRecord,
    pub created_from_now: String,
    pub modified_from_now: String,
}

/// Three-field projection used to populate selection UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
    pub description: String,
}

/// Query spec for the remote listing resource.
#[derive(Debug, Clone)]
pub struct ListSpec {
    pub doctype: String,
    pub filters: Map<String, Value>,
    pub fields: Vec<String>,
    pub order_by: String,
    pub page_length: u32,
    /// Issue the first fetch as soon as the resource is constructed.
    pub auto: bool,
}

impl ListSpec {
    pub fn custom_data_sources(page_length: u32) -> Self {
        ListSpec {
            doctype: "Insights Custom Data Source".to_string(),
            filters: Map::new(),
            fields: ["name", "title", "status", "creation", "modified", "database_type"]
                .iter()
                .map(|field| field.to_string())
                .collect(),
            order_by: "creation desc".to_string(),
            page_length,
            auto: true,
        }
    }
}

/// The backend emits naive `YYYY-MM-DD HH:MM:SS.ffffff` timestamps (server
/// local time treated as UTC here); accept RFC 3339 as well.
mod frappe_datetime {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(NAIVE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, NAIVE_FORMAT)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(serde::de::Error::custom)
    }
}
