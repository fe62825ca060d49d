use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::api::types::{
    DataSourceItem, DataSourceRecord, DropdownOption, ListSpec, DEFAULT_PAGE_LENGTH,
};
use crate::api::{DataSourceApi, HttpApi};
use crate::core::resource::{FlagGuard, ListResource};
use crate::utils::{time, ApiError, Config};

/// Pull-based memo keyed by the list resource's version marker.
struct Memo<T> {
    cached: RwLock<Option<(u64, Arc<Vec<T>>)>>,
}

impl<T> Memo<T> {
    fn new() -> Self {
        Memo {
            cached: RwLock::new(None),
        }
    }

    fn get_or_recompute(&self, version: u64, compute: impl FnOnce() -> Vec<T>) -> Arc<Vec<T>> {
        if let Some((cached_version, cached)) = self
            .cached
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
        {
            if *cached_version == version {
                return cached.clone();
            }
        }
        let fresh = Arc::new(compute());
        *self.cached.write().unwrap_or_else(|p| p.into_inner()) = Some((version, fresh.clone()));
        fresh
    }
}

/// Store over the custom data source listing: decorated records, dropdown
/// projections, and create / delete / test-connection actions that delegate
/// to the remote API. Explicitly constructed and injected; one instance per
/// application session.
pub struct DataSourceListStore {
    api: Arc<dyn DataSourceApi>,
    resource: Arc<ListResource>,
    site_host: String,
    creating: Arc<AtomicBool>,
    testing: Arc<AtomicBool>,
    items: Memo<DataSourceItem>,
    options: Memo<DropdownOption>,
}

impl DataSourceListStore {
    /// Build a store over the standard custom data source listing. Must be
    /// called within a tokio runtime: the initial auto-load is spawned.
    pub fn new(api: Arc<dyn DataSourceApi>, site_host: impl Into<String>) -> Self {
        Self::with_spec(
            api,
            site_host,
            ListSpec::custom_data_sources(DEFAULT_PAGE_LENGTH),
        )
    }

    pub fn with_spec(
        api: Arc<dyn DataSourceApi>,
        site_host: impl Into<String>,
        spec: ListSpec,
    ) -> Self {
        let resource = ListResource::new(api.clone(), spec);
        DataSourceListStore {
            api,
            resource,
            site_host: site_host.into(),
            creating: Arc::new(AtomicBool::new(false)),
            testing: Arc::new(AtomicBool::new(false)),
            items: Memo::new(),
            options: Memo::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let api = Arc::new(HttpApi::new(config)?);
        Ok(Self::with_spec(
            api,
            config.site_host(),
            ListSpec::custom_data_sources(config.page_length),
        ))
    }

    /// The current page of records, decorated for display. Recomputed only
    /// when the underlying fetch result has changed.
    pub fn list(&self) -> Arc<Vec<DataSourceItem>> {
        let version = self.resource.version();
        let data = self.resource.data();
        let host = self.site_host.clone();
        self.items.get_or_recompute(version, || {
            data.iter().map(|record| decorate(record, &host)).collect()
        })
    }

    /// One option per visible record, same order as `list`.
    pub fn dropdown_options(&self) -> Arc<Vec<DropdownOption>> {
        let version = self.resource.version();
        let items = self.list();
        self.options.get_or_recompute(version, || {
            items.iter().map(make_dropdown_option).collect()
        })
    }

    /// Options for the records matching every given attribute/value pair.
    /// Empty filters match everything. Comparison is deliberately coercive
    /// (`1` matches `true`), matching how site-db filters like
    /// `{"is_site_db": 1}` are written by callers.
    pub fn dropdown_options_matching(&self, filters: &Map<String, Value>) -> Vec<DropdownOption> {
        self.list()
            .iter()
            .filter(|item| {
                filters.iter().all(|(key, expected)| {
                    item.record
                        .field(key)
                        .map_or(false, |actual| loose_eq(&actual, expected))
                })
            })
            .map(make_dropdown_option)
            .collect()
    }

    pub fn loading(&self) -> bool {
        self.resource.loading()
    }

    pub fn deleting(&self) -> bool {
        self.resource.deleting()
    }

    pub fn creating(&self) -> bool {
        self.creating.load(Ordering::SeqCst)
    }

    pub fn testing(&self) -> bool {
        self.testing.load(Ordering::SeqCst)
    }

    /// Create a data source remotely, then refresh the listing. The returned
    /// future resolves once the refresh has been issued, not once it lands;
    /// a refresh failure is logged, not returned.
    pub async fn create(&self, args: Value) -> Result<(), ApiError> {
        {
            let _busy = FlagGuard::raise(&self.creating);
            self.api.create_custom_data_source(args).await?;
        }
        self.resource.clone().reload_detached();
        Ok(())
    }

    /// Delete by unique document name, then refresh the listing. Same
    /// refresh semantics as `create`.
    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.resource.delete(name).await?;
        self.resource.clone().reload_detached();
        Ok(())
    }

    /// Stateless connection check; never touches the listing.
    pub async fn test_connection(&self, args: Value) -> Result<Value, ApiError> {
        let _busy = FlagGuard::raise(&self.testing);
        self.api.test_connection(args).await
    }
}

fn decorate(record: &DataSourceRecord, site_host: &str) -> DataSourceItem {
    let mut record = record.clone();
    if !site_host.is_empty() {
        record.title = site_host.to_string();
    }
    DataSourceItem {
        created_from_now: time::from_now(record.creation),
        modified_from_now: time::from_now(record.modified),
        record,
    }
}

fn make_dropdown_option(item: &DataSourceItem) -> DropdownOption {
    DropdownOption {
        label: item.record.title.clone(),
        value: item.record.database_type.clone(),
        description: item.record.database_type.clone(),
    }
}

/// Loose equality over JSON values: equal values compare structurally,
/// mixed types fall back to numeric coercion (booleans and numeric strings
/// become numbers), so `true` matches `1` and `"1"` matches `1`.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
