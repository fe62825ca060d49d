use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::api::types::{DataSourceRecord, ListSpec};
use crate::api::DataSourceApi;
use crate::utils::ApiError;

/// RAII guard holding a boolean flag high for the duration of an operation,
/// so the flag reads false again even when the operation errors.
pub(crate) struct FlagGuard(Arc<AtomicBool>);

impl FlagGuard {
    pub(crate) fn raise(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        FlagGuard(flag.clone())
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Client-side view of a remote list query: the current page of records, a
/// version marker bumped on every successful reload, and per-operation
/// loading flags. The remote listing is the source of truth; this is a
/// read-through cache refreshed on demand.
pub struct ListResource {
    api: Arc<dyn DataSourceApi>,
    spec: ListSpec,
    data: RwLock<Arc<Vec<DataSourceRecord>>>,
    version: AtomicU64,
    loading: Arc<AtomicBool>,
    deleting: Arc<AtomicBool>,
}

impl ListResource {
    /// Must be called within a tokio runtime when the spec has `auto` set;
    /// the initial reload is spawned.
    pub fn new(api: Arc<dyn DataSourceApi>, spec: ListSpec) -> Arc<Self> {
        let resource = Arc::new(ListResource {
            api,
            spec,
            data: RwLock::new(Arc::new(Vec::new())),
            version: AtomicU64::new(0),
            loading: Arc::new(AtomicBool::new(false)),
            deleting: Arc::new(AtomicBool::new(false)),
        });
        if resource.spec.auto {
            resource.clone().reload_detached();
        }
        resource
    }

    /// Current page of records; empty before the first successful load.
    pub fn data(&self) -> Arc<Vec<DataSourceRecord>> {
        self.data.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Bumped on every successful reload; derived views key their memos on it.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn deleting(&self) -> bool {
        self.deleting.load(Ordering::SeqCst)
    }

    pub fn spec(&self) -> &ListSpec {
        &self.spec
    }

    /// Re-issue the query and replace the current page on success.
    pub async fn reload(&self) -> Result<(), ApiError> {
        let _busy = FlagGuard::raise(&self.loading);
        let records = self.api.fetch_list(&self.spec).await?;
        debug!(count = records.len(), doctype = %self.spec.doctype, "list reloaded");
        *self.data.write().unwrap_or_else(|p| p.into_inner()) = Arc::new(records);
        self.version.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Fire-and-forget reload; a failure is reported through the log rather
    /// than to any caller.
    pub fn reload_detached(self: Arc<Self>) {
        tokio::spawn(async move {
            if let Err(err) = self.reload().await {
                warn!(error = %err, doctype = %self.spec.doctype, "background list reload failed");
            }
        });
    }

    /// Delete one document by its unique name. The local page is left as is;
    /// callers follow up with a reload.
    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        let _busy = FlagGuard::raise(&self.deleting);
        self.api.delete_data_source(&self.spec.doctype, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{Map, Value};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct StaticApi {
        records: Mutex<Vec<DataSourceRecord>>,
        list_calls: AtomicUsize,
        deleted: Mutex<Vec<String>>,
    }

    impl StaticApi {
        fn with_records(records: Vec<DataSourceRecord>) -> Arc<Self> {
            Arc::new(StaticApi {
                records: Mutex::new(records),
                list_calls: AtomicUsize::new(0),
                deleted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DataSourceApi for StaticApi {
        async fn fetch_list(&self, _spec: &ListSpec) -> Result<Vec<DataSourceRecord>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.lock().unwrap().clone())
        }

        async fn create_custom_data_source(&self, _args: Value) -> Result<(), ApiError> {
            Ok(())
        }

        async fn delete_data_source(&self, _doctype: &str, name: &str) -> Result<(), ApiError> {
            self.deleted.lock().unwrap().push(name.to_string());
            self.records.lock().unwrap().retain(|r| r.name != name);
            Ok(())
        }

        async fn test_connection(&self, _args: Value) -> Result<Value, ApiError> {
            Ok(Value::Null)
        }
    }

    fn record(name: &str) -> DataSourceRecord {
        DataSourceRecord {
            name: name.to_string(),
            title: format!("{} source", name),
            status: "Active".to_string(),
            database_type: "BigQuery".to_string(),
            creation: Utc::now(),
            modified: Utc::now(),
            extra: Map::new(),
        }
    }

    fn manual_spec() -> ListSpec {
        ListSpec {
            auto: false,
            ..ListSpec::custom_data_sources(100)
        }
    }

    #[tokio::test]
    async fn test_reload_replaces_page_and_bumps_version() {
        let api = StaticApi::with_records(vec![record("ds-1"), record("ds-2")]);
        let resource = ListResource::new(api.clone(), manual_spec());

        assert!(resource.data().is_empty());
        assert_eq!(resource.version(), 0);

        resource.reload().await.unwrap();
        assert_eq!(resource.data().len(), 2);
        assert_eq!(resource.version(), 1);
        assert!(!resource.loading());

        resource.reload().await.unwrap();
        assert_eq!(resource.version(), 2);
    }

    #[tokio::test]
    async fn test_auto_spec_issues_initial_fetch() {
        let api = StaticApi::with_records(vec![record("ds-1")]);
        let resource = ListResource::new(api.clone(), ListSpec::custom_data_sources(100));

        for _ in 0..500 {
            if resource.version() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert_eq!(resource.version(), 1);
        assert_eq!(resource.data().len(), 1);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
        assert!(!resource.loading());
    }

    #[tokio::test]
    async fn test_delete_submits_key_and_clears_flag() {
        let api = StaticApi::with_records(vec![record("ds-1")]);
        let resource = ListResource::new(api.clone(), manual_spec());

        resource.delete("ds-1").await.unwrap();
        assert_eq!(*api.deleted.lock().unwrap(), vec!["ds-1".to_string()]);
        assert!(!resource.deleting());
    }
}
