//! Screen data controllers.
//!
//! A controller owns one remote resource slot plus the dependency set
//! (query) that determines what is fetched. Reads are tagged with a
//! generation number and only the newest one may update the slot. Every
//! successful write goes through [`ResourceController::invalidate_and_reload`]
//! so local state always comes back from the backend's copy.

use crate::domain::outcome::unwrap_envelope;
use crate::domain::request::RequestDescriptor;
use crate::domain::ApiError;
use crate::infrastructure::api_client::RequestExecutor;
use crate::notify::{LoadingGuard, LoadingIndicator};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod analytics;
pub mod bundles;
pub mod debounce;
pub mod plans;
pub mod settings;

pub use debounce::Debouncer;

/// The dependency set of a screen: filters, page, tab, date range.
pub trait ScreenQuery: Clone + PartialEq + Send + Sync + 'static {
    /// `None` when there is nothing to fetch yet.
    fn read_request(&self) -> Option<RequestDescriptor>;
}

/// What happened to a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Applied,
    /// A newer read was issued while this one was in flight.
    Superseded,
    /// The query did not change, so nothing was fetched.
    Unchanged,
    /// A newer input arrived within the debounce window.
    Debounced,
    Idle,
}

#[derive(Debug, Default)]
struct Slot {
    data: Option<Value>,
    issued: u64,
    last_error: Option<ApiError>,
}

pub struct ResourceController<Q: ScreenQuery> {
    executor: Arc<RequestExecutor>,
    loading: Arc<dyn LoadingIndicator>,
    query: Mutex<Q>,
    slot: Mutex<Slot>,
}

impl<Q: ScreenQuery> ResourceController<Q> {
    pub fn new(
        executor: Arc<RequestExecutor>,
        loading: Arc<dyn LoadingIndicator>,
        query: Q,
    ) -> Self {
        Self {
            executor,
            loading,
            query: Mutex::new(query),
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub async fn query(&self) -> Q {
        self.query.lock().await.clone()
    }

    pub async fn data(&self) -> Option<Value> {
        self.slot.lock().await.data.clone()
    }

    pub async fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data().await.map(serde_json::from_value).transpose()
    }

    pub async fn last_error(&self) -> Option<ApiError> {
        self.slot.lock().await.last_error.clone()
    }

    /// Generation of the most recently issued read.
    pub async fn generation(&self) -> u64 {
        self.slot.lock().await.issued
    }

    /// Fetches with the current query. A failed read keeps the previous data.
    pub async fn load(&self) -> Result<Refresh, ApiError> {
        let (generation, request) = {
            let query = self.query.lock().await;
            let Some(request) = query.read_request() else {
                return Ok(Refresh::Idle);
            };
            let mut slot = self.slot.lock().await;
            slot.issued += 1;
            (slot.issued, request)
        };

        let result = {
            let _loading = LoadingGuard::start(self.loading.clone());
            self.executor
                .attempt(&request)
                .await
                .and_then(|(_, data)| unwrap_envelope(data))
        };

        let mut slot = self.slot.lock().await;
        if generation != slot.issued {
            tracing::debug!(
                "Discarding response for {} (generation {}, latest {})",
                request.url,
                generation,
                slot.issued
            );
            return Ok(Refresh::Superseded);
        }

        match result {
            Ok(data) => {
                slot.data = Some(data);
                slot.last_error = None;
                Ok(Refresh::Applied)
            }
            Err(e) => {
                slot.last_error = Some(e.clone());
                drop(slot);
                self.executor.notify_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Replaces the query and reloads if it changed.
    pub async fn set_query(&self, query: Q) -> Result<Refresh, ApiError> {
        {
            let mut current = self.query.lock().await;
            if *current == query {
                return Ok(Refresh::Unchanged);
            }
            *current = query;
        }
        self.load().await
    }

    pub async fn update_query(&self, update: impl FnOnce(&mut Q)) -> Result<Refresh, ApiError> {
        let mut query = self.query().await;
        update(&mut query);
        self.set_query(query).await
    }

    /// Drops any notion that local state is current and reads it back.
    pub async fn invalidate_and_reload(&self) -> Result<Refresh, ApiError> {
        tracing::debug!("Reloading after write");
        self.load().await
    }

    /// Performs a write. On success a notice is shown and the resource is
    /// reloaded once; on failure the current data is left untouched.
    pub async fn mutate(
        &self,
        request: RequestDescriptor,
        success_message: &str,
    ) -> Result<Value, ApiError> {
        let result = {
            let _loading = LoadingGuard::start(self.loading.clone());
            self.executor
                .attempt(&request)
                .await
                .and_then(|(_, data)| unwrap_envelope(data))
        };

        match result {
            Ok(data) => {
                self.executor.notify_success(success_message);
                if let Err(e) = self.invalidate_and_reload().await {
                    tracing::warn!("Reload after {} {} failed: {}", request.method, request.url, e);
                }
                Ok(data)
            }
            Err(e) => {
                tracing::warn!("{} {} failed: {}", request.method, request.url, e);
                self.executor.notify_error(e.to_string());
                Err(e)
            }
        }
    }
}

/// A resource with a local edit buffer in front of it.
///
/// Edits stay local until saved. A failed save discards the buffer so the
/// screen falls back to the last copy read from the backend.
pub struct EditableResource<Q: ScreenQuery> {
    resource: ResourceController<Q>,
    buffer: Mutex<Option<Value>>,
}

impl<Q: ScreenQuery> EditableResource<Q> {
    pub fn new(resource: ResourceController<Q>) -> Self {
        Self {
            resource,
            buffer: Mutex::new(None),
        }
    }

    pub fn resource(&self) -> &ResourceController<Q> {
        &self.resource
    }

    /// The edit buffer if dirty, otherwise the remote copy.
    pub async fn current(&self) -> Option<Value> {
        if let Some(edited) = self.buffer.lock().await.clone() {
            return Some(edited);
        }
        self.resource.data().await
    }

    pub async fn is_dirty(&self) -> bool {
        self.buffer.lock().await.is_some()
    }

    pub async fn edit(&self, change: impl FnOnce(&mut Value)) {
        let remote = self.resource.data().await;
        let mut buffer = self.buffer.lock().await;
        let draft = buffer.get_or_insert_with(|| {
            remote.unwrap_or_else(|| Value::Object(Default::default()))
        });
        change(draft);
    }

    pub async fn replace(&self, draft: Value) {
        *self.buffer.lock().await = Some(draft);
    }

    pub async fn discard(&self) {
        *self.buffer.lock().await = None;
    }

    /// Sends the write built from the current draft.
    pub async fn save(
        &self,
        build: impl FnOnce(Value) -> RequestDescriptor,
        success_message: &str,
    ) -> Result<Value, ApiError> {
        let Some(draft) = self.current().await else {
            return Err(ApiError::Rejected("Nothing to save".to_string()));
        };

        let result = self.resource.mutate(build(draft), success_message).await;
        // Saved or not, the buffer no longer represents pending work.
        self.discard().await;
        result
    }
}
