use super::{EditableResource, Refresh, ResourceController, ScreenQuery};
use crate::domain::request::RequestDescriptor;
use crate::domain::ApiError;
use crate::infrastructure::api_client::RequestExecutor;
use crate::notify::LoadingIndicator;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsQuery {
    pub shop: String,
}

impl ScreenQuery for SettingsQuery {
    fn read_request(&self) -> Option<RequestDescriptor> {
        Some(RequestDescriptor::get("/api/settings/customization").query("shop", &self.shop))
    }
}

/// Storefront customization settings (colors, labels, layout options).
/// The payload is kept as opaque JSON.
pub struct SettingsController {
    editable: EditableResource<SettingsQuery>,
}

impl SettingsController {
    pub fn new(
        executor: Arc<RequestExecutor>,
        loading: Arc<dyn LoadingIndicator>,
        shop: impl Into<String>,
    ) -> Self {
        let query = SettingsQuery { shop: shop.into() };
        Self {
            editable: EditableResource::new(ResourceController::new(executor, loading, query)),
        }
    }

    pub async fn load(&self) -> Result<Refresh, ApiError> {
        self.editable.resource().load().await
    }

    pub async fn settings(&self) -> Option<Value> {
        self.editable.current().await
    }

    pub async fn is_dirty(&self) -> bool {
        self.editable.is_dirty().await
    }

    /// Sets one top-level setting in the edit buffer.
    pub async fn set(&self, key: &str, value: Value) {
        self.editable
            .edit(|settings| {
                if let Value::Object(map) = settings {
                    map.insert(key.to_string(), value);
                }
            })
            .await
    }

    pub async fn replace(&self, settings: Value) {
        self.editable.replace(settings).await
    }

    pub async fn discard(&self) {
        self.editable.discard().await
    }

    pub async fn save(&self) -> Result<Value, ApiError> {
        let shop = self.editable.resource().query().await.shop;
        self.editable
            .save(
                |settings| {
                    RequestDescriptor::post("/api/settings/customization")
                        .json(json!({ "shop": shop, "settings": settings }))
                },
                "Settings saved",
            )
            .await
    }
}
