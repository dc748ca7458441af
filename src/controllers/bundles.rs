use super::{Debouncer, EditableResource, Refresh, ResourceController, ScreenQuery};
use crate::domain::request::{MultipartField, RequestDescriptor};
use crate::domain::ApiError;
use crate::infrastructure::api_client::RequestExecutor;
use crate::notify::LoadingIndicator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleKind {
    #[serde(rename = "fixed")]
    Fixed,
    #[serde(rename = "mix_and_match")]
    MixAndMatch,
    #[serde(rename = "bxgy")]
    BuyXGetY,
    #[serde(rename = "volume")]
    Volume,
    #[serde(rename = "addons")]
    Addons,
    #[serde(rename = "fbt")]
    FrequentlyBoughtTogether,
}

impl BundleKind {
    pub const ALL: [BundleKind; 6] = [
        BundleKind::Fixed,
        BundleKind::MixAndMatch,
        BundleKind::BuyXGetY,
        BundleKind::Volume,
        BundleKind::Addons,
        BundleKind::FrequentlyBoughtTogether,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BundleKind::Fixed => "fixed",
            BundleKind::MixAndMatch => "mix_and_match",
            BundleKind::BuyXGetY => "bxgy",
            BundleKind::Volume => "volume",
            BundleKind::Addons => "addons",
            BundleKind::FrequentlyBoughtTogether => "fbt",
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BundleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BundleKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = BundleKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown bundle type '{}', expected one of {}", s, known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    Active,
    Draft,
}

impl FromStr for BundleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BundleStatus::Active),
            "draft" => Ok(BundleStatus::Draft),
            other => Err(format!("unknown status '{}', expected active or draft", other)),
        }
    }
}

/// Bundle ids come back as numbers from some endpoints and strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleId {
    Number(u64),
    Text(String),
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleId::Number(id) => f.pad(&id.to_string()),
            BundleId::Text(id) => f.pad(id),
        }
    }
}

impl From<&str> for BundleId {
    fn from(id: &str) -> Self {
        id.parse()
            .map(BundleId::Number)
            .unwrap_or_else(|_| BundleId::Text(id.to_string()))
    }
}

impl From<u64> for BundleId {
    fn from(id: u64) -> Self {
        BundleId::Number(id)
    }
}

impl BundleId {
    /// Finds the id in a create response, either top level or under `bundle`.
    pub fn from_response(value: &Value) -> Option<Self> {
        let id = value
            .get("id")
            .or_else(|| value.get("bundle").and_then(|bundle| bundle.get("id")))?;
        serde_json::from_value(id.clone()).ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleSummary {
    pub id: BundleId,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundlePage {
    #[serde(default)]
    pub bundles: Vec<BundleSummary>,
    #[serde(default, alias = "totalPages")]
    pub total_pages: Option<u32>,
    #[serde(default, alias = "totalCount")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleListQuery {
    pub shop: String,
    pub kind: Option<BundleKind>,
    pub page: u32,
    pub search: String,
}

impl BundleListQuery {
    pub fn new(shop: impl Into<String>) -> Self {
        Self {
            shop: shop.into(),
            kind: None,
            page: 1,
            search: String::new(),
        }
    }
}

impl ScreenQuery for BundleListQuery {
    fn read_request(&self) -> Option<RequestDescriptor> {
        let search = Some(self.search.trim()).filter(|s| !s.is_empty());
        Some(
            RequestDescriptor::get("/api/bundles")
                .query("shop", &self.shop)
                .query("page", self.page)
                .query_opt("type", self.kind)
                .query_opt("search", search),
        )
    }
}

/// The bundle table: tabs per bundle type, paging, debounced search and the
/// row actions.
pub struct BundleListController {
    resource: ResourceController<BundleListQuery>,
    debouncer: Debouncer,
}

impl BundleListController {
    pub fn new(
        executor: Arc<RequestExecutor>,
        loading: Arc<dyn LoadingIndicator>,
        shop: impl Into<String>,
    ) -> Self {
        Self {
            resource: ResourceController::new(executor, loading, BundleListQuery::new(shop)),
            debouncer: Debouncer::default(),
        }
    }

    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    pub fn resource(&self) -> &ResourceController<BundleListQuery> {
        &self.resource
    }

    pub async fn load(&self) -> Result<Refresh, ApiError> {
        self.resource.load().await
    }

    pub async fn page(&self) -> Result<Option<BundlePage>, ApiError> {
        self.resource
            .data_as()
            .await
            .map_err(|e| ApiError::CorruptResponse(e.to_string()))
    }

    /// New search text resets paging. Bursts of keystrokes collapse into one
    /// fetch for the last text.
    pub async fn search(&self, text: impl Into<String>) -> Result<Refresh, ApiError> {
        let Some(text) = self.debouncer.settle(text.into()).await else {
            return Ok(Refresh::Debounced);
        };

        self.resource
            .update_query(|query| {
                if query.search != text {
                    query.search = text;
                    query.page = 1;
                }
            })
            .await
    }

    pub async fn go_to_page(&self, page: u32) -> Result<Refresh, ApiError> {
        self.resource
            .update_query(|query| query.page = page.max(1))
            .await
    }

    pub async fn select_kind(&self, kind: Option<BundleKind>) -> Result<Refresh, ApiError> {
        self.resource
            .update_query(|query| {
                if query.kind != kind {
                    query.kind = kind;
                    query.page = 1;
                }
            })
            .await
    }

    pub async fn set_status(&self, id: &BundleId, status: BundleStatus) -> Result<Value, ApiError> {
        let shop = self.resource.query().await.shop;
        let request = RequestDescriptor::post(format!("/api/bundles/{}/status", id))
            .json(json!({ "shop": shop, "status": status }));
        self.resource.mutate(request, "Bundle status updated").await
    }

    pub async fn delete(&self, id: &BundleId) -> Result<Value, ApiError> {
        let shop = self.resource.query().await.shop;
        let request = RequestDescriptor::delete(format!("/api/bundles/{}", id)).query("shop", shop);
        self.resource.mutate(request, "Bundle deleted").await
    }

    pub async fn duplicate(&self, id: &BundleId) -> Result<Value, ApiError> {
        let shop = self.resource.query().await.shop;
        let request = RequestDescriptor::post(format!("/api/bundles/{}/duplicate", id))
            .json(json!({ "shop": shop }));
        self.resource.mutate(request, "Bundle duplicated").await
    }

    pub async fn upload_image(
        &self,
        id: &BundleId,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, ApiError> {
        let shop = self.resource.query().await.shop;
        let request = RequestDescriptor::post(format!("/api/bundles/{}/image", id)).multipart(vec![
            MultipartField::text("shop", shop),
            MultipartField::file("image", file_name, mime, bytes),
        ]);
        self.resource.mutate(request, "Image uploaded").await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleQuery {
    pub shop: String,
    pub id: Option<BundleId>,
}

impl ScreenQuery for BundleQuery {
    fn read_request(&self) -> Option<RequestDescriptor> {
        let id = self.id.as_ref()?;
        Some(RequestDescriptor::get(format!("/api/bundles/{}", id)).query("shop", &self.shop))
    }
}

/// Create and edit screen for a single bundle.
pub struct BundleEditor {
    editable: EditableResource<BundleQuery>,
}

impl BundleEditor {
    pub fn new(
        executor: Arc<RequestExecutor>,
        loading: Arc<dyn LoadingIndicator>,
        shop: impl Into<String>,
        id: Option<BundleId>,
    ) -> Self {
        let query = BundleQuery {
            shop: shop.into(),
            id,
        };
        Self {
            editable: EditableResource::new(ResourceController::new(executor, loading, query)),
        }
    }

    pub fn editable(&self) -> &EditableResource<BundleQuery> {
        &self.editable
    }

    pub async fn load(&self) -> Result<Refresh, ApiError> {
        self.editable.resource().load().await
    }

    pub async fn bundle(&self) -> Option<Value> {
        self.editable.current().await
    }

    pub async fn edit(&self, change: impl FnOnce(&mut Value)) {
        self.editable.edit(change).await
    }

    /// PATCHes an existing bundle or POSTs a new one. A newly created bundle
    /// is then loaded back by the id the backend assigned.
    pub async fn save(&self) -> Result<Value, ApiError> {
        let query = self.editable.resource().query().await;
        match query.id {
            Some(id) => self.update(&query.shop, &id).await,
            None => self.create(&query.shop).await,
        }
    }

    async fn update(&self, shop: &str, id: &BundleId) -> Result<Value, ApiError> {
        let url = format!("/api/bundles/{}", id);
        let saved = self
            .editable
            .save(
                |draft| RequestDescriptor::patch(url).json(json!({ "shop": shop, "bundle": draft })),
                "Bundle saved",
            )
            .await?;
        Ok(self.bundle().await.unwrap_or(saved))
    }

    async fn create(&self, shop: &str) -> Result<Value, ApiError> {
        let created = self
            .editable
            .save(
                |draft| {
                    RequestDescriptor::post("/api/bundles")
                        .json(json!({ "shop": shop, "bundle": draft }))
                },
                "Bundle created",
            )
            .await?;

        let Some(id) = BundleId::from_response(&created) else {
            tracing::warn!("Create response carried no bundle id");
            return Ok(created);
        };

        self.editable
            .resource()
            .update_query(|query| query.id = Some(id))
            .await?;
        Ok(self.bundle().await.unwrap_or(created))
    }
}
