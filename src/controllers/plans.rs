use super::{Refresh, ResourceController, ScreenQuery};
use crate::domain::request::RequestDescriptor;
use crate::domain::ApiError;
use crate::infrastructure::api_client::RequestExecutor;
use crate::notify::LoadingIndicator;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlansQuery {
    pub shop: String,
}

impl ScreenQuery for PlansQuery {
    fn read_request(&self) -> Option<RequestDescriptor> {
        Some(RequestDescriptor::get("/api/plans").query("shop", &self.shop))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, alias = "trialDays")]
    pub trial_days: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanCatalog {
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default, alias = "currentPlan")]
    pub current_plan: Option<String>,
}

impl PlanCatalog {
    pub fn current(&self) -> Option<&Plan> {
        let current = self.current_plan.as_deref()?;
        self.plans.iter().find(|plan| plan.name == current)
    }
}

pub struct PlansController {
    resource: ResourceController<PlansQuery>,
}

impl PlansController {
    pub fn new(
        executor: Arc<RequestExecutor>,
        loading: Arc<dyn LoadingIndicator>,
        shop: impl Into<String>,
    ) -> Self {
        let query = PlansQuery { shop: shop.into() };
        Self {
            resource: ResourceController::new(executor, loading, query),
        }
    }

    pub async fn load(&self) -> Result<Refresh, ApiError> {
        self.resource.load().await
    }

    pub async fn catalog(&self) -> Result<Option<PlanCatalog>, ApiError> {
        self.resource
            .data_as()
            .await
            .map_err(|e| ApiError::CorruptResponse(e.to_string()))
    }

    /// Requests a plan change. Paid plans answer with a billing confirmation
    /// URL the merchant has to visit.
    pub async fn subscribe(&self, plan: &str) -> Result<Option<String>, ApiError> {
        let shop = self.resource.query().await.shop;
        let request = RequestDescriptor::post("/api/plans/subscribe")
            .json(json!({ "shop": shop, "plan": plan }));

        let response = self.resource.mutate(request, "Plan updated").await?;
        Ok(response
            .get("confirmation_url")
            .or_else(|| response.get("confirmationUrl"))
            .and_then(|url| url.as_str())
            .map(|url| url.to_string()))
    }
}
