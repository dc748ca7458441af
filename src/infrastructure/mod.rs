pub mod api_client;
pub mod onboarding_store;

pub use api_client::RequestExecutor;
pub use onboarding_store::OnboardingStore;
