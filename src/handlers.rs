use anyhow::{Context, Result};
use chrono::Local;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::HostTokenClient;
use crate::cli::{BundleCommands, PlanCommands, SettingsCommands};
use crate::config::{self, Config};
use crate::controllers::analytics::{AnalyticsController, DateRange};
use crate::controllers::bundles::{BundleEditor, BundleId, BundleListController};
use crate::controllers::plans::PlansController;
use crate::controllers::settings::SettingsController;
use crate::infrastructure::{OnboardingStore, RequestExecutor};
use crate::notify::{ConsoleNotifier, LoadingIndicator, NoopLoading};
use crate::session::{SessionTokenSource, TokenProvider};

/// An authenticated connection to the backend for one shop.
pub struct AdminSession {
    pub tokens: Arc<SessionTokenSource>,
    pub executor: Arc<RequestExecutor>,
    pub loading: Arc<dyn LoadingIndicator>,
    pub shop: String,
}

impl AdminSession {
    /// Starts the token refresh and waits for the first token. Without one
    /// nothing else can work, so that failure ends the command.
    pub async fn connect(config: &Config, shop: Option<String>) -> Result<Self> {
        let fetcher = Arc::new(HostTokenClient::new(
            config.api_key.clone(),
            config.token_url.clone(),
        ));
        let tokens = Arc::new(SessionTokenSource::start(fetcher, config.refresh_interval()));

        let credential = tokens
            .ready()
            .await
            .context("Could not obtain a session token; check your API key and token URL")?;

        let shop = shop
            .or_else(|| config.shop.clone())
            .or_else(|| {
                HostTokenClient::parse_claims(credential.as_str())
                    .ok()
                    .and_then(|claims| claims.shop_domain())
            })
            .context("No shop configured; pass --shop or set BUNDLE_SHOP")?;

        tracing::debug!("Connected to {} for shop {}", config.api_url, shop);

        let provider: Arc<dyn TokenProvider> = tokens.clone();
        let executor = Arc::new(RequestExecutor::new(
            config.api_url.clone(),
            provider,
            Arc::new(ConsoleNotifier),
        ));

        Ok(Self {
            tokens,
            executor,
            loading: Arc::new(NoopLoading),
            shop,
        })
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to format response")?
    );
    Ok(())
}

fn read_json_file(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("{:?} is not valid JSON", path))
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

pub async fn handle_init(
    config_path: &PathBuf,
    api_key: Option<String>,
    api_url: String,
    token_url: String,
    shop: Option<String>,
) -> Result<()> {
    if Config::exists(config_path) {
        println!("Configuration already exists at {:?}", config_path);
        print!("Overwrite? (y/N): ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    config::load_dotenv();

    let api_url = std::env::var("BUNDLE_API_URL").unwrap_or(api_url);
    let token_url = std::env::var("BUNDLE_TOKEN_URL").unwrap_or(token_url);

    let api_key = api_key
        .or_else(|| std::env::var("BUNDLE_API_KEY").ok())
        .or_else(|| {
            print!("Enter your API key: ");
            std::io::Write::flush(&mut std::io::stdout()).ok();
            let mut input = String::new();
            std::io::stdin().read_line(&mut input).ok();
            Some(input.trim().to_string())
        })
        .filter(|key| !key.is_empty())
        .context("API key is required")?;

    println!("Validating API key...");
    let client = HostTokenClient::new(api_key.clone(), token_url.clone());

    match client.fetch_session_token().await {
        Ok(token) => {
            println!("✓ Session token issued");

            let mut config = Config::new(api_key, api_url);
            config.token_url = token_url;
            config.shop = shop.or_else(|| token.claims.shop_domain());
            config.save(config_path)?;
            println!("✓ Configuration saved to {:?}", config_path);

            if let Some(shop) = &config.shop {
                println!("✓ Shop: {}", shop);
            }

            Ok(())
        }
        Err(e) => {
            println!("✗ Authentication failed: {}", e);
            println!("\nPlease check:");
            println!("  • Your API key is correct");
            println!("  • You have network connectivity");
            println!("  • The token URL is correct: {}", token_url);
            Err(anyhow::anyhow!("Failed to authenticate with provided API key"))
        }
    }
}

pub fn handle_show_config(config_path: &Path, show_secrets: bool) -> Result<()> {
    let config = Config::load_with_env(config_path)?;

    let api_key = if show_secrets {
        config.api_key.clone()
    } else {
        let visible: String = config.api_key.chars().take(4).collect();
        format!("{}…", visible)
    };

    println!("Config file:      {:?}", config_path);
    println!("API key:          {}", api_key);
    println!("API URL:          {}", config.api_url);
    println!("Token URL:        {}", config.token_url);
    println!(
        "Shop:             {}",
        config.shop.as_deref().unwrap_or("(from session token)")
    );
    println!("Refresh interval: {}s", config.refresh_interval().as_secs());
    Ok(())
}

pub async fn handle_bundles(
    config_path: &Path,
    shop: Option<String>,
    command: BundleCommands,
) -> Result<()> {
    let config = Config::load_with_env(config_path)?;
    let session = AdminSession::connect(&config, shop).await?;
    let list = BundleListController::new(
        session.executor.clone(),
        session.loading.clone(),
        session.shop.clone(),
    );

    match command {
        BundleCommands::List { kind, page, search } => {
            list.resource()
                .update_query(|query| {
                    query.kind = kind;
                    query.page = page.max(1);
                    query.search = search.unwrap_or_default();
                })
                .await?;
            // An unchanged query skipped the fetch above.
            if list.resource().data().await.is_none() {
                list.load().await?;
            }

            let Some(page) = list.page().await? else {
                println!("No bundles.");
                return Ok(());
            };
            for bundle in &page.bundles {
                println!(
                    "{:<12} {:<8} {:<14} {}",
                    bundle.id,
                    bundle.status.as_deref().unwrap_or("-"),
                    bundle.kind.as_deref().unwrap_or("-"),
                    bundle.title
                );
            }
            if let Some(total_pages) = page.total_pages {
                println!("Page {} of {}", list.resource().query().await.page, total_pages);
            }
        }
        BundleCommands::Show { id } => {
            let editor = BundleEditor::new(
                session.executor.clone(),
                session.loading.clone(),
                session.shop.clone(),
                Some(BundleId::from(id.as_str())),
            );
            editor.load().await?;
            if let Some(bundle) = editor.bundle().await {
                print_json(&bundle)?;
            }
        }
        BundleCommands::Save { file, id } => {
            let draft = read_json_file(&file)?;
            let editor = BundleEditor::new(
                session.executor.clone(),
                session.loading.clone(),
                session.shop.clone(),
                id.as_deref().map(BundleId::from),
            );
            if id.is_some() {
                editor.load().await?;
            }
            editor.editable().replace(draft).await;
            let saved = editor.save().await?;
            print_json(&saved)?;
        }
        BundleCommands::Status { id, status } => {
            list.set_status(&BundleId::from(id.as_str()), status).await?;
        }
        BundleCommands::Delete { id } => {
            list.delete(&BundleId::from(id.as_str())).await?;
        }
        BundleCommands::Duplicate { id } => {
            let created = list.duplicate(&BundleId::from(id.as_str())).await?;
            if let Some(new_id) = BundleId::from_response(&created) {
                println!("New bundle id: {}", new_id);
            }
        }
        BundleCommands::UploadImage { id, file } => {
            let bytes = fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("image")
                .to_string();
            list.upload_image(
                &BundleId::from(id.as_str()),
                &file_name,
                guess_mime(&file),
                bytes,
            )
            .await?;
        }
    }

    Ok(())
}

pub async fn handle_settings(
    config_path: &Path,
    shop: Option<String>,
    command: SettingsCommands,
) -> Result<()> {
    let config = Config::load_with_env(config_path)?;
    let session = AdminSession::connect(&config, shop).await?;
    let settings = SettingsController::new(session.executor, session.loading, session.shop);

    match command {
        SettingsCommands::Show => {
            settings.load().await?;
            if let Some(current) = settings.settings().await {
                print_json(&current)?;
            }
        }
        SettingsCommands::Save { file } => {
            let draft = read_json_file(&file)?;
            settings.replace(draft).await;
            settings.save().await?;
        }
    }

    Ok(())
}

pub async fn handle_analytics(
    config_path: &Path,
    shop: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let range = match (from, to) {
        (None, None) => DateRange::last_days(today, 30),
        (from, to) => {
            let default = DateRange::last_days(today, 30);
            DateRange::parse(
                &from.unwrap_or_else(|| default.start_param()),
                &to.unwrap_or_else(|| default.end_param()),
            )?
        }
    };

    let config = Config::load_with_env(config_path)?;
    let session = AdminSession::connect(&config, shop).await?;
    let analytics =
        AnalyticsController::new(session.executor, session.loading, session.shop, range);

    analytics.load().await?;
    let Some(summary) = analytics.summary().await? else {
        println!("No analytics data.");
        return Ok(());
    };

    println!("{} to {}", range.start_param(), range.end_param());
    println!("Revenue:    {:.2}", summary.revenue);
    println!("Orders:     {}", summary.orders);
    println!("Views:      {}", summary.views);
    println!("Conversion: {:.2}%", summary.conversion_rate * 100.0);
    Ok(())
}

pub async fn handle_plans(
    config_path: &Path,
    shop: Option<String>,
    command: PlanCommands,
) -> Result<()> {
    let config = Config::load_with_env(config_path)?;
    let session = AdminSession::connect(&config, shop).await?;
    let plans = PlansController::new(session.executor, session.loading, session.shop);

    match command {
        PlanCommands::List => {
            plans.load().await?;
            let catalog = plans.catalog().await?.unwrap_or_default();
            for plan in &catalog.plans {
                let marker = if catalog.current_plan.as_deref() == Some(plan.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<16} {:>8.2}", marker, plan.name, plan.price);
            }
        }
        PlanCommands::Subscribe { plan } => {
            if let Some(url) = plans.subscribe(&plan).await? {
                println!("Approve the charge at: {}", url);
            }
        }
    }

    Ok(())
}

pub fn handle_onboarding(reset: bool) -> Result<()> {
    let store = OnboardingStore::new()?;

    if reset {
        store.reset()?;
        println!("Onboarding will be shown again.");
        return Ok(());
    }

    if store.is_shown() {
        println!("Onboarding already shown.");
    } else {
        println!("Welcome! Create your first bundle with `bundle-admin bundles save --file bundle.json`.");
        store.mark_shown()?;
    }
    Ok(())
}
