use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::controllers::bundles::{BundleKind, BundleStatus};

#[derive(Parser, Debug)]
#[command(name = "bundle-admin")]
#[command(author, version, about = "Manage product bundles from the command line", long_about = None)]
pub struct Cli {
    /// Verbose mode (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file path
    #[arg(short, long, default_value = "bundle_admin.json")]
    pub config: PathBuf,

    /// Shop domain (defaults to the config file or the session token)
    #[arg(long, global = true)]
    pub shop: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save API credentials after checking they yield a session token
    Init {
        /// API key (or set BUNDLE_API_KEY env var)
        #[arg(short, long)]
        api_key: Option<String>,

        /// Backend base URL
        #[arg(long, default_value = crate::config::DEFAULT_API_URL)]
        api_url: String,

        /// Session token endpoint
        #[arg(long, default_value = crate::config::DEFAULT_TOKEN_URL)]
        token_url: String,
    },

    /// Show current configuration
    Config {
        /// Show API key (hidden by default)
        #[arg(long)]
        show_secrets: bool,
    },

    /// List and manage bundles
    Bundles {
        #[command(subcommand)]
        command: BundleCommands,
    },

    /// Storefront customization settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Bundle performance for a date range
    Analytics {
        /// Start date (YYYY-MM-DD), defaults to 30 days ago
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<String>,
    },

    /// Subscription plans
    Plans {
        #[command(subcommand)]
        command: PlanCommands,
    },

    /// Show or reset the onboarding flag
    Onboarding {
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BundleCommands {
    /// List bundles
    List {
        /// Bundle type tab (fixed, mix_and_match, bxgy, volume, addons, fbt)
        #[arg(short, long)]
        kind: Option<BundleKind>,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a single bundle
    Show { id: String },

    /// Create or update a bundle from a JSON file
    Save {
        /// JSON file holding the bundle
        #[arg(short, long)]
        file: PathBuf,

        /// Existing bundle id; omit to create
        #[arg(long)]
        id: Option<String>,
    },

    /// Activate or deactivate a bundle
    Status { id: String, status: BundleStatus },

    Delete { id: String },

    Duplicate { id: String },

    /// Upload a bundle image
    UploadImage {
        id: String,

        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    Show,

    /// Replace settings with the contents of a JSON file
    Save {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    List,

    Subscribe { plan: String },
}

impl Cli {
    pub fn get_log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::ERROR,
            1 => tracing::Level::WARN,
            2 => tracing::Level::INFO,
            3 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

impl Commands {
    /// Subcommand name, safe to log since it carries no arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Config { .. } => "config",
            Commands::Bundles { .. } => "bundles",
            Commands::Settings { .. } => "settings",
            Commands::Analytics { .. } => "analytics",
            Commands::Plans { .. } => "plans",
            Commands::Onboarding { .. } => "onboarding",
        }
    }
}
