//! Clap derive structures for the `smartfarm` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only depends on clap + clap_complete so `build.rs` can include it for
//! man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// smartfarm -- command-line client for the SmartFarm management backend
#[derive(Debug, Parser)]
#[command(
    name = "smartfarm",
    version,
    about = "Manage SmartFarm farmers, crops, suppliers and market data from the command line",
    long_about = "A command-line client for the SmartFarm management backend.\n\n\
        Reads go through a local query cache, mutations invalidate the\n\
        affected entries, and `watch` streams realtime price and alert events.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "SMARTFARM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// REST API base URL (overrides profile)
    #[arg(long, env = "SMARTFARM_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Realtime WebSocket URL (default: derived from the API URL)
    #[arg(long, env = "SMARTFARM_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Access token (overrides stored credentials)
    #[arg(long, env = "SMARTFARM_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SMARTFARM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SMARTFARM_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "SMARTFARM_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortDirection {
    Asc,
    Desc,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage farmers
    #[command(alias = "f")]
    Farmers(FarmersArgs),

    /// Manage crops, status changes and harvests
    #[command(alias = "c")]
    Crops(CropsArgs),

    /// Farm recommendations: review, update status, generate
    #[command(alias = "rec")]
    Recommendations(RecommendationsArgs),

    /// Manage suppliers, their catalogue and orders
    #[command(alias = "sup")]
    Suppliers(SuppliersArgs),

    /// Market prices, trends and price alerts
    #[command(alias = "market")]
    Prices(PricesArgs),

    /// Generate, track and download reports
    Reports(ReportsArgs),

    /// Dashboard widgets
    #[command(alias = "dash")]
    Dashboard(DashboardArgs),

    /// Stream realtime events
    Watch(WatchArgs),

    /// Log in and store the issued tokens in the system keyring
    Login(LoginArgs),

    /// Forget stored tokens for the active profile
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared List Arguments ────────────────────────────────────────────

/// Shared pagination and filtering arguments for all list commands.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Max results per page
    #[arg(long, short = 'l', default_value = "10")]
    pub limit: u32,

    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Status filter
    #[arg(long)]
    pub status: Option<String>,

    /// Sort field
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort direction
    #[arg(long, value_enum)]
    pub order: Option<SortDirection>,

    /// Extra filter as KEY=VALUE (repeatable), e.g. --filter farmerId=f-1
    #[arg(long = "filter", short = 'f', value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
}

/// `--from-file` for create/update payloads.
#[derive(Debug, Args)]
pub struct PayloadArgs {
    /// JSON file with the request body
    #[arg(long = "from-file", short = 'F', value_name = "PATH")]
    pub from_file: PathBuf,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FARMERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FarmersArgs {
    #[command(subcommand)]
    pub command: FarmersCommand,
}

#[derive(Debug, Subcommand)]
pub enum FarmersCommand {
    /// List farmers
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get farmer details
    Get {
        /// Farmer ID
        id: String,
    },

    /// Register a new farmer
    Create {
        #[arg(long, required_unless_present = "from_file")]
        first_name: Option<String>,

        #[arg(long, required_unless_present = "from_file")]
        last_name: Option<String>,

        #[arg(long, required_unless_present = "from_file")]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        city: Option<String>,

        /// Farm size in hectares
        #[arg(long)]
        farm_size: Option<f64>,

        /// Create from JSON file (overrides individual flags)
        #[arg(long = "from-file", short = 'F', value_name = "PATH")]
        from_file: Option<PathBuf>,
    },

    /// Update a farmer from a JSON file
    Update {
        /// Farmer ID
        id: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Delete a farmer
    #[command(alias = "rm")]
    Delete {
        /// Farmer ID
        id: String,
    },

    /// Search farmers by name or email (more than two characters)
    Search {
        query: String,
    },

    /// Farmer statistics
    Stats,

    /// Bulk-import farmers from a JSON array file
    Import {
        /// JSON file containing an array of farmers
        path: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CROPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CropsArgs {
    #[command(subcommand)]
    pub command: CropsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CropsCommand {
    /// List crops
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get crop details
    Get {
        /// Crop ID
        id: String,
    },

    /// Create a crop from a JSON file
    Create(PayloadArgs),

    /// Update a crop from a JSON file
    Update {
        /// Crop ID
        id: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Delete a crop
    #[command(alias = "rm")]
    Delete {
        /// Crop ID
        id: String,
    },

    /// Crop statistics
    Stats,

    /// Change a crop's lifecycle status
    Status {
        /// Crop ID
        id: String,

        /// New status: planned, planted, growing, ready_for_harvest, harvested, failed
        status: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Record a harvest
    Harvest {
        /// Crop ID
        id: String,

        /// Actual yield in tons
        #[arg(long = "yield", value_name = "TONS")]
        actual_yield: f64,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Upcoming crop tasks
    Tasks {
        /// Look-ahead window in days
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Crops belonging to one farmer
    ForFarmer {
        farmer_id: String,
    },

    /// Crops planted on one field
    ForField {
        field_id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RECOMMENDATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RecommendationsArgs {
    #[command(subcommand)]
    pub command: RecommendationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RecommendationsCommand {
    /// List recommendations
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get recommendation details
    Get {
        /// Recommendation ID
        id: String,
    },

    /// Create a recommendation from a JSON file
    Create(PayloadArgs),

    /// Update a recommendation from a JSON file
    Update {
        /// Recommendation ID
        id: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Delete a recommendation
    #[command(alias = "rm")]
    Delete {
        /// Recommendation ID
        id: String,
    },

    /// Recommendation statistics
    Stats,

    /// Change a recommendation's status
    Status {
        /// Recommendation ID
        id: String,

        /// New status: pending, in_progress, completed, dismissed
        status: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Generate new recommendations
    Generate {
        /// Recommendation type: crop_planning, pest_control, irrigation, fertilization, harvest, market
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Entity type: crop, field, farmer, inventory, market
        #[arg(long, requires = "entity_id")]
        entity: Option<String>,

        /// Entity ID
        #[arg(long, requires = "entity")]
        entity_id: Option<String>,
    },

    /// Recommendations similar to one
    Similar {
        /// Recommendation ID
        id: String,
    },

    /// Recommendations attached to one entity
    For {
        /// Entity type: crop, field, farmer, inventory, market
        entity: String,

        /// Entity ID
        entity_id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SUPPLIERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SuppliersArgs {
    #[command(subcommand)]
    pub command: SuppliersCommand,
}

#[derive(Debug, Subcommand)]
pub enum SuppliersCommand {
    /// List suppliers
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get supplier details
    Get {
        /// Supplier ID
        id: String,
    },

    /// Create a supplier from a JSON file
    Create(PayloadArgs),

    /// Update a supplier from a JSON file
    Update {
        /// Supplier ID
        id: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Delete a supplier
    #[command(alias = "rm")]
    Delete {
        /// Supplier ID
        id: String,
    },

    /// Search suppliers
    Search {
        query: String,
    },

    /// Supplier statistics
    Stats,

    /// List a supplier's products
    Products {
        /// Supplier ID
        id: String,
    },

    /// Add a product to a supplier's catalogue from a JSON file
    AddProduct {
        /// Supplier ID
        id: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Update a catalogue product from a JSON file
    UpdateProduct {
        /// Supplier ID
        id: String,

        /// Product ID
        product_id: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Remove a product from a supplier's catalogue
    RemoveProduct {
        /// Supplier ID
        id: String,

        /// Product ID
        product_id: String,
    },

    /// Purchase orders placed with a supplier
    Orders {
        /// Supplier ID
        id: String,

        #[command(flatten)]
        list: ListArgs,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PRICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PricesArgs {
    #[command(subcommand)]
    pub command: PricesCommand,
}

#[derive(Debug, Subcommand)]
pub enum PricesCommand {
    /// Current market prices
    #[command(alias = "ls")]
    Current {
        #[arg(long)]
        commodity: Option<String>,

        #[arg(long)]
        market: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Price history for one commodity
    History {
        commodity: String,

        #[arg(long)]
        market: Option<String>,

        #[arg(long)]
        start_date: Option<String>,

        #[arg(long)]
        end_date: Option<String>,

        /// Sampling interval: day, week, month
        #[arg(long)]
        interval: Option<String>,
    },

    /// Price trends
    Trends {
        /// Commodities, comma-separated
        #[arg(long, value_delimiter = ',')]
        commodities: Vec<String>,

        /// Window in days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Market statistics: top movers and price changes
    Stats,

    /// Known commodities
    Commodities,

    /// Known markets
    Markets,

    /// Manage price alerts
    Alerts(AlertsArgs),
}

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List price alerts
    #[command(alias = "ls")]
    List,

    /// Create a price alert
    Create {
        commodity: String,

        /// Trigger condition: above, below, change
        #[arg(long)]
        condition: String,

        /// Threshold price (or percentage for `change`)
        #[arg(long)]
        value: f64,

        /// Create the alert disabled
        #[arg(long)]
        inactive: bool,
    },

    /// Update a price alert
    Update {
        /// Alert ID
        id: String,

        #[arg(long)]
        condition: Option<String>,

        #[arg(long)]
        value: Option<f64>,

        /// Enable or disable the alert
        #[arg(long, action = clap::ArgAction::Set)]
        active: Option<bool>,
    },

    /// Delete a price alert
    #[command(alias = "rm")]
    Delete {
        /// Alert ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REPORTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ReportsArgs {
    #[command(subcommand)]
    pub command: ReportsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReportsCommand {
    /// List report templates
    Templates {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Start generating a report from a template
    Generate {
        /// Template ID
        template_id: String,

        /// Output format: pdf, excel, csv, json
        #[arg(long)]
        format: Option<String>,

        /// Template parameter as KEY=VALUE (repeatable); JSON values are parsed
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Email when the report is ready
        #[arg(long)]
        email: bool,

        /// Wait for generation to finish
        #[arg(long, short = 'w')]
        wait: bool,
    },

    /// Show a generated report's status
    Status {
        /// Report ID
        id: String,

        /// Keep polling while the report is processing
        #[arg(long, short = 'w')]
        watch: bool,
    },

    /// Previously generated reports
    History(ListArgs),

    /// Report statistics
    Stats,

    /// Download a generated report
    Download {
        /// Report ID
        id: String,

        /// Destination file (default: report-<ID>.<ext>)
        #[arg(long, short = 'O', value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Schedule a recurring report from a JSON file
    Schedule(PayloadArgs),

    /// List scheduled reports
    Scheduled,

    /// Delete a scheduled report
    Unschedule {
        /// Scheduled report ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DASHBOARD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(subcommand)]
    pub command: DashboardCommand,

    #[arg(long, global = true)]
    pub start_date: Option<String>,

    #[arg(long, global = true)]
    pub end_date: Option<String>,

    #[arg(long, global = true)]
    pub region: Option<String>,

    #[arg(long, global = true)]
    pub crop_type: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum DashboardCommand {
    /// Headline numbers
    Summary,

    /// Dashboard for one farmer
    Farmer {
        farmer_id: String,
    },

    /// Recent activity feed
    Activities,

    /// Revenue, expenses and profit
    Financials,

    /// Crop area distribution
    Crops,

    /// Upcoming tasks
    Tasks,

    /// Yield and resource usage
    Performance,

    /// Open alerts
    Alerts,

    /// Current weather and forecast
    Weather,

    /// Market price snapshot
    Market,

    /// Mark a dashboard alert as read
    MarkRead {
        /// Alert ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Event names to subscribe to
    #[arg(default_values_t = [String::from("priceUpdate"), String::from("alertTriggered")])]
    pub events: Vec<String>,

    /// Stop after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Ask the server for each event's current value on connect
    #[arg(long)]
    pub request: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (default: profile email or SMARTFARM_EMAIL)
    #[arg(long, env = "SMARTFARM_EMAIL")]
    pub email: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Set a value on the active profile
    Set {
        /// Key: api_url, ws_url, email, ca_cert, insecure, timeout, realtime,
        /// reconnect_attempts, reconnect_delay
        key: String,

        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Switch the default profile
    Use {
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
