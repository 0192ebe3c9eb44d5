use clap::Parser;

/// Command-line entry point. Every flag has an environment-variable
/// fallback (`--cluster` / `CLUSTER`, etc.) per spec.md §6; CLI flags win
/// over environment variables, which win over `ids.json` defaults.
#[derive(Debug, Parser)]
#[command(name = "mango-liquidator", about = "Cross-margin liquidation bot")]
pub struct Cli {
    /// Cluster name as it appears in ids.json (e.g. mainnet-beta, devnet).
    #[arg(long, env = "CLUSTER")]
    pub cluster: Option<String>,

    /// Override the RPC URL instead of looking it up in ids.json.
    #[arg(long, env = "CLUSTER_URL")]
    pub cluster_url: Option<String>,

    /// Name of the trading group to watch, e.g. BTC_ETH_USDT.
    #[arg(long, env = "GROUP_NAME")]
    pub group_name: Option<String>,

    /// Path to ids.json.
    #[arg(long, env = "IDS_JSON_PATH", default_value = "ids.json")]
    pub ids_json: String,

    /// Path to the operator's wallet keypair file.
    #[arg(long, env = "KEEPER_KEYPAIR")]
    pub keypair: Option<String>,

    /// Log every decision but never submit a liquidation, rebalance trade,
    /// or force-cancel transaction.
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,

    /// Run a single scouting pass (funnel counts only) and exit, instead of
    /// entering the long-running supervisor loop.
    #[arg(long)]
    pub scout: bool,

    /// Notification target URIs, e.g. telegram:CHAT@BOT or discord:URL.
    #[arg(long = "notify", env = "NOTIFY_TARGETS", value_delimiter = ',')]
    pub notify: Vec<String>,

    /// The liquidator's own already-initialized margin account under this
    /// group, deposited from during a `Liquidate` instruction.
    #[arg(long, env = "LIQUIDATOR_MARGIN_ACCOUNT")]
    pub liquidator_margin_account: Option<String>,

    /// Wallet rebalance targets, e.g. --rebalance ETH:20% --rebalance BTC:0.05
    #[arg(long = "rebalance", env = "REBALANCE_TARGETS", value_delimiter = ',')]
    pub rebalance_targets: Vec<String>,

    /// The wallet's own open-orders account per market it trades on while
    /// rebalancing, e.g. --open-orders-account ETH/USDT=<pubkey>. Serum
    /// open-orders accounts must exist on-chain before they can be traded
    /// through; this bot does not create them.
    #[arg(long = "open-orders-account", env = "OPEN_ORDERS_ACCOUNTS", value_delimiter = ',')]
    pub open_orders_accounts: Vec<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
