use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod balancer;
mod chain;
mod cli;
mod config;
mod errors;
mod instructions;
mod layout;
mod liquidator;
mod model;
mod observability;
mod pricing;
mod processor;
mod supervisor;
mod trade;
mod wallet;

use balancer::{LiveWalletBalancer, NullWalletBalancer, ParsedTargetBalance, WalletBalancer};
use chain::ChainClient;
use cli::Cli;
use config::{Config, IdsFile};
use errors::{BotError, BotResult};
use liquidator::{
    AccountLiquidator, ActualAccountLiquidator, ForceCancelOrdersAccountLiquidator,
    NullAccountLiquidator, ReportingAccountLiquidator,
};
use model::Group;
use observability::notification::{parse_notification_target, NotificationTarget};
use observability::EventBus;
use processor::LiquidationProcessor;
use supervisor::Supervisor;
use trade::SerumImmediateTradeExecutor;
use wallet::Wallet;

#[tokio::main]
async fn main() -> BotResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse_args();
    let ids = IdsFile::load(std::path::Path::new(&cli.ids_json))?;
    let config = Config::resolve(&cli, &ids)?;

    info!(cluster = %config.cluster, group = %config.group_name, "starting liquidator");

    let chain = ChainClient::new(config.cluster_url.clone());
    let wallet = Wallet::load(&config.wallet_path)?;
    info!(wallet = %wallet.address(), "loaded wallet");

    let cluster_ids = ids
        .clusters
        .get(&config.cluster)
        .ok_or_else(|| errors::BotError::Config(format!("cluster '{}' vanished after resolve", config.cluster)))?;
    let group_ids = cluster_ids.mango_groups.get(&config.group_name).ok_or_else(|| {
        errors::BotError::Config(format!("group '{}' vanished after resolve", config.group_name))
    })?;
    let group = Group::load(&chain, config.group_address, group_ids)?;

    let targets: Vec<Box<dyn NotificationTarget>> = config
        .notification_targets
        .iter()
        .filter_map(|spec| match parse_notification_target(spec) {
            Ok(target) => Some(target),
            Err(e) => {
                error!(spec = %spec, error = %e, "ignoring malformed notification target");
                None
            }
        })
        .collect();

    let balancer_group = group.clone();

    let mut processor = LiquidationProcessor::new(
        &chain,
        config.program_id,
        group,
        config.worthwhile_threshold,
    );
    processor.update_margin_accounts()?;
    processor.update_prices()?;

    if cli.scout {
        let report = processor.scout();
        for account in report.liquidatable() {
            info!(
                account = %account.address,
                owner = %account.owner,
                net_value = %account.net_value,
                "liquidation candidate"
            );
        }
        return Ok(());
    }

    let liquidator_margin_account = if config.dry_run {
        // Never actually dereferenced by NullAccountLiquidator; the group
        // address is a harmless placeholder that satisfies the field.
        config.group_address
    } else {
        config.liquidator_margin_account.ok_or_else(|| {
            BotError::Config(
                "--liquidator-margin-account (or LIQUIDATOR_MARGIN_ACCOUNT) is required outside --dry-run"
                    .to_string(),
            )
        })?
    };

    let actual_liquidator = ActualAccountLiquidator {
        program_id: config.program_id,
        wallet: &wallet,
        liquidator_margin_account,
    };

    let base_liquidator: Box<dyn AccountLiquidator> = if config.dry_run {
        Box::new(NullAccountLiquidator)
    } else {
        Box::new(ForceCancelOrdersAccountLiquidator {
            program_id: config.program_id,
            wallet: &wallet,
            inner: Box::new(actual_liquidator),
        })
    };
    let events = EventBus::new(64);
    let reporting_liquidator = ReportingAccountLiquidator {
        inner: base_liquidator,
        targets: &targets,
        wallet: &wallet,
        events: &events,
    };

    let null_balancer = NullWalletBalancer;

    let parsed_targets: Vec<(model::Token, balancer::TargetBalance)> = config
        .rebalance_targets
        .iter()
        .filter_map(|spec| match spec.parse::<ParsedTargetBalance>() {
            Ok(parsed) => match balancer_group.find_token_by_name(&parsed.token_name) {
                Ok(basket_token) => Some((basket_token.token.clone(), parsed.target)),
                Err(e) => {
                    error!(spec = %spec, error = %e, "ignoring rebalance target for unknown token");
                    None
                }
            },
            Err(e) => {
                error!(spec = %spec, error = %e, "ignoring malformed rebalance target");
                None
            }
        })
        .collect();

    let market_for_token = |token: &model::Token| -> BotResult<model::group::MarketMetadata> {
        balancer_group
            .markets
            .iter()
            .find(|m| balancer_group.basket_tokens[m.base_token_index].token.mint == token.mint)
            .cloned()
            .ok_or_else(|| BotError::MarketNotInGroup {
                base: token.name.clone(),
                quote: "quote".to_string(),
            })
    };

    let live_executor = SerumImmediateTradeExecutor {
        program_id: config.program_id,
        dex_program_id: config.dex_program_id,
        wallet: &wallet,
        open_orders_by_market: config.open_orders_accounts.iter().map(|(k, v)| (k.clone(), *v)).collect(),
    };
    let live_balancer = LiveWalletBalancer {
        wallet: &wallet,
        executor: &live_executor,
        targets: parsed_targets.clone(),
        action_threshold: config.action_threshold,
        market_for_token: &market_for_token,
    };

    let balancer: &dyn WalletBalancer = if config.dry_run || parsed_targets.is_empty() {
        &null_balancer
    } else {
        &live_balancer
    };

    let supervisor = Supervisor::new(
        processor,
        Duration::from_secs(config.accounts_poll_secs),
        Duration::from_secs(config.prices_poll_secs),
    );
    supervisor.run(&reporting_liquidator, balancer).await;

    Ok(())
}
