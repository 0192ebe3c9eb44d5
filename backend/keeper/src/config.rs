use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::errors::{BotError, BotResult};

/// Mirrors the shape of the upstream `ids.json`: one entry per cluster,
/// each naming the on-chain program, the DEX program, and the groups
/// available on that cluster.
#[derive(Debug, Clone, Deserialize)]
pub struct IdsFile {
    #[serde(flatten)]
    pub clusters: HashMap<String, ClusterIds>,
    pub cluster_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterIds {
    pub program_id: String,
    pub dex_program_id: String,
    pub mango_groups: HashMap<String, GroupIds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupIds {
    pub mango_group_pk: String,
    #[serde(default)]
    pub oracles: Vec<OracleIds>,
    #[serde(default)]
    pub spot_markets: Vec<SpotMarketIds>,
    #[serde(default)]
    pub symbols: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleIds {
    pub symbol: String,
    pub public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotMarketIds {
    pub name: String,
    pub public_key: String,
}

impl IdsFile {
    pub fn load(path: &Path) -> BotResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: IdsFile = serde_json::from_str(&raw)?;
        Ok(parsed)
    }
}

/// Fully-resolved runtime configuration: CLI flags override environment
/// variables, which override `ids.json` defaults. Built once at startup and
/// handed by reference to every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: String,
    pub cluster_url: String,
    pub group_name: String,
    pub program_id: Pubkey,
    pub dex_program_id: Pubkey,
    pub group_address: Pubkey,
    pub wallet_path: String,
    pub dry_run: bool,
    pub worthwhile_threshold: rust_decimal::Decimal,
    pub action_threshold: rust_decimal::Decimal,
    pub accounts_poll_secs: u64,
    pub prices_poll_secs: u64,
    pub notification_targets: Vec<String>,
    pub liquidator_margin_account: Option<Pubkey>,
    pub rebalance_targets: Vec<String>,
    pub open_orders_accounts: HashMap<String, Pubkey>,
}

impl Config {
    pub fn resolve(cli: &crate::cli::Cli, ids: &IdsFile) -> BotResult<Self> {
        let cluster = cli
            .cluster
            .clone()
            .unwrap_or_else(|| "mainnet-beta".to_string());

        let cluster_url = cli.cluster_url.clone().or_else(|| {
            ids.cluster_urls.get(&cluster).cloned()
        }).ok_or_else(|| {
            BotError::Config(format!("no cluster_url known for cluster '{cluster}'"))
        })?;

        let group_name = cli
            .group_name
            .clone()
            .unwrap_or_else(|| "BTC_ETH_USDT".to_string());

        let cluster_ids = ids.clusters.get(&cluster).ok_or_else(|| {
            BotError::Config(format!("cluster '{cluster}' not present in ids.json"))
        })?;

        let group_ids = cluster_ids.mango_groups.get(&group_name).ok_or_else(|| {
            BotError::Config(format!(
                "group '{group_name}' not present for cluster '{cluster}'"
            ))
        })?;

        let program_id = parse_pubkey(&cluster_ids.program_id)?;
        let dex_program_id = parse_pubkey(&cluster_ids.dex_program_id)?;
        let group_address = parse_pubkey(&group_ids.mango_group_pk)?;

        let liquidator_margin_account = cli
            .liquidator_margin_account
            .as_deref()
            .map(parse_pubkey)
            .transpose()?;

        let mut open_orders_accounts = HashMap::new();
        for entry in &cli.open_orders_accounts {
            let (market, pubkey) = entry.split_once('=').ok_or_else(|| {
                BotError::Config(format!(
                    "malformed --open-orders-account entry '{entry}', expected MARKET=PUBKEY"
                ))
            })?;
            open_orders_accounts.insert(market.to_string(), parse_pubkey(pubkey)?);
        }

        Ok(Config {
            cluster,
            cluster_url,
            group_name,
            program_id,
            dex_program_id,
            group_address,
            wallet_path: cli
                .keypair
                .clone()
                .unwrap_or_else(|| shellexpand::tilde("~/.config/solana/id.json").to_string()),
            dry_run: cli.dry_run,
            worthwhile_threshold: rust_decimal::Decimal::new(1, 2), // 0.01
            action_threshold: rust_decimal::Decimal::new(1, 2),     // 0.01 = 1%
            accounts_poll_secs: 60,
            prices_poll_secs: 2,
            notification_targets: cli.notify.clone(),
            liquidator_margin_account,
            rebalance_targets: cli.rebalance_targets.clone(),
            open_orders_accounts,
        })
    }
}

fn parse_pubkey(s: &str) -> BotResult<Pubkey> {
    s.parse()
        .map_err(|_| BotError::Config(format!("invalid pubkey '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_ids_json() {
        let raw = r#"{
            "mainnet-beta": {
                "program_id": "11111111111111111111111111111111",
                "dex_program_id": "11111111111111111111111111111111",
                "mango_groups": {
                    "BTC_ETH_USDT": {
                        "mango_group_pk": "11111111111111111111111111111111",
                        "oracles": [],
                        "spot_markets": [],
                        "symbols": {}
                    }
                }
            },
            "cluster_urls": {
                "mainnet-beta": "https://api.mainnet-beta.solana.com"
            }
        }"#;
        let parsed: IdsFile = serde_json::from_str(raw).unwrap();
        assert!(parsed.clusters.contains_key("mainnet-beta"));
        assert_eq!(
            parsed.cluster_urls.get("mainnet-beta").unwrap(),
            "https://api.mainnet-beta.solana.com"
        );
    }
}
