use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

use crate::blockchain::{
    DEFAULT_DIFFICULTY, DEFAULT_MAX_BLOCK_SIZE, DEFAULT_POLL_INTERVAL, MINING_REWARD,
};
use crate::error::{NodeError, Result};
use crate::transaction::{DEFAULT_MAX_GENERATE, DEFAULT_TX_SIZE_MAX, DEFAULT_TX_SIZE_MIN};

/// Runtime settings of a single node. Every field has a default so a bare
/// `cargo run` brings up a usable manager on port 5000.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    /// Address advertised to peers; also the worker identity in reports.
    pub address: String,
    /// Opaque identity stamped into mined blocks and credited with rewards.
    pub node_id: String,
    pub manager: Option<String>,
    pub peers: Vec<String>,
    pub miners: Vec<String>,
    pub difficulty: u32,
    pub max_block_size: u32,
    pub tx_size: RangeInclusive<u32>,
    pub max_generate: usize,
    pub mining_reward: u64,
    pub poll_interval: u64,
    pub mining_delay: Duration,
    pub round_timeout: Option<Duration>,
    pub gossip_interval: Option<Duration>,
    pub resolve_interval: Option<Duration>,
    pub http_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let host = "127.0.0.1".to_string();
        let port = 5000;
        Self {
            address: format!("{host}:{port}"),
            host,
            port,
            node_id: Uuid::new_v4().simple().to_string(),
            manager: None,
            peers: Vec::new(),
            miners: Vec::new(),
            difficulty: DEFAULT_DIFFICULTY,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            tx_size: DEFAULT_TX_SIZE_MIN..=DEFAULT_TX_SIZE_MAX,
            max_generate: DEFAULT_MAX_GENERATE,
            mining_reward: MINING_REWARD,
            poll_interval: DEFAULT_POLL_INTERVAL,
            mining_delay: Duration::ZERO,
            round_timeout: None,
            gossip_interval: None,
            resolve_interval: None,
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl NodeConfig {
    /// Build the config from process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = parse_var("PORT")?.unwrap_or(defaults.port);
        let address = env::var("NODE_ADDRESS").unwrap_or_else(|_| format!("{host}:{port}"));

        let tx_size_min = parse_var("TX_SIZE_MIN")?.unwrap_or(DEFAULT_TX_SIZE_MIN);
        let tx_size_max = parse_var("TX_SIZE_MAX")?.unwrap_or(DEFAULT_TX_SIZE_MAX);
        if tx_size_min == 0 || tx_size_min > tx_size_max {
            return Err(NodeError::Config(format!(
                "TX_SIZE_MIN..TX_SIZE_MAX must be a non-empty positive range, got {tx_size_min}..{tx_size_max}"
            )));
        }

        let poll_interval = parse_var("POW_POLL_INTERVAL")?.unwrap_or(defaults.poll_interval);
        if poll_interval == 0 {
            return Err(NodeError::Config("POW_POLL_INTERVAL must be > 0".into()));
        }

        Ok(Self {
            host,
            port,
            address,
            node_id: env::var("NODE_ID").unwrap_or(defaults.node_id),
            manager: env::var("MANAGER_ADDRESS").ok().filter(|m| !m.trim().is_empty()),
            peers: list_var("PEERS"),
            miners: list_var("MINERS"),
            difficulty: parse_var("DIFFICULTY")?.unwrap_or(defaults.difficulty),
            max_block_size: parse_var("MAX_BLOCK_SIZE")?.unwrap_or(defaults.max_block_size),
            tx_size: tx_size_min..=tx_size_max,
            max_generate: parse_var("MAX_GENERATE")?.unwrap_or(defaults.max_generate),
            mining_reward: parse_var("MINING_REWARD")?.unwrap_or(defaults.mining_reward),
            poll_interval,
            mining_delay: parse_var("MINING_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.mining_delay),
            round_timeout: parse_var("ROUND_TIMEOUT_SECS")?.map(Duration::from_secs),
            gossip_interval: parse_var("GOSSIP_INTERVAL_SECS")?.map(Duration::from_secs),
            resolve_interval: parse_var("RESOLVE_INTERVAL_SECS")?.map(Duration::from_secs),
            http_timeout: parse_var("HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        })
    }
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| NodeError::Config(format!("{key}={raw:?} is not a valid value"))),
        _ => Ok(None),
    }
}

fn list_var(key: &str) -> Vec<String> {
    env::var(key)
        .map(|raw| split_list(&raw))
        .unwrap_or_default()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
