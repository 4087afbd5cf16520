use std::{fs, path::Path, time::Duration};

use alloy_primitives::Address;
use anyhow::{bail, Context};
use chain_client::{ChainGateway, GatewayOptions, MissingWallet, RpcGateway};
use purchase_flow::{ControllerOptions, ViewLabels};
use serde::Deserialize;
use shared::domain::{ChainId, Deployment, BASE_SEPOLIA};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "jackpot.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// JSON-RPC endpoint of the wallet agent. `None` means no agent.
    pub wallet_url: Option<String>,
    /// Optional node endpoint for reads; the wallet agent serves them otherwise.
    pub rpc_url: Option<String>,
    pub required_chain_id: u64,
    pub network_name: String,
    pub lottery_address: String,
    pub token_address: String,
    pub token_symbol: String,
    pub token_decimals: u8,
    pub buy_gas_limit: u64,
    pub receipt_poll_ms: u64,
    pub account_poll_ms: u64,
    pub notice_ms: u64,
    pub install_url: String,
    pub show_counters: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wallet_url: None,
            rpc_url: None,
            required_chain_id: BASE_SEPOLIA.0,
            network_name: "Base Sepolia".into(),
            lottery_address: "0x7eC05443F0782C13642750E028Cb0B207B9F9Ae7".into(),
            token_address: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".into(),
            token_symbol: "USDC".into(),
            token_decimals: 6,
            buy_gas_limit: 300_000,
            receipt_poll_ms: 1500,
            account_poll_ms: 2000,
            notice_ms: 5000,
            install_url: "https://metamask.io/download/".into(),
            show_counters: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    wallet_url: Option<String>,
    rpc_url: Option<String>,
    required_chain_id: Option<u64>,
    network_name: Option<String>,
    lottery_address: Option<String>,
    token_address: Option<String>,
    token_symbol: Option<String>,
    token_decimals: Option<u8>,
    buy_gas_limit: Option<u64>,
    receipt_poll_ms: Option<u64>,
    account_poll_ms: Option<u64>,
    notice_ms: Option<u64>,
    install_url: Option<String>,
    show_counters: Option<bool>,
}

/// Defaults, then `path` if it exists, then environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;

    if file.wallet_url.is_some() {
        settings.wallet_url = file.wallet_url;
    }
    if file.rpc_url.is_some() {
        settings.rpc_url = file.rpc_url;
    }
    if let Some(v) = file.required_chain_id {
        settings.required_chain_id = v;
    }
    if let Some(v) = file.network_name {
        settings.network_name = v;
    }
    if let Some(v) = file.lottery_address {
        settings.lottery_address = v;
    }
    if let Some(v) = file.token_address {
        settings.token_address = v;
    }
    if let Some(v) = file.token_symbol {
        settings.token_symbol = v;
    }
    if let Some(v) = file.token_decimals {
        settings.token_decimals = v;
    }
    if let Some(v) = file.buy_gas_limit {
        settings.buy_gas_limit = v;
    }
    if let Some(v) = file.receipt_poll_ms {
        settings.receipt_poll_ms = v;
    }
    if let Some(v) = file.account_poll_ms {
        settings.account_poll_ms = v;
    }
    if let Some(v) = file.notice_ms {
        settings.notice_ms = v;
    }
    if let Some(v) = file.install_url {
        settings.install_url = v;
    }
    if let Some(v) = file.show_counters {
        settings.show_counters = v;
    }

    Ok(())
}

/// `JACKPOT_<NAME>` and the `APP__<NAME>` alias; the alias wins when both are set.
fn apply_env<F>(settings: &mut Settings, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(&format!("APP__{name}")).or_else(|| lookup(&format!("JACKPOT_{name}")))
    };

    if let Some(v) = var("WALLET_URL") {
        settings.wallet_url = Some(v).filter(|v| !v.trim().is_empty());
    }
    if let Some(v) = var("RPC_URL") {
        settings.rpc_url = Some(v).filter(|v| !v.trim().is_empty());
    }
    if let Some(v) = var("CHAIN_ID") {
        settings.required_chain_id = parse_env("CHAIN_ID", &v)?;
    }
    if let Some(v) = var("NETWORK_NAME") {
        settings.network_name = v;
    }
    if let Some(v) = var("LOTTERY_ADDRESS") {
        settings.lottery_address = v;
    }
    if let Some(v) = var("TOKEN_ADDRESS") {
        settings.token_address = v;
    }
    if let Some(v) = var("BUY_GAS_LIMIT") {
        settings.buy_gas_limit = parse_env("BUY_GAS_LIMIT", &v)?;
    }
    if let Some(v) = var("NOTICE_MS") {
        settings.notice_ms = parse_env("NOTICE_MS", &v)?;
    }

    Ok(())
}

fn parse_env<T>(name: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value '{raw}' for {name}"))
}

impl Settings {
    pub fn deployment(&self) -> anyhow::Result<Deployment> {
        Ok(Deployment {
            chain_id: ChainId(self.required_chain_id),
            network_name: self.network_name.clone(),
            lottery: parse_address("lottery_address", &self.lottery_address)?,
            token: parse_address("token_address", &self.token_address)?,
            token_symbol: self.token_symbol.clone(),
            token_decimals: self.token_decimals,
        })
    }

    pub fn wallet_endpoint(&self) -> anyhow::Result<Option<Url>> {
        self.wallet_url
            .as_deref()
            .map(|raw| parse_url("wallet_url", raw))
            .transpose()
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            required_chain: ChainId(self.required_chain_id),
            buy_gas_limit: self.buy_gas_limit,
            labels: ViewLabels {
                network_name: self.network_name.clone(),
                install_url: self.install_url.clone(),
                currency_prefix: currency_prefix(&self.token_symbol),
                token_decimals: self.token_decimals,
            },
        }
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_ms)
    }

    pub fn account_poll_interval(&self) -> Duration {
        Duration::from_millis(self.account_poll_ms.max(100))
    }

    /// Picks the RPC gateway, or [`MissingWallet`] when no wallet agent is configured.
    pub fn build_gateway(&self) -> anyhow::Result<Box<dyn ChainGateway>> {
        let deployment = self.deployment()?;
        let Some(wallet_url) = self.wallet_endpoint()? else {
            return Ok(Box::new(MissingWallet::new(deployment.lottery)));
        };
        let node_url = self
            .rpc_url
            .as_deref()
            .map(|raw| parse_url("rpc_url", raw))
            .transpose()?;
        let options = GatewayOptions {
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_ms.max(100)),
        };
        Ok(Box::new(RpcGateway::new(
            wallet_url, node_url, deployment, options,
        )))
    }
}

/// Stablecoins render as `$1`, other tokens as `WETH 1`.
fn currency_prefix(symbol: &str) -> String {
    match symbol.to_ascii_uppercase().as_str() {
        "USDC" | "USDT" | "DAI" | "USD" => "$".to_string(),
        _ => format!("{symbol} "),
    }
}

fn parse_address(field: &str, raw: &str) -> anyhow::Result<Address> {
    raw.trim()
        .parse::<Address>()
        .with_context(|| format!("{field} '{raw}' is not a valid address"))
}

fn parse_url(field: &str, raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("{field} '{raw}' is not a URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{field} must use http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
