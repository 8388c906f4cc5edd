use std::{collections::HashSet, env, fs::File, io::Read, path::Path, time::Duration};

use alloy::primitives::{
    address,
    utils::{parse_units, ParseUnits},
    U256,
};
use regex::{Captures, Regex};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    rbundler_error,
    shared::common_types::EvmAddress,
    transaction::SubmissionConfig,
    user_operation::ValidationConfig,
    wallet_pool::WalletPoolConfig,
};

pub const CONFIG_FILE_NAME: &str = "rbundler.yaml";

/// EntryPoint v0.7
pub const DEFAULT_ENTRY_POINT: EvmAddress =
    EvmAddress::new(address!("0x0000000071727De22E5E9d8BAf0edAc6f37da032"));

fn default_entry_point() -> EvmAddress {
    DEFAULT_ENTRY_POINT
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000, allowed_origins: None }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WalletPoolSetupConfig {
    pub max_pending: u32,
    pub max_failures: u32,
    /// In ether, e.g. `"0.01"`.
    #[serde(deserialize_with = "deserialize_eth_amount", serialize_with = "serialize_eth_amount")]
    pub min_balance: U256,
    /// Balance headroom worth one scoring point, in ether.
    #[serde(deserialize_with = "deserialize_eth_amount", serialize_with = "serialize_eth_amount")]
    pub balance_unit: U256,
    pub cool_down_ms: u64,
}

impl Default for WalletPoolSetupConfig {
    fn default() -> Self {
        let defaults = WalletPoolConfig::default();
        Self {
            max_pending: defaults.max_pending,
            max_failures: defaults.max_failures,
            min_balance: defaults.min_balance,
            balance_unit: defaults.balance_unit,
            cool_down_ms: defaults.cool_down.as_millis() as u64,
        }
    }
}

impl WalletPoolSetupConfig {
    pub fn to_pool_config(&self) -> WalletPoolConfig {
        WalletPoolConfig {
            max_pending: self.max_pending,
            max_failures: self.max_failures,
            min_balance: self.min_balance,
            balance_unit: self.balance_unit,
            cool_down: Duration::from_millis(self.cool_down_ms),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SubmissionSetupConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub receipt_poll_interval_ms: u64,
    /// Wei.
    pub max_fee_per_gas: u64,
    /// Wei.
    pub max_priority_fee_per_gas: u64,
    pub gas_margin_percent: u64,
    pub record_retention_ms: u64,
}

impl Default for SubmissionSetupConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1_000,
            confirmation_timeout_ms: 300_000,
            receipt_poll_interval_ms: 1_000,
            max_fee_per_gas: 100_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
            gas_margin_percent: 10,
            record_retention_ms: 600_000,
        }
    }
}

impl SubmissionSetupConfig {
    pub fn to_submission_config(&self, entry_point: EvmAddress) -> SubmissionConfig {
        SubmissionConfig {
            entry_point,
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_fee_per_gas: self.max_fee_per_gas as u128,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas as u128,
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn record_retention(&self) -> Duration {
        Duration::from_millis(self.record_retention_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ValidationSetupConfig {
    pub min_verification_gas: u64,
    pub max_verification_gas: u64,
    pub max_total_gas: u64,
    pub max_call_data_size: usize,
    pub banned_addresses: Vec<EvmAddress>,
}

impl Default for ValidationSetupConfig {
    fn default() -> Self {
        let defaults = ValidationConfig::default();
        Self {
            min_verification_gas: defaults.min_verification_gas as u64,
            max_verification_gas: defaults.max_verification_gas as u64,
            max_total_gas: defaults.max_total_gas as u64,
            max_call_data_size: defaults.max_call_data_size,
            banned_addresses: Vec::new(),
        }
    }
}

impl ValidationSetupConfig {
    pub fn to_validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            min_verification_gas: self.min_verification_gas as u128,
            max_verification_gas: self.max_verification_gas as u128,
            max_total_gas: self.max_total_gas as u128,
            max_call_data_size: self.max_call_data_size,
            banned_addresses: self.banned_addresses.iter().copied().collect::<HashSet<_>>(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BundlerConfig {
    pub name: String,
    pub provider_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_entry_point")]
    pub entry_point: EvmAddress,
    pub signing_keys: Vec<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub wallet_pool: WalletPoolSetupConfig,
    #[serde(default)]
    pub submission: SubmissionSetupConfig,
    #[serde(default)]
    pub validation: ValidationSetupConfig,
    /// `error`, `warn`, `info`, `debug` or `trace`. `RUST_LOG` still wins per target.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub log_level: Option<String>,
}

impl BundlerConfig {
    /// Starting point written by `rbundler init`.
    pub fn template(name: &str) -> Self {
        Self {
            name: name.to_string(),
            provider_urls: vec!["${PROVIDER_URL}".to_string()],
            chain_id: None,
            entry_point: DEFAULT_ENTRY_POINT,
            signing_keys: vec![
                "${RELAY_WALLET_KEY_1}".to_string(),
                "${RELAY_WALLET_KEY_2}".to_string(),
            ],
            api: ApiConfig::default(),
            wallet_pool: WalletPoolSetupConfig::default(),
            submission: SubmissionSetupConfig::default(),
            validation: ValidationSetupConfig::default(),
            log_level: None,
        }
    }

    pub fn log_level(&self) -> Result<LevelFilter, ReadYamlError> {
        match &self.log_level {
            None => Ok(LevelFilter::INFO),
            Some(level) => level
                .trim()
                .parse::<LevelFilter>()
                .map_err(|_| ReadYamlError::InvalidConfig(format!("unknown log_level {}", level))),
        }
    }
}

fn deserialize_eth_amount<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let parsed: ParseUnits = parse_units(s.trim(), 18)
        .map_err(|e| de::Error::custom(format!("invalid ether amount {}: {}", s, e)))?;
    Ok(parsed.into())
}

fn serialize_eth_amount<S>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let eth_divisor = U256::from(10u64.pow(18));
    let whole_eth = amount / eth_divisor;
    let remainder = amount % eth_divisor;

    let eth_string = if remainder.is_zero() {
        format!("{}", whole_eth)
    } else {
        let decimal_str = format!("{:018}", remainder);
        let decimal_trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole_eth, decimal_trimmed)
    };

    serializer.serialize_str(&eth_string)
}

fn substitute_env_variables(contents: &str) -> Result<String, ReadYamlError> {
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ReadYamlError::SetupConfigInvalidYaml(e.to_string()))?;

    let mut missing: Vec<String> = Vec::new();
    let result = re.replace_all(contents, |caps: &Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                rbundler_error!("Environment variable {} not found", var_name);
                missing.push(var_name.to_string());
                String::new()
            }
        }
    });

    if let Some(var_name) = missing.into_iter().next() {
        return Err(ReadYamlError::EnvironmentVariableNotFound(var_name));
    }

    Ok(result.into_owned())
}

#[derive(Error, Debug)]
pub enum ReadYamlError {
    #[error("Can not find yaml")]
    CanNotFindYaml,

    #[error("Can not read yaml")]
    CanNotReadYaml,

    #[error("Setup config is invalid yaml and does not match the struct - {0}")]
    SetupConfigInvalidYaml(String),

    #[error("Environment variable {0} not found")]
    EnvironmentVariableNotFound(String),

    #[error("No provider urls defined in the yaml")]
    NoProviderUrls,

    #[error("No signing keys defined in the yaml")]
    NoSigningKeys,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub fn read(file_path: &Path, raw_yaml: bool) -> Result<BundlerConfig, ReadYamlError> {
    let mut file = File::open(file_path).map_err(|_| ReadYamlError::CanNotFindYaml)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|_| ReadYamlError::CanNotReadYaml)?;

    parse(&contents, raw_yaml)
}

pub fn parse(contents: &str, raw_yaml: bool) -> Result<BundlerConfig, ReadYamlError> {
    let substituted_contents =
        if raw_yaml { contents.to_string() } else { substitute_env_variables(contents)? };

    let config: BundlerConfig = serde_yaml::from_str(&substituted_contents)
        .map_err(|e| ReadYamlError::SetupConfigInvalidYaml(e.to_string()))?;

    if config.provider_urls.iter().all(|url| url.trim().is_empty()) {
        return Err(ReadYamlError::NoProviderUrls);
    }

    if config.signing_keys.iter().all(|key| key.trim().is_empty()) {
        return Err(ReadYamlError::NoSigningKeys);
    }

    if config.submission.max_attempts == 0 {
        return Err(ReadYamlError::InvalidConfig("submission.max_attempts must be at least 1".into()));
    }

    if config.wallet_pool.max_pending == 0 {
        return Err(ReadYamlError::InvalidConfig("wallet_pool.max_pending must be at least 1".into()));
    }

    config.log_level()?;

    let validation = &config.validation;
    if validation.min_verification_gas > validation.max_verification_gas {
        return Err(ReadYamlError::InvalidConfig(format!(
            "validation.min_verification_gas ({}) is above validation.max_verification_gas ({})",
            validation.min_verification_gas, validation.max_verification_gas
        )));
    }

    Ok(config)
}
