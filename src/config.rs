use std::{env, fs, path::PathBuf, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    account::AccountRef,
    amount::Hbar,
    id::{AccountId, IdParseError},
    key::{KeyError, PrivateKey},
    network::in_memory::{InMemoryLedger, LedgerSettings},
};

pub const ACCOUNTS_ENV: &str = "LEDGER_ACCOUNTS";
pub const ACCOUNTS_FILE_ENV: &str = "LEDGER_ACCOUNTS_FILE";
pub const GENESIS_ACCOUNTS_ENV: &str = "LEDGER_GENESIS_ACCOUNTS";
pub const GENESIS_BALANCE_ENV: &str = "LEDGER_GENESIS_BALANCE_HBAR";
pub const TRANSACTION_FEE_ENV: &str = "LEDGER_TRANSACTION_FEE_TINYBARS";

const DEFAULT_GENESIS_ACCOUNTS: usize = 3;
const DEFAULT_GENESIS_BALANCE_HBAR: u32 = 1000;
const DEFAULT_TRANSACTION_FEE_TINYBARS: u32 = 1_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read accounts file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse accounts JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid account id `{id}`: {source}")]
    AccountId {
        id: String,
        #[source]
        source: IdParseError,
    },
    #[error("Invalid private key for account `{id}`: {source}")]
    PrivateKey {
        id: String,
        #[source]
        source: KeyError,
    },
    #[error("Invalid value `{value}` for `{key}`: expected {expected}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// One pre-funded account as written in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountCredentials {
    pub id: String,
    #[serde(alias = "privateKey")]
    pub private_key: String,
}

impl AccountCredentials {
    pub fn parse(&self) -> Result<AccountRef, ConfigError> {
        let account_id: AccountId = self.id.parse().map_err(|source| ConfigError::AccountId {
            id: self.id.clone(),
            source,
        })?;
        let private_key =
            PrivateKey::from_str_ed25519(&self.private_key).map_err(|source| {
                ConfigError::PrivateKey {
                    id: self.id.clone(),
                    source,
                }
            })?;
        Ok(AccountRef::new(account_id, private_key))
    }
}

pub fn parse_accounts(json: &str) -> Result<Vec<AccountRef>, ConfigError> {
    let credentials: Vec<AccountCredentials> = serde_json::from_str(json)?;
    credentials.iter().map(AccountCredentials::parse).collect()
}

/// Value of the first of `keys` that is set, parsed. Unset keys fall back to `default`;
/// a set but unparseable value is an error.
pub fn read_env_any<T, F>(
    lookup: &F,
    keys: &[&'static str],
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some((key, raw)) = keys.iter().find_map(|key| lookup(key).map(|raw| (*key, raw))) else {
        return Ok(default);
    };
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: raw,
        expected,
    })
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Pre-funded accounts with known ids and keys.
    pub accounts: Vec<AccountRef>,
    /// Accounts generated on top of `accounts` until there are at least this many.
    pub genesis_accounts: usize,
    pub genesis_balance: Hbar,
    pub settings: LedgerSettings,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            genesis_accounts: DEFAULT_GENESIS_ACCOUNTS,
            genesis_balance: Hbar::new(i64::from(DEFAULT_GENESIS_BALANCE_HBAR)),
            settings: LedgerSettings::default(),
        }
    }
}

impl NetworkConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`NetworkConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let accounts = match (lookup(ACCOUNTS_ENV), lookup(ACCOUNTS_FILE_ENV)) {
            (Some(json), _) => parse_accounts(&json)?,
            (None, Some(path)) => {
                let path = PathBuf::from(path);
                let json = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                parse_accounts(&json)?
            }
            (None, None) => Vec::new(),
        };
        let defaults = Self::default();
        let genesis_accounts = read_env_any(
            &lookup,
            &[GENESIS_ACCOUNTS_ENV],
            defaults.genesis_accounts,
            "a non-negative account count",
        )?;
        let genesis_balance: u32 = read_env_any(
            &lookup,
            &[GENESIS_BALANCE_ENV],
            DEFAULT_GENESIS_BALANCE_HBAR,
            "a non-negative whole number of hbars",
        )?;
        let transaction_fee: u32 = read_env_any(
            &lookup,
            &[TRANSACTION_FEE_ENV],
            DEFAULT_TRANSACTION_FEE_TINYBARS,
            "a non-negative number of tinybars",
        )?;
        Ok(Self {
            accounts,
            genesis_accounts,
            genesis_balance: Hbar::new(i64::from(genesis_balance)),
            settings: LedgerSettings {
                transaction_fee: Hbar::from_tinybars(i64::from(transaction_fee)),
                ..defaults.settings
            },
        })
    }

    /// Builds a fresh ledger holding every configured account, topped up with generated
    /// ones, each funded with the genesis balance.
    pub fn bootstrap(&self) -> (InMemoryLedger, Vec<AccountRef>) {
        let mut ledger = InMemoryLedger::new(self.settings.clone());
        let mut accounts = Vec::with_capacity(self.accounts.len().max(self.genesis_accounts));
        for account in &self.accounts {
            ledger.genesis_account(
                Some(account.account_id),
                account.private_key.public_key().into(),
                self.genesis_balance,
            );
            accounts.push(account.clone());
        }
        while accounts.len() < self.genesis_accounts {
            let private_key = PrivateKey::generate_ed25519();
            let account_id =
                ledger.genesis_account(None, private_key.public_key().into(), self.genesis_balance);
            accounts.push(AccountRef::new(account_id, private_key));
        }
        (ledger, accounts)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::network::LedgerNetwork;

    use super::*;

    const KEY: &str = "302e020100300506032b657004220420\
                       9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn parse_account_list() {
        let json = format!(
            r#"[{{"id": "0.0.5005", "privateKey": "{KEY}"}}, {{"id": "0.0.5006", "private_key": "{KEY}"}}]"#
        );
        let accounts = parse_accounts(&json).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].account_id, AccountId::new(0, 0, 5005));
        assert_eq!(accounts[1].account_id, AccountId::new(0, 0, 5006));
    }

    #[test]
    fn reject_bad_entries() {
        let err = parse_accounts(r#"[{"id": "5005", "private_key": "00"}]"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid account id `5005`: Expected `shard.realm.num`, got `5005`"
        );
        let err = parse_accounts(r#"[{"id": "0.0.1", "private_key": "zz"}]"#).unwrap_err();
        assert!(matches!(err, ConfigError::PrivateKey { .. }));
        assert!(matches!(
            parse_accounts("{}").unwrap_err(),
            ConfigError::Json(_)
        ));
    }

    #[tokio::test]
    async fn bootstrap_tops_up_configured_accounts() {
        let config = NetworkConfig {
            accounts: parse_accounts(&format!(r#"[{{"id": "0.0.2", "private_key": "{KEY}"}}]"#))
                .unwrap(),
            ..NetworkConfig::default()
        };
        let (ledger, accounts) = config.bootstrap();
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].account_id, AccountId::new(0, 0, 2));
        for account in &accounts {
            let balance = ledger.account_balance(&account.account_id).await.unwrap();
            assert_eq!(balance.hbars, Hbar::new(1000));
        }
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = NetworkConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.accounts.is_empty());
        assert_eq!(config.genesis_accounts, 3);
        assert_eq!(config.genesis_balance, Hbar::new(1000));
        assert_eq!(config.settings.transaction_fee, Hbar::from_tinybars(1_000_000));
    }

    #[test]
    fn variables_override_defaults() {
        let config = NetworkConfig::from_lookup(lookup(&[
            (GENESIS_ACCOUNTS_ENV, "5"),
            (GENESIS_BALANCE_ENV, " 250 "),
            (TRANSACTION_FEE_ENV, "42"),
        ]))
        .unwrap();
        assert_eq!(config.genesis_accounts, 5);
        assert_eq!(config.genesis_balance, Hbar::new(250));
        assert_eq!(config.settings.transaction_fee, Hbar::from_tinybars(42));
    }

    #[test]
    fn reject_negative_or_garbage_values() {
        let err = NetworkConfig::from_lookup(lookup(&[(GENESIS_BALANCE_ENV, "-5")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                key: GENESIS_BALANCE_ENV,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Invalid value `-5` for `LEDGER_GENESIS_BALANCE_HBAR`: expected a non-negative whole number of hbars"
        );

        let err = NetworkConfig::from_lookup(lookup(&[(GENESIS_ACCOUNTS_ENV, "three")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                key: GENESIS_ACCOUNTS_ENV,
                ..
            }
        ));
        let err = NetworkConfig::from_lookup(lookup(&[(TRANSACTION_FEE_ENV, "-1")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                key: TRANSACTION_FEE_ENV,
                ..
            }
        ));
    }
}
