use std::{collections::HashMap, str::FromStr};

use cucumber::World;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{AccountRef, Operator},
    amount::{AmountError, Hbar, from_base_units, to_base_units},
    client::Client,
    config::{ConfigError, NetworkConfig},
    helpers::{self, HelperError, TokenContext},
    id::TopicId,
    key::{KeyError, KeyList},
    network::{LedgerError, in_memory::InMemoryLedger},
    transaction::{FrozenTransaction, TransactionResponse},
};

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Helper(#[from] HelperError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("{what} is not set up yet; run `{step}` first")]
    Missing {
        what: &'static str,
        step: &'static str,
    },
    #[error("step needs configured account #{index}, but only {available} are available")]
    NotEnoughAccounts { index: usize, available: usize },
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("assertion failed: {message}")]
    Assertion { message: String },
}

pub type StepResult = Result<(), StepError>;

pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> StepResult {
    if condition {
        Ok(())
    } else {
        Err(StepError::Assertion { message: message() })
    }
}

/// Role an account plays within a scenario.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Party {
    First,
    Second,
    Third,
    Fourth,
}

impl FromStr for Party {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "second" => Ok(Self::Second),
            "third" => Ok(Self::Third),
            "fourth" => Ok(Self::Fourth),
            other => Err(StepError::InvalidArgument {
                message: format!("unknown account ordinal `{other}`"),
            }),
        }
    }
}

/// Ledger connection shared by the steps of one scenario.
#[derive(Debug)]
pub struct Session {
    pub client: Client<InMemoryLedger>,
    pub accounts: Vec<AccountRef>,
}

impl Session {
    pub fn from_config(config: &NetworkConfig) -> Self {
        let (ledger, accounts) = config.bootstrap();
        Self {
            client: Client::new(ledger.into()),
            accounts,
        }
    }
}

#[derive(World, Debug, Default)]
pub struct LedgerWorld {
    session: Option<Session>,
    pub operator: Option<Operator>,
    pub token: Option<TokenContext>,
    pub parties: HashMap<Party, AccountRef>,
    pub topic_id: Option<TopicId>,
    pub threshold_key: Option<KeyList>,
    pub pending: Option<FrozenTransaction>,
    pub last_response: Option<TransactionResponse>,
    /// Hbars of the first account just before it submitted `last_response`.
    pub payer_balance_before: Option<Hbar>,
}

impl LedgerWorld {
    /// Connects on first use, so configuration errors fail the first step instead of the run.
    pub fn session(&mut self) -> Result<&Session, StepError> {
        if self.session.is_none() {
            let config = NetworkConfig::from_env()?;
            self.session = Some(Session::from_config(&config));
        }
        self.session.as_ref().ok_or(StepError::Missing {
            what: "ledger session",
            step: "any Given step",
        })
    }

    pub fn client(&mut self) -> Result<Client<InMemoryLedger>, StepError> {
        Ok(self.session()?.client.clone())
    }

    pub fn configured_account(&mut self, index: usize) -> Result<AccountRef, StepError> {
        let accounts = &self.session()?.accounts;
        accounts
            .get(index)
            .cloned()
            .ok_or(StepError::NotEnoughAccounts {
                index,
                available: accounts.len(),
            })
    }

    pub fn operator(&self) -> Result<&Operator, StepError> {
        self.operator.as_ref().ok_or(StepError::Missing {
            what: "operator account",
            step: "Given A Hedera account with more than <n> hbar",
        })
    }

    pub fn token(&self) -> Result<&TokenContext, StepError> {
        self.token.as_ref().ok_or(StepError::Missing {
            what: "token",
            step: "Given A token named Test Token (HTT) with <n> tokens",
        })
    }

    pub fn party(&self, party: Party) -> Result<&AccountRef, StepError> {
        self.parties.get(&party).ok_or(StepError::Missing {
            what: "scenario account",
            step: "Given A <ordinal> Hedera account ...",
        })
    }

    pub fn topic_id(&self) -> Result<TopicId, StepError> {
        self.topic_id.ok_or(StepError::Missing {
            what: "topic",
            step: "When A topic is created with the memo ...",
        })
    }

    /// Asserts that `party` holds exactly `amount` (human units) of the scenario token.
    pub async fn ensure_token_holding(&mut self, party: Party, amount: Decimal) -> StepResult {
        let client = self.client()?;
        let token = self.token()?;
        let account_id = self.party(party)?.account_id;
        let expected = to_base_units(amount, token.decimals)?;
        let actual = helpers::token_balance(&client, account_id, token.token_id).await?;
        let held = from_base_units(actual, token.decimals)?;
        ensure(actual == expected, || {
            format!("{party:?} account {account_id} holds {held} tokens ({actual} base units), expected {amount}")
        })
    }
}
