use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    amount::Hbar,
    id::{AccountId, TokenId, TopicId},
    key::Key,
    transaction::{FrozenTransaction, Receipt, Status, TokenSupplyType, TransactionId, TransactionResponse},
};

pub mod in_memory;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Transaction {transaction_id} failed precheck with status {status}")]
    Precheck {
        transaction_id: TransactionId,
        status: Status,
    },
    #[error("Receipt for transaction {transaction_id} contained error status {status}")]
    ReceiptStatus {
        transaction_id: TransactionId,
        status: Status,
    },
    #[error("No receipt found for transaction {0}")]
    ReceiptNotFound(TransactionId),
    #[error("Query failed with status {0}")]
    Query(Status),
    #[error("Failed to encode transaction: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LedgerError {
    /// Ledger status behind the failure, if the ledger produced one.
    pub fn status(&self) -> Option<Status> {
        match self {
            LedgerError::Precheck { status, .. } | LedgerError::ReceiptStatus { status, .. } => {
                Some(*status)
            }
            LedgerError::Query(status) => Some(*status),
            _ => None,
        }
    }
}

/// Point-in-time balances of one account; token amounts are in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub hbars: Hbar,
    pub tokens: BTreeMap<TokenId, u64>,
}

impl AccountBalance {
    pub fn token(&self, token_id: &TokenId) -> Option<u64> {
        self.tokens.get(token_id).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub token_id: TokenId,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub total_supply: u64,
    pub max_supply: u64,
    pub supply_type: TokenSupplyType,
    pub treasury_account_id: AccountId,
    pub admin_key: Option<Key>,
    pub supply_key: Option<Key>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    pub topic_id: TopicId,
    pub memo: String,
    pub submit_key: Option<Key>,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    pub contents: String,
    pub transaction_id: TransactionId,
}

/// Remote ledger as seen by the client. Transactions are frozen and signed before they
/// get here, so implementations never hold key material.
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    async fn execute(&self, transaction: FrozenTransaction) -> Result<TransactionResponse, LedgerError>;

    /// Raw receipt, whatever its status.
    async fn receipt(&self, transaction_id: &TransactionId) -> Result<Receipt, LedgerError>;

    async fn account_balance(&self, account_id: &AccountId) -> Result<AccountBalance, LedgerError>;

    async fn token_info(&self, token_id: &TokenId) -> Result<TokenInfo, LedgerError>;

    async fn topic_info(&self, topic_id: &TopicId) -> Result<TopicInfo, LedgerError>;

    async fn topic_messages(&self, topic_id: &TopicId) -> Result<Vec<TopicMessage>, LedgerError>;
}
