use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use ed25519_dalek::Signature;
use serde::Serialize;

use crate::{
    amount::Hbar,
    id::{AccountId, TokenId, TopicId},
    key::{Key, PrivateKey, PublicKey},
};

/// Outcome code reported by the ledger, either at precheck or in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    InvalidSignature,
    InsufficientPayerBalance,
    InsufficientAccountBalance,
    InsufficientTokenBalance,
    InvalidAccountId,
    InvalidTokenId,
    InvalidTopicId,
    TokenAlreadyAssociatedToAccount,
    TokenNotAssociatedToAccount,
    TokenMaxSupplyReached,
    TokenHasNoSupplyKey,
    TransfersNotZeroSumForToken,
    InvalidAccountAmounts,
    InvalidTokenDecimals,
    DuplicateTransaction,
    InvalidTransactionBody,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::InvalidSignature => "INVALID_SIGNATURE",
            Status::InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            Status::InsufficientAccountBalance => "INSUFFICIENT_ACCOUNT_BALANCE",
            Status::InsufficientTokenBalance => "INSUFFICIENT_TOKEN_BALANCE",
            Status::InvalidAccountId => "INVALID_ACCOUNT_ID",
            Status::InvalidTokenId => "INVALID_TOKEN_ID",
            Status::InvalidTopicId => "INVALID_TOPIC_ID",
            Status::TokenAlreadyAssociatedToAccount => "TOKEN_ALREADY_ASSOCIATED_TO_ACCOUNT",
            Status::TokenNotAssociatedToAccount => "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT",
            Status::TokenMaxSupplyReached => "TOKEN_MAX_SUPPLY_REACHED",
            Status::TokenHasNoSupplyKey => "TOKEN_HAS_NO_SUPPLY_KEY",
            Status::TransfersNotZeroSumForToken => "TRANSFERS_NOT_ZERO_SUM_FOR_TOKEN",
            Status::InvalidAccountAmounts => "INVALID_ACCOUNT_AMOUNTS",
            Status::InvalidTokenDecimals => "INVALID_TOKEN_DECIMALS",
            Status::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Status::InvalidTransactionBody => "INVALID_TRANSACTION_BODY",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payer account plus the instant the transaction becomes valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start_nanos: u64,
}

impl TransactionId {
    /// Valid start times are strictly increasing within the process, so ids never collide.
    pub fn generate(account_id: AccountId) -> Self {
        static LAST_VALID_START: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        let mut last = LAST_VALID_START.load(Ordering::Relaxed);
        loop {
            let next = now.max(last.saturating_add(1));
            match LAST_VALID_START.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Self {
                        account_id,
                        valid_start_nanos: next,
                    };
                }
                Err(actual) => last = actual,
            }
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id,
            self.valid_start_nanos / 1_000_000_000,
            self.valid_start_nanos % 1_000_000_000
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountCreate {
    pub key: Key,
    pub initial_balance: Hbar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSupplyType {
    Infinite,
    Finite,
}

/// Supplies are in base units.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCreate {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub initial_supply: u64,
    pub supply_type: TokenSupplyType,
    pub max_supply: u64,
    pub treasury: AccountId,
    pub admin_key: Option<Key>,
    pub supply_key: Option<Key>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenAssociate {
    pub account_id: AccountId,
    pub token_ids: Vec<TokenId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenMint {
    pub token_id: TokenId,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HbarTransfer {
    pub account_id: AccountId,
    pub amount: Hbar,
}

/// Signed amount in base units; negative entries debit the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenTransfer {
    pub token_id: TokenId,
    pub account_id: AccountId,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Transfer {
    pub hbar_transfers: Vec<HbarTransfer>,
    pub token_transfers: Vec<TokenTransfer>,
}

impl Transfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hbar_transfer(mut self, account_id: AccountId, amount: Hbar) -> Self {
        self.hbar_transfers.push(HbarTransfer { account_id, amount });
        self
    }

    pub fn add_token_transfer(mut self, token_id: TokenId, account_id: AccountId, amount: i64) -> Self {
        self.token_transfers.push(TokenTransfer {
            token_id,
            account_id,
            amount,
        });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicCreate {
    pub memo: String,
    pub submit_key: Option<Key>,
    pub admin_key: Option<Key>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicMessageSubmit {
    pub topic_id: TopicId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionBody {
    AccountCreate(AccountCreate),
    TokenCreate(TokenCreate),
    TokenAssociate(TokenAssociate),
    TokenMint(TokenMint),
    Transfer(Transfer),
    TopicCreate(TopicCreate),
    TopicMessageSubmit(TopicMessageSubmit),
}

macro_rules! body_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for TransactionBody {
                fn from(body: $variant) -> Self {
                    TransactionBody::$variant(body)
                }
            }
        )*
    };
}

body_from!(
    AccountCreate,
    TokenCreate,
    TokenAssociate,
    TokenMint,
    Transfer,
    TopicCreate,
    TopicMessageSubmit,
);

impl TransactionBody {
    pub fn kind(&self) -> &'static str {
        match self {
            TransactionBody::AccountCreate(_) => "account_create",
            TransactionBody::TokenCreate(_) => "token_create",
            TransactionBody::TokenAssociate(_) => "token_associate",
            TransactionBody::TokenMint(_) => "token_mint",
            TransactionBody::Transfer(_) => "transfer",
            TransactionBody::TopicCreate(_) => "topic_create",
            TransactionBody::TopicMessageSubmit(_) => "topic_message_submit",
        }
    }

    /// Fixes the payer and transaction id; the body can no longer change once frozen.
    pub fn freeze(self, payer: AccountId) -> Result<FrozenTransaction, serde_json::Error> {
        let transaction_id = TransactionId::generate(payer);
        let body_bytes = serde_json::to_vec(&SignedPayload {
            transaction_id: &transaction_id,
            body: &self,
        })?;
        Ok(FrozenTransaction {
            transaction_id,
            body: self,
            body_bytes,
            signatures: Vec::new(),
        })
    }
}

#[derive(Serialize)]
struct SignedPayload<'a> {
    transaction_id: &'a TransactionId,
    body: &'a TransactionBody,
}

#[derive(Debug, Clone)]
pub struct SignaturePair {
    pub public_key: PublicKey,
    pub signature: Signature,
}

#[derive(Debug, Clone)]
pub struct FrozenTransaction {
    transaction_id: TransactionId,
    body: TransactionBody,
    body_bytes: Vec<u8>,
    signatures: Vec<SignaturePair>,
}

impl FrozenTransaction {
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn payer(&self) -> AccountId {
        self.transaction_id.account_id
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn signatures(&self) -> &[SignaturePair] {
        &self.signatures
    }

    pub fn sign(self, key: &PrivateKey) -> Self {
        let signature = key.sign(&self.body_bytes);
        self.add_signature(key.public_key(), signature)
    }

    /// Attaches a signature produced elsewhere; a second signature from the same key is ignored.
    pub fn add_signature(mut self, public_key: PublicKey, signature: Signature) -> Self {
        if !self.signatures.iter().any(|s| s.public_key == public_key) {
            self.signatures.push(SignaturePair {
                public_key,
                signature,
            });
        }
        self
    }

    pub fn is_signed_by(&self, public_key: &PublicKey) -> bool {
        self.signatures.iter().any(|s| &s.public_key == public_key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionResponse {
    pub transaction_id: TransactionId,
}

/// Confirmation record of a transaction that reached consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub status: Status,
    pub account_id: Option<AccountId>,
    pub token_id: Option<TokenId>,
    pub topic_id: Option<TopicId>,
    pub topic_sequence_number: Option<u64>,
}

impl Receipt {
    pub fn new(transaction_id: TransactionId, status: Status) -> Self {
        Self {
            transaction_id,
            status,
            account_id: None,
            token_id: None,
            topic_id: None,
            topic_sequence_number: None,
        }
    }
}
