//! Token test helpers: the setup and read steps that acceptance scenarios chain together.
//!
//! Quantities passed in and out are human units unless stated otherwise; conversion to the
//! ledger's base units happens here and nowhere else.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    account::{AccountRef, Operator},
    amount::{AmountError, Hbar, to_base_units},
    client::Client,
    id::{AccountId, TokenId},
    key::PrivateKey,
    network::{AccountBalance, LedgerError, LedgerNetwork},
    transaction::{
        AccountCreate, Receipt, Status, TokenAssociate, TokenCreate, TokenSupplyType, Transfer,
    },
};

#[derive(Debug, Error)]
pub enum HelperError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("Failed to associate token {token_id} with account {account_id}: {source}")]
    Association {
        account_id: AccountId,
        token_id: TokenId,
        #[source]
        source: LedgerError,
    },
    #[error("Receipt of transaction {transaction_id} has no {field}")]
    MissingReceiptField {
        transaction_id: String,
        field: &'static str,
    },
    #[error("Amount {0} base units does not fit a signed transfer entry")]
    TransferOverflow(u64),
}

/// Token the helpers operate on. The treasury key also serves as admin and supply key.
#[derive(Debug, Clone)]
pub struct TokenContext {
    pub token_id: TokenId,
    pub decimals: u32,
    pub treasury: AccountRef,
}

impl TokenContext {
    pub fn base_units(&self, amount: Decimal) -> Result<u64, AmountError> {
        to_base_units(amount, self.decimals)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSupply {
    Infinite,
    /// The whole supply, in human units, is minted to the treasury at creation.
    Finite { max: Decimal },
}

#[derive(Debug, Clone)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub supply: TokenSupply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Associated,
    AlreadyAssociated,
}

/// Creates an account holding `initial_balance`, keyed with a fresh ed25519 key.
pub async fn create_account<N: LedgerNetwork>(
    client: &Client<N>,
    operator: &Operator,
    initial_balance: Hbar,
) -> Result<AccountRef, HelperError> {
    let private_key = PrivateKey::generate_ed25519();
    let receipt = client
        .submit(
            operator,
            AccountCreate {
                key: private_key.public_key().into(),
                initial_balance,
            },
            &[],
        )
        .await?;
    let account_id = receipt
        .account_id
        .ok_or_else(|| missing_field(&receipt, "account id"))?;
    info!(%account_id, %initial_balance, "account created");
    Ok(AccountRef::new(account_id, private_key))
}

/// Associates `token_id` with `account`. Calling it again for the same pair succeeds.
pub async fn associate_token<N: LedgerNetwork>(
    client: &Client<N>,
    operator: &Operator,
    account: &AccountRef,
    token_id: TokenId,
) -> Result<Association, HelperError> {
    let body = TokenAssociate {
        account_id: account.account_id,
        token_ids: vec![token_id],
    };
    match client
        .submit(operator, body, &[&account.private_key])
        .await
    {
        Ok(_) => {
            debug!(account_id = %account.account_id, %token_id, "token associated");
            Ok(Association::Associated)
        }
        Err(err) if err.status() == Some(Status::TokenAlreadyAssociatedToAccount) => {
            debug!(account_id = %account.account_id, %token_id, "token already associated");
            Ok(Association::AlreadyAssociated)
        }
        Err(source) => {
            warn!(account_id = %account.account_id, %token_id, error = %source, "token association failed");
            Err(HelperError::Association {
                account_id: account.account_id,
                token_id,
                source,
            })
        }
    }
}

/// Moves `amount` (human units) of the token from its treasury to `receiver`.
pub async fn distribute_tokens<N: LedgerNetwork>(
    client: &Client<N>,
    operator: &Operator,
    token: &TokenContext,
    amount: Decimal,
    receiver: AccountId,
) -> Result<Receipt, HelperError> {
    let units = token.base_units(amount)?;
    let signed = i64::try_from(units).map_err(|_| HelperError::TransferOverflow(units))?;
    let transfer = Transfer::new()
        .add_token_transfer(token.token_id, token.treasury.account_id, -signed)
        .add_token_transfer(token.token_id, receiver, signed);
    let receipt = client
        .submit(operator, transfer, &[&token.treasury.private_key])
        .await?;
    info!(token_id = %token.token_id, %receiver, %amount, units, "tokens distributed");
    Ok(receipt)
}

pub async fn account_balances<N: LedgerNetwork>(
    client: &Client<N>,
    account_id: AccountId,
) -> Result<AccountBalance, HelperError> {
    Ok(client.account_balance(&account_id).await?)
}

/// Balance of one token in base units. An account that never associated the token reads as 0.
pub async fn token_balance<N: LedgerNetwork>(
    client: &Client<N>,
    account_id: AccountId,
    token_id: TokenId,
) -> Result<u64, HelperError> {
    let balances = account_balances(client, account_id).await?;
    Ok(balances.token(&token_id).unwrap_or(0))
}

/// Creates a token with `treasury` as treasury, admin and supply key holder.
pub async fn create_token<N: LedgerNetwork>(
    client: &Client<N>,
    operator: &Operator,
    spec: TokenSpec,
    treasury: &AccountRef,
) -> Result<TokenContext, HelperError> {
    let treasury_key = treasury.private_key.public_key();
    let (supply_type, max_supply) = match spec.supply {
        TokenSupply::Infinite => (TokenSupplyType::Infinite, 0),
        TokenSupply::Finite { max } => (TokenSupplyType::Finite, to_base_units(max, spec.decimals)?),
    };
    let body = TokenCreate {
        name: spec.name,
        symbol: spec.symbol,
        decimals: spec.decimals,
        initial_supply: max_supply,
        supply_type,
        max_supply,
        treasury: treasury.account_id,
        admin_key: Some(treasury_key.into()),
        supply_key: Some(treasury_key.into()),
    };
    let receipt = client
        .submit(operator, body, &[&treasury.private_key])
        .await?;
    let token_id = receipt
        .token_id
        .ok_or_else(|| missing_field(&receipt, "token id"))?;
    info!(%token_id, decimals = spec.decimals, "token created");
    Ok(TokenContext {
        token_id,
        decimals: spec.decimals,
        treasury: treasury.clone(),
    })
}

fn missing_field(receipt: &Receipt, field: &'static str) -> HelperError {
    HelperError::MissingReceiptField {
        transaction_id: receipt.transaction_id.to_string(),
        field,
    }
}
