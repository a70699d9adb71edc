use cucumber::{given, then, when};
use tracing::info;

use super::{funded_account, whole, whole_hbars};
use crate::{
    helpers::{self, TokenSpec, TokenSupply},
    network::{LedgerError, TokenInfo},
    transaction::{Status, TokenMint, TransactionBody, Transfer},
    world::{LedgerWorld, Party, StepError, StepResult, ensure},
};

const TOKEN_NAME: &str = "Test Token";
const TOKEN_SYMBOL: &str = "HTT";
const TOKEN_DECIMALS: u32 = 2;

fn test_token(supply: TokenSupply) -> TokenSpec {
    TokenSpec {
        name: TOKEN_NAME.to_owned(),
        symbol: TOKEN_SYMBOL.to_owned(),
        decimals: TOKEN_DECIMALS,
        supply,
    }
}

/// Configured account 0 acts as operator and token treasury; ordinals start at account 1.
fn configured_index(party: Party) -> usize {
    match party {
        Party::First => 1,
        Party::Second => 2,
        Party::Third => 3,
        Party::Fourth => 4,
    }
}

fn ensure_operator(world: &mut LedgerWorld) -> StepResult {
    if world.operator.is_none() {
        world.operator = Some(world.configured_account(0)?);
    }
    Ok(())
}

async fn create_token(world: &mut LedgerWorld, supply: TokenSupply) -> StepResult {
    let client = world.client()?;
    let operator = world.operator()?.clone();
    let token = helpers::create_token(&client, &operator, test_token(supply), &operator).await?;
    world.token = Some(token);
    Ok(())
}

#[given(expr = "A Hedera account with more than {int} hbar")]
async fn operator_account(world: &mut LedgerWorld, hbars: u64) -> StepResult {
    world.operator = Some(funded_account(world, 0, hbars).await?);
    Ok(())
}

#[given(regex = r"^A (first|second|third|fourth) [Hh]edera account with more than (\d+) hbar$")]
async fn ordinal_account(world: &mut LedgerWorld, party: Party, hbars: u64) -> StepResult {
    ensure_operator(world)?;
    let account = funded_account(world, configured_index(party), hbars).await?;
    world.parties.insert(party, account);
    Ok(())
}

#[given(regex = r"^A second Hedera account$")]
async fn second_account(world: &mut LedgerWorld) -> StepResult {
    ensure_operator(world)?;
    let account = funded_account(world, configured_index(Party::Second), 10).await?;
    world.parties.insert(Party::Second, account);
    Ok(())
}

#[given(regex = r"^A token named Test Token \(HTT\) with (\d+) tokens$")]
async fn fixed_supply_token(world: &mut LedgerWorld, tokens: u64) -> StepResult {
    ensure_operator(world)?;
    create_token(world, TokenSupply::Finite { max: whole(tokens) }).await
}

#[given(regex = r"^The (first|second|third|fourth) account holds (\d+) HTT tokens$")]
async fn account_receives_tokens(world: &mut LedgerWorld, party: Party, tokens: u64) -> StepResult {
    let client = world.client()?;
    let operator = world.operator()?.clone();
    let token = world.token()?.clone();
    let account = world.party(party)?.clone();
    let current = helpers::token_balance(&client, account.account_id, token.token_id).await?;
    if tokens > 0 && current == 0 {
        helpers::associate_token(&client, &operator, &account, token.token_id).await?;
        helpers::distribute_tokens(&client, &operator, &token, whole(tokens), account.account_id)
            .await?;
    }
    world.ensure_token_holding(party, whole(tokens)).await
}

/// Provisions a fresh account for `party` with exactly `hbars` and `tokens`.
#[given(
    regex = r"^A (first|second|third|fourth) [Hh]edera account with (?:more than )?(\d+) hbar and (\d+) HTT tokens$"
)]
async fn provisioned_account(
    world: &mut LedgerWorld,
    party: Party,
    hbars: u64,
    tokens: u64,
) -> StepResult {
    let client = world.client()?;
    let operator = world.operator()?.clone();
    let token = world.token()?.clone();
    let initial_balance = whole_hbars(hbars);

    let account = helpers::create_account(&client, &operator, initial_balance).await?;
    helpers::associate_token(&client, &operator, &account, token.token_id).await?;
    if tokens > 0 {
        helpers::distribute_tokens(&client, &operator, &token, whole(tokens), account.account_id)
            .await?;
    }

    let balance = helpers::account_balances(&client, account.account_id).await?;
    ensure(balance.hbars == initial_balance, || {
        format!(
            "account {} holds {}, expected {initial_balance}",
            account.account_id, balance.hbars
        )
    })?;
    world.parties.insert(party, account);
    world.ensure_token_holding(party, whole(tokens)).await
}

#[when(regex = r"^I create a token named Test Token \(HTT\)$")]
async fn create_mintable_token(world: &mut LedgerWorld) -> StepResult {
    create_token(world, TokenSupply::Infinite).await
}

#[when(regex = r"^I create a fixed supply token named Test Token \(HTT\) with (\d+) tokens$")]
async fn create_fixed_supply_token(world: &mut LedgerWorld, tokens: u64) -> StepResult {
    create_token(world, TokenSupply::Finite { max: whole(tokens) }).await
}

/// Freezes the transfer with the first account as payer and signs it as the sender.
#[when(regex = r"^The (first|second) account creates a transaction to transfer (\d+) HTT tokens to the (first|second) account$")]
async fn create_transfer(
    world: &mut LedgerWorld,
    sender: Party,
    tokens: u64,
    receiver: Party,
) -> StepResult {
    let client = world.client()?;
    let operator = world.operator()?.clone();
    let token = world.token()?.clone();
    let payer = world.party(Party::First)?.account_id;
    let from = world.party(sender)?.clone();
    let to = world.party(receiver)?.clone();

    helpers::associate_token(&client, &operator, &to, token.token_id).await?;
    let units = signed_units(token.base_units(whole(tokens))?)?;
    let transfer = Transfer::new()
        .add_token_transfer(token.token_id, from.account_id, -units)
        .add_token_transfer(token.token_id, to.account_id, units);
    let transaction = TransactionBody::from(transfer)
        .freeze(payer)
        .map_err(LedgerError::from)?
        .sign(&from.private_key);
    world.pending = Some(transaction);
    Ok(())
}

#[when(regex = r"^A transaction is created to transfer (\d+) HTT tokens out of the first and second account and (\d+) HTT tokens into the third account and (\d+) HTT tokens into the fourth account$")]
async fn create_multi_party_transfer(
    world: &mut LedgerWorld,
    out_each: u64,
    into_third: u64,
    into_fourth: u64,
) -> StepResult {
    let token = world.token()?.clone();
    let debit = out_each.checked_mul(2);
    if debit != into_third.checked_add(into_fourth) {
        return Err(StepError::InvalidArgument {
            message: format!(
                "2 x {out_each} tokens out does not match {into_third} + {into_fourth} tokens in"
            ),
        });
    }
    let first = world.party(Party::First)?.clone();
    let second = world.party(Party::Second)?.clone();
    let third = world.party(Party::Third)?.account_id;
    let fourth = world.party(Party::Fourth)?.account_id;

    let out_units = signed_units(token.base_units(whole(out_each))?)?;
    let transfer = Transfer::new()
        .add_token_transfer(token.token_id, first.account_id, -out_units)
        .add_token_transfer(token.token_id, second.account_id, -out_units)
        .add_token_transfer(
            token.token_id,
            third,
            signed_units(token.base_units(whole(into_third))?)?,
        )
        .add_token_transfer(
            token.token_id,
            fourth,
            signed_units(token.base_units(whole(into_fourth))?)?,
        );
    let transaction = TransactionBody::from(transfer)
        .freeze(first.account_id)
        .map_err(LedgerError::from)?
        .sign(&first.private_key)
        .sign(&second.private_key);
    world.pending = Some(transaction);
    Ok(())
}

#[when(expr = "The first account submits the transaction")]
async fn submit_pending(world: &mut LedgerWorld) -> StepResult {
    let client = world.client()?;
    let first = world.party(Party::First)?.clone();
    let transaction = world.pending.take().ok_or(StepError::Missing {
        what: "pending transaction",
        step: "When ... creates a transaction ...",
    })?;
    let balance_before = helpers::account_balances(&client, first.account_id).await?.hbars;
    let response = client.execute(&first, transaction).await?;
    let receipt = client.get_receipt(&response).await?;
    info!(transaction_id = %receipt.transaction_id, status = %receipt.status, "transaction submitted");
    world.last_response = Some(response);
    world.payer_balance_before = Some(balance_before);
    Ok(())
}

#[then(expr = "The token has the name {string}")]
async fn token_name(world: &mut LedgerWorld, name: String) -> StepResult {
    let info = token_info(world).await?;
    ensure(info.name == name, || {
        format!("token name is `{}`, expected `{name}`", info.name)
    })
}

#[then(expr = "The token has the symbol {string}")]
async fn token_symbol(world: &mut LedgerWorld, symbol: String) -> StepResult {
    let info = token_info(world).await?;
    ensure(info.symbol == symbol, || {
        format!("token symbol is `{}`, expected `{symbol}`", info.symbol)
    })
}

#[then(expr = "The token has {int} decimals")]
async fn token_decimals(world: &mut LedgerWorld, decimals: u32) -> StepResult {
    let info = token_info(world).await?;
    ensure(info.decimals == decimals, || {
        format!("token has {} decimals, expected {decimals}", info.decimals)
    })
}

#[then(expr = "The token is owned by the account")]
async fn token_owner(world: &mut LedgerWorld) -> StepResult {
    let info = token_info(world).await?;
    let operator = world.operator()?.account_id;
    ensure(info.treasury_account_id == operator, || {
        format!(
            "token treasury is {}, expected {operator}",
            info.treasury_account_id
        )
    })
}

#[then(expr = "The total supply of the token is {int}")]
async fn total_supply(world: &mut LedgerWorld, tokens: u64) -> StepResult {
    let info = token_info(world).await?;
    let expected = world.token()?.base_units(whole(tokens))?;
    ensure(info.total_supply == expected, || {
        format!(
            "total supply is {} base units, expected {expected}",
            info.total_supply
        )
    })
}

#[then(expr = "An attempt to mint {int} additional tokens succeeds")]
async fn mint_succeeds(world: &mut LedgerWorld, tokens: u64) -> StepResult {
    let before = token_info(world).await?.total_supply;
    let amount = world.token()?.base_units(whole(tokens))?;
    mint(world, amount).await?;
    let after = token_info(world).await?.total_supply;
    ensure(after == before + amount, || {
        format!("total supply is {after} base units after minting {amount} onto {before}")
    })
}

#[then(expr = "An attempt to mint tokens fails")]
async fn mint_fails(world: &mut LedgerWorld) -> StepResult {
    match mint(world, 1).await {
        Err(StepError::Ledger(err)) if err.status() == Some(Status::TokenMaxSupplyReached) => {
            info!(status = %Status::TokenMaxSupplyReached, "mint rejected");
            Ok(())
        }
        Err(err) => Err(err),
        Ok(()) => Err(StepError::Assertion {
            message: "mint beyond the maximum supply succeeded".to_owned(),
        }),
    }
}

#[then(regex = r"^The (first|second|third|fourth) account holds (\d+) HTT tokens$")]
async fn account_holds(world: &mut LedgerWorld, party: Party, tokens: u64) -> StepResult {
    world.ensure_token_holding(party, whole(tokens)).await
}

#[then(expr = "The first account has paid for the transaction fee")]
async fn first_account_paid(world: &mut LedgerWorld) -> StepResult {
    let client = world.client()?;
    let first = world.party(Party::First)?.account_id;
    let missing = StepError::Missing {
        what: "submitted transaction",
        step: "When The first account submits the transaction",
    };
    let (Some(response), Some(before)) = (world.last_response, world.payer_balance_before) else {
        return Err(missing);
    };
    let payer = response.transaction_id.account_id;
    ensure(payer == first, || {
        format!("transaction was paid by {payer}, expected {first}")
    })?;

    let fee = client.network().transaction_fee();
    let after = helpers::account_balances(&client, first).await?.hbars;
    ensure(before.checked_sub(fee) == Some(after), || {
        format!("account {first} went from {before} to {after}, expected a fee of {fee}")
    })
}

async fn token_info(world: &mut LedgerWorld) -> Result<TokenInfo, StepError> {
    let client = world.client()?;
    let token_id = world.token()?.token_id;
    Ok(client.token_info(&token_id).await?)
}

async fn mint(world: &mut LedgerWorld, amount: u64) -> StepResult {
    let client = world.client()?;
    let operator = world.operator()?.clone();
    let token = world.token()?.clone();
    client
        .submit(
            &operator,
            TokenMint {
                token_id: token.token_id,
                amount,
            },
            &[&token.treasury.private_key],
        )
        .await?;
    Ok(())
}

fn signed_units(units: u64) -> Result<i64, StepError> {
    i64::try_from(units).map_err(|_| StepError::InvalidArgument {
        message: format!("{units} base units do not fit a transfer entry"),
    })
}
