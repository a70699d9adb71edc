mod token;
mod topic;

use rust_decimal::Decimal;

use crate::{
    account::AccountRef,
    amount::Hbar,
    helpers,
    world::{LedgerWorld, StepError, ensure},
};

/// Configured account `index`, checked to hold more than `hbars`.
async fn funded_account(
    world: &mut LedgerWorld,
    index: usize,
    hbars: u64,
) -> Result<AccountRef, StepError> {
    let client = world.client()?;
    let account = world.configured_account(index)?;
    let balance = helpers::account_balances(&client, account.account_id).await?;
    let floor = whole_hbars(hbars);
    ensure(balance.hbars > floor, || {
        format!(
            "account {} holds {}, expected more than {floor}",
            account.account_id, balance.hbars
        )
    })?;
    Ok(account)
}

fn whole(amount: u64) -> Decimal {
    Decimal::from(amount)
}

fn whole_hbars(hbars: u64) -> Hbar {
    Hbar::new(i64::try_from(hbars).unwrap_or(i64::MAX))
}
