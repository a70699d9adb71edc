use std::sync::Arc;

use ledger_acceptance::{
    account::{AccountRef, Operator},
    amount::Hbar,
    client::Client,
    helpers::{
        Association, TokenContext, TokenSpec, TokenSupply, account_balances, associate_token,
        create_account, create_token, distribute_tokens, token_balance,
    },
    key::PrivateKey,
    network::in_memory::{InMemoryLedger, LedgerSettings},
    transaction::Status,
};
use rust_decimal::Decimal;

struct Fixture {
    client: Client<InMemoryLedger>,
    operator: Operator,
}

impl Fixture {
    fn new() -> Self {
        let mut ledger = InMemoryLedger::new(LedgerSettings::default());
        let key = PrivateKey::generate_ed25519();
        let account_id = ledger.genesis_account(None, key.public_key().into(), Hbar::new(1000));
        Self {
            client: Client::new(Arc::new(ledger)),
            operator: AccountRef::new(account_id, key),
        }
    }

    async fn token(&self, supply: u64) -> TokenContext {
        let spec = TokenSpec {
            name: "Test Token".to_owned(),
            symbol: "HTT".to_owned(),
            decimals: 2,
            supply: TokenSupply::Finite {
                max: Decimal::from(supply),
            },
        };
        create_token(&self.client, &self.operator, spec, &self.operator)
            .await
            .unwrap()
    }

    async fn account(&self, hbars: i64) -> AccountRef {
        create_account(&self.client, &self.operator, Hbar::new(hbars))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn provisioned_account_holds_only_hbars() {
    let fixture = Fixture::new();
    let account = fixture.account(100).await;

    let balances = account_balances(&fixture.client, account.account_id)
        .await
        .unwrap();
    assert_eq!(balances.hbars, Hbar::new(100));
    assert!(balances.tokens.is_empty());
}

#[tokio::test]
async fn unassociated_token_reads_as_zero() {
    let fixture = Fixture::new();
    let token = fixture.token(1000).await;
    let account = fixture.account(1).await;

    let balance = token_balance(&fixture.client, account.account_id, token.token_id)
        .await
        .unwrap();
    assert_eq!(balance, 0);
}

#[tokio::test]
async fn distribute_scales_by_token_decimals() {
    let fixture = Fixture::new();
    let token = fixture.token(1000).await;
    let account = fixture.account(1).await;

    let association = associate_token(&fixture.client, &fixture.operator, &account, token.token_id)
        .await
        .unwrap();
    assert_eq!(association, Association::Associated);
    distribute_tokens(
        &fixture.client,
        &fixture.operator,
        &token,
        Decimal::from(50),
        account.account_id,
    )
    .await
    .unwrap();

    let balance = token_balance(&fixture.client, account.account_id, token.token_id)
        .await
        .unwrap();
    assert_eq!(balance, 5000);
}

#[tokio::test]
async fn reassociation_is_idempotent() {
    let fixture = Fixture::new();
    let token = fixture.token(1000).await;
    let account = fixture.account(1).await;
    associate_token(&fixture.client, &fixture.operator, &account, token.token_id)
        .await
        .unwrap();
    distribute_tokens(
        &fixture.client,
        &fixture.operator,
        &token,
        Decimal::from(7),
        account.account_id,
    )
    .await
    .unwrap();

    let again = associate_token(&fixture.client, &fixture.operator, &account, token.token_id)
        .await
        .unwrap();
    assert_eq!(again, Association::AlreadyAssociated);
    let balance = token_balance(&fixture.client, account.account_id, token.token_id)
        .await
        .unwrap();
    assert_eq!(balance, 700);
}

#[tokio::test]
async fn distribution_conserves_supply() {
    let fixture = Fixture::new();
    let token = fixture.token(1000).await;
    let account = fixture.account(1).await;
    associate_token(&fixture.client, &fixture.operator, &account, token.token_id)
        .await
        .unwrap();

    let treasury_before = token_balance(&fixture.client, fixture.operator.account_id, token.token_id)
        .await
        .unwrap();
    distribute_tokens(
        &fixture.client,
        &fixture.operator,
        &token,
        Decimal::new(1250, 2),
        account.account_id,
    )
    .await
    .unwrap();
    let treasury_after = token_balance(&fixture.client, fixture.operator.account_id, token.token_id)
        .await
        .unwrap();
    let receiver = token_balance(&fixture.client, account.account_id, token.token_id)
        .await
        .unwrap();

    assert_eq!(treasury_before, 100_000);
    assert_eq!(treasury_before - treasury_after, 1250);
    assert_eq!(receiver, 1250);
    let info = fixture.client.token_info(&token.token_id).await.unwrap();
    assert_eq!(info.total_supply, treasury_after + receiver);
}

#[tokio::test]
async fn distribution_without_association_is_rejected() {
    let fixture = Fixture::new();
    let token = fixture.token(1000).await;
    let account = fixture.account(1).await;

    let err = distribute_tokens(
        &fixture.client,
        &fixture.operator,
        &token,
        Decimal::ONE,
        account.account_id,
    )
    .await
    .unwrap_err();
    match err {
        ledger_acceptance::helpers::HelperError::Ledger(err) => {
            assert_eq!(err.status(), Some(Status::TokenNotAssociatedToAccount));
        }
        other => panic!("expected a ledger rejection, got {other:?}"),
    }
    let treasury = token_balance(&fixture.client, fixture.operator.account_id, token.token_id)
        .await
        .unwrap();
    assert_eq!(treasury, 100_000);
}
