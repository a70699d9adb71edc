use std::collections::BTreeMap;

use crate::{
    amount::Hbar,
    id::{AccountId, TokenId},
    key::{Key, PrivateKey},
    transaction::Status,
};

/// Account id plus the private key that controls it.
#[derive(Debug, Clone)]
pub struct AccountRef {
    pub account_id: AccountId,
    pub private_key: PrivateKey,
}

impl AccountRef {
    pub fn new(account_id: AccountId, private_key: PrivateKey) -> Self {
        Self {
            account_id,
            private_key,
        }
    }
}

/// Identity that pays for and signs a submitted transaction.
pub type Operator = AccountRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    HbarCredited(Hbar),
    HbarDebited(Hbar),
    TokenAssociated(TokenId),
    TokenCredited { token_id: TokenId, amount: u64 },
    TokenDebited { token_id: TokenId, amount: u64 },
}

/// Ledger-side state of an account.
/// Handlers validate and return events, [`LedgerAccount::apply`] mutates.
#[derive(Debug, Clone)]
pub struct LedgerAccount {
    key: Key,
    hbars: Hbar,
    tokens: BTreeMap<TokenId, u64>,
}

impl LedgerAccount {
    pub fn new(key: Key, hbars: Hbar) -> Self {
        Self {
            key,
            hbars,
            tokens: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn hbars(&self) -> Hbar {
        self.hbars
    }

    /// `None` when the token is not associated.
    pub fn token_balance(&self, token_id: &TokenId) -> Option<u64> {
        self.tokens.get(token_id).copied()
    }

    pub fn tokens(&self) -> &BTreeMap<TokenId, u64> {
        &self.tokens
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        match event {
            AccountEvent::HbarCredited(amount) => {
                self.hbars = Hbar::from_tinybars(self.hbars.to_tinybars() + amount.to_tinybars());
            }
            AccountEvent::HbarDebited(amount) => {
                self.hbars = Hbar::from_tinybars(self.hbars.to_tinybars() - amount.to_tinybars());
            }
            AccountEvent::TokenAssociated(token_id) => {
                self.tokens.entry(*token_id).or_insert(0);
            }
            AccountEvent::TokenCredited { token_id, amount } => {
                *self.tokens.entry(*token_id).or_insert(0) += amount;
            }
            AccountEvent::TokenDebited { token_id, amount } => {
                if let Some(balance) = self.tokens.get_mut(token_id) {
                    *balance -= amount;
                }
            }
        }
    }

    pub fn handle_hbar_debit(&self, amount: Hbar, payer: bool) -> Result<AccountEvent, Status> {
        match self.hbars.checked_sub(amount) {
            Some(rest) if !rest.is_negative() => Ok(AccountEvent::HbarDebited(amount)),
            _ if payer => Err(Status::InsufficientPayerBalance),
            _ => Err(Status::InsufficientAccountBalance),
        }
    }

    pub fn handle_hbar_credit(&self, amount: Hbar) -> Result<AccountEvent, Status> {
        self.hbars
            .checked_add(amount)
            .map(|_| AccountEvent::HbarCredited(amount))
            .ok_or(Status::InvalidAccountAmounts)
    }

    pub fn handle_association(&self, token_id: TokenId) -> Result<AccountEvent, Status> {
        if self.tokens.contains_key(&token_id) {
            return Err(Status::TokenAlreadyAssociatedToAccount);
        }
        Ok(AccountEvent::TokenAssociated(token_id))
    }

    pub fn handle_token_debit(&self, token_id: TokenId, amount: u64) -> Result<AccountEvent, Status> {
        match self.tokens.get(&token_id) {
            None => Err(Status::TokenNotAssociatedToAccount),
            Some(balance) if *balance < amount => Err(Status::InsufficientTokenBalance),
            Some(_) => Ok(AccountEvent::TokenDebited { token_id, amount }),
        }
    }

    pub fn handle_token_credit(&self, token_id: TokenId, amount: u64) -> Result<AccountEvent, Status> {
        match self.tokens.get(&token_id) {
            None => Err(Status::TokenNotAssociatedToAccount),
            Some(balance) if balance.checked_add(amount).is_none() => {
                Err(Status::InvalidAccountAmounts)
            }
            Some(_) => Ok(AccountEvent::TokenCredited { token_id, amount }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(hbars: i64) -> LedgerAccount {
        LedgerAccount::new(
            Key::Single(PrivateKey::generate_ed25519().public_key()),
            Hbar::new(hbars),
        )
    }

    #[test]
    fn apply_events() {
        let token = TokenId::new(0, 0, 7);
        let mut acc = account(10);

        acc.apply(&AccountEvent::HbarDebited(Hbar::new(3)));
        assert_eq!(acc.hbars(), Hbar::new(7));
        acc.apply(&AccountEvent::HbarCredited(Hbar::new(1)));
        assert_eq!(acc.hbars(), Hbar::new(8));

        assert_eq!(acc.token_balance(&token), None);
        acc.apply(&AccountEvent::TokenAssociated(token));
        assert_eq!(acc.token_balance(&token), Some(0));
        acc.apply(&AccountEvent::TokenCredited {
            token_id: token,
            amount: 500,
        });
        acc.apply(&AccountEvent::TokenDebited {
            token_id: token,
            amount: 200,
        });
        assert_eq!(acc.token_balance(&token), Some(300));
        // association keeps the existing balance
        acc.apply(&AccountEvent::TokenAssociated(token));
        assert_eq!(acc.token_balance(&token), Some(300));
    }

    #[test]
    fn handle_hbar_debit() {
        let acc = account(5);
        assert_eq!(
            acc.handle_hbar_debit(Hbar::new(5), false),
            Ok(AccountEvent::HbarDebited(Hbar::new(5)))
        );
        assert_eq!(
            acc.handle_hbar_debit(Hbar::new(6), false),
            Err(Status::InsufficientAccountBalance)
        );
        assert_eq!(
            acc.handle_hbar_debit(Hbar::new(6), true),
            Err(Status::InsufficientPayerBalance)
        );
    }

    #[test]
    fn handle_token_events() {
        let token = TokenId::new(0, 0, 7);
        let mut acc = account(1);

        assert_eq!(
            acc.handle_token_credit(token, 1),
            Err(Status::TokenNotAssociatedToAccount)
        );
        assert_eq!(
            acc.handle_token_debit(token, 1),
            Err(Status::TokenNotAssociatedToAccount)
        );

        let evt = acc.handle_association(token).unwrap();
        acc.apply(&evt);
        assert_eq!(
            acc.handle_association(token),
            Err(Status::TokenAlreadyAssociatedToAccount)
        );

        let evt = acc.handle_token_credit(token, 100).unwrap();
        acc.apply(&evt);
        assert_eq!(
            acc.handle_token_debit(token, 101),
            Err(Status::InsufficientTokenBalance)
        );
        assert_eq!(
            acc.handle_token_debit(token, 100),
            Ok(AccountEvent::TokenDebited {
                token_id: token,
                amount: 100
            })
        );
    }
}
