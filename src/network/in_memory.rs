use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    account::{AccountEvent, LedgerAccount},
    amount::Hbar,
    id::{AccountId, EntityId, TokenId, TopicId},
    key::{Key, PublicKey},
    transaction::{
        AccountCreate, FrozenTransaction, Receipt, Status, TokenAssociate, TokenCreate, TokenMint,
        TokenSupplyType, TopicCreate, TopicMessageSubmit, TransactionBody, TransactionId,
        TransactionResponse, Transfer,
    },
};

use super::{AccountBalance, LedgerError, LedgerNetwork, TokenInfo, TopicInfo, TopicMessage};

/// Largest precision accepted for a token; 10^18 still fits a u64.
const MAX_TOKEN_DECIMALS: u32 = 18;

#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub shard: u64,
    pub realm: u64,
    /// Number given to the first entity created without an explicit id.
    pub first_entity_num: u64,
    /// Flat fee charged to the payer of every transaction that passes precheck.
    pub transaction_fee: Hbar,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            shard: 0,
            realm: 0,
            first_entity_num: 1001,
            transaction_fee: Hbar::from_tinybars(1_000_000),
        }
    }
}

#[derive(Debug, Clone)]
struct TokenState {
    name: String,
    symbol: String,
    decimals: u32,
    total_supply: u64,
    max_supply: u64,
    supply_type: TokenSupplyType,
    treasury: AccountId,
    admin_key: Option<Key>,
    supply_key: Option<Key>,
}

#[derive(Debug, Clone)]
struct TopicState {
    memo: String,
    submit_key: Option<Key>,
    messages: Vec<TopicMessage>,
}

#[derive(Debug)]
enum LedgerEvent {
    Account {
        account_id: AccountId,
        event: AccountEvent,
    },
    AccountCreated {
        account_id: AccountId,
        account: LedgerAccount,
    },
    TokenCreated {
        token_id: TokenId,
        token: TokenState,
    },
    TokenMinted {
        token_id: TokenId,
        amount: u64,
    },
    TopicCreated {
        topic_id: TopicId,
        topic: TopicState,
    },
    TopicMessageAppended(TopicMessage),
}

impl LedgerEvent {
    fn account(account_id: AccountId, event: AccountEvent) -> Self {
        LedgerEvent::Account { account_id, event }
    }
}

#[derive(Debug)]
struct LedgerState {
    shard: u64,
    realm: u64,
    next_entity_num: u64,
    accounts: HashMap<AccountId, LedgerAccount>,
    tokens: HashMap<TokenId, TokenState>,
    topics: HashMap<TopicId, TopicState>,
    receipts: HashMap<TransactionId, Receipt>,
}

/// Ledger kept entirely in memory. Every transaction reaches consensus as soon as it passes
/// precheck, and its body either applies completely or not at all.
#[derive(Debug)]
pub struct InMemoryLedger {
    transaction_fee: Hbar,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            transaction_fee: settings.transaction_fee,
            state: Mutex::new(LedgerState {
                shard: settings.shard,
                realm: settings.realm,
                next_entity_num: settings.first_entity_num,
                accounts: HashMap::new(),
                tokens: HashMap::new(),
                topics: HashMap::new(),
                receipts: HashMap::new(),
            }),
        }
    }

    pub fn transaction_fee(&self) -> Hbar {
        self.transaction_fee
    }

    /// Funds an account out of thin air before the ledger is shared.
    /// Without an explicit id the next free entity number is used.
    pub fn genesis_account(
        &mut self,
        account_id: Option<AccountId>,
        key: Key,
        balance: Hbar,
    ) -> AccountId {
        let state = self.state.get_mut();
        let account_id = match account_id {
            Some(id) => {
                state.next_entity_num = state.next_entity_num.max(id.num().saturating_add(1));
                id
            }
            None => AccountId(state.allocate_entity_id()),
        };
        state
            .accounts
            .insert(account_id, LedgerAccount::new(key, balance));
        debug!(%account_id, %balance, "genesis account funded");
        account_id
    }
}

impl LedgerState {
    fn peek_entity_id(&self) -> EntityId {
        EntityId::new(self.shard, self.realm, self.next_entity_num)
    }

    fn allocate_entity_id(&mut self) -> EntityId {
        let id = self.peek_entity_id();
        self.next_entity_num = self.next_entity_num.saturating_add(1);
        id
    }

    fn account(&self, account_id: &AccountId) -> Result<&LedgerAccount, Status> {
        self.accounts.get(account_id).ok_or(Status::InvalidAccountId)
    }

    fn token(&self, token_id: &TokenId) -> Result<&TokenState, Status> {
        self.tokens.get(token_id).ok_or(Status::InvalidTokenId)
    }

    /// Checks that must pass before the payer is charged. Returns the verified signers.
    fn precheck(&self, tx: &FrozenTransaction, fee: Hbar) -> Result<HashSet<PublicKey>, Status> {
        if self.receipts.contains_key(&tx.transaction_id()) {
            return Err(Status::DuplicateTransaction);
        }
        let mut signers = HashSet::new();
        for pair in tx.signatures() {
            if !pair.public_key.verify(tx.body_bytes(), &pair.signature) {
                return Err(Status::InvalidSignature);
            }
            signers.insert(pair.public_key);
        }
        let payer = self.account(&tx.payer())?;
        require_key(payer.key(), &signers)?;
        payer.handle_hbar_debit(fee, true)?;
        Ok(signers)
    }

    fn handle(
        &self,
        tx: &FrozenTransaction,
        signers: &HashSet<PublicKey>,
    ) -> Result<Vec<LedgerEvent>, Status> {
        match tx.body() {
            TransactionBody::AccountCreate(body) => self.handle_account_create(tx.payer(), body),
            TransactionBody::TokenCreate(body) => self.handle_token_create(body, signers),
            TransactionBody::TokenAssociate(body) => self.handle_token_associate(body, signers),
            TransactionBody::TokenMint(body) => self.handle_token_mint(body, signers),
            TransactionBody::Transfer(body) => self.handle_transfer(body, signers),
            TransactionBody::TopicCreate(body) => self.handle_topic_create(body, signers),
            TransactionBody::TopicMessageSubmit(body) => {
                self.handle_topic_message(tx.transaction_id(), body, signers)
            }
        }
    }

    fn handle_account_create(
        &self,
        payer: AccountId,
        body: &AccountCreate,
    ) -> Result<Vec<LedgerEvent>, Status> {
        if body.initial_balance.is_negative() {
            return Err(Status::InvalidAccountAmounts);
        }
        let debit = self
            .account(&payer)?
            .handle_hbar_debit(body.initial_balance, true)?;
        Ok(vec![
            LedgerEvent::account(payer, debit),
            LedgerEvent::AccountCreated {
                account_id: AccountId(self.peek_entity_id()),
                account: LedgerAccount::new(body.key.clone(), body.initial_balance),
            },
        ])
    }

    fn handle_token_create(
        &self,
        body: &TokenCreate,
        signers: &HashSet<PublicKey>,
    ) -> Result<Vec<LedgerEvent>, Status> {
        let treasury = self.account(&body.treasury)?;
        require_key(treasury.key(), signers)?;
        if let Some(admin_key) = &body.admin_key {
            require_key(admin_key, signers)?;
        }
        if body.decimals > MAX_TOKEN_DECIMALS {
            return Err(Status::InvalidTokenDecimals);
        }
        match body.supply_type {
            TokenSupplyType::Finite
                if body.max_supply == 0 || body.initial_supply > body.max_supply =>
            {
                return Err(Status::InvalidTransactionBody);
            }
            TokenSupplyType::Infinite if body.max_supply != 0 => {
                return Err(Status::InvalidTransactionBody);
            }
            _ => {}
        }

        let token_id = TokenId(self.peek_entity_id());
        let mut events = vec![
            LedgerEvent::TokenCreated {
                token_id,
                token: TokenState {
                    name: body.name.clone(),
                    symbol: body.symbol.clone(),
                    decimals: body.decimals,
                    total_supply: body.initial_supply,
                    max_supply: body.max_supply,
                    supply_type: body.supply_type,
                    treasury: body.treasury,
                    admin_key: body.admin_key.clone(),
                    supply_key: body.supply_key.clone(),
                },
            },
            LedgerEvent::account(body.treasury, AccountEvent::TokenAssociated(token_id)),
        ];
        if body.initial_supply > 0 {
            events.push(LedgerEvent::account(
                body.treasury,
                AccountEvent::TokenCredited {
                    token_id,
                    amount: body.initial_supply,
                },
            ));
        }
        Ok(events)
    }

    fn handle_token_associate(
        &self,
        body: &TokenAssociate,
        signers: &HashSet<PublicKey>,
    ) -> Result<Vec<LedgerEvent>, Status> {
        let account = self.account(&body.account_id)?;
        require_key(account.key(), signers)?;
        let unique: BTreeSet<&TokenId> = body.token_ids.iter().collect();
        if body.token_ids.is_empty() || unique.len() != body.token_ids.len() {
            return Err(Status::InvalidTransactionBody);
        }
        body.token_ids
            .iter()
            .map(|token_id| {
                self.token(token_id)?;
                let event = account.handle_association(*token_id)?;
                Ok(LedgerEvent::account(body.account_id, event))
            })
            .collect()
    }

    fn handle_token_mint(
        &self,
        body: &TokenMint,
        signers: &HashSet<PublicKey>,
    ) -> Result<Vec<LedgerEvent>, Status> {
        let token = self.token(&body.token_id)?;
        let supply_key = token.supply_key.as_ref().ok_or(Status::TokenHasNoSupplyKey)?;
        require_key(supply_key, signers)?;
        if body.amount == 0 {
            return Err(Status::InvalidTransactionBody);
        }
        let total = token
            .total_supply
            .checked_add(body.amount)
            .ok_or(Status::TokenMaxSupplyReached)?;
        if token.supply_type == TokenSupplyType::Finite && total > token.max_supply {
            return Err(Status::TokenMaxSupplyReached);
        }
        let credit = self
            .account(&token.treasury)?
            .handle_token_credit(body.token_id, body.amount)?;
        Ok(vec![
            LedgerEvent::TokenMinted {
                token_id: body.token_id,
                amount: body.amount,
            },
            LedgerEvent::account(token.treasury, credit),
        ])
    }

    /// Entries are netted per account so the same account may appear more than once.
    fn handle_transfer(
        &self,
        body: &Transfer,
        signers: &HashSet<PublicKey>,
    ) -> Result<Vec<LedgerEvent>, Status> {
        if body.hbar_transfers.is_empty() && body.token_transfers.is_empty() {
            return Err(Status::InvalidTransactionBody);
        }
        let mut events = Vec::new();
        let mut debited = BTreeSet::new();

        let mut hbar_net: BTreeMap<AccountId, i128> = BTreeMap::new();
        for entry in &body.hbar_transfers {
            if entry.amount.is_negative() {
                debited.insert(entry.account_id);
            }
            *hbar_net.entry(entry.account_id).or_default() += i128::from(entry.amount.to_tinybars());
        }
        if hbar_net.values().sum::<i128>() != 0 {
            return Err(Status::InvalidAccountAmounts);
        }

        let mut token_net: BTreeMap<(TokenId, AccountId), i128> = BTreeMap::new();
        let mut token_sums: BTreeMap<TokenId, i128> = BTreeMap::new();
        for entry in &body.token_transfers {
            if entry.amount < 0 {
                debited.insert(entry.account_id);
            }
            *token_net
                .entry((entry.token_id, entry.account_id))
                .or_default() += i128::from(entry.amount);
            *token_sums.entry(entry.token_id).or_default() += i128::from(entry.amount);
        }
        for (token_id, sum) in &token_sums {
            self.token(token_id)?;
            if *sum != 0 {
                return Err(Status::TransfersNotZeroSumForToken);
            }
        }

        for account_id in &debited {
            require_key(self.account(account_id)?.key(), signers)?;
        }

        for (account_id, net) in hbar_net {
            let account = self.account(&account_id)?;
            let amount = Hbar::from_tinybars(
                i64::try_from(net.abs()).map_err(|_| Status::InvalidAccountAmounts)?,
            );
            let event = match net {
                0 => continue,
                n if n < 0 => account.handle_hbar_debit(amount, false)?,
                _ => account.handle_hbar_credit(amount)?,
            };
            events.push(LedgerEvent::account(account_id, event));
        }

        for ((token_id, account_id), net) in token_net {
            let account = self.account(&account_id)?;
            let amount = u64::try_from(net.abs()).map_err(|_| Status::InvalidAccountAmounts)?;
            let event = match net {
                0 => continue,
                n if n < 0 => account.handle_token_debit(token_id, amount)?,
                _ => account.handle_token_credit(token_id, amount)?,
            };
            events.push(LedgerEvent::account(account_id, event));
        }

        Ok(events)
    }

    fn handle_topic_create(
        &self,
        body: &TopicCreate,
        signers: &HashSet<PublicKey>,
    ) -> Result<Vec<LedgerEvent>, Status> {
        if let Some(admin_key) = &body.admin_key {
            require_key(admin_key, signers)?;
        }
        Ok(vec![LedgerEvent::TopicCreated {
            topic_id: TopicId(self.peek_entity_id()),
            topic: TopicState {
                memo: body.memo.clone(),
                submit_key: body.submit_key.clone(),
                messages: Vec::new(),
            },
        }])
    }

    fn handle_topic_message(
        &self,
        transaction_id: TransactionId,
        body: &TopicMessageSubmit,
        signers: &HashSet<PublicKey>,
    ) -> Result<Vec<LedgerEvent>, Status> {
        let topic = self.topics.get(&body.topic_id).ok_or(Status::InvalidTopicId)?;
        if let Some(submit_key) = &topic.submit_key {
            require_key(submit_key, signers)?;
        }
        if body.message.is_empty() {
            return Err(Status::InvalidTransactionBody);
        }
        Ok(vec![LedgerEvent::TopicMessageAppended(TopicMessage {
            topic_id: body.topic_id,
            sequence_number: topic.messages.len() as u64 + 1,
            contents: body.message.clone(),
            transaction_id,
        })])
    }

    /// Applies validated events and fills the entity fields of the receipt.
    fn apply(&mut self, events: Vec<LedgerEvent>, receipt: &mut Receipt) {
        for event in events {
            match event {
                LedgerEvent::Account { account_id, event } => {
                    if let Some(account) = self.accounts.get_mut(&account_id) {
                        account.apply(&event);
                    }
                }
                LedgerEvent::AccountCreated {
                    account_id,
                    account,
                } => {
                    self.allocate_entity_id();
                    self.accounts.insert(account_id, account);
                    receipt.account_id = Some(account_id);
                }
                LedgerEvent::TokenCreated { token_id, token } => {
                    self.allocate_entity_id();
                    self.tokens.insert(token_id, token);
                    receipt.token_id = Some(token_id);
                }
                LedgerEvent::TokenMinted { token_id, amount } => {
                    if let Some(token) = self.tokens.get_mut(&token_id) {
                        token.total_supply += amount;
                    }
                }
                LedgerEvent::TopicCreated { topic_id, topic } => {
                    self.allocate_entity_id();
                    self.topics.insert(topic_id, topic);
                    receipt.topic_id = Some(topic_id);
                }
                LedgerEvent::TopicMessageAppended(message) => {
                    receipt.topic_sequence_number = Some(message.sequence_number);
                    if let Some(topic) = self.topics.get_mut(&message.topic_id) {
                        topic.messages.push(message);
                    }
                }
            }
        }
    }
}

fn require_key(key: &Key, signers: &HashSet<PublicKey>) -> Result<(), Status> {
    if key.is_satisfied_by(signers) {
        Ok(())
    } else {
        Err(Status::InvalidSignature)
    }
}

#[async_trait]
impl LedgerNetwork for InMemoryLedger {
    async fn execute(&self, transaction: FrozenTransaction) -> Result<TransactionResponse, LedgerError> {
        let transaction_id = transaction.transaction_id();
        let mut state = self.state.lock().await;

        let signers = match state.precheck(&transaction, self.transaction_fee) {
            Ok(signers) => signers,
            Err(status) => {
                warn!(%transaction_id, %status, kind = transaction.body().kind(), "transaction failed precheck");
                return Err(LedgerError::Precheck {
                    transaction_id,
                    status,
                });
            }
        };

        // the fee is charged whatever the outcome of the body
        let mut receipt = Receipt::new(transaction_id, Status::Success);
        state.apply(
            vec![LedgerEvent::account(
                transaction.payer(),
                AccountEvent::HbarDebited(self.transaction_fee),
            )],
            &mut receipt,
        );
        match state.handle(&transaction, &signers) {
            Ok(events) => state.apply(events, &mut receipt),
            Err(status) => receipt.status = status,
        }
        debug!(
            %transaction_id,
            kind = transaction.body().kind(),
            status = %receipt.status,
            "transaction reached consensus"
        );
        state.receipts.insert(transaction_id, receipt);

        Ok(TransactionResponse { transaction_id })
    }

    async fn receipt(&self, transaction_id: &TransactionId) -> Result<Receipt, LedgerError> {
        self.state
            .lock()
            .await
            .receipts
            .get(transaction_id)
            .cloned()
            .ok_or(LedgerError::ReceiptNotFound(*transaction_id))
    }

    async fn account_balance(&self, account_id: &AccountId) -> Result<AccountBalance, LedgerError> {
        let state = self.state.lock().await;
        let account = state.account(account_id).map_err(LedgerError::Query)?;
        Ok(AccountBalance {
            account_id: *account_id,
            hbars: account.hbars(),
            tokens: account.tokens().clone(),
        })
    }

    async fn token_info(&self, token_id: &TokenId) -> Result<TokenInfo, LedgerError> {
        let state = self.state.lock().await;
        let token = state.token(token_id).map_err(LedgerError::Query)?;
        Ok(TokenInfo {
            token_id: *token_id,
            name: token.name.clone(),
            symbol: token.symbol.clone(),
            decimals: token.decimals,
            total_supply: token.total_supply,
            max_supply: token.max_supply,
            supply_type: token.supply_type,
            treasury_account_id: token.treasury,
            admin_key: token.admin_key.clone(),
            supply_key: token.supply_key.clone(),
        })
    }

    async fn topic_info(&self, topic_id: &TopicId) -> Result<TopicInfo, LedgerError> {
        let state = self.state.lock().await;
        let topic = state
            .topics
            .get(topic_id)
            .ok_or(LedgerError::Query(Status::InvalidTopicId))?;
        Ok(TopicInfo {
            topic_id: *topic_id,
            memo: topic.memo.clone(),
            submit_key: topic.submit_key.clone(),
            sequence_number: topic.messages.len() as u64,
        })
    }

    async fn topic_messages(&self, topic_id: &TopicId) -> Result<Vec<TopicMessage>, LedgerError> {
        let state = self.state.lock().await;
        state
            .topics
            .get(topic_id)
            .map(|topic| topic.messages.clone())
            .ok_or(LedgerError::Query(Status::InvalidTopicId))
    }
}
