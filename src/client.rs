use std::sync::Arc;

use tracing::debug;

use crate::{
    account::Operator,
    id::{AccountId, TokenId, TopicId},
    key::PrivateKey,
    network::{AccountBalance, LedgerError, LedgerNetwork, TokenInfo, TopicInfo, TopicMessage},
    transaction::{FrozenTransaction, Receipt, Status, TransactionBody, TransactionResponse},
};

/// Stateless handle to a ledger network.
///
/// The client never remembers who is acting: every submitting call names its [`Operator`],
/// so one client can be shared by callers acting as different accounts.
#[derive(Debug)]
pub struct Client<N> {
    network: Arc<N>,
}

impl<N> Clone for Client<N> {
    fn clone(&self) -> Self {
        Self {
            network: Arc::clone(&self.network),
        }
    }
}

impl<N: LedgerNetwork> Client<N> {
    pub fn new(network: Arc<N>) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Adds the operator signature and submits. Does not wait for consensus.
    pub async fn execute(
        &self,
        operator: &Operator,
        transaction: FrozenTransaction,
    ) -> Result<TransactionResponse, LedgerError> {
        let transaction = transaction.sign(&operator.private_key);
        debug!(
            transaction_id = %transaction.transaction_id(),
            operator = %operator.account_id,
            kind = transaction.body().kind(),
            "submitting transaction"
        );
        self.network.execute(transaction).await
    }

    /// Receipt of a submitted transaction; any status other than success is an error.
    pub async fn get_receipt(&self, response: &TransactionResponse) -> Result<Receipt, LedgerError> {
        let receipt = self.network.receipt(&response.transaction_id).await?;
        if receipt.status != Status::Success {
            return Err(LedgerError::ReceiptStatus {
                transaction_id: receipt.transaction_id,
                status: receipt.status,
            });
        }
        Ok(receipt)
    }

    /// Freezes `body` with the operator as payer, signs it with `signers`, submits it
    /// and waits for a successful receipt.
    pub async fn submit(
        &self,
        operator: &Operator,
        body: impl Into<TransactionBody>,
        signers: &[&PrivateKey],
    ) -> Result<Receipt, LedgerError> {
        let body: TransactionBody = body.into();
        let transaction = signers
            .iter()
            .fold(body.freeze(operator.account_id)?, |tx, key| tx.sign(key));
        let response = self.execute(operator, transaction).await?;
        self.get_receipt(&response).await
    }

    pub async fn account_balance(&self, account_id: &AccountId) -> Result<AccountBalance, LedgerError> {
        self.network.account_balance(account_id).await
    }

    pub async fn token_info(&self, token_id: &TokenId) -> Result<TokenInfo, LedgerError> {
        self.network.token_info(token_id).await
    }

    pub async fn topic_info(&self, topic_id: &TopicId) -> Result<TopicInfo, LedgerError> {
        self.network.topic_info(topic_id).await
    }

    pub async fn topic_messages(&self, topic_id: &TopicId) -> Result<Vec<TopicMessage>, LedgerError> {
        self.network.topic_messages(topic_id).await
    }
}
