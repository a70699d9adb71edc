use cucumber::{given, then, when};
use tracing::info;

use super::funded_account;
use crate::{
    key::{Key, KeyList},
    transaction::{TopicCreate, TopicMessageSubmit},
    world::{LedgerWorld, Party, StepError, StepResult, ensure},
};

#[given(expr = "a first account with more than {int} hbars")]
async fn first_account(world: &mut LedgerWorld, hbars: u64) -> StepResult {
    let account = funded_account(world, 0, hbars).await?;
    world.operator = Some(account.clone());
    world.parties.insert(Party::First, account);
    Ok(())
}

#[given(expr = "A second account with more than {int} hbars")]
async fn second_account(world: &mut LedgerWorld, hbars: u64) -> StepResult {
    let account = funded_account(world, 1, hbars).await?;
    world.parties.insert(Party::Second, account);
    Ok(())
}

#[given(expr = "A {int} of {int} threshold key with the first and second account")]
async fn threshold_key(world: &mut LedgerWorld, threshold: u32, total: usize) -> StepResult {
    let keys = vec![
        world.party(Party::First)?.private_key.public_key(),
        world.party(Party::Second)?.private_key.public_key(),
    ];
    let key_list = KeyList::new(keys, threshold)?;
    ensure(key_list.keys().len() == total, || {
        format!(
            "threshold key is built from {} accounts, not {total}",
            key_list.keys().len()
        )
    })?;
    info!(
        threshold = key_list.threshold(),
        keys = key_list.keys().len(),
        "threshold key ready"
    );
    world.threshold_key = Some(key_list);
    Ok(())
}

#[when(expr = "A topic is created with the memo {string} with the first account as the submit key")]
async fn topic_with_single_key(world: &mut LedgerWorld, memo: String) -> StepResult {
    let submit_key = world.party(Party::First)?.private_key.public_key();
    create_topic(world, memo, submit_key.into()).await
}

#[when(expr = "A topic is created with the memo {string} with the threshold key as the submit key")]
async fn topic_with_threshold_key(world: &mut LedgerWorld, memo: String) -> StepResult {
    let submit_key = world.threshold_key.clone().ok_or(StepError::Missing {
        what: "threshold key",
        step: "Given A <m> of <n> threshold key with the first and second account",
    })?;
    create_topic(world, memo, submit_key.into()).await
}

#[when(expr = "The message {string} is published to the topic")]
async fn publish_message(world: &mut LedgerWorld, message: String) -> StepResult {
    let client = world.client()?;
    let operator = world.operator()?.clone();
    let topic_id = world.topic_id()?;
    let receipt = client
        .submit(&operator, TopicMessageSubmit { topic_id, message }, &[])
        .await?;
    info!(%topic_id, sequence_number = ?receipt.topic_sequence_number, "message published");
    Ok(())
}

#[then(expr = "The message {string} is received by the topic and can be printed to the console")]
async fn message_received(world: &mut LedgerWorld, message: String) -> StepResult {
    let client = world.client()?;
    let topic_id = world.topic_id()?;
    let messages = client.topic_messages(&topic_id).await?;
    let received = messages.iter().find(|received| received.contents == message);
    let Some(received) = received else {
        return Err(StepError::Assertion {
            message: format!(
                "topic {topic_id} holds {} messages, none of them `{message}`",
                messages.len()
            ),
        });
    };
    info!(
        %topic_id,
        sequence_number = received.sequence_number,
        contents = %received.contents,
        "message received"
    );
    Ok(())
}

async fn create_topic(world: &mut LedgerWorld, memo: String, submit_key: Key) -> StepResult {
    let client = world.client()?;
    let operator = world.operator()?.clone();
    let signer = world.party(Party::First)?.private_key.clone();
    let body = TopicCreate {
        memo: memo.clone(),
        submit_key: Some(submit_key),
        admin_key: None,
    };
    let receipt = client.submit(&operator, body, &[&signer]).await?;
    let topic_id = receipt.topic_id.ok_or_else(|| StepError::Assertion {
        message: format!("receipt {} carries no topic id", receipt.transaction_id),
    })?;
    let info = client.topic_info(&topic_id).await?;
    ensure(info.memo == memo, || {
        format!("topic memo is `{}`, expected `{memo}`", info.memo)
    })?;
    info!(%topic_id, %memo, "topic created");
    world.topic_id = Some(topic_id);
    Ok(())
}
