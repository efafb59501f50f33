// ABOUTME: The bot's command handlers: register, borrow, return, reset, and purge.
// ABOUTME: Each checks ledger preconditions, performs the store op, and builds the reply.

use chrono::{DateTime, Duration, Utc};
use tokio::time::sleep;

use poold_core::{AccountRecord, HolderId, Ledger, LedgerError, NewAccount, ReturnOutcome, StoreError};

use crate::discord::{ChannelMessage, ChatError, DiscordRest};

/// Messages older than this cannot go through the platform's batched
/// delete; they are removed one by one instead.
pub const BULK_DELETE_WINDOW_DAYS: i64 = 14;

/// Largest batch the platform accepts in one bulk-delete call.
pub const MAX_BULK_CHUNK: usize = 100;

/// Pause between individual deletions so the purge stays under rate limits.
pub const PURGE_PACING: std::time::Duration = std::time::Duration::from_millis(350);

/// What a handler sends back: an ephemeral reply to the invoker, plus an
/// optional public announcement for the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub message: String,
    pub announcement: Option<String>,
}

impl CommandReply {
    fn quiet(message: String) -> Self {
        Self {
            message,
            announcement: None,
        }
    }
}

/// First step of borrowing: either a refusal or the list to choose from.
#[derive(Debug, Clone)]
pub enum BorrowStart {
    AlreadyBorrowing,
    NoneAvailable,
    /// (label, value) pairs for the selection menu: "name (rank)" labeled,
    /// account id valued.
    Choices(Vec<(String, String)>),
}

/// Register a new account from submitted form fields.
pub async fn register(
    ledger: &Ledger,
    name: String,
    account_id: String,
    password: String,
    rank: String,
) -> Result<CommandReply, StoreError> {
    let display_name = name.clone();
    ledger
        .register(NewAccount {
            name,
            account_id,
            password,
            rank,
        })
        .await?;
    Ok(CommandReply::quiet(format!(
        "Registered account {display_name}."
    )))
}

/// Start a borrow: refuse double loans up front, then enumerate what is
/// available. Selection is an explicit user choice, never auto-assigned.
pub async fn begin_borrow(ledger: &Ledger, holder: HolderId) -> Result<BorrowStart, StoreError> {
    if ledger.is_active(holder).await {
        return Ok(BorrowStart::AlreadyBorrowing);
    }

    let available = ledger.available().await?;
    if available.is_empty() {
        return Ok(BorrowStart::NoneAvailable);
    }

    let choices = available
        .into_iter()
        .map(|record| {
            (
                format!("{} ({})", record.name, record.rank),
                record.account_id,
            )
        })
        .collect();
    Ok(BorrowStart::Choices(choices))
}

/// Complete a borrow once the user has picked an account.
pub async fn complete_borrow(
    ledger: &Ledger,
    holder: HolderId,
    account_id: &str,
    user_name: &str,
) -> Result<CommandReply, StoreError> {
    borrow_reply(ledger.borrow(holder, account_id).await, user_name)
}

fn borrow_reply(
    result: Result<AccountRecord, LedgerError>,
    user_name: &str,
) -> Result<CommandReply, StoreError> {
    match result {
        Ok(record) => Ok(CommandReply {
            message: format!("You borrowed {}.", record.name),
            announcement: Some(format!("{user_name} borrowed {}!", record.name)),
        }),
        Err(LedgerError::AlreadyBorrowing) => Ok(CommandReply::quiet(
            "You are already borrowing an account. Please return it first.".to_string(),
        )),
        Err(LedgerError::AccountTaken(name)) => Ok(CommandReply::quiet(format!(
            "{name} was just taken by someone else. Please pick again."
        ))),
        Err(LedgerError::AccountMissing(_)) => Ok(CommandReply::quiet(
            "That account no longer exists. Please pick again.".to_string(),
        )),
        Err(LedgerError::Store(err)) => Err(err),
        Err(err) => {
            tracing::error!(error = %err, "unexpected ledger refusal during borrow");
            Ok(CommandReply::quiet(
                "Something went wrong completing the borrow. Please try again.".to_string(),
            ))
        }
    }
}

/// Return the caller's current loan.
pub async fn return_account(
    ledger: &Ledger,
    holder: HolderId,
    user_name: &str,
) -> Result<CommandReply, StoreError> {
    return_reply(ledger.give_back(holder).await, user_name)
}

fn return_reply(
    result: Result<ReturnOutcome, LedgerError>,
    user_name: &str,
) -> Result<CommandReply, StoreError> {
    match result {
        Ok(ReturnOutcome::Returned(record)) => Ok(CommandReply {
            message: format!("You returned {}.", record.name),
            announcement: Some(format!("{user_name} returned {}!", record.name)),
        }),
        Ok(ReturnOutcome::OutOfSync(record)) => Ok(CommandReply::quiet(format!(
            "{} was already released outside the bot, so there was nothing to return. \
             Please borrow again if you still need an account.",
            record.name
        ))),
        Err(LedgerError::NothingBorrowed) => Ok(CommandReply::quiet(
            "You have no account to return.".to_string(),
        )),
        Err(LedgerError::Store(err)) => Err(err),
        Err(err) => {
            tracing::error!(error = %err, "unexpected ledger refusal during return");
            Ok(CommandReply::quiet(
                "Something went wrong returning the account. Please try again.".to_string(),
            ))
        }
    }
}

/// Administrative reset of another user's loan state. Unconditional and
/// idempotent; the caller's permission was already checked.
pub async fn reset_borrowed(ledger: &Ledger, target: HolderId) -> CommandReply {
    match ledger.reset(target).await {
        Some(record) => CommandReply::quiet(format!(
            "Cleared the loan held by <@{target}> ({}).",
            record.name
        )),
        None => CommandReply::quiet(format!("<@{target}> holds no account; nothing to clear.")),
    }
}

/// How a purge went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub bulk_deleted: usize,
    pub individually_deleted: usize,
}

impl PurgeReport {
    pub fn summary(&self) -> String {
        format!(
            "Deleted {} messages ({} batched, {} individually).",
            self.bulk_deleted + self.individually_deleted,
            self.bulk_deleted,
            self.individually_deleted
        )
    }
}

/// Split message ids on the platform's bulk-delete age window: ids young
/// enough for batched deletion first, older ids second.
pub fn split_by_age(
    messages: &[ChannelMessage],
    now: DateTime<Utc>,
) -> (Vec<String>, Vec<String>) {
    let cutoff = now - Duration::days(BULK_DELETE_WINDOW_DAYS);
    let mut young = Vec::new();
    let mut old = Vec::new();

    for message in messages {
        if message.timestamp > cutoff {
            young.push(message.id.clone());
        } else {
            old.push(message.id.clone());
        }
    }

    (young, old)
}

/// Bulk message cleanup over the newest page of channel history. One
/// invocation covers at most 100 messages (the platform's page size); an
/// admin reruns the command for a deeper backlog. Recent messages go
/// through batched deletion in chunks the platform accepts; older ones are
/// deleted individually with a fixed pacing delay. The split exists purely
/// to satisfy the platform's batch-size and age limits.
pub async fn purge_messages(
    rest: &DiscordRest,
    channel_id: &str,
) -> Result<PurgeReport, ChatError> {
    let messages = rest.list_messages(channel_id, 100).await?;
    let (young, old) = split_by_age(&messages, Utc::now());

    let mut report = PurgeReport {
        bulk_deleted: 0,
        individually_deleted: 0,
    };

    for chunk in young.chunks(MAX_BULK_CHUNK) {
        if chunk.len() == 1 {
            // The batched endpoint refuses single-message calls.
            rest.delete_message(channel_id, &chunk[0]).await?;
            report.individually_deleted += 1;
        } else {
            rest.bulk_delete(channel_id, chunk).await?;
            report.bulk_deleted += chunk.len();
        }
    }

    for id in &old {
        rest.delete_message(channel_id, id).await?;
        report.individually_deleted += 1;
        sleep(PURGE_PACING).await;
    }

    tracing::info!(
        channel = channel_id,
        bulk = report.bulk_deleted,
        individual = report.individually_deleted,
        "channel purge finished"
    );
    Ok(report)
}
