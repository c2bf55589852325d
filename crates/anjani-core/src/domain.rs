/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). Channels use negative ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatId(pub i64);

/// Where a sent message landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: i32,
}
