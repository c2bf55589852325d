use crate::domain::UserId;

/// How the messaging service should parse message text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// The transport's richest markup. On the Bot API this is HTML, which covers the
    /// formatting both Markdown and HTML senders rely on.
    #[default]
    Default,
    Markdown,
    Html,
    /// Send text verbatim, no style parsing.
    Disabled,
}

/// Inline keyboard (buttons attached to a message).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }
}

/// Additional interface options sent with a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyMarkup {
    InlineKeyboard(InlineKeyboard),
    /// Custom reply keyboard; each inner vec is a row of button labels.
    ReplyKeyboard(Vec<Vec<String>>),
    RemoveKeyboard,
    ForceReply,
}

/// Options for an outgoing text message. `None` means "not set, use the service default".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: ParseMode,
    pub disable_web_page_preview: Option<bool>,
    pub disable_notification: Option<bool>,
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendOptions {
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn disable_web_page_preview(mut self, v: bool) -> Self {
        self.disable_web_page_preview = Some(v);
        self
    }

    pub fn disable_notification(mut self, v: bool) -> Self {
        self.disable_notification = Some(v);
        self
    }

    pub fn reply_markup(mut self, markup: ReplyMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

/// The bot's own account as reported by the messaging service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelfUser {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

/// Client session storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    /// Nothing persisted; the session lives as long as the process.
    InMemory,
}
