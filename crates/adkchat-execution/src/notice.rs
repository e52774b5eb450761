/// Short user-facing notifications raised next to the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatNotice {
    Info(String),
    Success(String),
    Error(String),
}

impl ChatNotice {
    pub fn text(&self) -> &str {
        match self {
            ChatNotice::Info(text) | ChatNotice::Success(text) | ChatNotice::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ChatNotice::Error(_))
    }
}
