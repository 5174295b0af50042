/// What an inbound event carries, as far as the processor is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum EventKind {
    /// Anything the channel delivered that is not a text message.
    #[default]
    Unknown,
    /// A text message from a user.
    Message,
}

/// One unit of inbound work pulled from the message channel.
///
/// `meta` is channel-specific context needed to reply. It is created by the
/// fetch side and only read by the processing side; the consumer moves it
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<M> {
    pub kind: EventKind,
    pub text: String,
    pub meta: Option<M>,
}

impl<M> Event<M> {
    pub fn message(text: impl Into<String>, meta: M) -> Self {
        Self {
            kind: EventKind::Message,
            text: text.into(),
            meta: Some(meta),
        }
    }

    pub fn unknown() -> Self {
        Self {
            kind: EventKind::Unknown,
            text: String::new(),
            meta: None,
        }
    }
}
