const HELP_TEXT: &str = "I can keep a reading list of pages for you and offer one back when you have time to read.

To save a page, just send me a link to it.

To get a random page from your list, send me /rnd.
Careful: once I send you a page, it is removed from your list.";

/// Outgoing messages the bot sends back to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Hello,
    Help,
    Saved,
    AlreadyExists,
    NoSavedPages,
    UnknownCommand,
    /// A page handed out by `/rnd`; the text is the bare URL.
    Page(String),
}

impl Reply {
    pub fn text(&self) -> String {
        match self {
            Reply::Hello => format!("Hi there! \u{1F47E}\n\n{HELP_TEXT}"),
            Reply::Help => HELP_TEXT.to_string(),
            Reply::Saved => "Saved! \u{1F44C}".to_string(),
            Reply::AlreadyExists => "This page is already in your list \u{1F917}".to_string(),
            Reply::NoSavedPages => "You have no saved pages yet \u{1F648}".to_string(),
            Reply::UnknownCommand => "Unknown command \u{1F914}".to_string(),
            Reply::Page(url) => url.clone(),
        }
    }
}
