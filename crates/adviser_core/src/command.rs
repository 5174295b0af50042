use url::Url;

const START: &str = "/start";
const HELP: &str = "/help";
const RANDOM: &str = "/rnd";

/// A user request decoded from the text of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Hand out one saved page and mark it as read.
    Random,
    /// Save the given URL for the sender.
    Save(String),
    Unknown(String),
}

impl Command {
    /// Decodes message text. Surrounding whitespace is ignored; the URL of a
    /// `Save` is kept exactly as typed otherwise.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if is_page_url(text) {
            return Command::Save(text.to_string());
        }
        match text {
            START => Command::Start,
            HELP => Command::Help,
            RANDOM => Command::Random,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// True when `text` is an absolute URL with a host, i.e. something worth saving.
pub fn is_page_url(text: &str) -> bool {
    match Url::parse(text) {
        Ok(url) => url.host_str().is_some_and(|host| !host.is_empty()),
        Err(_) => false,
    }
}
