use std::fmt;

/// A saved link. The literal `(url, owner)` pair is its identity; nothing is
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Page {
    pub url: String,
    pub owner: String,
}

impl Page {
    pub fn new(url: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            owner: owner.into(),
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (owner {})", self.url, self.owner)
    }
}
