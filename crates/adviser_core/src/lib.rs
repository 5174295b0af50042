//! Read adviser core: pure data types and command interpretation.
mod command;
mod event;
mod page;
mod reply;

pub use command::{is_page_url, Command};
pub use event::{Event, EventKind};
pub use page::Page;
pub use reply::Reply;
