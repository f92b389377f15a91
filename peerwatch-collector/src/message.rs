//! Announcement text.
//!
//! Layout, one item per line:
//! ```text
//! La IP ({address}) de {institution} descargó:
//! {content}
//!  {occurred_at}
//!  (Esto fue descargado en el pasado)      <- stale repeats only
//!  {activity link}
//! ```
//! Length is counted in Unicode scalar values. Only the content line is ever
//! shortened.

use std::net::Ipv4Addr;

use peerwatch_ledger::format_local;

use crate::collector::ActivityEvent;

pub const REPEAT_QUALIFIER: &str = " (Esto fue descargado en el pasado)";
pub const ELLIPSIS: &str = "...";
pub const DEFAULT_ACTIVITY_LINK_BASE: &str = "https://iknowwhatyoudownload.com/en/peer/?ip=";

/// Limits and links used to compose messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSettings {
    pub max_chars: usize,
    /// Content names are cut to this many characters (before the ellipsis) when the
    /// whole message is too long.
    pub content_max_chars: usize,
    /// The address is appended to this to build the activity link.
    pub activity_link_base: String,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            max_chars: 280,
            content_max_chars: 100,
            activity_link_base: DEFAULT_ACTIVITY_LINK_BASE.to_string(),
        }
    }
}

impl MessageSettings {
    pub fn activity_link(&self, address: Ipv4Addr) -> String {
        format!("{}{}", self.activity_link_base, address)
    }
}

/// A rendered message and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub text: String,
    pub truncated: bool,
    /// False when the message is still too long after truncation.
    pub within_limit: bool,
}

fn header(event: &ActivityEvent) -> String {
    match event.institution.as_deref() {
        Some(institution) => format!("La IP ({}) de {} descargó:", event.address, institution),
        None => format!("La IP {} descargó:", event.address),
    }
}

fn render(event: &ActivityEvent, content: &str, repeat: bool, link: &str) -> String {
    let qualifier = if repeat {
        format!("\n{}", REPEAT_QUALIFIER)
    } else {
        String::new()
    };
    format!(
        "{}\n{}\n {}{}\n {}",
        header(event),
        content,
        format_local(&event.occurred_at),
        qualifier,
        link
    )
}

/// Cut `content` to `max` characters plus an ellipsis, or return it unchanged if it
/// already fits.
pub fn truncate_content(content: &str, max: usize) -> Option<String> {
    match content.char_indices().nth(max) {
        Some((cut, _)) => Some(format!("{}{}", &content[..cut], ELLIPSIS)),
        None => None,
    }
}

/// Compose the announcement for an event.
///
/// An over-long message first has its content cut to `content_max_chars`. If the
/// other lines still leave less room than that, the content is cut to exactly the
/// room left. Only when the other lines alone exceed the limit is the message
/// returned over-long, flagged by `within_limit`.
pub fn compose_message(event: &ActivityEvent, repeat: bool, settings: &MessageSettings) -> ComposedMessage {
    let link = settings.activity_link(event.address);
    let fits = |text: &str| text.chars().count() <= settings.max_chars;

    let text = render(event, &event.content, repeat, &link);
    if fits(&text) {
        return ComposedMessage {
            text,
            truncated: false,
            within_limit: true,
        };
    }

    let (text, truncated) = match truncate_content(&event.content, settings.content_max_chars) {
        Some(short) => (render(event, &short, repeat, &link), true),
        None => (text, false),
    };
    if fits(&text) {
        return ComposedMessage {
            text,
            truncated,
            within_limit: true,
        };
    }

    // room the header, date, qualifier and link leave for the content line
    let overhead = render(event, "", repeat, &link).chars().count() + ELLIPSIS.chars().count();
    let shorter = settings
        .max_chars
        .checked_sub(overhead)
        .filter(|room| *room > 0)
        .and_then(|room| truncate_content(&event.content, room));
    match shorter {
        Some(short) => ComposedMessage {
            text: render(event, &short, repeat, &link),
            truncated: true,
            within_limit: true,
        },
        None => ComposedMessage {
            text,
            truncated,
            within_limit: false,
        },
    }
}

/// Public link to an announcement.
pub fn permalink(base: &str, reference: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), reference)
}
