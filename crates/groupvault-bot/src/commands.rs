//! Plain-text command parsing.
//!
//! Commands are ordinary messages starting with `/`; no inline
//! keyboards or menus. `/command@BotName` forms are accepted so the
//! bot works in groups with privacy mode off.

use groupvault_core::GroupRecord;

/// Maximum number of stored trigger keywords per group.
pub const MAX_KEYWORDS: usize = 20;

/// A recognized bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Setup,
    Link,
    Verify,
    Unlink,
    Archive,
    Mode,
    AutoArchive,
    /// `/interval 6`; bare `/interval` prompts for a value.
    Interval(Option<String>),
    /// `/keywords a, b`; bare `/keywords` prompts for a list.
    Keywords(Option<String>),
    /// `/lang de`; bare `/lang` reports the current preference.
    Lang(Option<String>),
}

/// Parses a message text into a command.
///
/// Returns `None` for non-commands and unknown commands.
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let (head, tail) = match rest.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (rest, ""),
    };
    // Strip an @BotName suffix.
    let name = head.split('@').next().unwrap_or(head);
    let arg = if tail.is_empty() {
        None
    } else {
        Some(tail.to_string())
    };

    match name {
        "start" => Some(Command::Start),
        "setup" => Some(Command::Setup),
        "link" => Some(Command::Link),
        "verify" => Some(Command::Verify),
        "unlink" => Some(Command::Unlink),
        "archive" => Some(Command::Archive),
        "mode" => Some(Command::Mode),
        "autoarchive" => Some(Command::AutoArchive),
        "interval" => Some(Command::Interval(arg)),
        "keywords" => Some(Command::Keywords(arg)),
        "lang" => Some(Command::Lang(arg)),
        _ => None,
    }
}

/// Parses a notify-interval argument (hours, 1 through 24).
pub fn parse_interval(input: &str) -> Option<u8> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|hours| (1..=24).contains(hours))
}

/// Parses a comma-separated keyword list, trimmed and capped.
pub fn parse_keywords(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .take(MAX_KEYWORDS)
        .map(String::from)
        .collect()
}

/// Whether a reply-mode message triggers archiving of its reply.
///
/// Either the `/archive` command or an exact (case-insensitive) match
/// against the group's keyword list.
pub fn is_archive_trigger(text: &str, record: &GroupRecord) -> bool {
    matches!(parse(text), Some(Command::Archive)) || record.matches_keyword(text)
}
