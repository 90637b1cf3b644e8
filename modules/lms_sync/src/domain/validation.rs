//! Syntactic checks for platform identifiers, matching the rules the
//! platform itself enforces.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::contract::model::CHANNEL_ROLES;

pub const ID_LENGTH: usize = 26;
pub const CHANNEL_NAME_MIN_LENGTH: usize = 1;
pub const CHANNEL_NAME_MAX_LENGTH: usize = 64;
pub const TEAM_NAME_MIN_LENGTH: usize = 2;
pub const TEAM_NAME_MAX_LENGTH: usize = 64;
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 22;

const RESTRICTED_USERNAMES: &[&str] = &["all", "channel", "matterbot", "system"];

static CHANNEL_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+([a-z\-_0-9]+|(__)?)[a-z0-9]*$").expect("valid channel regex")
});

static TEAM_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+([a-z\-0-9]+|(__)?)[a-z0-9]+$").expect("valid team regex")
});

static USERNAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9.\-_]+$").expect("valid username regex"));

/// Platform ids are 26 ASCII alphanumerics.
pub fn is_valid_id(value: &str) -> bool {
    value.len() == ID_LENGTH && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Accepts a bare lowercase address: no display name, exactly one `@`,
/// non-empty dot-atom local part and domain, no whitespace. Quoted local
/// parts and empty dot-separated segments (`a..b`, `.a`, `a.`) are rejected.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email != email.to_lowercase() {
        return false;
    }
    if email
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '(' | ')' | ',' | ';' | '"'))
    {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => is_dot_atom(local) && is_dot_atom(domain),
        _ => false,
    }
}

fn is_dot_atom(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            !part.is_empty()
                && !part
                    .chars()
                    .any(|c| c.is_control() || matches!(c, '[' | ']' | '\\' | ':'))
        })
}

pub fn is_valid_channel_identifier(name: &str) -> bool {
    (CHANNEL_NAME_MIN_LENGTH..=CHANNEL_NAME_MAX_LENGTH).contains(&name.len())
        && CHANNEL_IDENTIFIER.is_match(name)
}

pub fn is_valid_team_name(name: &str) -> bool {
    (TEAM_NAME_MIN_LENGTH..=TEAM_NAME_MAX_LENGTH).contains(&name.len()) && TEAM_NAME.is_match(name)
}

pub fn is_valid_username(name: &str) -> bool {
    (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && USERNAME_CHARS.is_match(name)
        && !RESTRICTED_USERNAMES.contains(&name)
}

/// A whitespace-separated list where every token is a known channel role.
pub fn is_valid_channel_roles(roles: &str) -> bool {
    let mut tokens = roles.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|r| CHANNEL_ROLES.contains(&r))
}
