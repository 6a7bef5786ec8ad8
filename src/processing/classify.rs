//! Token classification.
//!
//! Rules run in a fixed order and the first match wins:
//!
//! 1. Reference: the lower-cased token contains a known host ([`LONG_FORM_HOSTS`] or
//!    [`SHORT_LINK_HOSTS`]). The token is kept verbatim.
//! 2. Playlist id: starts with one of [`PLAYLIST_PREFIXES`], or equals [`WATCH_LATER`].
//! 3. Video id: see [`is_video_id`].
//! 4. Anything else is [`TokenKind::Unrecognized`].
//!
//! Row-mode (tabular) tokens use [`classify_row_token`] instead, which accepts only
//! long-form host references and rejects everything else.

use crate::types::{ClassifiedToken, Token, TokenKind};

/// Host fragments of full channel/video pages.
pub const LONG_FORM_HOSTS: &[&str] = &["youtube.com"];

/// Host fragments of short links.
pub const SHORT_LINK_HOSTS: &[&str] = &["youtu.be"];

/// Recognized two-letter playlist prefixes (set version 1).
pub const PLAYLIST_PREFIXES: &[&str] = &["PL", "UU", "LL", "FL", "RD", "OL", "UL", "PU"];

/// The watch-later pseudo-playlist.
pub const WATCH_LATER: &str = "WL";

/// Length of a video identifier.
pub const VIDEO_ID_LEN: usize = 11;

// An id encodes 64 bits in 11 base64url digits, so the last digit carries only 4 bits.
const VIDEO_ID_LAST_CHARS: &str = "AEIMQUYcgkosw048";

/// Classify a free-scan token.
pub fn classify(token: &str) -> TokenKind {
    if is_reference(token) {
        TokenKind::Reference
    } else if is_playlist_id(token) {
        TokenKind::PlaylistId
    } else if is_video_id(token) {
        TokenKind::VideoId
    } else {
        TokenKind::Unrecognized
    }
}

/// Classify a row-mode token: long-form references only.
pub fn classify_row_token(token: &str) -> TokenKind {
    if contains_host(token, LONG_FORM_HOSTS) {
        TokenKind::Reference
    } else {
        TokenKind::Unrecognized
    }
}

/// Pair a token with its free-scan kind.
pub fn classify_token(token: Token) -> ClassifiedToken {
    let kind = classify(token.as_str());
    ClassifiedToken { value: token, kind }
}

/// Whether the token points at any recognized host.
pub fn is_reference(token: &str) -> bool {
    contains_host(token, LONG_FORM_HOSTS) || contains_host(token, SHORT_LINK_HOSTS)
}

/// Whether the token has a playlist prefix or is the watch-later sentinel.
pub fn is_playlist_id(token: &str) -> bool {
    token == WATCH_LATER
        || (token.len() >= 2 && PLAYLIST_PREFIXES.iter().any(|p| token.starts_with(p)))
}

/// Whether the token is an 11-character `[A-Za-z0-9_-]` video identifier.
///
/// The final character must also be a valid last digit of a 64-bit base64url value.
pub fn is_video_id(token: &str) -> bool {
    token.len() == VIDEO_ID_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        && token
            .chars()
            .last()
            .is_some_and(|c| VIDEO_ID_LAST_CHARS.contains(c))
}

fn contains_host(token: &str, hosts: &[&str]) -> bool {
    let lower = token.to_lowercase();
    hosts.iter().any(|h| lower.contains(h))
}
