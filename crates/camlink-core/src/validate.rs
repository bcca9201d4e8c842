//! Input validation shared by the HTTP layer and the pairing flow.

use std::sync::LazyLock;

use regex::Regex;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("static regex is valid"));

static DEVICE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{16}$").expect("static regex is valid"));

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("static regex is valid")
});

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// 3-20 characters of letters, digits, and underscores.
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Device tokens are 16 lowercase hex characters.
pub fn is_valid_device_token(token: &str) -> bool {
    DEVICE_TOKEN_RE.is_match(token)
}

/// Entity ids are lowercase hyphenated UUIDs.
pub fn is_valid_id(id: &str) -> bool {
    ID_RE.is_match(id)
}

/// Trim and strip angle brackets from free-form text stored verbatim.
pub fn sanitize(input: &str) -> String {
    input.trim().chars().filter(|c| !matches!(c, '<' | '>')).collect()
}
