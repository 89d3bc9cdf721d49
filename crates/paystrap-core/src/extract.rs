//! Field extraction from platform CLI output
//!
//! The platform CLI prints a mix of JSON and free text. Each credential field
//! has its own lexical shape, so each gets its own rule. A rule that does not
//! match yields `None`; deciding whether that is fatal happens later.

use regex::Regex;
use std::sync::LazyLock;

static ACCOUNT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""id"\s*:\s*"([^"]*)""#).expect("valid regex"));

// `\b` keeps the prefix anchored to a token start: `xpk_live` or `_sk_test`
// never match.
static PUBLISHABLE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(pk_[A-Za-z0-9_]+)").expect("valid regex"));

static SECRET_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(sk_[A-Za-z0-9_]+)").expect("valid regex"));

// `stripe config --list` prints live keys before test keys, and the live
// secret is usually an `rk_live_` restricted key. Test-mode tokens win so the
// publishable and secret key always come from the same mode.
static TEST_PUBLISHABLE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(pk_test_[A-Za-z0-9_]+)").expect("valid regex"));

static TEST_SECRET_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(sk_test_[A-Za-z0-9_]+)").expect("valid regex"));

static WEBHOOK_SECRET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(whsec_[A-Za-z0-9_]+)").expect("valid regex"));

/// Credential fields the pipeline collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    AccountId,
    PublishableKey,
    SecretKey,
    WebhookSecret,
}

impl Field {
    /// Fields that must be present for a run to verify, in check order
    pub const REQUIRED: [Field; 4] = [
        Field::AccountId,
        Field::PublishableKey,
        Field::SecretKey,
        Field::WebhookSecret,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::AccountId => "account id",
            Field::PublishableKey => "publishable key",
            Field::SecretKey => "secret key",
            Field::WebhookSecret => "webhook secret",
        }
    }

    /// Whether the value must be kept out of logs
    pub fn is_secret(&self) -> bool {
        matches!(self, Field::SecretKey | Field::WebhookSecret)
    }

    /// Test-mode rule tried before the general one
    fn preferred_pattern(&self) -> Option<&'static Regex> {
        match self {
            Field::PublishableKey => Some(&*TEST_PUBLISHABLE_KEY),
            Field::SecretKey => Some(&*TEST_SECRET_KEY),
            Field::AccountId | Field::WebhookSecret => None,
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Field::AccountId => &*ACCOUNT_ID,
            Field::PublishableKey => &*PUBLISHABLE_KEY,
            Field::SecretKey => &*SECRET_KEY,
            Field::WebhookSecret => &*WEBHOOK_SECRET,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pull the first value for `field` out of `text`
///
/// API keys prefer test-mode tokens and fall back to the first token of
/// either mode.
pub fn extract(text: &str, field: Field) -> Option<String> {
    field
        .preferred_pattern()
        .and_then(|pattern| first_capture(pattern, text))
        .or_else(|| first_capture(field.pattern(), text))
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

static ACCOUNT_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(charges_enabled|payouts_enabled|details_submitted)"\s*:\s*(true|false)"#)
        .expect("valid regex")
});

/// Onboarding flags reported by the account endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountStatus {
    pub charges_enabled: Option<bool>,
    pub payouts_enabled: Option<bool>,
    pub details_submitted: Option<bool>,
}

impl AccountStatus {
    /// Read the flags from account-info output. Flags that are absent stay
    /// `None`; the first occurrence of each wins.
    pub fn parse(text: &str) -> Self {
        let mut status = Self::default();
        for caps in ACCOUNT_FLAG.captures_iter(text) {
            let value = &caps[2] == "true";
            let slot = match &caps[1] {
                "charges_enabled" => &mut status.charges_enabled,
                "payouts_enabled" => &mut status.payouts_enabled,
                _ => &mut status.details_submitted,
            };
            slot.get_or_insert(value);
        }
        status
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Scan `lines` in order and return the first value for `field`
pub fn extract_from_lines<'a, I>(lines: I, field: Field) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().find_map(|line| extract(line, field))
}
