//! Identity fields of a GitHub pull request notification email.
//!
//! Extraction is a small tokenizer over named boundary markers rather than a free-form parser.
//! Nothing is ever guessed: a field whose markers are not found is left empty, and the missing
//! boundary is reported as a [`Miss`] by [`diagnose`].
//!
//! Boundaries never span a line break, and the first occurrence of an end marker wins.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Opens the notification target URL.
pub const TARGET_START: &str = "\"target\": \"";
/// Closes the notification target URL.
pub const TARGET_END: &str = "#event-";
/// Looser closing marker, used when [`TARGET_END`] does not follow the target on its line.
pub const TARGET_END_LOOSE: &str = "event-";
/// Precedes the repository path in the target URL.
pub const GITHUB_HOST: &str = "github.com/";
/// Follows the repository path in the target URL.
pub const PULL_SEGMENT: &str = "/pull/";
/// Opens the carbon-copy header.
pub const CC_PREFIX: &str = "Cc: ";
/// Closes the first carbon-copy address.
pub const CC_TERMINATOR: &str = ",";

/// Identity fields extracted from a raw notification email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EmailFields {
    /// Repository in `owner/repo` form.
    pub repo_name: String,
    /// Pull request number, ASCII digits only.
    pub pr_number: String,
    /// First address of the `Cc:` header.
    pub cc_email: String,
    /// Notification target URL, up to the event anchor.
    pub raw_target_url: String,
}

/// A boundary marker that was not found while extracting [`EmailFields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Miss {
    /// No [`TARGET_START`] marker in the email.
    TargetStart,
    /// No event marker after any [`TARGET_START`] on the same line.
    TargetEnd,
    /// No [`GITHUB_HOST`] in the target URL.
    GithubHost,
    /// No [`PULL_SEGMENT`] after the host in the target URL.
    PullSegment,
    /// No digit immediately after [`PULL_SEGMENT`].
    PrNumber,
    /// No [`CC_PREFIX`] header in the email.
    CcPrefix,
    /// No [`CC_TERMINATOR`] after any [`CC_PREFIX`] on the same line.
    CcTerminator,
}

impl Miss {
    /// The field left empty by this miss.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::TargetStart | Self::TargetEnd => "raw_target_url",
            Self::GithubHost | Self::PullSegment => "repo_name",
            Self::PrNumber => "pr_number",
            Self::CcPrefix | Self::CcTerminator => "cc_email",
        }
    }
}

/// Result of running the tokenizer over an email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Extraction {
    /// Extracted fields; missing ones are empty.
    pub fields: EmailFields,
    /// Every boundary that was not found, in extraction order.
    pub misses: Vec<Miss>,
}

impl Extraction {
    /// Tokenize `raw_email`.
    #[must_use]
    pub fn run(raw_email: &str) -> Self {
        let mut misses = Vec::new();
        let mut fields = EmailFields::default();

        match target_url(raw_email) {
            Ok(url) => {
                fields.raw_target_url = url.to_owned();

                match bounded(url, GITHUB_HOST, PULL_SEGMENT) {
                    Ok(repo) => fields.repo_name = repo.to_owned(),
                    Err(Boundary::Start) => misses.push(Miss::GithubHost),
                    Err(Boundary::End) => misses.push(Miss::PullSegment),
                }

                match pr_number(url) {
                    Some(number) => fields.pr_number = number.to_owned(),
                    None => misses.push(Miss::PrNumber),
                }
            }
            Err(miss) => {
                // Every URL-derived field is missing with the URL.
                misses.extend([miss, Miss::GithubHost, Miss::PrNumber]);
            }
        }

        match bounded(raw_email, CC_PREFIX, CC_TERMINATOR) {
            Ok(cc) => fields.cc_email = cc.to_owned(),
            Err(Boundary::Start) => misses.push(Miss::CcPrefix),
            Err(Boundary::End) => misses.push(Miss::CcTerminator),
        }

        Self { fields, misses }
    }
}

/// Extract the identity fields of a raw notification email. Never fails.
#[must_use]
pub fn extract(raw_email: &str) -> EmailFields {
    Extraction::run(raw_email).fields
}

/// List the boundaries that could not be found in a raw notification email.
#[must_use]
pub fn diagnose(raw_email: &str) -> Vec<Miss> {
    Extraction::run(raw_email).misses
}

/// Which side of a bounded span was not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Start,
    End,
}

/// The shortest span between an occurrence of `start` and the next `end` on the same line.
///
/// Occurrences of `start` are tried in order; the first one followed by `end` wins.
fn bounded<'a>(text: &'a str, start: &str, end: &str) -> Result<&'a str, Boundary> {
    let mut missing = Boundary::Start;
    for (index, _) in text.match_indices(start) {
        missing = Boundary::End;
        let rest = text
            .get(index.saturating_add(start.len())..)
            .unwrap_or_default();
        if let Some((inner, _)) = first_line(rest).split_once(end) {
            return Ok(inner);
        }
    }
    Err(missing)
}

fn first_line(text: &str) -> &str {
    text.split(['\r', '\n']).next().unwrap_or_default()
}

fn target_url(raw_email: &str) -> Result<&str, Miss> {
    bounded(raw_email, TARGET_START, TARGET_END)
        .or_else(|_| bounded(raw_email, TARGET_START, TARGET_END_LOOSE))
        .map_err(|boundary| match boundary {
            Boundary::Start => Miss::TargetStart,
            Boundary::End => Miss::TargetEnd,
        })
}

/// The leading digit run after [`PULL_SEGMENT`]. Any non-digit ends it.
fn pr_number(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once(PULL_SEGMENT)?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = rest.get(..end).unwrap_or_default();
    (!digits.is_empty()).then_some(digits)
}
