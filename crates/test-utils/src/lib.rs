//! Shared test fixtures for the workspace.
//!
//! Fixtures are raw text so that every crate parses them through its own public types.

/// A wallet address in `0x` hex form.
pub const WALLET: &str = "0x00000000219ab540356cBB839Cbe05303d7705Fa";

/// [`WALLET`] as a canonical decimal field element.
pub const WALLET_DECIMAL: &str = "44667813780391404145283579356374304250";

/// Target URL of the merged pull request in [`merged_notification`].
pub const MERGED_TARGET: &str = "https://github.com/acme/widgets/pull/42#event-1234567";

/// Number of limbs in the fixture RSA key and signature.
pub const LIMBS: u64 = 18;

const DKIM_HEADER: &str = "from:octocat <notifications@github.com>\r\n\
    subject:Re: [acme/widgets] Add gears (PR #42)\r\n\
    dkim-signature:v=1; a=rsa-sha256; c=relaxed/relaxed; d=github.com; s=pf2023; \
    bh=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=; b=";

const DKIM_BODY: &str = "Merged #42 into main.\r\n";

/// A GitHub pull request notification email whose JSON-LD block points at `target`.
#[must_use]
pub fn notification_email(target: &str) -> String {
    format!(
        "From: octocat <notifications@github.com>\r\n\
         To: acme/widgets <widgets@noreply.github.com>\r\n\
         Cc: dev@example.com, Author <author@noreply.github.com>\r\n\
         Subject: Re: [acme/widgets] Add gears (PR #42)\r\n\
         \r\n\
         Merged #42 into main.\r\n\
         <script type=\"application/ld+json\">{{\"target\": \"{target}\"}}</script>\r\n"
    )
}

/// Notification for pull request 42 of `acme/widgets`.
#[must_use]
pub fn merged_notification() -> String {
    notification_email(MERGED_TARGET)
}

/// A notification email without a target marker.
#[must_use]
pub fn notification_without_target() -> String {
    "From: octocat <notifications@github.com>\r\n\
     Cc: dev@example.com, Author <author@noreply.github.com>\r\n\
     Subject: Re: [acme/widgets] Add gears (PR #42)\r\n\
     \r\n\
     Merged #42 into main.\r\n"
        .to_owned()
}

/// DKIM witness JSON as emitted by the email-signature helper.
///
/// Different seeds give different signatures, and so different nullifiers.
#[must_use]
pub fn dkim_witness_json(signature_seed: u64) -> String {
    let body_hash_index = DKIM_HEADER
        .find("bh=")
        .map_or(0, |index| index.saturating_add(3));
    let limbs = |base: u64| {
        (0..LIMBS)
            .map(|i| quoted(base.wrapping_add(i)))
            .collect::<Vec<_>>()
            .join(",")
    };

    format!(
        r#"{{
  "header": {{ "storage": [{header}], "len": "{header_len}" }},
  "body": {{ "storage": [{body}], "len": "{body_len}" }},
  "body_hash_index": "{body_hash_index}",
  "pubkey": {{ "modulus": [{modulus}], "redc": [{redc}] }},
  "signature": [{signature}]
}}"#,
        header = bytes(DKIM_HEADER),
        header_len = DKIM_HEADER.len(),
        body = bytes(DKIM_BODY),
        body_len = DKIM_BODY.len(),
        modulus = limbs(1_000_003),
        redc = limbs(2_000_003),
        signature = limbs(signature_seed.wrapping_mul(1_000_000_007)),
    )
}

fn bytes(text: &str) -> String {
    text.bytes()
        .map(|b| quoted(u64::from(b)))
        .collect::<Vec<_>>()
        .join(",")
}

fn quoted(value: u64) -> String {
    format!("\"{value}\"")
}
