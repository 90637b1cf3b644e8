//! Shared-secret verification for inbound requests.

use subtle::ConstantTimeEq;

use crate::domain::error::DomainError;

/// Checks a request-supplied secret against the configured one.
///
/// Comparison is constant-time per round. When it fails the candidate is
/// query-unescaped once and retried, so secrets that went through one or more
/// extra rounds of percent-encoding are still accepted. The loop ends as soon
/// as unescaping no longer changes the value.
///
/// An empty configured secret never matches.
pub fn verify_secret(expected: &str, got: &str) -> Result<(), DomainError> {
    if expected.is_empty() {
        return Err(DomainError::secret_mismatch());
    }

    let mut candidate = got.to_owned();
    loop {
        if bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())) {
            return Ok(());
        }

        match query_unescape(&candidate) {
            Some(unescaped) if unescaped != candidate => candidate = unescaped,
            _ => return Err(DomainError::secret_mismatch()),
        }
    }
}

/// Query-string unescaping: `+` becomes a space, `%XX` is decoded.
/// Returns `None` for malformed escapes or non UTF-8 results.
fn query_unescape(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let well_formed = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| {
            bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        });
    if !well_formed {
        return None;
    }

    let plus_decoded = s.replace('+', " ");
    urlencoding::decode(&plus_decoded).ok().map(|c| c.into_owned())
}
