//! Shared-secret verification for inbound worker callbacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation label for callback secret tags.
const CALLBACK_TAG_CONTEXT: &[u8] = b"seo-writer/worker-callback";

fn tag(secret: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(CALLBACK_TAG_CONTEXT);
    mac
}

/// Compare a presented credential against the configured secret.
///
/// Both values are reduced to fixed-length HMAC tags which are then compared
/// in constant time, so neither length nor content leaks through timing.
/// An empty configured secret never verifies.
pub fn verify_shared_secret(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let expected_tag = tag(expected).finalize().into_bytes();
    tag(provided).verify_slice(&expected_tag).is_ok()
}
