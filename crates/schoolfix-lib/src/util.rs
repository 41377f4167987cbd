//! ID generation and timestamp utilities.

use chrono::{DateTime, SubsecRound, Utc};
use sha2::{Digest, Sha256};

/// Prefix shared by every issue ID.
pub const ID_PREFIX: &str = "ISS";

/// Length of the random-looking suffix after the millisecond stamp.
const SUFFIX_LEN: usize = 5;

/// Current time at millisecond precision, the resolution stored timestamps carry.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

// ============================================================================
// ID Generation
// ============================================================================

/// Generate a unique issue ID: `ISS-<unix millis>-<5 base36 chars>`.
///
/// The suffix is derived from a SHA256 of the seed fields and a nonce.
/// The `exists` closure checks for collisions; the nonce increases until
/// an unused ID is found.
pub fn generate_id<F>(title: &str, description: &str, created_at: DateTime<Utc>, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let millis = created_at.timestamp_millis();
    let mut nonce = 0u32;
    loop {
        let seed = generate_id_seed(title, description, created_at, nonce);
        let id = format!("{ID_PREFIX}-{millis}-{}", compute_id_hash(&seed, SUFFIX_LEN));
        if !exists(&id) {
            return id;
        }
        nonce = nonce.wrapping_add(1);
    }
}

/// True when `id` has the `ISS-<digits>[-<suffix>]` shape.
///
/// The suffix-less form is what older local collections contain.
#[must_use]
pub fn is_valid_id_format(id: &str) -> bool {
    let mut parts = id.splitn(3, '-');
    let (Some(prefix), Some(stamp)) = (parts.next(), parts.next()) else {
        return false;
    };
    let suffix_ok = parts
        .next()
        .is_none_or(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    prefix == ID_PREFIX
        && !stamp.is_empty()
        && stamp.chars().all(|c| c.is_ascii_digit())
        && suffix_ok
}

fn generate_id_seed(title: &str, description: &str, created_at: DateTime<Utc>, nonce: u32) -> String {
    format!(
        "{}|{}|{}|{}",
        title,
        description,
        created_at.timestamp_nanos_opt().unwrap_or(0),
        nonce
    )
}

fn compute_id_hash(input: &str, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();

    let mut num = 0u64;
    for &byte in result.iter().take(8) {
        num = (num << 8) | u64::from(byte);
    }

    let mut encoded = base36_encode(num);
    if encoded.len() < length {
        encoded = format!("{encoded:0>length$}");
    }
    encoded.chars().take(length).collect()
}

fn base36_encode(mut num: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if num == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while num > 0 {
        chars.push(ALPHABET[(num % 36) as usize] as char);
        num /= 36;
    }
    chars.into_iter().rev().collect()
}
