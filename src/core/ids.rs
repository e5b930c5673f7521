use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;

const ID_BYTES: usize = 16;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh URL-safe identifier for sessions and messages.
pub fn new_id() -> String {
    random_urlsafe(ID_BYTES)
}

pub fn random_urlsafe(bytes_len: usize) -> String {
    let bytes = best_effort_random_bytes(bytes_len);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn best_effort_random_bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0_u8; len];
    if let Err(err) = getrandom::fill(&mut out) {
        tracing::warn!(error = %err, "OS randomness unavailable; using clock-based ids");
        return fallback_bytes(len);
    }
    out
}

/// Unique within a run, not unpredictable.
fn fallback_bytes(len: usize) -> Vec<u8> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let seed = [counter.to_le_bytes().as_slice(), nanos.to_le_bytes().as_slice()].concat();
    seed.iter().copied().cycle().take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_urlsafe_without_padding() {
        let id = new_id();
        assert_eq!(id.len(), 22);
        assert!(id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }

    #[test]
    fn ids_do_not_repeat() {
        let ids: HashSet<String> = (0..500).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn fallback_ids_do_not_repeat() {
        let first = fallback_bytes(ID_BYTES);
        let second = fallback_bytes(ID_BYTES);
        assert_eq!(first.len(), ID_BYTES);
        assert_ne!(first, second);
    }
}
