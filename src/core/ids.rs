//! Identifier generation for catalog records and cost rows.
//!
//! Ids look like `prd_k3j9x0_lz4q8m2a`: a type prefix, six random base-36
//! characters and a base-36 millisecond timestamp. The timestamp part is bumped
//! so it never repeats within the process, which makes ids unique even when two
//! are generated in the same millisecond with the same random part.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 6;

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// What an id is generated for; selects the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Products (`prd`)
    Product,
    /// Ingredients (`ing`)
    Ingredient,
    /// Calculation-scoped additional costs (`cost`)
    Cost,
}

impl IdKind {
    /// Prefix placed before the first underscore.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Product => "prd",
            Self::Ingredient => "ing",
            Self::Cost => "cost",
        }
    }
}

/// Generates a new process-unique id for `kind`.
#[must_use]
pub fn generate_id(kind: IdKind) -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..RANDOM_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect();

    format!("{}_{random}_{}", kind.prefix(), to_base36(next_stamp()))
}

/// Current time in milliseconds, strictly greater than any stamp handed out before.
fn next_stamp() -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        // value % 36 < 36, the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_id_shape() {
        let id = generate_id(IdKind::Product);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "prd");
        assert_eq!(parts[1].len(), RANDOM_LEN);
        assert!(parts[1].bytes().all(|b| BASE36.contains(&b)));

        assert!(generate_id(IdKind::Ingredient).starts_with("ing_"));
        assert!(generate_id(IdKind::Cost).starts_with("cost_"));
    }

    #[test]
    fn test_ids_are_unique_in_tight_loop() {
        let ids: HashSet<String> = (0..10_000)
            .map(|i| {
                let kind = match i % 3 {
                    0 => IdKind::Product,
                    1 => IdKind::Ingredient,
                    _ => IdKind::Cost,
                };
                generate_id(kind)
            })
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_stamps_are_strictly_increasing() {
        let first = next_stamp();
        let second = next_stamp();
        assert!(second > first);
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_295), "zz");
    }
}
