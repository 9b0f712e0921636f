//! Identifier and filename generation, plus small request-value parsers.

use std::path::Path;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Local;
use rand::Rng;
use uuid::Uuid;

use hackshop_core::UserId;

/// A random UUIDv4 as 32 lowercase hex characters, no dashes.
#[must_use]
pub fn generate_uuid_hex() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Six random decimal digits from the thread CSPRNG.
#[must_use]
pub fn generate_mailcode() -> String {
    let mut rng = rand::rng();
    (0..6)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Process-wide order sequence, randomly seeded at first use.
static ORDER_SEQUENCE: LazyLock<AtomicU32> =
    LazyLock::new(|| AtomicU32::new(rand::rng().random_range(0..1_000_000)));

/// Human-facing order number.
///
/// `YYYYMMDDHHMMSS`, then the user id zero-padded to four digits, then a
/// six-digit sequence value. The sequence only repeats after a million
/// orders, so one user's orders within the same second never collide.
#[must_use]
pub fn generate_order_number(user_id: UserId) -> String {
    let suffix = ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!(
        "{}{:04}{suffix:06}",
        Local::now().format("%Y%m%d%H%M%S"),
        user_id.as_i32()
    )
}

/// A fresh file name that keeps the extension of `original`.
#[must_use]
pub fn unique_filename(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{}{ext}", generate_uuid_hex())
}

/// Parse a strictly positive integer, falling back to `default`.
#[must_use]
pub fn parse_positive_int(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Form checkbox semantics: `1`, `true`, `on` and `yes`, case-insensitive.
#[must_use]
pub fn is_truthy(raw: Option<&str>) -> bool {
    raw.is_some_and(|s| {
        matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_uuid_hex_shape() {
        let a = generate_uuid_hex();
        let b = generate_uuid_hex();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_mailcode_is_six_digits() {
        for _ in 0..50 {
            let code = generate_mailcode();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_order_numbers_distinct_for_same_user() {
        let user = UserId::new(7);
        let numbers: HashSet<String> = (0..5_000).map(|_| generate_order_number(user)).collect();
        assert_eq!(numbers.len(), 5_000);
    }

    #[test]
    fn test_order_numbers_distinct_across_threads() {
        let user = UserId::new(9);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(move || {
                    (0..500)
                        .map(|_| generate_order_number(user))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let numbers: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(numbers.len(), 8 * 500);
    }

    #[test]
    fn test_order_number_layout() {
        let number = generate_order_number(UserId::new(42));
        assert_eq!(number.len(), 14 + 4 + 6);
        assert_eq!(&number[14..18], "0042");
    }

    #[test]
    fn test_unique_filename_keeps_extension() {
        let name = unique_filename("avatar.png");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 32 + 4);
        assert_ne!(name, unique_filename("avatar.png"));
    }

    #[test]
    fn test_unique_filename_without_extension() {
        assert_eq!(unique_filename("README").len(), 32);
    }

    #[test]
    fn test_parse_positive_int() {
        assert_eq!(parse_positive_int(Some("3"), 1), 3);
        assert_eq!(parse_positive_int(Some("abc"), 1), 1);
        assert_eq!(parse_positive_int(Some("-4"), 1), 1);
        assert_eq!(parse_positive_int(Some("0"), 1), 1);
        assert_eq!(parse_positive_int(None, 5), 5);
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(Some("on")));
        assert!(is_truthy(Some("TRUE")));
        assert!(is_truthy(Some("1")));
        assert!(!is_truthy(Some("off")));
        assert!(!is_truthy(None));
    }
}
