use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::seq::SliceRandom;
use rand::Rng;

const ALPHANUMERIC_AND_SPACE: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z', ' ',
];

const LOWERCASE_AND_SPACE: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', ' ',
];

/// Random text for summaries, page titles and comments.
///
/// Draws from digits, ASCII letters and space, or from lowercase letters and
/// space when `only_letters` is set.
pub fn generate_random_string(length: usize, only_letters: bool) -> String {
    generate_random_string_with(&mut rand::thread_rng(), length, only_letters)
}

/// [`generate_random_string`] with a caller-supplied RNG.
pub fn generate_random_string_with<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    only_letters: bool,
) -> String {
    let alphabet = if only_letters {
        LOWERCASE_AND_SPACE
    } else {
        ALPHANUMERIC_AND_SPACE
    };
    (0..length)
        .filter_map(|_| alphabet.choose(rng).copied())
        .collect()
}

/// Current Unix time in whole seconds.
pub fn timestamp_int() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Parses a duration string in the format "30s", "10m", "5h", "3d".
///
/// Supported units:
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - `d` for days
pub fn parse_duration_string(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let Some(unit_char) = s.chars().last() else {
        return Err("Duration string cannot be empty".to_string());
    };
    let value_str = &s[..s.len() - unit_char.len_utf8()];

    let value = match u64::from_str(value_str) {
        Ok(v) => v,
        Err(_) => {
            return Err(format!(
                "Invalid numeric value in duration: '{}'",
                value_str
            ))
        }
    };

    let unit_secs: u64 = match unit_char {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => {
            return Err(format!(
                "Unknown duration unit: '{}'. Use 's', 'm', 'h', or 'd'.",
                unit_char
            ))
        }
    };

    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Duration too large: '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    mod random_string {
        use super::*;

        #[test]
        fn has_requested_length() {
            assert_eq!(generate_random_string(0, false).len(), 0);
            assert_eq!(generate_random_string(25, false).chars().count(), 25);
            assert_eq!(generate_random_string(25, true).chars().count(), 25);
        }

        #[test]
        fn only_letters_uses_lowercase_and_space() {
            let mut rng = StdRng::seed_from_u64(1);
            let s = generate_random_string_with(&mut rng, 500, true);
            assert!(s.chars().all(|c| c.is_ascii_lowercase() || c == ' '), "got: {}", s);
        }

        #[test]
        fn default_alphabet_is_alphanumeric_and_space() {
            let mut rng = StdRng::seed_from_u64(2);
            let s = generate_random_string_with(&mut rng, 500, false);
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric() || c == ' '));
            assert!(s.chars().any(|c| c.is_ascii_digit()));
            assert!(s.chars().any(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn timestamp_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(timestamp_int() > 1_577_836_800);
    }

    mod duration {
        use super::*;

        #[test]
        fn parse_seconds() {
            assert_eq!(
                parse_duration_string("30s").unwrap(),
                Duration::from_secs(30)
            );
        }

        #[test]
        fn parse_minutes() {
            assert_eq!(
                parse_duration_string("45m").unwrap(),
                Duration::from_secs(2700)
            );
        }

        #[test]
        fn parse_hours_and_days() {
            assert_eq!(
                parse_duration_string("2h").unwrap(),
                Duration::from_secs(7200)
            );
            assert_eq!(
                parse_duration_string("1d").unwrap(),
                Duration::from_secs(86400)
            );
        }

        #[test]
        fn trims_whitespace() {
            assert_eq!(
                parse_duration_string("  10m  ").unwrap(),
                Duration::from_secs(600)
            );
        }

        #[test]
        fn empty_string_errors() {
            let err = parse_duration_string("   ").unwrap_err();
            assert!(err.contains("empty"), "error was: {}", err);
        }

        #[test]
        fn unknown_suffix_errors() {
            let err = parse_duration_string("10x").unwrap_err();
            assert!(err.contains("Unknown duration unit"), "error was: {}", err);
        }

        #[test]
        fn no_suffix_errors() {
            let err = parse_duration_string("10").unwrap_err();
            assert!(err.contains("Unknown duration unit"), "error was: {}", err);
        }

        #[test]
        fn non_ascii_suffix_errors_without_panicking() {
            let err = parse_duration_string("10é").unwrap_err();
            assert!(err.contains("Unknown duration unit"), "error was: {}", err);
        }

        #[test]
        fn overflowing_duration_errors() {
            let err = parse_duration_string("300000000000000d").unwrap_err();
            assert!(err.contains("too large"), "error was: {}", err);
            assert!(parse_duration_string("9999999999999999h").is_err());
            assert_eq!(
                parse_duration_string(&format!("{}s", u64::MAX)).unwrap(),
                Duration::from_secs(u64::MAX)
            );
        }

        #[test]
        fn fractional_number_errors() {
            let err = parse_duration_string("5.5h").unwrap_err();
            assert!(err.contains("Invalid numeric"), "error was: {}", err);
        }
    }
}
