//! Phone number normalisation and SIP participant identities

/// Identity used when a phone number carries no digits
pub const UNKNOWN_IDENTITY: &str = "sip_unknown";

fn digits_of(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalise user input to `+<digits>`.
///
/// Every non-digit is dropped. Returns an empty string when no digits remain.
/// Idempotent.
pub fn normalize_phone(raw: &str) -> String {
    let digits = digits_of(raw);
    if digits.is_empty() {
        String::new()
    } else {
        format!("+{}", digits)
    }
}

/// SIP participant identity for a phone number, `sip_<digits>` or [`UNKNOWN_IDENTITY`]
pub fn identity_for(raw: &str) -> String {
    let digits = digits_of(raw);
    if digits.is_empty() {
        UNKNOWN_IDENTITY.to_string()
    } else {
        format!("sip_{}", digits)
    }
}

/// Digits only, as used in room names
pub fn digits_only(raw: &str) -> String {
    digits_of(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_indian_mobile() {
        assert_eq!(normalize_phone("+91-98765 43210"), "+919876543210");
        assert_eq!(identity_for("+919876543210"), "sip_919876543210");
    }

    #[test]
    fn test_empty_and_digitless_input() {
        assert_eq!(normalize_phone(""), "");
        assert_eq!(normalize_phone("call me"), "");
        assert_eq!(identity_for(""), UNKNOWN_IDENTITY);
        assert_eq!(identity_for("+"), UNKNOWN_IDENTITY);
    }

    #[test]
    fn test_non_ascii_digits_are_dropped() {
        // Devanagari digits are not dialable
        assert_eq!(normalize_phone("९८७६"), "");
        assert_eq!(normalize_phone("(022) 2345-6789"), "+02223456789");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in ".*") {
            let once = normalize_phone(&raw);
            prop_assert_eq!(normalize_phone(&once), once.clone());
        }

        #[test]
        fn normalized_is_plus_digits_or_empty(raw in ".*") {
            let normalized = normalize_phone(&raw);
            if !normalized.is_empty() {
                prop_assert!(normalized.starts_with('+'));
                prop_assert!(normalized.len() > 1);
                prop_assert!(normalized[1..].chars().all(|c| c.is_ascii_digit()));
            }
        }

        #[test]
        fn identity_matches_normalized_digits(raw in "[0-9 +()-]{0,20}") {
            let normalized = normalize_phone(&raw);
            let identity = identity_for(&raw);
            if normalized.is_empty() {
                prop_assert_eq!(identity, UNKNOWN_IDENTITY);
            } else {
                prop_assert_eq!(identity, format!("sip_{}", &normalized[1..]));
            }
        }
    }
}
