//! Recipient-number normalization into the platform's canonical address
//! form. Pure and deterministic.

use zg_domain::error::{Error, Result};

/// Platform address suffix for individual chats.
pub const ADDRESS_SUFFIX: &str = "@c.us";

/// Normalize a raw phone number into a canonical platform address.
///
/// Strips every non-digit character, prefixes the country code when the
/// remaining sequence is a bare local number (10 or 11 digits) or does not
/// already start with the code, and appends [`ADDRESS_SUFFIX`].
pub fn format_number(raw: &str, country_code: &str) -> Result<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(Error::InvalidRecipient(format!(
            "no digits in {raw:?}"
        )));
    }

    if digits.len() == 10 || digits.len() == 11 {
        digits = format!("{country_code}{digits}");
    }
    if !digits.starts_with(country_code) {
        digits = format!("{country_code}{digits}");
    }

    Ok(format!("{digits}{ADDRESS_SUFFIX}"))
}

/// Strip the platform suffix off an address, yielding the bare number.
pub fn strip_address_suffix(address: &str) -> &str {
    address.strip_suffix(ADDRESS_SUFFIX).unwrap_or(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_variants_converge() {
        let expected = "5561991763642@c.us";
        assert_eq!(format_number("(61) 99176-3642", "55").unwrap(), expected);
        assert_eq!(format_number("5561991763642", "55").unwrap(), expected);
        assert_eq!(format_number("61991763642", "55").unwrap(), expected);
    }

    #[test]
    fn ten_digit_landline_gets_country_code() {
        assert_eq!(
            format_number("6133334444", "55").unwrap(),
            "556133334444@c.us"
        );
    }

    #[test]
    fn foreign_length_still_gets_code_when_missing() {
        // 12 digits not starting with the country code.
        assert_eq!(
            format_number("123456789012", "55").unwrap(),
            "55123456789012@c.us"
        );
    }

    #[test]
    fn empty_and_digitless_rejected() {
        assert!(format_number("", "55").is_err());
        assert!(format_number("abc-def", "55").is_err());
    }

    #[test]
    fn deterministic() {
        let a = format_number("+55 (61) 99176-3642", "55").unwrap();
        let b = format_number("+55 (61) 99176-3642", "55").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn suffix_strips_back_off() {
        assert_eq!(strip_address_suffix("5561991763642@c.us"), "5561991763642");
        assert_eq!(strip_address_suffix("5561991763642"), "5561991763642");
    }
}
