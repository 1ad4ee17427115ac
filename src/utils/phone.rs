/// Country code assumed for local-format numbers.
const DEFAULT_COUNTRY_CODE: &str = "972";

/// Normalize a lenient phone input to digits-only international form.
///
/// Accepts spaces, hyphens, and a single leading plus. Local numbers
/// (optionally starting with 0) get the default country code prepended.
/// Returns `None` when the input cannot be read as a valid number.
pub fn normalize_to_e164(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let plus_count = cleaned.matches('+').count();
    if plus_count > 1 || (plus_count == 1 && !cleaned.starts_with('+')) {
        return None;
    }

    if let Some(digits) = cleaned.strip_prefix('+') {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        return is_valid_e164_digits(digits).then(|| digits.to_string());
    }

    if cleaned.starts_with(DEFAULT_COUNTRY_CODE) {
        return is_valid_e164_digits(&cleaned).then_some(cleaned);
    }

    let local = cleaned.strip_prefix('0').unwrap_or(&cleaned);
    let with_country = format!("{DEFAULT_COUNTRY_CODE}{local}");
    is_valid_e164_digits(&with_country).then_some(with_country)
}

/// Strict plus-prefixed E.164, as required for the stored admin phone:
/// `+`, a nonzero digit, then 1 to 14 more digits.
pub fn is_valid_e164_plus(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    if digits.len() < 2 || digits.len() > 15 {
        return false;
    }
    let mut chars = digits.chars();
    matches!(chars.next(), Some('1'..='9')) && chars.all(|c| c.is_ascii_digit())
}

/// E.164 digits without the plus: 8 to 15 digits, no leading zero.
fn is_valid_e164_digits(digits: &str) -> bool {
    if digits.len() < 8 || digits.len() > 15 {
        return false;
    }
    if digits.starts_with('0') {
        return false;
    }
    digits.chars().all(|c| c.is_ascii_digit())
}
