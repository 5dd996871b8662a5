use std::collections::HashSet;

/// Normalize a phone number to E.164.
///
/// - `+` prefixed numbers keep their digits as-is and need 8 to 15 of them.
/// - 10 bare digits are domestic and get `default_country_code`.
/// - 11 to 15 bare digits already carry a country code.
///
/// Anything else is rejected.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let raw = raw.trim();
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if raw.starts_with('+') {
        return (8..=15)
            .contains(&digits.len())
            .then(|| format!("+{}", digits));
    }

    match digits.len() {
        10 => Some(format!("+{}{}", default_country_code, digits)),
        11..=15 => Some(format!("+{}", digits)),
        _ => None,
    }
}

/// Outcome of normalizing a batch of candidate numbers.
#[derive(Debug, Default, PartialEq)]
pub struct PhoneSet {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// Normalize and deduplicate candidates, keeping first-seen order. Blank entries are skipped.
pub fn collect_phones<'a, I>(candidates: I, default_country_code: &str) -> PhoneSet
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut set = PhoneSet::default();

    for candidate in candidates {
        if candidate.trim().is_empty() {
            continue;
        }
        match normalize_phone(candidate, default_country_code) {
            Some(phone) => {
                if seen.insert(phone.clone()) {
                    set.valid.push(phone);
                }
            }
            None => set.invalid.push(candidate.trim().to_string()),
        }
    }

    set
}
