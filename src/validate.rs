use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Contact;

/// Accepted phone format: exactly nine ASCII digits.
pub const PHONE_PATTERN: &str = "^[0-9]{9}$";

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PHONE_PATTERN).expect("phone pattern is a valid regex"));

/// Outcome of checking a candidate phone number against the current collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneCheck {
    Valid,
    /// Does not match `PHONE_PATTERN`
    Malformed,
    /// Already used by a loaded contact
    Duplicate,
}

impl PhoneCheck {
    pub fn is_valid(self) -> bool {
        matches!(self, PhoneCheck::Valid)
    }

    pub fn label(self) -> &'static str {
        match self {
            PhoneCheck::Valid => "valid",
            PhoneCheck::Malformed => "invalid: malformed",
            PhoneCheck::Duplicate => "invalid: duplicate",
        }
    }
}

pub fn is_well_formed(candidate: &str) -> bool {
    PHONE_RE.is_match(candidate)
}

/// Exact string comparison, no normalization of spaces or dashes.
pub fn is_duplicate(contacts: &[Contact], candidate: &str) -> bool {
    contacts.iter().any(|contact| contact.phone == candidate)
}

pub fn check_phone(contacts: &[Contact], candidate: &str) -> PhoneCheck {
    if is_duplicate(contacts, candidate) {
        PhoneCheck::Duplicate
    } else if !is_well_formed(candidate) {
        PhoneCheck::Malformed
    } else {
        PhoneCheck::Valid
    }
}

pub fn is_valid_phone(contacts: &[Contact], candidate: &str) -> bool {
    check_phone(contacts, candidate).is_valid()
}
