//! Participant and session identifier handling
//!
//! Identifiers are stored as bare labels; the `sub-`/`ses-` prefixed forms
//! are derived on demand and never accepted as input. Labels must be strictly
//! alphanumeric so that the prefixed forms are valid BIDS entity values.

/// Prefix of the derived participant identifier (`sub-01`).
pub const BIDS_PARTICIPANT_PREFIX: &str = "sub-";

/// Prefix of the derived session identifier (`ses-01`).
pub const BIDS_SESSION_PREFIX: &str = "ses-";

/// Session label standing in for "no session" in datasets without
/// session-level directories.
pub const SESSIONLESS_ID: &str = "none";

/// Checks a bare participant label.
pub fn check_participant_id(value: &str) -> Result<(), String> {
    check_label(value, BIDS_PARTICIPANT_PREFIX)
}

/// Checks a bare session label.
///
/// The sessionless sentinel [`SESSIONLESS_ID`] passes like any other label.
pub fn check_session_id(value: &str) -> Result<(), String> {
    check_label(value, BIDS_SESSION_PREFIX)
}

fn check_label(value: &str, forbidden_prefix: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".into());
    }
    if value.starts_with(forbidden_prefix) {
        return Err(format!(
            "must be a bare label without the '{forbidden_prefix}' prefix"
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("must contain only alphanumeric characters".into());
    }
    Ok(())
}

/// Derived participant identifier: `01` becomes `sub-01`.
pub fn bids_participant_id(participant_id: &str) -> String {
    format!("{BIDS_PARTICIPANT_PREFIX}{participant_id}")
}

/// Derived session identifier: `BL` becomes `ses-BL`.
pub fn bids_session_id(session_id: &str) -> String {
    format!("{BIDS_SESSION_PREFIX}{session_id}")
}

/// True when the session label is the sessionless sentinel.
pub fn is_sessionless(session_id: &str) -> bool {
    session_id == SESSIONLESS_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_alphanumeric_labels() {
        assert!(check_participant_id("01").is_ok());
        assert!(check_participant_id("MNI0001").is_ok());
        assert!(check_session_id("BL").is_ok());
        assert!(check_session_id("M12").is_ok());
        assert!(check_session_id(SESSIONLESS_ID).is_ok());
    }

    #[test]
    fn rejects_prefixed_labels() {
        let err = check_participant_id("sub-01").unwrap_err();
        assert!(err.contains("'sub-'"));
        let err = check_session_id("ses-BL").unwrap_err();
        assert!(err.contains("'ses-'"));
    }

    #[test]
    fn rejects_empty_and_non_alphanumeric_labels() {
        assert!(check_participant_id("").is_err());
        assert!(check_participant_id("01_02").is_err());
        assert!(check_session_id("BL 2").is_err());
        assert!(check_session_id("é1").is_err());
    }

    #[test]
    fn derived_identifiers_carry_bids_prefixes() {
        assert_eq!(bids_participant_id("01"), "sub-01");
        assert_eq!(bids_session_id("none"), "ses-none");
        assert!(is_sessionless("none"));
        assert!(!is_sessionless("BL"));
    }
}
