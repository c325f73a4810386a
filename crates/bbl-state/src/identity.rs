use crate::validator::ValidationError;
use chrono::{DateTime, Utc};

const LAKES: &[&str] = &[
    "ontario", "erie", "huron", "superior", "michigan", "tahoe", "baikal", "titicaca", "victoria",
    "malawi", "geneva", "como", "garda", "constance", "ladoga", "onega", "vanern", "taupo",
    "toba", "inle", "bled", "ohrid", "prespa", "balaton",
];

/// Generate an environment name of the form `bbl-env-<lake>-<timestamp>`.
///
/// The lake is picked from a blake3 hash of the timestamp, so two
/// environments created in the same minute still tend to differ.
pub fn generate_env_id(now: DateTime<Utc>) -> String {
    let seed = now.timestamp_nanos_opt().unwrap_or_default();
    let digest = blake3::hash(&seed.to_le_bytes());
    let index = usize::from(digest.as_bytes()[0]) % LAKES.len();
    format!(
        "bbl-env-{}-{}",
        LAKES[index],
        now.format("%Y-%m-%dt%H-%Mz")
    )
}

/// Environment names end up in IaaS resource names, which allow only
/// lowercase letters, digits and hyphens.
pub fn validate_env_id(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > 63 {
        return Err(ValidationError::Rejected(
            "environment name must be 1-63 characters".to_owned(),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(ValidationError::Rejected(format!(
            "environment name '{name}' must match [a-z0-9-]"
        )));
    }
    if !name.as_bytes()[0].is_ascii_lowercase() {
        return Err(ValidationError::Rejected(format!(
            "environment name '{name}' must start with a letter"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_id_has_expected_shape() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let id = generate_env_id(now);
        assert!(id.starts_with("bbl-env-"), "{id}");
        assert!(id.ends_with("-2026-10-16t09-30z"), "{id}");
        validate_env_id(&id).unwrap();
    }

    #[test]
    fn generated_id_is_deterministic_for_a_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(generate_env_id(now), generate_env_id(now));
    }

    #[test]
    fn valid_names() {
        assert!(validate_env_id("prod").is_ok());
        assert!(validate_env_id("bbl-env-1").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_env_id("").is_err());
        assert!(validate_env_id("Prod").is_err());
        assert!(validate_env_id("my_env").is_err());
        assert!(validate_env_id("1env").is_err());
        assert!(validate_env_id(&"a".repeat(64)).is_err());
    }
}
