//! Request validation for the create endpoint.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Column width of `name` and `email` in the users table.
pub const MAX_FIELD_LEN: usize = 100;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {}", e))
});

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

impl CreateUserRequest {
    /// Check field presence, length and email shape. Returns the trimmed name
    /// and email on success.
    pub fn validate(&self) -> ApiResult<(String, String)> {
        let name = self.name.trim();
        let email = self.email.trim();

        if name.is_empty() {
            return Err(ApiError::validation_failed("Field 'name' must not be empty")
                .with_details(serde_json::json!({ "field": "name" })));
        }
        if name.chars().count() > MAX_FIELD_LEN {
            return Err(ApiError::validation_failed(format!(
                "Field 'name' must be at most {} characters",
                MAX_FIELD_LEN
            ))
            .with_details(serde_json::json!({ "field": "name" })));
        }
        if email.chars().count() > MAX_FIELD_LEN {
            return Err(ApiError::validation_failed(format!(
                "Field 'email' must be at most {} characters",
                MAX_FIELD_LEN
            ))
            .with_details(serde_json::json!({ "field": "email" })));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(ApiError::invalid_format("email", "an email address"));
        }

        Ok((name.to_string(), email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use proptest::prelude::*;
    use tierbench_test_utils::generators::{arb_email, arb_name};

    fn req(name: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_valid_request_is_trimmed() {
        let (name, email) = req("  Ada ", " ada@test.com ").validate().unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(email, "ada@test.com");
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = req("   ", "ada@test.com").validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_long_fields_rejected() {
        let long = "x".repeat(MAX_FIELD_LEN + 1);
        assert!(req(&long, "ada@test.com").validate().is_err());
        assert!(req("Ada", &format!("{}@test.com", long)).validate().is_err());
        assert!(req(&"x".repeat(MAX_FIELD_LEN), "ada@test.com").validate().is_ok());
    }

    #[test]
    fn test_malformed_email_rejected() {
        for email in ["", "ada", "ada@", "@test.com", "ada@test", "a da@test.com"] {
            let err = req("Ada", email).validate().unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFormat, "accepted {:?}", email);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_generated_inputs_validate(name in arb_name(), email in arb_email()) {
            let result = req(&name, &email).validate();
            prop_assert!(result.is_ok(), "{:?}", result);
        }
    }
}
