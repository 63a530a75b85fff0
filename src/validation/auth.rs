use garde::Validate;
use serde::{Deserialize, Serialize};

/// Shown when a form arrives without the fields it needs.
pub const FORM_NOT_SUBMITTED: &str = "Form not submitted correctly.";

/// Login and signup form fields as submitted.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Login and signup fields once both are present.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CredentialsFields {
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Per-field messages for the credentials form.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CredentialsFieldErrors {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsForm {
    /// The submitted fields, or `None` if the form is incomplete.
    pub fn fields(self) -> Option<CredentialsFields> {
        Some(CredentialsFields {
            username: self.username?,
            password: self.password?,
        })
    }
}

impl CredentialsFields {
    /// Validates the fields, returning per-field messages on failure.
    pub fn check(&self) -> Result<(), CredentialsFieldErrors> {
        let report = match self.validate() {
            Ok(()) => return Ok(()),
            Err(report) => report,
        };

        let mut errors = CredentialsFieldErrors::default();
        for (path, _) in report.iter() {
            match path.to_string().as_str() {
                "username" => errors.username = Some("Username must not be empty".to_string()),
                "password" => errors.password = Some("Password must not be empty".to_string()),
                _ => {}
            }
        }
        Err(errors)
    }
}

/// The password reset email field.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct EmailField {
    #[garde(length(min = 1))]
    pub email: String,
}

/// Per-field messages for the password reset form.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct EmailFieldErrors {
    pub email: Option<String>,
}

impl EmailField {
    pub fn check(&self) -> Result<(), EmailFieldErrors> {
        self.validate().map_err(|_| EmailFieldErrors {
            email: Some("Email must not be empty".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_form_has_no_fields() {
        let form = CredentialsForm {
            username: Some("dash".to_string()),
            password: None,
        };
        assert!(form.fields().is_none());
    }

    #[test]
    fn empty_fields_are_reported_individually() {
        let fields = CredentialsFields {
            username: String::new(),
            password: "hunter2".to_string(),
        };
        assert_eq!(
            fields.check(),
            Err(CredentialsFieldErrors {
                username: Some("Username must not be empty".to_string()),
                password: None,
            })
        );

        let fields = CredentialsFields {
            username: String::new(),
            password: String::new(),
        };
        let errors = fields.check().unwrap_err();
        assert!(errors.username.is_some());
        assert_eq!(errors.password.as_deref(), Some("Password must not be empty"));
    }

    #[test]
    fn filled_fields_pass() {
        let fields = CredentialsFields {
            username: "dash@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(fields.check().is_ok());
    }

    #[test]
    fn empty_email_is_reported() {
        let field = EmailField { email: String::new() };
        assert_eq!(field.check().unwrap_err().email.as_deref(), Some("Email must not be empty"));
        assert!(EmailField { email: "a@b.c".to_string() }.check().is_ok());
    }
}
