//! Client registration and login rules

use serde_json::Value;

use super::{check_len, is_valid_email, optional_str, required_str};
use crate::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// A validated registration form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    /// Lower-cased
    pub email: String,
    pub password: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    /// Client number the caller asked for, if any
    pub client_number: Option<String>,
}

/// A validated login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub fn validate_registration(body: &Value) -> Result<Registration, ValidationError> {
    let (first_name, last_name, email, password) = match (
        required_str(body, "firstName"),
        required_str(body, "lastName"),
        required_str(body, "email"),
        body.get("password")
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty()),
    ) {
        (Some(f), Some(l), Some(e), Some(p)) => (f, l, e, p),
        _ => {
            return Err(ValidationError::new(
                "form",
                "Missing required fields: firstName, lastName, email, and password are required",
            ));
        }
    };

    if !is_valid_email(email) {
        return Err(ValidationError::new("email", "Invalid email format"));
    }

    if super::char_len(password) < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            "Password must be at least 8 characters long",
        ));
    }

    check_len(
        "firstName",
        first_name,
        100,
        "First name must be 100 characters or less",
    )?;
    check_len(
        "lastName",
        last_name,
        100,
        "Last name must be 100 characters or less",
    )?;

    let company = optional_str(body, "company", "Company")?;
    if let Some(company) = company {
        check_len(
            "company",
            company,
            100,
            "Company name must be 100 characters or less",
        )?;
    }

    let phone = optional_str(body, "phone", "Phone")?;
    if let Some(phone) = phone {
        check_len("phone", phone, 50, "Phone number must be 50 characters or less")?;
    }

    let client_number = optional_str(body, "clientNumber", "Client number")?;

    Ok(Registration {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_lowercase(),
        password: password.to_string(),
        company: company.map(str::to_string),
        phone: phone.map(str::to_string),
        client_number: client_number.map(str::to_string),
    })
}

pub fn validate_login(body: &Value) -> Result<LoginForm, ValidationError> {
    let email = required_str(body, "email");
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty());

    match (email, password) {
        (Some(email), Some(password)) => Ok(LoginForm {
            email: email.to_lowercase(),
            password: password.to_string(),
        }),
        _ => Err(ValidationError::new(
            "form",
            "Email and password are required",
        )),
    }
}
