//! Contact form rules

use serde_json::Value;

use super::{check_len, is_valid_email, optional_str, required_str};
use crate::error::ValidationError;
use crate::models::{ContactSubmission, ServiceCategory};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 320;
pub const MAX_COMPANY_LEN: usize = 100;
pub const MAX_PHONE_LEN: usize = 50;
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Validate and normalise a contact form body.
///
/// The caller's IP address is not part of the form and is left unset.
pub fn validate_contact(body: &Value) -> Result<ContactSubmission, ValidationError> {
    let name = required_str(body, "name")
        .ok_or_else(|| ValidationError::new("name", "Name is required"))?;
    let email = required_str(body, "email")
        .ok_or_else(|| ValidationError::new("email", "Email is required"))?;
    let message = required_str(body, "message")
        .ok_or_else(|| ValidationError::new("message", "Message is required"))?;

    if !is_valid_email(email) {
        return Err(ValidationError::new(
            "email",
            "Please enter a valid email address",
        ));
    }

    check_len("name", name, MAX_NAME_LEN, "Name must be 100 characters or less")?;
    check_len("email", email, MAX_EMAIL_LEN, "Email address is too long")?;

    let company = optional_str(body, "company", "Company")?;
    if let Some(company) = company {
        check_len(
            "company",
            company,
            MAX_COMPANY_LEN,
            "Company name must be 100 characters or less",
        )?;
    }

    let phone = optional_str(body, "phone", "Phone")?;
    if let Some(phone) = phone {
        check_len(
            "phone",
            phone,
            MAX_PHONE_LEN,
            "Phone number must be 50 characters or less",
        )?;
    }

    check_len(
        "message",
        message,
        MAX_MESSAGE_LEN,
        "Message must be 4000 characters or less",
    )?;

    let service = match optional_str(body, "service", "Service")? {
        None => None,
        Some(value) => Some(
            ServiceCategory::parse(value)
                .ok_or_else(|| ValidationError::new("service", "Invalid service selection"))?,
        ),
    };

    Ok(ContactSubmission {
        name: name.to_string(),
        email: email.to_lowercase(),
        company: company.map(str::to_string),
        phone: phone.map(str::to_string),
        service,
        message: message.to_string(),
        ip_address: None,
    })
}
