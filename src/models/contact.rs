//! Contact form submissions

use serde::Serialize;
use serde_json::{Value, json};

/// Option-set value for a newly received submission
pub const CONTACT_STATUS_NEW: u32 = 463_170_000;

/// Service the enquiry is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    Microsoft365,
    PowerPlatform,
    DigitalTransformation,
    Training,
    CustomSolutions,
    Consultation,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 6] = [
        ServiceCategory::Microsoft365,
        ServiceCategory::PowerPlatform,
        ServiceCategory::DigitalTransformation,
        ServiceCategory::Training,
        ServiceCategory::CustomSolutions,
        ServiceCategory::Consultation,
    ];

    /// Parse a form value, accepting the older widget spellings too
    pub fn parse(value: &str) -> Option<Self> {
        let alias = match value {
            "microsoft365" => Some(ServiceCategory::Microsoft365),
            "powerplatform" => Some(ServiceCategory::PowerPlatform),
            "migration" => Some(ServiceCategory::DigitalTransformation),
            "other" => Some(ServiceCategory::CustomSolutions),
            _ => None,
        };
        alias.or_else(|| Self::ALL.into_iter().find(|c| c.as_str() == value))
    }

    /// CRM option-set value
    pub fn option_value(self) -> u32 {
        match self {
            ServiceCategory::Microsoft365 => 463_170_000,
            ServiceCategory::PowerPlatform => 463_170_001,
            ServiceCategory::DigitalTransformation => 463_170_002,
            ServiceCategory::Training => 463_170_003,
            ServiceCategory::CustomSolutions => 463_170_004,
            ServiceCategory::Consultation => 463_170_005,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceCategory::Microsoft365 => "microsoft-365",
            ServiceCategory::PowerPlatform => "power-platform",
            ServiceCategory::DigitalTransformation => "digital-transformation",
            ServiceCategory::Training => "training",
            ServiceCategory::CustomSolutions => "custom-solutions",
            ServiceCategory::Consultation => "consultation",
        }
    }
}

/// A normalised contact submission, ready to store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub service: Option<ServiceCategory>,
    pub message: String,
    pub ip_address: Option<String>,
}

impl ContactSubmission {
    /// CRM row for this submission
    pub fn to_record(&self) -> Value {
        json!({
            "e365_name": self.name,
            "e365_email": self.email,
            "e365_company": self.company,
            "e365_phonenumber": self.phone,
            "e365_service": self.service.map(ServiceCategory::option_value),
            "e365_message": self.message,
            "e365_ipaddress": self.ip_address,
            "e365_contactstatus": CONTACT_STATUS_NEW,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_aliases() {
        assert_eq!(
            ServiceCategory::parse("microsoft365"),
            Some(ServiceCategory::Microsoft365)
        );
        assert_eq!(
            ServiceCategory::parse("migration"),
            Some(ServiceCategory::DigitalTransformation)
        );
        assert_eq!(
            ServiceCategory::parse("other"),
            Some(ServiceCategory::CustomSolutions)
        );
        assert_eq!(ServiceCategory::parse("Training"), None);
        assert_eq!(ServiceCategory::parse("unknown"), None);
    }

    #[test]
    fn test_canonical_forms_parse_back() {
        for category in ServiceCategory::ALL {
            assert_eq!(ServiceCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(ServiceCategory::Consultation.option_value(), 463_170_005);
    }

    #[test]
    fn test_record_columns() {
        let submission = ContactSubmission {
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            company: None,
            phone: Some("+61 400 000 000".into()),
            service: Some(ServiceCategory::Training),
            message: "Hello".into(),
            ip_address: None,
        };

        let record = submission.to_record();
        assert_eq!(record["e365_name"], "Jane Doe");
        assert_eq!(record["e365_company"], Value::Null);
        assert_eq!(record["e365_phonenumber"], "+61 400 000 000");
        assert_eq!(record["e365_service"], 463_170_003);
        assert_eq!(record["e365_ipaddress"], Value::Null);
        assert_eq!(record["e365_contactstatus"], 463_170_000);
    }
}
