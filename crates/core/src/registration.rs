//! Student sign-up form validation.
//!
//! Everything here runs before any remote call is made. A form that fails
//! validation never reaches the auth service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::UserProfile;
use crate::types::{CanteenId, Email, EmailError, Gender, Hostel, HostelId, Role, UserId};

/// Default college email domain.
pub const DEFAULT_COLLEGE_DOMAIN: &str = "iiitdmj.ac.in";

/// Why a registration form was refused.
///
/// The `Display` text is shown to the student as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Please fill in your {0}.")]
    MissingField(&'static str),

    #[error("Please enter a valid email address ({0}).")]
    InvalidEmail(EmailError),

    #[error("Use your official college email only.")]
    RestrictedEmailDomain,

    #[error("Please select your preferred canteen.")]
    MissingPreferredCanteen,

    #[error("Please select a valid gender.")]
    InvalidGender,

    #[error("Male students cannot select a girls' hostel.")]
    GenderHostelConflict,
}

/// Raw registration form fields, exactly as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub hostel_id: String,
    #[serde(default)]
    pub preferred_canteen_id: String,
}

/// A validated registration, ready to be sent as sign-up metadata.
///
/// The password is not carried here; it stays on the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    #[serde(skip)]
    pub email: Email,
    pub full_name: String,
    pub phone: String,
    pub hostel_id: HostelId,
    pub preferred_canteen_id: CanteenId,
    pub gender: Gender,
    pub role: Role,
}

impl RegistrationForm {
    /// Validate the form.
    ///
    /// `hostel` is the hostel row matching `hostel_id`, when it is known.
    /// An unknown hostel skips the gender check rather than failing it.
    ///
    /// # Errors
    ///
    /// The first rule the form breaks, checked in this order: required
    /// fields, email shape, college domain, preferred canteen, gender value,
    /// gender against hostel.
    pub fn validate(
        &self,
        college_domain: &str,
        hostel: Option<&Hostel>,
    ) -> Result<Registration, RegistrationError> {
        let required = [
            ("email", &self.email),
            ("password", &self.password),
            ("full name", &self.full_name),
            ("phone number", &self.phone),
            ("gender", &self.gender),
            ("hostel", &self.hostel_id),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(RegistrationError::MissingField(field));
        }

        let email = Email::parse(&self.email).map_err(RegistrationError::InvalidEmail)?;
        if !email.has_domain(college_domain) {
            return Err(RegistrationError::RestrictedEmailDomain);
        }

        let preferred_canteen_id = CanteenId::new(self.preferred_canteen_id.trim());
        if preferred_canteen_id.is_empty() {
            return Err(RegistrationError::MissingPreferredCanteen);
        }

        let gender: Gender = self
            .gender
            .parse()
            .map_err(|_| RegistrationError::InvalidGender)?;

        if let Some(hostel) = hostel
            && !hostel.admits(Some(gender))
        {
            return Err(RegistrationError::GenderHostelConflict);
        }

        Ok(Registration {
            email,
            full_name: self.full_name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            hostel_id: HostelId::new(self.hostel_id.trim()),
            preferred_canteen_id,
            gender,
            role: Role::Student,
        })
    }
}

impl Registration {
    /// The profile row to insert once the auth service has assigned an id.
    #[must_use]
    pub fn into_profile(self, id: UserId) -> UserProfile {
        UserProfile {
            id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            hostel_id: self.hostel_id,
            preferred_canteen_id: self.preferred_canteen_id,
            gender: self.gender,
            role: self.role,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            email: "22bcs001@iiitdmj.ac.in".to_string(),
            password: "hunter22".to_string(),
            full_name: " Ravi Kumar ".to_string(),
            phone: "+919876543210".to_string(),
            gender: "male".to_string(),
            hostel_id: "h1".to_string(),
            preferred_canteen_id: "c1".to_string(),
        }
    }

    fn girls_hostel() -> Hostel {
        Hostel {
            id: HostelId::new("h1"),
            name: "Girls Hostel".to_string(),
            is_girls: true,
        }
    }

    #[test]
    fn test_valid_form() {
        let registration = form().validate(DEFAULT_COLLEGE_DOMAIN, None).unwrap();
        assert_eq!(registration.full_name, "Ravi Kumar");
        assert_eq!(registration.role, Role::Student);
        assert_eq!(registration.gender, Gender::Male);

        let profile = registration.into_profile(UserId::new("u1"));
        assert_eq!(profile.email.as_str(), "22bcs001@iiitdmj.ac.in");
        assert_eq!(profile.preferred_canteen_id.as_str(), "c1");
    }

    #[test]
    fn test_outside_email_is_refused() {
        let mut f = form();
        f.email = "ravi@gmail.com".to_string();
        let err = f.validate(DEFAULT_COLLEGE_DOMAIN, None).unwrap_err();
        assert_eq!(err, RegistrationError::RestrictedEmailDomain);
        assert_eq!(err.to_string(), "Use your official college email only.");
    }

    #[test]
    fn test_missing_preferred_canteen() {
        let mut f = form();
        f.preferred_canteen_id = "  ".to_string();
        let err = f.validate(DEFAULT_COLLEGE_DOMAIN, None).unwrap_err();
        assert_eq!(err.to_string(), "Please select your preferred canteen.");
    }

    #[test]
    fn test_male_with_girls_hostel() {
        let err = form()
            .validate(DEFAULT_COLLEGE_DOMAIN, Some(&girls_hostel()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Male students cannot select a girls' hostel.");
    }

    #[test]
    fn test_female_with_girls_hostel_is_fine() {
        let mut f = form();
        f.gender = "female".to_string();
        assert!(f.validate(DEFAULT_COLLEGE_DOMAIN, Some(&girls_hostel())).is_ok());
    }

    #[test]
    fn test_missing_fields_reported_first() {
        let mut f = form();
        f.phone.clear();
        f.email = "ravi@gmail.com".to_string();
        assert_eq!(
            f.validate(DEFAULT_COLLEGE_DOMAIN, None).unwrap_err(),
            RegistrationError::MissingField("phone number")
        );
    }

    #[test]
    fn test_domain_check_precedes_canteen_check() {
        let mut f = form();
        f.email = "ravi@gmail.com".to_string();
        f.preferred_canteen_id.clear();
        assert_eq!(
            f.validate(DEFAULT_COLLEGE_DOMAIN, None).unwrap_err(),
            RegistrationError::RestrictedEmailDomain
        );
    }

    #[test]
    fn test_unknown_gender() {
        let mut f = form();
        f.gender = "robot".to_string();
        assert_eq!(
            f.validate(DEFAULT_COLLEGE_DOMAIN, None).unwrap_err(),
            RegistrationError::InvalidGender
        );
    }

    #[test]
    fn test_malformed_email() {
        let mut f = form();
        f.email = "not-an-email".to_string();
        assert!(matches!(
            f.validate(DEFAULT_COLLEGE_DOMAIN, None),
            Err(RegistrationError::InvalidEmail(EmailError::MissingAtSymbol))
        ));
    }
}
