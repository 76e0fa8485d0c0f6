//! Shipping address form and its validator.
//!
//! Validation is all-at-once: [`validate`] checks every field and returns
//! the full error map, so the form can light up every invalid field in a
//! single pass. Per-field clearing happens at edit time instead (see
//! [`CheckoutPipeline::update_field`](super::CheckoutPipeline::update_field)).
//!
//! Field values are validated exactly as typed; no trimming or
//! normalization happens here.

use std::collections::BTreeMap;

use krispy_cottage_core::Email;

/// Minimum digits for a plausible phone number.
const MIN_MOBILE_LEN: usize = 7;
/// Shortest postal code accepted (some countries use 3 characters).
const MIN_ZIP_LEN: usize = 3;

/// The ten shipping address fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    MobileNo,
    AddressLine1,
    AddressLine2,
    Country,
    City,
    State,
    ZipCode,
}

impl FormField {
    /// The field's name on the wire and in presentation-layer bindings.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::MobileNo => "mobileNo",
            Self::AddressLine1 => "addressLine1",
            Self::AddressLine2 => "addressLine2",
            Self::Country => "country",
            Self::City => "city",
            Self::State => "state",
            Self::ZipCode => "zipCode",
        }
    }
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Raw shipping address input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile_no: String,
    pub address_line1: String,
    pub address_line2: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl AddressForm {
    /// Read one field's current value.
    #[must_use]
    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Email => &self.email,
            FormField::MobileNo => &self.mobile_no,
            FormField::AddressLine1 => &self.address_line1,
            FormField::AddressLine2 => &self.address_line2,
            FormField::Country => &self.country,
            FormField::City => &self.city,
            FormField::State => &self.state,
            FormField::ZipCode => &self.zip_code,
        }
    }

    /// Overwrite one field's value.
    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::FirstName => &mut self.first_name,
            FormField::LastName => &mut self.last_name,
            FormField::Email => &mut self.email,
            FormField::MobileNo => &mut self.mobile_no,
            FormField::AddressLine1 => &mut self.address_line1,
            FormField::AddressLine2 => &mut self.address_line2,
            FormField::Country => &mut self.country,
            FormField::City => &mut self.city,
            FormField::State => &mut self.state,
            FormField::ZipCode => &mut self.zip_code,
        };
        *slot = value.into();
    }
}

/// Per-field validation messages, keyed by field in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<FormField, &'static str>);

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The message for one field, if it failed validation.
    #[must_use]
    pub fn message(&self, field: FormField) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    /// Drop the error for one field, leaving the rest intact.
    pub fn clear(&mut self, field: FormField) {
        self.0.remove(&field);
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &'static str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, *message))
    }

    fn insert(&mut self, field: FormField, message: &'static str) {
        self.0.insert(field, message);
    }
}

/// A shipping address that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub mobile_no: String,
    pub address_line1: String,
    pub address_line2: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Validate every field of the form at once.
///
/// Returns the typed form, or the complete map of per-field messages so
/// all invalid fields can be surfaced together.
///
/// # Errors
///
/// Returns [`FieldErrors`] with one message per invalid field.
pub fn validate(form: &AddressForm) -> Result<ValidatedForm, FieldErrors> {
    let mut errors = FieldErrors::default();

    if form.first_name.is_empty() {
        errors.insert(FormField::FirstName, "First name is required");
    }
    if form.last_name.is_empty() {
        errors.insert(FormField::LastName, "Last name is required");
    }

    let email = match Email::parse(&form.email) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.insert(FormField::Email, "Invalid email address");
            None
        }
    };

    if form.mobile_no.len() < MIN_MOBILE_LEN {
        errors.insert(FormField::MobileNo, "Invalid mobile number");
    }
    if form.address_line1.is_empty() {
        errors.insert(FormField::AddressLine1, "Address Line 1 is required");
    }
    if form.address_line2.is_empty() {
        errors.insert(FormField::AddressLine2, "Address Line 2 is required");
    }
    if form.country.is_empty() {
        errors.insert(FormField::Country, "Country is required");
    }
    if form.city.is_empty() {
        errors.insert(FormField::City, "City is required");
    }
    if form.state.is_empty() {
        errors.insert(FormField::State, "State is required");
    }
    if form.zip_code.len() < MIN_ZIP_LEN {
        errors.insert(FormField::ZipCode, "Invalid zip code");
    }

    match email {
        Some(email) if errors.is_empty() => Ok(ValidatedForm {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            email,
            mobile_no: form.mobile_no.clone(),
            address_line1: form.address_line1.clone(),
            address_line2: form.address_line2.clone(),
            country: form.country.clone(),
            city: form.city.clone(),
            state: form.state.clone(),
            zip_code: form.zip_code.clone(),
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled_form() -> AddressForm {
        AddressForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            mobile_no: "5551234567".to_string(),
            address_line1: "1 Analytical Way".to_string(),
            address_line2: "Unit 2".to_string(),
            country: "US".to_string(),
            city: "London".to_string(),
            state: "LDN".to_string(),
            zip_code: "12345".to_string(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        let validated = validate(&filled_form()).unwrap();
        assert_eq!(validated.email.as_ref(), "ada@example.com");
        assert_eq!(validated.zip_code, "12345");
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let errors = validate(&AddressForm::default()).unwrap_err();
        assert_eq!(errors.len(), 10);
        assert_eq!(
            errors.message(FormField::FirstName),
            Some("First name is required")
        );
        assert_eq!(
            errors.message(FormField::AddressLine1),
            Some("Address Line 1 is required")
        );
        assert_eq!(errors.message(FormField::ZipCode), Some("Invalid zip code"));
    }

    #[test]
    fn test_invalid_email_only() {
        let mut form = filled_form();
        form.email = "not-an-email".to_string();
        let errors = validate(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.message(FormField::Email),
            Some("Invalid email address")
        );
    }

    #[test]
    fn test_short_mobile_number_rejected() {
        let mut form = filled_form();
        form.mobile_no = "555123".to_string(); // 6 digits, one short
        let errors = validate(&form).unwrap_err();
        assert_eq!(
            errors.message(FormField::MobileNo),
            Some("Invalid mobile number")
        );
    }

    #[test]
    fn test_short_zip_rejected_long_zip_accepted() {
        let mut form = filled_form();
        form.zip_code = "12".to_string();
        assert!(validate(&form).is_err());

        form.zip_code = "123".to_string();
        assert!(validate(&form).is_ok());
    }

    #[test]
    fn test_whitespace_is_not_trimmed() {
        // Values are validated as typed; a lone space satisfies "required".
        let mut form = filled_form();
        form.city = " ".to_string();
        assert!(validate(&form).is_ok());
    }

    #[test]
    fn test_field_roundtrip_accessors() {
        let mut form = AddressForm::default();
        form.set_field(FormField::Country, "CA");
        assert_eq!(form.field(FormField::Country), "CA");
        assert_eq!(form.field(FormField::City), "");
    }

    #[test]
    fn test_clear_removes_only_that_field() {
        let mut errors = validate(&AddressForm::default()).unwrap_err();
        errors.clear(FormField::Email);
        assert_eq!(errors.message(FormField::Email), None);
        assert_eq!(errors.len(), 9);
    }
}
