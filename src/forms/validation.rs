use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use super::control_value;
use crate::dom::Document;

/// Controls of the booking form, in display order.
pub const BOOKING_FIELDS: [&str; 7] =
    ["checkin", "checkout", "guests", "roomtype", "fullname", "email", "phone"];

/// Controls of the contact form, in display order.
pub const CONTACT_FIELDS: [&str; 5] = ["firstname", "lastname", "contact-email", "subject", "message"];

/// Value format of date inputs.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why a field was rejected. The display text is what the page shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldProblem {
    #[error("{label} is required")]
    Required { label: String },
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please enter a valid phone number")]
    InvalidPhone,
    #[error("Please enter a valid date")]
    InvalidDate,
    #[error("Check-in date cannot be in the past")]
    CheckInInPast,
    #[error("Check-out date must be after check-in date")]
    CheckOutNotAfterCheckIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {problem}")]
pub struct FieldError {
    /// Element id of the control
    pub field: String,
    pub problem: FieldProblem,
}

impl FieldError {
    /// Error for the control with id `field`.
    fn new(field: &str, problem: FieldProblem) -> Self {
        Self { field: field.to_string(), problem }
    }
}

/// Every problem found in one submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// `Ok` when there is nothing to report.
    fn check(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() { Ok(()) } else { Err(Self { errors }) }
    }

    /// Whether `field` has at least one problem.
    #[must_use]
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Date,
    Select,
    TextArea,
}

/// A form control and what the user entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub id: String,
    /// Label text used in the "is required" message
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub value: String,
}

impl FormField {
    /// Reads the control with element id `id`.
    ///
    /// The label is the text of `label[for=id]`, else the `name`, else the id.
    #[must_use]
    pub fn from_document(document: &Document, id: &str) -> Option<Self> {
        let control = document.element_by_id(id)?;
        let kind = match document.tag_name(control) {
            Some("select") => FieldKind::Select,
            Some("textarea") => FieldKind::TextArea,
            _ => match document.attribute(control, "type").map(str::to_ascii_lowercase).as_deref() {
                Some("email") => FieldKind::Email,
                Some("tel") => FieldKind::Tel,
                Some("date") => FieldKind::Date,
                _ => FieldKind::Text,
            },
        };
        let label = document
            .descendants(document.root())
            .into_iter()
            .find(|n| document.tag_name(*n) == Some("label") && document.attribute(*n, "for") == Some(id))
            .map(|label| document.text_content(label).trim().to_string())
            .or_else(|| document.attribute(control, "name").map(ToString::to_string))
            .unwrap_or_else(|| id.to_string());

        Some(Self {
            id: id.to_string(),
            label,
            kind,
            required: document.has_attribute(control, "required"),
            value: control_value(document, control),
        })
    }
}

/// Validates form fields.
#[derive(Debug, Clone)]
pub struct FormValidator {
    /// Accepted email shape
    email: Regex,
    /// Accepted phone number once separators are removed
    phone: Regex,
    /// Separators allowed inside a phone number
    phone_separators: Regex,
}

impl FormValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?,
            phone: Regex::new(r"^\+?[1-9]\d{0,15}$")?,
            phone_separators: Regex::new(r"[\s\-()]")?,
        })
    }

    #[must_use]
    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email.is_match(email)
    }

    #[must_use]
    pub fn is_valid_phone(&self, phone: &str) -> bool {
        self.phone.is_match(&self.phone_separators.replace_all(phone, ""))
    }

    /// The problem with one field, if any. Values are trimmed first.
    #[must_use]
    pub fn validate_field(&self, field: &FormField) -> Option<FieldProblem> {
        let value = field.value.trim();
        if value.is_empty() {
            return field.required.then(|| FieldProblem::Required { label: field.label.clone() });
        }
        match field.kind {
            FieldKind::Email if !self.is_valid_email(value) => Some(FieldProblem::InvalidEmail),
            FieldKind::Tel if !self.is_valid_phone(value) => Some(FieldProblem::InvalidPhone),
            _ => None,
        }
    }

    /// Validates every field; one failure does not stop the others.
    #[must_use]
    pub fn validate_fields(&self, fields: &[FormField]) -> Vec<FieldError> {
        fields
            .iter()
            .filter_map(|field| {
                self.validate_field(field).map(|problem| FieldError::new(&field.id, problem))
            })
            .collect()
    }

    /// Validates the booking form, including the stay dates against `today`.
    pub fn validate_booking(&self, document: &Document, today: NaiveDate) -> Result<(), ValidationFailure> {
        let fields = read_fields(document, &BOOKING_FIELDS);
        let mut errors = self.validate_fields(&fields);
        errors.extend(check_dates(&fields, today));
        tracing::debug!(errors = errors.len(), "Booking form validated");
        ValidationFailure::check(errors)
    }

    pub fn validate_contact(&self, document: &Document) -> Result<(), ValidationFailure> {
        let fields = read_fields(document, &CONTACT_FIELDS);
        let errors = self.validate_fields(&fields);
        tracing::debug!(errors = errors.len(), "Contact form validated");
        ValidationFailure::check(errors)
    }
}

/// Controls missing from the page are skipped.
fn read_fields(document: &Document, ids: &[&str]) -> Vec<FormField> {
    ids.iter().filter_map(|id| FormField::from_document(document, id)).collect()
}

/// Check-in must not be in the past and check-out must follow it.
///
/// Only runs when both dates were entered.
fn check_dates(fields: &[FormField], today: NaiveDate) -> Vec<FieldError> {
    let value = |id: &str| {
        fields.iter().find(|field| field.id == id).map(|field| field.value.trim()).filter(|v| !v.is_empty())
    };
    let (Some(check_in), Some(check_out)) = (value("checkin"), value("checkout")) else {
        return Vec::new();
    };

    let mut errors = Vec::new();
    let mut parse = |id: &str, value: &str| match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError::new(id, FieldProblem::InvalidDate));
            None
        }
    };
    let check_in = parse("checkin", check_in);
    let check_out = parse("checkout", check_out);

    if let Some(check_in) = check_in
        && check_in < today
    {
        errors.push(FieldError::new("checkin", FieldProblem::CheckInInPast));
    }
    if let (Some(check_in), Some(check_out)) = (check_in, check_out)
        && check_out <= check_in
    {
        errors.push(FieldError::new("checkout", FieldProblem::CheckOutNotAfterCheckIn));
    }
    errors
}

/// Writes each field's message into `#<id>-error`, clearing fields of `ids`
/// that have none.
pub fn show_errors(document: &mut Document, ids: &[&str], errors: &[FieldError]) {
    for id in ids {
        let Some(slot) = document.element_by_id(&format!("{id}-error")) else {
            continue;
        };
        // 同じ欄に複数ある場合は最後のメッセージを表示
        let message = errors
            .iter()
            .rev()
            .find(|error| error.field == *id)
            .map(|error| error.problem.to_string())
            .unwrap_or_default();
        document.set_text_content(slot, &message);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    const BOOKING: &str = r#"<form id="booking-form">
<label for="checkin">Check-in Date</label><input type="date" id="checkin" required value="2026-11-01"><span id="checkin-error"></span>
<label for="checkout">Check-out Date</label><input type="date" id="checkout" required value="2026-11-04"><span id="checkout-error"></span>
<label for="guests">Guests</label><select id="guests" required><option value="">Select guests</option><option value="2" selected>2 Guests</option></select><span id="guests-error"></span>
<label for="roomtype">Room Type</label><select id="roomtype" required><option value="deluxe" data-price="400" selected>Deluxe</option></select><span id="roomtype-error"></span>
<label for="fullname">Full Name</label><input type="text" id="fullname" required value="Nino Beridze"><span id="fullname-error"></span>
<label for="email">Email Address</label><input type="email" id="email" required value="nino@example.ge"><span id="email-error"></span>
<label for="phone">Phone Number</label><input type="tel" id="phone" required value="+995 (555) 12-34-56"><span id="phone-error"></span>
</form>"#;

    #[fixture]
    fn validator() -> FormValidator {
        FormValidator::new().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn field(kind: FieldKind, required: bool, value: &str) -> FormField {
        FormField {
            id: "field".to_string(),
            label: "Field".to_string(),
            kind,
            required,
            value: value.to_string(),
        }
    }

    #[rstest]
    #[case("guest@resort.ge", true)]
    #[case("a@b.c", true)]
    #[case("no-at-sign.ge", false)]
    #[case("two@@resort.ge", false)]
    #[case("space in@resort.ge", false)]
    #[case("nodot@resort", false)]
    fn email_pattern(validator: FormValidator, #[case] email: &str, #[case] valid: bool) {
        assert_that!(validator.is_valid_email(email), eq(valid));
    }

    #[rstest]
    #[case("+995 555 12 34 56", true)]
    #[case("(555) 123-4567", true)]
    #[case("0555123456", false)]
    #[case("+1234567890123456", true)]
    #[case("+12345678901234567", false)]
    #[case("555-CALL", false)]
    fn phone_pattern(validator: FormValidator, #[case] phone: &str, #[case] valid: bool) {
        assert_that!(validator.is_valid_phone(phone), eq(valid));
    }

    #[rstest]
    #[case::empty_required(field(FieldKind::Text, true, "  "), Some(FieldProblem::Required { label: "Field".to_string() }))]
    #[case::empty_optional(field(FieldKind::Email, false, ""), None)]
    #[case::bad_email(field(FieldKind::Email, true, "nope"), Some(FieldProblem::InvalidEmail))]
    #[case::bad_phone(field(FieldKind::Tel, false, "12ab"), Some(FieldProblem::InvalidPhone))]
    #[case::text_is_free_form(field(FieldKind::Text, true, "nope"), None)]
    fn field_rules(validator: FormValidator, #[case] field: FormField, #[case] expected: Option<FieldProblem>) {
        assert_eq!(validator.validate_field(&field), expected);
    }

    #[rstest]
    #[gtest]
    fn reads_fields_from_document() {
        let document = Document::parse(BOOKING).unwrap();

        let guests = FormField::from_document(&document, "guests").unwrap();
        let phone = FormField::from_document(&document, "phone").unwrap();

        assert_that!(guests.value, eq("2"));
        assert_that!(guests.kind, eq(FieldKind::Select));
        assert_that!(phone.label, eq("Phone Number"));
        assert_that!(phone.kind, eq(FieldKind::Tel));
        expect_true!(phone.required);
        assert_that!(FormField::from_document(&document, "coupon"), none());
    }

    #[rstest]
    fn valid_booking_passes(validator: FormValidator) {
        let document = Document::parse(BOOKING).unwrap();

        assert_eq!(validator.validate_booking(&document, today()), Ok(()));
    }

    #[rstest]
    fn booking_collects_every_problem(validator: FormValidator) {
        let html = BOOKING
            .replace(r#"value="2026-11-01""#, r#"value="2026-10-01""#)
            .replace(r#"value="2026-11-04""#, r#"value="2026-09-30""#)
            .replace(r#"value="nino@example.ge""#, r#"value="nino""#)
            .replace(r#"value="Nino Beridze""#, r#"value="""#);
        let document = Document::parse(&html).unwrap();

        let failure = validator.validate_booking(&document, today()).unwrap_err();

        assert_eq!(
            failure.errors,
            vec![
                FieldError::new("fullname", FieldProblem::Required { label: "Full Name".to_string() }),
                FieldError::new("email", FieldProblem::InvalidEmail),
                FieldError::new("checkin", FieldProblem::CheckInInPast),
                FieldError::new("checkout", FieldProblem::CheckOutNotAfterCheckIn),
            ]
        );
    }

    #[rstest]
    #[gtest]
    fn same_day_checkout_is_rejected(validator: FormValidator) {
        let html = BOOKING.replace(r#"value="2026-11-04""#, r#"value="2026-11-01""#);
        let document = Document::parse(&html).unwrap();

        let failure = validator.validate_booking(&document, today()).unwrap_err();

        expect_true!(failure.has_error("checkout"));
        expect_false!(failure.has_error("checkin"));
    }

    #[rstest]
    fn contact_form_requires_every_field(validator: FormValidator) {
        let html = r#"<form id="contact-form">
<input id="firstname" required value="Giorgi"><input id="lastname" name="lastname" required>
<input type="email" id="contact-email" required value="giorgi@example.ge">
<select id="subject" required><option value="">Choose</option><option value="booking">Booking</option></select>
<textarea id="message" required>Hello</textarea></form>"#;
        let document = Document::parse(html).unwrap();

        let failure = validator.validate_contact(&document).unwrap_err();

        assert_eq!(
            failure.errors,
            vec![
                FieldError::new("lastname", FieldProblem::Required { label: "lastname".to_string() }),
                FieldError::new("subject", FieldProblem::Required { label: "subject".to_string() }),
            ]
        );
        assert_that!(failure.to_string(), eq("2 field(s) failed validation"));
    }

    #[rstest]
    fn show_errors_writes_and_clears_messages() {
        let mut document = Document::parse(BOOKING).unwrap();
        let errors = vec![FieldError::new("email", FieldProblem::InvalidEmail)];
        show_errors(&mut document, &BOOKING_FIELDS, &errors);

        let slot = document.element_by_id("email-error").unwrap();
        assert_that!(document.text_content(slot), eq("Please enter a valid email address"));

        show_errors(&mut document, &BOOKING_FIELDS, &[]);
        assert_that!(document.text_content(slot), eq(""));
    }
}
