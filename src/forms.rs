//! Booking and contact forms: field validation and the booking summary.
//!
//! Field values are read from the document the same way a browser would
//! submit them: `value` for inputs, the selected option for selects and the
//! text for textareas.

mod summary;
mod validation;

pub use summary::{
    BookingSummary,
    update_booking_summary,
};
pub use validation::{
    BOOKING_FIELDS,
    CONTACT_FIELDS,
    FieldError,
    FieldKind,
    FieldProblem,
    FormField,
    FormValidator,
    ValidationFailure,
    show_errors,
};

use crate::dom::{
    Document,
    NodeId,
};

/// `<option>` children of a select, in document order.
fn options(document: &Document, select: NodeId) -> Vec<NodeId> {
    document
        .descendants(select)
        .into_iter()
        .filter(|id| document.tag_name(*id) == Some("option"))
        .collect()
}

/// The `value` attribute, else the trimmed option text.
fn option_value(document: &Document, option: NodeId) -> String {
    document
        .attribute(option, "value")
        .map_or_else(|| document.text_content(option).trim().to_string(), ToString::to_string)
}

/// The option a select would submit: the `selected` one, else the first.
fn selected_option(document: &Document, select: NodeId) -> Option<NodeId> {
    let options = options(document, select);
    options
        .iter()
        .copied()
        .find(|option| document.has_attribute(*option, "selected"))
        .or_else(|| options.first().copied())
}

/// Current value of the form control `id`.
fn control_value(document: &Document, id: NodeId) -> String {
    match document.tag_name(id) {
        Some("select") => selected_option(document, id)
            .map(|option| option_value(document, option))
            .unwrap_or_default(),
        Some("textarea") => document.text_content(id),
        _ => document.attribute(id, "value").unwrap_or_default().to_string(),
    }
}
