//! Nights and price shown under the booking form.

use chrono::NaiveDate;

use super::{
    control_value,
    options,
};
use crate::dom::Document;
use crate::ui::set_display;

/// Value format of date inputs.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A priced stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingSummary {
    pub nights: u32,
    /// Total in whole dollars; zero means the room is priced on request
    pub total: u64,
}

impl BookingSummary {
    /// `None` unless `check_out` is at least one night after `check_in`.
    #[must_use]
    pub fn compute(check_in: NaiveDate, check_out: NaiveDate, price_per_night: u64) -> Option<Self> {
        let nights = u32::try_from((check_out - check_in).num_days()).ok().filter(|n| *n > 0)?;
        Some(Self { nights, total: u64::from(nights).saturating_mul(price_per_night) })
    }

    /// "1 night" / "3 nights"
    #[must_use]
    pub fn nights_label(&self) -> String {
        if self.nights == 1 { "1 night".to_string() } else { format!("{} nights", self.nights) }
    }

    /// "$1,200", or "Contact Us" when there is no price.
    #[must_use]
    pub fn total_label(&self) -> String {
        if self.total == 0 {
            "Contact Us".to_string()
        } else {
            format!("${}", group_thousands(self.total))
        }
    }
}

/// `1234567` → `1,234,567`.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Recomputes the summary from `#checkin`, `#checkout` and `#roomtype`.
///
/// The nightly price is the `data-price` of the chosen room option; a missing
/// or malformed price counts as zero. The summary elements are only written
/// when the stay is at least one night.
pub fn update_booking_summary(document: &mut Document) -> Option<BookingSummary> {
    let value = |id: &str| document.element_by_id(id).map(|control| control_value(document, control));
    let check_in = NaiveDate::parse_from_str(&value("checkin")?, DATE_FORMAT).ok()?;
    let check_out = NaiveDate::parse_from_str(&value("checkout")?, DATE_FORMAT).ok()?;
    let room_type = value("roomtype").filter(|room| !room.is_empty())?;

    let room_select = document.element_by_id("roomtype")?;
    let option = options(document, room_select)
        .into_iter()
        .find(|option| document.attribute(*option, "value") == Some(room_type.as_str()))?;
    let price = document
        .attribute(option, "data-price")
        .and_then(|price| price.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let summary = BookingSummary::compute(check_in, check_out, price)?;

    if let Some(nights) = document.element_by_id("nights-count") {
        document.set_text_content(nights, &summary.nights_label());
    }
    if let Some(total) = document.element_by_id("total-price") {
        document.set_text_content(total, &summary.total_label());
    }
    if let Some(panel) = document.element_by_id("booking-summary") {
        set_display(document, panel, "block");
    }
    Some(summary)
}
