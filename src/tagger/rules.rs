//! Tagging rules and the built-in rule set of the resort site.

use serde::{
    Deserialize,
    Serialize,
};

/// How elements get bound to translation keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TagRule {
    /// Every match of `selector` gets `key`.
    Selector {
        selector: String,
        key: String,
        /// Bind through the HTML marker instead of the text marker.
        #[serde(default)]
        html: bool,
    },
    /// Match `start + i` of `selector` gets `keys[i]`.
    Sequence {
        selector: String,
        keys: Vec<String>,
        #[serde(default)]
        start: usize,
        /// Skip the rule unless at least this many elements match.
        #[serde(default)]
        min_count: usize,
    },
    /// Inside the `index`-th match of `container`, the first `target` gets `key`.
    Nested {
        container: String,
        index: usize,
        target: String,
        key: String,
        #[serde(default)]
        min_count: usize,
        #[serde(default)]
        html: bool,
    },
}

impl TagRule {
    #[must_use]
    pub fn selector(selector: &str, key: &str) -> Self {
        Self::Selector { selector: selector.to_string(), key: key.to_string(), html: false }
    }

    #[must_use]
    pub fn sequence(selector: &str, keys: &[&str]) -> Self {
        Self::Sequence {
            selector: selector.to_string(),
            keys: keys.iter().map(ToString::to_string).collect(),
            start: 0,
            min_count: 0,
        }
    }

    #[must_use]
    pub fn nested(container: &str, index: usize, target: &str, key: &str) -> Self {
        Self::Nested {
            container: container.to_string(),
            index,
            target: target.to_string(),
            key: key.to_string(),
            min_count: 0,
            html: false,
        }
    }

    /// Requires at least `count` matches of the rule's collection.
    #[must_use]
    pub fn with_min_count(mut self, count: usize) -> Self {
        match &mut self {
            Self::Sequence { min_count, .. } | Self::Nested { min_count, .. } => *min_count = count,
            Self::Selector { .. } => {}
        }
        self
    }

    /// Starts a sequence at match `offset`.
    #[must_use]
    pub fn starting_at(mut self, offset: usize) -> Self {
        if let Self::Sequence { start, .. } = &mut self {
            *start = offset;
        }
        self
    }

    /// Binds through the HTML marker.
    #[must_use]
    pub fn as_html(mut self) -> Self {
        match &mut self {
            Self::Selector { html, .. } | Self::Nested { html, .. } => *html = true,
            Self::Sequence { .. } => {}
        }
        self
    }

    /// The selector the rule queries first.
    #[must_use]
    pub fn primary_selector(&self) -> &str {
        match self {
            Self::Selector { selector, .. } | Self::Sequence { selector, .. } => selector,
            Self::Nested { container, .. } => container,
        }
    }
}

/// Facility cards: (title key, description key).
const FACILITY_CARDS: [(&str, &str); 4] = [
    ("football_title", "football_description"),
    ("tennis_title", "tennis_description"),
    ("gym_title", "gym_description"),
    ("pool_title", "pool_description"),
];

/// Additional feature items: (title key, description key).
const FEATURE_ITEMS: [(&str, &str); 3] = [
    ("access_24_7", "access_description"),
    ("expert_staff", "expert_description"),
    ("premium_equipment", "premium_description"),
];

/// Section headers: (section selector, key prefix).
const SECTION_HEADERS: [(&str, &str); 5] = [
    (".gallery", "gallery"),
    (".reviews", "reviews"),
    (".booking", "booking"),
    (".contact", "contact"),
    (".facilities", "facilities"),
];

/// Rules that bind the authored resort pages to translation keys.
#[must_use]
pub fn resort_rules() -> Vec<TagRule> {
    let mut rules = vec![
        // Labels sit one per `.stat` container, so they are counted across the page.
        TagRule::sequence(
            ".stat-label",
            &["stat_happy_guests", "stat_years_experience", "stat_satisfaction"],
        )
        .with_min_count(3),
    ];

    for (section, prefix) in SECTION_HEADERS {
        rules.push(TagRule::selector(
            &format!("{section} .section-header .badge"),
            &format!("{prefix}_badge"),
        ));
        rules.push(TagRule::selector(
            &format!("{section} .section-header h2"),
            &format!("{prefix}_title"),
        ));
        rules.push(TagRule::selector(
            &format!("{section} .section-header p"),
            &format!("{prefix}_description"),
        ));
    }

    for (index, (title, description)) in FACILITY_CARDS.into_iter().enumerate() {
        rules.push(TagRule::nested(".facility-card", index, "h3", title).with_min_count(4));
        rules.push(
            TagRule::nested(".facility-card", index, ".facility-content p", description)
                .with_min_count(4),
        );
    }

    for (index, (title, description)) in FEATURE_ITEMS.into_iter().enumerate() {
        let container = ".additional-features .feature-item";
        rules.push(TagRule::nested(container, index, "h4", title).with_min_count(3));
        rules.push(TagRule::nested(container, index, "p", description).with_min_count(3));
    }

    rules.extend([
        TagRule::sequence(
            ".filter-btn",
            &["all_photos", "football_field", "tennis_court", "fitness_center", "swimming_pool"],
        )
        .with_min_count(5),
        TagRule::sequence(".rating-label", &["overall_rating", "happy_guests", "would_recommend"])
            .with_min_count(3),
        TagRule::selector(".reviews-cta h3", "ready_experience"),
        TagRule::selector(".reviews-cta p", "ready_description"),
        TagRule::sequence(".reviews-cta .btn", &["book_your_stay", "view_gallery"]).with_min_count(2),
        // Contact card first so the generic form-card rule does not claim its heading.
        TagRule::selector(".contact .form-card h3", "send_message"),
        TagRule::selector(".form-card h3", "reservation_details"),
        TagRule::selector(".form-card p", "reservation_subtitle"),
        TagRule::sequence(
            ".booking-form label",
            &[
                "checkin_date",
                "checkout_date",
                "number_guests",
                "room_type",
                "full_name",
                "email_address",
                "phone_number",
                "special_requests",
            ],
        ),
        TagRule::selector("#submit-btn span", "reserve_now"),
        TagRule::nested(".info-card", 0, "h4", "room_packages"),
        TagRule::nested(".info-card", 1, "h4", "contact_information"),
        TagRule::nested(".info-card", 2, "h4", "included_amenities"),
        TagRule::sequence(
            ".contact-form label",
            &["first_name", "last_name", "email_address", "phone_number", "subject", "message"],
        ),
        TagRule::selector(".contact-form .btn", "send_message_btn"),
        TagRule::sequence(".contact-detail h5", &["address", "phone", "email", "hours"]),
        TagRule::nested(".contact-detail", 0, ".contact-text p", "address_text").as_html(),
        TagRule::nested(".contact-detail", 1, ".contact-text p", "phone_text").as_html(),
        TagRule::nested(".contact-detail", 3, ".contact-text p", "hours_text").as_html(),
        TagRule::selector("#Location-info h4", "getting_here"),
        TagRule::sequence(".transport-item strong", &["airport", "driving", "public_transit"]),
        TagRule::selector(".emergency-card h3", "emergency_contact"),
        TagRule::selector(".emergency-card p", "emergency_description"),
        // The first emergency button shows the phone number and stays as authored.
        TagRule::sequence(".emergency-btn", &["chat_support"]).starting_at(1).with_min_count(2),
    ]);

    rules
}
