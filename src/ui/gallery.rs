//! Gallery filter and lightbox.

use super::set_display;
use crate::dom::{
    Document,
    NodeId,
};

/// Filter value that shows every item.
pub const FILTER_ALL: &str = "all";

/// Class of a gallery item.
const ITEM_CLASS: &str = "gallery-item";
/// Attribute holding an item's category.
const CATEGORY_ATTRIBUTE: &str = "data-category";
/// Class that shows the lightbox.
const ACTIVE_CLASS: &str = "active";

/// Lightbox overlay
const LIGHTBOX_ID: &str = "lightbox";
/// Lightbox `<img>`
const LIGHTBOX_IMAGE_ID: &str = "lightbox-image";
/// Lightbox heading
const LIGHTBOX_TITLE_ID: &str = "lightbox-title";
/// Lightbox caption
const LIGHTBOX_DESCRIPTION_ID: &str = "lightbox-description";

/// All `.gallery-item` elements in document order.
fn gallery_items(document: &Document) -> Vec<NodeId> {
    document
        .descendants(document.root())
        .into_iter()
        .filter(|id| document.has_class(*id, ITEM_CLASS))
        .collect()
}

/// Whether `item` is shown under `filter`.
fn matches_filter(document: &Document, item: NodeId, filter: &str) -> bool {
    filter == FILTER_ALL || document.attribute(item, CATEGORY_ATTRIBUTE) == Some(filter)
}

/// Shows the items of category `filter` and hides the rest.
///
/// Returns the visible items in document order.
pub fn filter_gallery(document: &mut Document, filter: &str) -> Vec<NodeId> {
    let mut visible = Vec::new();
    for item in gallery_items(document) {
        if matches_filter(document, item, filter) {
            set_display(document, item, "block");
            visible.push(item);
        } else {
            set_display(document, item, "none");
        }
    }
    tracing::debug!(filter, visible = visible.len(), "Gallery filtered");
    visible
}

/// What the lightbox shows for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightboxItem {
    pub image_src: Option<String>,
    pub image_alt: Option<String>,
    pub title: String,
    pub description: String,
}

impl LightboxItem {
    /// Reads the first `img`, `h4` and `p` of a gallery item.
    ///
    /// The text is read at call time, so it follows the current language.
    #[must_use]
    pub fn read(document: &Document, item: NodeId) -> Self {
        let first = |name: &str| {
            document.descendants(item).into_iter().find(|id| document.tag_name(*id) == Some(name))
        };
        let image = first("img");
        Self {
            image_src: image.and_then(|img| document.attribute(img, "src")).map(ToString::to_string),
            image_alt: image.and_then(|img| document.attribute(img, "alt")).map(ToString::to_string),
            title: first("h4").map(|h4| document.text_content(h4)).unwrap_or_default(),
            description: first("p").map(|p| document.text_content(p)).unwrap_or_default(),
        }
    }
}

/// Browses the items of the current filter.
#[derive(Debug, Clone, Default)]
pub struct Lightbox {
    /// Gallery items that can be browsed
    items: Vec<NodeId>,
    /// Position of the shown item in `items`
    index: usize,
    /// Whether the overlay is showing
    open: bool,
}

impl Lightbox {
    #[must_use]
    pub fn new(items: Vec<NodeId>) -> Self {
        Self { items, index: 0, open: false }
    }

    /// A lightbox over the items `filter` selects, without touching their style.
    #[must_use]
    pub fn for_filter(document: &Document, filter: &str) -> Self {
        let items = gallery_items(document)
            .into_iter()
            .filter(|item| matches_filter(document, *item, filter))
            .collect();
        Self::new(items)
    }

    #[must_use]
    pub fn items(&self) -> &[NodeId] {
        &self.items
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.items.get(self.index).copied()
    }

    /// Opens on `item`. Returns `false` if the item is not in the filtered list.
    pub fn open(&mut self, document: &mut Document, item: NodeId) -> bool {
        let Some(index) = self.items.iter().position(|candidate| *candidate == item) else {
            return false;
        };
        self.index = index;
        self.open = true;
        self.show(document);
        true
    }

    pub fn close(&mut self, document: &mut Document) {
        self.open = false;
        if let Some(lightbox) = document.element_by_id(LIGHTBOX_ID) {
            document.remove_class(lightbox, ACTIVE_CLASS);
        }
    }

    /// Moves to the next item, wrapping to the first.
    pub fn next(&mut self, document: &mut Document) {
        if self.items.is_empty() {
            return;
        }
        self.index = (self.index + 1) % self.items.len();
        self.show(document);
    }

    /// Moves to the previous item, wrapping to the last.
    pub fn previous(&mut self, document: &mut Document) {
        if self.items.is_empty() {
            return;
        }
        self.index = (self.index + self.items.len() - 1) % self.items.len();
        self.show(document);
    }

    /// Details of the current item, read from the document now.
    #[must_use]
    pub fn details(&self, document: &Document) -> Option<LightboxItem> {
        self.current().map(|item| LightboxItem::read(document, item))
    }

    /// Writes the current item into the lightbox and opens it.
    fn show(&self, document: &mut Document) {
        let Some(details) = self.details(document) else {
            return;
        };
        if let Some(image) = document.element_by_id(LIGHTBOX_IMAGE_ID) {
            if let Some(src) = &details.image_src {
                document.set_attribute(image, "src", src.as_str());
            }
            if let Some(alt) = &details.image_alt {
                document.set_attribute(image, "alt", alt.as_str());
            }
        }
        if let Some(title) = document.element_by_id(LIGHTBOX_TITLE_ID) {
            document.set_text_content(title, &details.title);
        }
        if let Some(description) = document.element_by_id(LIGHTBOX_DESCRIPTION_ID) {
            document.set_text_content(description, &details.description);
        }
        if let Some(lightbox) = document.element_by_id(LIGHTBOX_ID) {
            document.add_class(lightbox, ACTIVE_CLASS);
        } else {
            tracing::debug!("Lightbox element not in document");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    const PAGE: &str = r#"<div id="gallery-grid">
<div class="gallery-item" data-category="rooms"><img src="room.jpg" alt="Room"><h4>Deluxe Room</h4><p>Mountain view</p></div>
<div class="gallery-item" data-category="sports" style="opacity: 1"><img src="pool.jpg" alt="Pool"><h4>Pool</h4><p>Olympic size</p></div>
<div class="gallery-item" data-category="rooms"><img src="suite.jpg" alt="Suite"><h4>Suite</h4><p>Top floor</p></div>
</div>
<div id="lightbox"><img id="lightbox-image" src=""><h3 id="lightbox-title"></h3><p id="lightbox-description"></p></div>"#;

    #[fixture]
    fn document() -> Document {
        Document::parse(PAGE).unwrap()
    }

    fn displays(document: &Document) -> Vec<String> {
        gallery_items(document)
            .into_iter()
            .map(|item| document.attribute(item, "style").unwrap_or_default().to_string())
            .collect()
    }

    #[rstest]
    fn filter_by_category(mut document: Document) {
        let visible = filter_gallery(&mut document, "rooms");

        assert_that!(visible.len(), eq(2));
        assert_eq!(
            displays(&document),
            vec!["display: block", "opacity: 1; display: none", "display: block"]
        );
    }

    #[rstest]
    fn all_shows_everything_again(mut document: Document) {
        filter_gallery(&mut document, "sports");

        let visible = filter_gallery(&mut document, FILTER_ALL);

        assert_that!(visible.len(), eq(3));
        assert_eq!(
            displays(&document),
            vec!["display: block", "opacity: 1; display: block", "display: block"]
        );
    }

    #[rstest]
    fn unknown_category_hides_everything(mut document: Document) {
        assert!(filter_gallery(&mut document, "spa").is_empty());
    }

    #[rstest]
    #[gtest]
    fn lightbox_wraps_within_filter(mut document: Document) {
        let mut lightbox = Lightbox::for_filter(&document, "rooms");
        let last = lightbox.items()[1];

        expect_true!(lightbox.open(&mut document, last));
        lightbox.next(&mut document);
        assert_that!(lightbox.details(&document).unwrap().title, eq("Deluxe Room"));

        lightbox.previous(&mut document);
        assert_that!(lightbox.details(&document).unwrap().title, eq("Suite"));
    }

    #[rstest]
    #[gtest]
    fn open_writes_lightbox_elements(mut document: Document) {
        let mut lightbox = Lightbox::for_filter(&document, FILTER_ALL);
        let pool = lightbox.items()[1];

        lightbox.open(&mut document, pool);

        let title = document.element_by_id("lightbox-title").unwrap();
        let description = document.element_by_id("lightbox-description").unwrap();
        let image = document.element_by_id("lightbox-image").unwrap();
        let frame = document.element_by_id("lightbox").unwrap();
        assert_that!(document.text_content(title), eq("Pool"));
        assert_that!(document.text_content(description), eq("Olympic size"));
        assert_that!(document.attribute(image, "src"), some(eq("pool.jpg")));
        expect_true!(document.has_class(frame, "active"));

        lightbox.close(&mut document);
        expect_false!(lightbox.is_open());
        expect_false!(document.has_class(frame, "active"));
    }

    #[rstest]
    #[gtest]
    fn item_outside_filter_is_not_opened(mut document: Document) {
        let pool = Lightbox::for_filter(&document, "sports").items()[0];
        let mut lightbox = Lightbox::for_filter(&document, "rooms");

        expect_false!(lightbox.open(&mut document, pool));
        expect_false!(lightbox.is_open());
    }

    #[rstest]
    fn details_follow_document_text(mut document: Document) {
        let lightbox = Lightbox::for_filter(&document, "sports");
        let h4 = document.first_element_named("h4").unwrap();
        let pool_title = document.select(".gallery-item h4").unwrap()[1];
        document.set_text_content(pool_title, "აუზი");

        assert_that!(lightbox.details(&document).unwrap().title, eq("აუზი"));
        assert_that!(document.text_content(h4), eq("Deluxe Room"));
    }
}
