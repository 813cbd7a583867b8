//! A small CSS selector engine.
//!
//! Supported: type and universal selectors, `#id`, `.class`, `[attr]`,
//! `[attr=value]`, `:first-child`, `:last-child`, `:nth-child(n)`,
//! `:nth-of-type(n)`, descendant and child (`>`) combinators, and selector
//! lists. Anything else is rejected at parse time, notably text filters such
//! as `:contains(...)`, which are not CSS.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{
    Document,
    NodeId,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
    #[error("Unexpected {found} at offset {offset}")]
    Unexpected { found: String, offset: usize },
    #[error("Invalid position '{0}' (expected a positive integer)")]
    InvalidPosition(String),
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Selector text as written, for diagnostics.
    source: String,
    /// Alternatives separated by `,`.
    alternatives: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators, leftmost first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    /// Each compound with the combinator linking it to the previous one.
    parts: Vec<(Combinator, Compound)>,
}

/// Relation between two compounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
}

/// A type selector with its conditions, e.g. `a.btn[href]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    /// Lowercase tag name, `None` for `*` or no type selector.
    tag: Option<String>,
    /// Conditions that must all hold.
    conditions: Vec<Condition>,
}

/// One test on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `[name]`, or `[name="value"]` when `value` is set
    Attribute {
        /// Lowercase attribute name
        name: String,
        /// Exact value to compare
        value: Option<String>,
    },
    /// `:first-child`
    FirstChild,
    /// `:last-child`
    LastChild,
    /// 1-based position among element siblings.
    NthChild(usize),
    /// 1-based position among element siblings of the same type.
    NthOfType(usize),
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = SelectorParser { input, pos: 0 };
        let alternatives = parser.parse_list()?;
        Ok(Self { source: input.trim().to_string(), alternatives })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the element `id` matches any alternative.
    #[must_use]
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.alternatives.iter().any(|alternative| alternative.matches(doc, id))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl ComplexSelector {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.parts.len().checked_sub(1).is_some_and(|last| self.matches_at(doc, id, last))
    }

    /// Matches `parts[..=index]` with `parts[index]` anchored at `id`.
    fn matches_at(&self, doc: &Document, id: NodeId, index: usize) -> bool {
        let Some((combinator, compound)) = self.parts.get(index) else {
            return false;
        };
        if !compound.matches(doc, id) {
            return false;
        }
        let Some(previous) = index.checked_sub(1) else {
            return true;
        };
        match combinator {
            Combinator::Child => doc
                .parent(id)
                .filter(|p| doc.element(*p).is_some())
                .is_some_and(|p| self.matches_at(doc, p, previous)),
            Combinator::Descendant => {
                doc.ancestors(id).into_iter().any(|a| self.matches_at(doc, a, previous))
            }
        }
    }
}

impl Compound {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(element) = doc.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag
            && element.name != *tag
        {
            return false;
        }
        self.conditions.iter().all(|condition| match condition {
            Condition::Id(value) => element.attr("id") == Some(value.as_str()),
            Condition::Class(class) => element.has_class(class),
            Condition::Attribute { name, value: None } => element.has_attr(name),
            Condition::Attribute { name, value: Some(value) } => {
                element.attr(name) == Some(value.as_str())
            }
            Condition::FirstChild => sibling_position(doc, id, false) == Some(1),
            Condition::LastChild => doc
                .parent(id)
                .is_some_and(|p| doc.element_children(p).last().copied() == Some(id)),
            Condition::NthChild(n) => sibling_position(doc, id, false) == Some(*n),
            Condition::NthOfType(n) => sibling_position(doc, id, true) == Some(*n),
        })
    }
}

/// 1-based position of `id` among its element siblings.
fn sibling_position(doc: &Document, id: NodeId, same_type: bool) -> Option<usize> {
    let parent = doc.parent(id)?;
    let name = doc.tag_name(id)?;
    doc.element_children(parent)
        .into_iter()
        .filter(|s| !same_type || doc.tag_name(*s) == Some(name))
        .position(|s| s == id)
        .map(|p| p + 1)
}

/// Recursive-descent parser over the selector text.
struct SelectorParser<'a> {
    /// Selector text
    input: &'a str,
    /// Byte offset of the next character
    pos: usize,
}

impl SelectorParser<'_> {
    /// Next character, not consumed.
    fn peek(&self) -> Option<char> {
        self.input.get(self.pos..)?.chars().next()
    }

    /// Consumes the next character.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace, returning whether any was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    /// Error pointing at the current position.
    fn unexpected(&self) -> SelectorError {
        let found = self.peek().map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));
        SelectorError::Unexpected { found, offset: self.pos }
    }

    /// Consumes `expected` or fails.
    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Reads a possibly empty identifier.
    fn identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek()
            && (c.is_alphanumeric() || c == '-' || c == '_')
        {
            ident.push(c);
            self.bump();
        }
        ident
    }

    /// Reads a non-empty identifier.
    fn required_identifier(&mut self) -> Result<String, SelectorError> {
        let ident = self.identifier();
        if ident.is_empty() { Err(self.unexpected()) } else { Ok(ident) }
    }

    /// Comma separated selector list.
    fn parse_list(&mut self) -> Result<Vec<ComplexSelector>, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                None => break,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(alternatives)
    }

    /// Compounds joined by combinators.
    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            self.skip_whitespace();
            let compound = self.parse_compound()?;
            parts.push((combinator, compound));

            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    combinator = Combinator::Child;
                }
                Some(',') | None => break,
                Some(_) if had_whitespace => combinator = Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(ComplexSelector { parts })
    }

    /// Type selector followed by conditions.
    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                universal = true;
            }
            Some(c) if c.is_alphabetic() => {
                compound.tag = Some(self.identifier().to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.conditions.push(Condition::Id(self.required_identifier()?));
                }
                Some('.') => {
                    self.bump();
                    compound.conditions.push(Condition::Class(self.required_identifier()?));
                }
                Some('[') => {
                    self.bump();
                    compound.conditions.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.bump();
                    compound.conditions.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }

        if compound.tag.is_none() && compound.conditions.is_empty() && !universal {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    /// `[name]` or `[name="value"]`.
    fn parse_attribute(&mut self) -> Result<Condition, SelectorError> {
        self.skip_whitespace();
        let name = self.required_identifier()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = if self.peek() == Some('=') {
            self.bump();
            self.skip_whitespace();
            let value = self.parse_value()?;
            self.skip_whitespace();
            Some(value)
        } else {
            None
        };
        self.expect(']')?;
        Ok(Condition::Attribute { name, value })
    }

    /// Quoted or bare attribute value.
    fn parse_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => return Ok(value),
                        Some(c) => value.push(c),
                        None => return Err(self.unexpected()),
                    }
                }
            }
            _ => self.required_identifier(),
        }
    }

    /// Supported structural pseudo-classes.
    fn parse_pseudo(&mut self) -> Result<Condition, SelectorError> {
        let name = self.required_identifier()?.to_ascii_lowercase();
        match name.as_str() {
            "first-child" => Ok(Condition::FirstChild),
            "last-child" => Ok(Condition::LastChild),
            "nth-child" => Ok(Condition::NthChild(self.parse_position()?)),
            "nth-of-type" => Ok(Condition::NthOfType(self.parse_position()?)),
            _ => Err(SelectorError::UnsupportedPseudo(name)),
        }
    }

    /// `(n)` with n ≥ 1.
    fn parse_position(&mut self) -> Result<usize, SelectorError> {
        self.expect('(')?;
        let mut argument = String::new();
        loop {
            match self.bump() {
                Some(')') => break,
                Some(c) => argument.push(c),
                None => return Err(self.unexpected()),
            }
        }
        let argument = argument.trim();
        match argument.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(SelectorError::InvalidPosition(argument.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    const PAGE: &str = r#"<section class="facilities">
  <div class="section-header"><span class="badge">Facilities</span><h2>World-class</h2></div>
  <div class="facility-card"><h3>Football</h3><div class="facility-content"><p>Pitch</p></div></div>
  <div class="facility-card"><h3>Tennis</h3><div class="facility-content"><p>Court</p></div></div>
</section>
<div class="stats"><span class="stat-label">Guests</span><span class="stat-label">Years</span></div>
<form id="booking-form"><label for="checkin">Check-in</label><input id="checkin" type="date"></form>"#;

    fn texts(css: &str) -> Vec<String> {
        let document = Document::parse(PAGE).unwrap();
        document.select(css).unwrap().into_iter().map(|n| document.text_content(n)).collect()
    }

    #[rstest]
    #[case::tag("h3", &["Football", "Tennis"])]
    #[case::class(".badge", &["Facilities"])]
    #[case::descendant(".facilities .section-header h2", &["World-class"])]
    #[case::child(".facility-card > h3", &["Football", "Tennis"])]
    #[case::child_mismatch(".facility-card > p", &[])]
    #[case::nth_child(".facility-card:nth-child(3) h3", &["Tennis"])]
    #[case::nth_of_type(".stat-label:nth-of-type(2)", &["Years"])]
    #[case::first_child(".stat-label:first-child", &["Guests"])]
    #[case::last_child(".stat-label:last-child", &["Years"])]
    #[case::attribute_value(r#"label[for="checkin"]"#, &["Check-in"])]
    #[case::list("h2, .stat-label", &["World-class", "Guests", "Years"])]
    fn test_matching(#[case] css: &str, #[case] expected: &[&str]) {
        assert_eq!(texts(css), expected.iter().map(ToString::to_string).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_id_and_attribute_presence() {
        let document = Document::parse(PAGE).unwrap();

        let found = document.select("#booking-form input[type]").unwrap();

        assert_that!(found, len(eq(1)));
        assert_that!(document.attribute(found[0], "id"), some(eq("checkin")));
    }

    #[rstest]
    #[case::contains(r#".info-card h4:contains("Room Packages")"#, SelectorError::UnsupportedPseudo("contains".to_string()))]
    #[case::hover("a:hover", SelectorError::UnsupportedPseudo("hover".to_string()))]
    #[case::empty("   ", SelectorError::Empty)]
    #[case::zero_position("li:nth-child(0)", SelectorError::InvalidPosition("0".to_string()))]
    #[case::formula("li:nth-child(2n+1)", SelectorError::InvalidPosition("2n+1".to_string()))]
    fn test_rejected_selectors(#[case] css: &str, #[case] expected: SelectorError) {
        assert_eq!(Selector::parse(css).unwrap_err(), expected);
    }

    #[rstest]
    #[case::dangling_combinator(".a >")]
    #[case::unclosed_attribute("[data-translate")]
    #[case::trailing_comma("h1,")]
    fn test_syntax_errors(#[case] css: &str) {
        assert!(matches!(Selector::parse(css), Err(SelectorError::Unexpected { .. })));
    }
}
