use crate::filing::floor_char_boundary;
use regex::Regex;
use std::sync::OnceLock;

/// Picks the part of a cleaned filing body worth sending to the model.
///
/// Filing formats drift across companies and years, so the boundary is a
/// trait: the stage takes `&dyn ExcerptStrategy` and never hard-codes the
/// section heuristic.
pub trait ExcerptStrategy: Send + Sync {
    fn select<'a>(&self, body: &'a str) -> &'a str;
}

/// Jump to the business-description section when a known marker is found;
/// otherwise fall back to a prefix of the document. Either way the excerpt
/// is capped at `budget` bytes to respect the model's input window.
pub struct BusinessSection {
    pub budget: usize,
}

impl Default for BusinessSection {
    fn default() -> Self {
        // roughly what fits alongside the prompt scaffolding
        Self { budget: 15_000 }
    }
}

/// Section headings as they appear in 10-Ks and 20-Fs respectively.
fn section_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)item 1\. business|item 4\. information on the company")
            .expect("valid section pattern")
    })
}

impl ExcerptStrategy for BusinessSection {
    fn select<'a>(&self, body: &'a str) -> &'a str {
        let start = section_marker().find(body).map_or(0, |m| m.start());
        let end = floor_char_boundary(body, start + self.budget.min(body.len() - start));
        &body[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumps_to_business_section() {
        let body = format!(
            "{}ITEM 1. BUSINESS We operate online travel brands.",
            "front matter ".repeat(50)
        );
        let strategy = BusinessSection::default();
        let excerpt = strategy.select(&body);
        assert!(excerpt.starts_with("ITEM 1. BUSINESS"));
    }

    #[test]
    fn falls_back_to_prefix_without_marker() {
        let body = "x".repeat(20_000);
        let strategy = BusinessSection::default();
        let excerpt = strategy.select(&body);
        assert_eq!(excerpt.len(), 15_000);
        assert!(body.starts_with(excerpt));
    }

    #[test]
    fn recognises_the_20f_heading() {
        let body = "preamble Item 4. Information on the Company trailing text";
        let strategy = BusinessSection::default();
        assert!(strategy.select(body).starts_with("Item 4."));
    }

    #[test]
    fn budget_respects_char_boundaries() {
        let body = format!("Item 1. Business {}", "€".repeat(10_000));
        let strategy = BusinessSection { budget: 20 };
        // must not panic on a multi-byte boundary
        let excerpt = strategy.select(&body);
        assert!(excerpt.len() <= 20);
    }
}
