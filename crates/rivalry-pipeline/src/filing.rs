use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// The header fields live in the first few KB of a full submission.
const HEADER_WINDOW: usize = 5000;

/// Fields pulled from the SGML header of a full EDGAR submission.
///
/// Every field is optional; the date-extraction stage decides what
/// "resolved" means.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilingHeader {
    pub accession: Option<String>,
    pub form_type: Option<String>,
    pub filed_date: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub cik: Option<String>,
    pub fiscal_year_end: Option<String>,
}

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid header pattern"))
}

fn field<'t>(cell: &'static OnceLock<Regex>, pattern: &str, text: &'t str) -> Option<&'t str> {
    re(cell, pattern)
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// `YYYYMMDD` as printed in EDGAR headers.
fn date8(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

pub fn parse_header(raw: &str) -> FilingHeader {
    static ACCESSION: OnceLock<Regex> = OnceLock::new();
    static FORM: OnceLock<Regex> = OnceLock::new();
    static FILED: OnceLock<Regex> = OnceLock::new();
    static PERIOD: OnceLock<Regex> = OnceLock::new();
    static NAME: OnceLock<Regex> = OnceLock::new();
    static CIK: OnceLock<Regex> = OnceLock::new();
    static FYE: OnceLock<Regex> = OnceLock::new();

    let end = floor_char_boundary(raw, HEADER_WINDOW);
    let header = &raw[..end];

    FilingHeader {
        accession: field(&ACCESSION, r"ACCESSION NUMBER:\s+(\S+)", header).map(String::from),
        form_type: field(&FORM, r"CONFORMED SUBMISSION TYPE:\s+(\S+)", header).map(String::from),
        filed_date: field(&FILED, r"FILED AS OF DATE:\s+(\d{8})", header).and_then(date8),
        period_end: field(&PERIOD, r"CONFORMED PERIOD OF REPORT:\s+(\d{8})", header)
            .and_then(date8),
        company_name: field(&NAME, r"COMPANY CONFORMED NAME:\s+(.+)", header).map(String::from),
        cik: field(&CIK, r"CENTRAL INDEX KEY:\s+(\d+)", header).map(String::from),
        fiscal_year_end: field(&FYE, r"FISCAL YEAR END:\s+(\d{4})", header).map(String::from),
    }
}

/// Strip the SGML header and markup from a full submission, leaving
/// whitespace-collapsed document text for the mention extractor.
pub fn clean_body(raw: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    static WS: OnceLock<Regex> = OnceLock::new();

    let body = match raw.find("</SEC-HEADER>") {
        Some(idx) => &raw[idx + "</SEC-HEADER>".len()..],
        None => raw,
    };

    let stripped = re(&TAG, r"<[^>]+>").replace_all(body, " ");
    let collapsed = re(&WS, r"\s+").replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Largest byte index `<= at` that is a char boundary of `s`.
pub(crate) fn floor_char_boundary(s: &str, at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    let mut idx = at;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
