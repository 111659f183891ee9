use std::collections::HashMap;
use std::path::PathBuf;

/// A company in the study roster.
///
/// The alias list covers the brand names a filing (or the model reading it)
/// might use for the company; mention matching is case-insensitive over
/// this table.
#[derive(Debug, Clone)]
pub struct Company {
    pub ticker: String,
    pub name: String,
    /// SEC Central Index Key, as used by the EDGAR submissions API.
    pub cik: u64,
    pub aliases: Vec<String>,
}

const ROSTER: &[(&str, &str, u64, &[&str])] = &[
    (
        "BKNG",
        "Booking Holdings Inc.",
        1075531,
        &[
            "Booking Holdings",
            "Booking.com",
            "Priceline",
            "Kayak",
            "Agoda",
            "OpenTable",
        ],
    ),
    (
        "EXPE",
        "Expedia Group, Inc.",
        1324424,
        &[
            "Expedia Group",
            "Expedia",
            "Hotels.com",
            "Vrbo",
            "Orbitz",
            "Travelocity",
            "Hotwire",
        ],
    ),
    (
        "TCOM",
        "Trip.com Group Limited",
        1269238,
        &["Trip.com", "Ctrip", "Skyscanner", "Qunar"],
    ),
    (
        "TRIP",
        "Tripadvisor, Inc.",
        1526520,
        &["Tripadvisor", "TripAdvisor"],
    ),
    ("TRVG", "trivago N.V.", 1683825, &["Trivago"]),
    (
        "MMYT",
        "MakeMyTrip Limited",
        1495153,
        &["MakeMyTrip", "Goibibo"],
    ),
    ("YTRA", "Yatra Online, Inc.", 1516899, &["Yatra", "Yatra Online"]),
];

/// The travel-industry roster the study covers.
pub fn roster() -> Vec<Company> {
    ROSTER
        .iter()
        .map(|(ticker, name, cik, aliases)| Company {
            ticker: ticker.to_string(),
            name: name.to_string(),
            cik: *cik,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        })
        .collect()
}

pub const STUDY_START_YEAR: i32 = 2018;
pub const STUDY_END_YEAR: i32 = 2024;

/// Loaded once at startup and passed explicitly into each stage entry
/// point; stages never read the process environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    pub companies: Vec<Company>,
    pub start_year: i32,
    pub end_year: i32,
    /// Credential for the completion endpoint; only the mention-extraction
    /// stage requires it.
    pub openai_api_key: Option<String>,
    /// Identity string the SEC asks every EDGAR client to send; only the
    /// download stage requires it.
    pub edgar_user_agent: Option<String>,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            companies: roster(),
            start_year: STUDY_START_YEAR,
            end_year: STUDY_END_YEAR,
            openai_api_key: dotenv::var("OPENAI_API_KEY").ok(),
            edgar_user_agent: dotenv::var("EDGAR_USER_AGENT").ok(),
            data_dir: dotenv::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
        }
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    pub fn company(&self, ticker: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.ticker == ticker)
    }

    /// Lowercased alias (and ticker) -> ticker, for mention matching.
    pub fn alias_table(&self) -> HashMap<String, String> {
        let mut table = HashMap::new();
        for company in &self.companies {
            table.insert(company.ticker.to_lowercase(), company.ticker.clone());
            for alias in &company.aliases {
                table.insert(alias.to_lowercase(), company.ticker.clone());
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_tickers_are_unique() {
        let companies = roster();
        let mut tickers: Vec<_> = companies.iter().map(|c| c.ticker.as_str()).collect();
        tickers.sort();
        tickers.dedup();
        assert_eq!(tickers.len(), companies.len());
    }

    #[test]
    fn alias_table_maps_brands_to_tickers() {
        let cfg = Config {
            companies: roster(),
            start_year: STUDY_START_YEAR,
            end_year: STUDY_END_YEAR,
            openai_api_key: None,
            edgar_user_agent: None,
            data_dir: PathBuf::from("./data"),
        };
        let table = cfg.alias_table();
        assert_eq!(table.get("booking.com").map(String::as_str), Some("BKNG"));
        assert_eq!(table.get("vrbo").map(String::as_str), Some("EXPE"));
        assert_eq!(table.get("tcom").map(String::as_str), Some("TCOM"));
        assert!(table.get("delta").is_none());
    }
}
