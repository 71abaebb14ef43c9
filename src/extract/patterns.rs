//! Pattern rules for French legal-document and listing text.
//!
//! Each field has an ordered rule list; the first matching rule wins.
//! Rules are compiled once in `PatternRules::new`.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::types::record::PropertyType;

/// Compiled rule tables for every extractable field.
pub struct PatternRules {
    pub surface: Vec<Regex>,
    pub starting_price: Vec<Regex>,
    pub postal_code: Regex,
    pub city_after_postal: Regex,
    pub address: Vec<Regex>,
    pub rooms: Regex,
    pub floor: Regex,
    pub sale_date: Regex,
    pub sale_time: Regex,
    pub visit_section: Regex,
    pub any_date: Regex,
    pub tribunal: Regex,
    pub lawyer: Regex,
    pub case_number: Regex,
}

impl Default for PatternRules {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRules {
    pub fn new() -> Self {
        Self {
            surface: vec![
                Regex::new(
                    r"(?i)surface\s+(?:habitable|totale|utile)?\s*(?:de\s+)?(\d+(?:[.,]\d+)?)\s*m[²2]",
                )
                .unwrap(),
                Regex::new(r"(?i)d'une\s+surface\s+de\s+(\d+(?:[.,]\d+)?)\s*m[²2]").unwrap(),
                Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*m[²2]\s+(?:environ|de surface)").unwrap(),
            ],
            starting_price: vec![
                Regex::new(r"(?i)mise\s+[àa]\s+prix\s*:?\s*([\d\s\u{a0}\u{202f},.]+?)\s*(?:€|euros?)")
                    .unwrap(),
                Regex::new(r"(?i)prix\s+de\s+d[ée]part\s*:?\s*([\d\s\u{a0}\u{202f},.]+?)\s*(?:€|euros?)")
                    .unwrap(),
            ],
            // Preceded by space/comma so RG numbers like "24/00817" and
            // digit runs inside longer numbers do not false-match
            postal_code: Regex::new(r"(?:^|[\s,(])(\d{5})\b").unwrap(),
            city_after_postal: Regex::new(
                r"\b\d{5}[ \t]+([A-ZÀ-Ü][a-zà-ü\-]+(?:\s+[A-ZÀ-Ü]?[a-zà-ü\-]+)*)",
            )
            .unwrap(),
            address: vec![
                Regex::new(r"(?i)(?:situ[ée]e?s?|sise?s?|se trouvant)\s+(?:au|à|aux?)\s+(.+?)\s*\d{5}")
                    .unwrap(),
                Regex::new(r"(?i)(?:adresse|localisation)\s*:?\s*(.+?)\s*\d{5}").unwrap(),
                Regex::new(
                    r"(?i)(\d+[,\s]+(?:rue|avenue|boulevard|chemin|all[ée]e|impasse|place|quai)[^,\n]+)",
                )
                .unwrap(),
            ],
            rooms: Regex::new(r"(?i)(\d+)\s*pi[èe]ces?\s*(?:principales?)?").unwrap(),
            floor: Regex::new(r"(?i)(?:au\s+)?(\d+)(?:e|ème|er)?\s*étage").unwrap(),
            sale_date: Regex::new(
                r"(?i)(?:vente|adjudication|audience)\s+(?:du\s+|le\s+)?(\d{1,2}[/\-]\d{1,2}[/\-]\d{4}|\d{1,2}(?:er)?\s+\w+\s+\d{4})",
            )
            .unwrap(),
            sale_time: Regex::new(r"(?i)\b(\d{1,2})\s*h\s*(\d{2})?\b").unwrap(),
            visit_section: Regex::new(r"(?i)visites?\s*:?\s*([^\n]+(?:\n[^\n]*visite[^\n]*)*)")
                .unwrap(),
            any_date: Regex::new(r"(\d{1,2}[/\-]\d{1,2}[/\-]\d{4}|\d{1,2}(?:er)?\s+\w+\s+\d{4})")
                .unwrap(),
            tribunal: Regex::new(
                r"(?i)tribunal\s+(?:judiciaire|de grande instance)\s+(?:de\s+|d')?([A-Za-zà-ü\-]+)",
            )
            .unwrap(),
            lawyer: Regex::new(r"(?:Maître|Me\.?)\s+([A-ZÀ-Ü][a-zà-ü\-]+(?:\s+[A-ZÀ-Ü][a-zà-ü\-]+)*)")
                .unwrap(),
            case_number: Regex::new(r"(?:RG|n°)\s*(\d{2}/\d{3,6})").unwrap(),
        }
    }

    /// First surface rule that matches.
    pub fn match_surface(&self, text: &str) -> Option<f64> {
        self.surface
            .iter()
            .find_map(|rule| rule.captures(text))
            .and_then(|caps| caps[1].replace(',', ".").parse().ok())
    }

    /// First starting-price rule that matches.
    pub fn match_starting_price(&self, text: &str) -> Option<f64> {
        self.starting_price
            .iter()
            .find_map(|rule| rule.captures(text))
            .and_then(|caps| parse_price(&caps[1]))
    }

    /// First address rule that matches.
    pub fn match_address(&self, text: &str) -> Option<String> {
        self.address
            .iter()
            .find_map(|rule| rule.captures(text))
            .map(|caps| caps[1].trim().trim_end_matches(',').to_string())
            .filter(|a| !a.is_empty())
    }
}

/// Parse a French-formatted price: "1 234 567,89", "185.000", "250 000".
/// Spaces (including non-breaking) group thousands; a trailing comma or
/// dot group of 1-2 digits is the decimal part.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let mut normalized = cleaned.replace(',', ".");
    // Keep only the last dot as decimal separator when it looks like one;
    // otherwise every dot is a thousands separator
    if let Some(last) = normalized.rfind('.') {
        let decimals = normalized.len() - last - 1;
        if decimals == 3 {
            normalized = normalized.replace('.', "");
        } else {
            let (head, tail) = normalized.split_at(last);
            normalized = format!("{}{}", head.replace('.', ""), tail);
        }
    }
    normalized.parse().ok().filter(|v: &f64| *v > 0.0)
}

const FRENCH_MONTHS: [(&str, u32); 12] = [
    ("janvier", 1),
    ("février", 2),
    ("mars", 3),
    ("avril", 4),
    ("mai", 5),
    ("juin", 6),
    ("juillet", 7),
    ("août", 8),
    ("septembre", 9),
    ("octobre", 10),
    ("novembre", 11),
    ("décembre", 12),
];

/// Parse a date in numeric ("12/03/2026", "12-03-2026") or written
/// French form ("12 mars 2026", "1er mars 2026").
pub fn parse_french_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    for sep in ['/', '-'] {
        let parts: Vec<&str> = text.split(sep).collect();
        if parts.len() == 3 {
            if let (Ok(day), Ok(month), Ok(year)) = (
                parts[0].trim().parse::<u32>(),
                parts[1].trim().parse::<u32>(),
                parts[2].trim().parse::<i32>(),
            ) {
                return NaiveDate::from_ymd_opt(year, month, day);
            }
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() == 3 {
        let day: u32 = words[0].trim_end_matches("er").parse().ok()?;
        let month_word = words[1].to_lowercase();
        let month = FRENCH_MONTHS
            .iter()
            .find(|(name, _)| *name == month_word || name.starts_with(month_word.as_str()))
            .map(|(_, n)| *n)?;
        let year: i32 = words[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Parse a visit slot "12/03/2026 à 14h30" into a date-time; a missing
/// time defaults to noon so slots stay ordered within a day.
pub fn parse_visit_slot(date_text: &str, time_text: Option<(u32, u32)>) -> Option<NaiveDateTime> {
    let date = parse_french_date(date_text)?;
    let (hour, minute) = time_text.unwrap_or((12, 0));
    date.and_hms_opt(hour, minute, 0)
}

/// Detect the property category from keywords, most specific first.
pub fn detect_property_type(text: &str) -> Option<PropertyType> {
    let lower = text.to_lowercase();
    if lower.contains("local commercial") || lower.contains("local à usage commercial") {
        Some(PropertyType::Commercial)
    } else if lower.contains("appartement") || lower.contains("studio") {
        Some(PropertyType::Apartment)
    } else if lower.contains("maison") || lower.contains("villa") || lower.contains("pavillon") {
        Some(PropertyType::House)
    } else if lower.contains("terrain") {
        Some(PropertyType::Land)
    } else if lower.contains("parking") || lower.contains("garage") || lower.contains("box") {
        Some(PropertyType::Parking)
    } else {
        None
    }
}

/// Detect the occupation status ("libre", "occupé").
pub fn detect_occupation(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if lower.contains("libre de toute occupation") || lower.contains("libre d'occupation") {
        Some("libre".to_string())
    } else if lower.contains("occupé") || lower.contains("loué") {
        Some("occupé".to_string())
    } else {
        None
    }
}
