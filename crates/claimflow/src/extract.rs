//! Heuristic field extraction over raw OCR text.
//!
//! All patterns are compiled once at construction. Extraction is a pure
//! function of the input text, so repeated runs over the same text yield
//! identical fields.

use chrono::NaiveDate;
use regex::Regex;

use crate::claim::ClaimFields;

/// Compiled extraction patterns for claimant name, date and amount.
pub struct FieldExtractor {
    name_pattern: Regex,
    name_tail_pattern: Regex,
    date_pattern: Regex,
    amount_pattern: Regex,
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self {
            name_pattern: Regex::new(
                r"(?im)^(?:name|claimant|applicant|patient|submitted by)\s*[:\-\s]\s*(.*)$",
            )
            .expect("static pattern is valid"),
            name_tail_pattern: Regex::new(r"(?i)\s+(?:date|policy|claim|service|report|id).*")
                .expect("static pattern is valid"),
            date_pattern: Regex::new(r"\b(\d{1,2})[-/.\s](\d{1,2})[-/.\s](\d{2,4})\b")
                .expect("static pattern is valid"),
            // Misspelled labels show up in OCR output often enough to match.
            amount_pattern: Regex::new(
                r"(?i)(?:total amount|balance duc|balance due|amount due|total charges|total chirges|payment|total|amount|charge)\s*[:\-\s]?\s*([$€£₹])?\s*([\d,]+\.\d{2})",
            )
            .expect("static pattern is valid"),
        }
    }

    /// Derives structured fields from recognized text.
    pub fn extract(&self, text: &str) -> ClaimFields {
        let (amount, currency) = self.extract_amount(text);
        ClaimFields {
            name: self.extract_name(text),
            date: self.extract_date(text),
            amount,
            currency,
        }
    }

    /// First labeled line wins. Trailing label runs (a date or policy
    /// number crammed onto the same line) are cut off.
    fn extract_name(&self, text: &str) -> Option<String> {
        let captures = self.name_pattern.captures(text)?;
        let raw = captures.get(1).map_or("", |m| m.as_str());
        let cleaned = self.name_tail_pattern.replace(raw, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.to_string())
        }
    }

    /// First date-like substring, read as month/day/year. Two-digit
    /// years are taken as 20xx. Impossible dates yield nothing.
    fn extract_date(&self, text: &str) -> Option<NaiveDate> {
        let captures = self.date_pattern.captures(text)?;
        let month: u32 = captures.get(1)?.as_str().parse().ok()?;
        let day: u32 = captures.get(2)?.as_str().parse().ok()?;
        let mut year: i32 = captures.get(3)?.as_str().parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Largest labeled monetary value wins; ties keep the first seen.
    /// The currency symbol is taken from the winning match only.
    fn extract_amount(&self, text: &str) -> (Option<f64>, Option<String>) {
        let mut best: Option<(f64, Option<String>)> = None;
        for captures in self.amount_pattern.captures_iter(text) {
            let Some(digits) = captures.get(2) else {
                continue;
            };
            let Ok(value) = digits.as_str().replace(',', "").parse::<f64>() else {
                continue;
            };
            let beats = match &best {
                Some((current, _)) => value > *current,
                None => true,
            };
            if beats {
                let symbol = captures.get(1).map(|m| m.as_str().to_string());
                best = Some((value, symbol));
            }
        }
        match best {
            Some((value, symbol)) => (Some(value), symbol),
            None => (None, None),
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}
