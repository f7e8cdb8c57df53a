//! Date parsing and arithmetic for pt-BR calendar text.
//!
//! Release calendars embed reference periods in free text in three shapes:
//! "março de 2024", "Março/2024" and "3/2024". All are normalized to the
//! first day of the month.

use chrono::{Datelike, Days, NaiveDate, Weekday};

const MONTHS: [(&str, u32); 12] = [
    ("janeiro", 1),
    ("fevereiro", 2),
    ("março", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
];

/// Month number for a pt-BR month name. Accepts "marco" for "março".
pub fn month_number(name: &str) -> Option<u32> {
    let lowered = name.trim().to_lowercase();
    let normalized = lowered.replace('ç', "c");
    MONTHS
        .iter()
        .find(|(m, _)| m.replace('ç', "c") == normalized)
        .map(|&(_, n)| n)
}

pub fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Extract a reference period embedded in free text.
///
/// Tries month-name forms first ("março de 2024", "Março/2024"), then the
/// numeric "m/yyyy" form.
pub fn parse_reference_period(text: &str) -> Option<NaiveDate> {
    month_name_year(text).or_else(|| numeric_month_year(text))
}

fn month_name_year(text: &str) -> Option<NaiveDate> {
    let lowered = text.to_lowercase();
    for (name, month) in MONTHS {
        let mut search = lowered.as_str();
        while let Some(pos) = search.find(name) {
            let rest = &search[pos + name.len()..];
            let rest = rest.trim_start();
            // "março de 2024"
            if let Some(tail) = rest.strip_prefix("de ") {
                if let Some(date) = leading_year(tail.trim_start(), month) {
                    return Some(date);
                }
            }
            // "março/2024"
            if let Some(tail) = rest.strip_prefix('/') {
                if let Some(date) = leading_year(tail, month) {
                    return Some(date);
                }
            }
            search = &search[pos + name.len()..];
        }
    }
    None
}

fn leading_year(text: &str, month: u32) -> Option<NaiveDate> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    first_of_month(digits.parse().ok()?, month)
}

fn numeric_month_year(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let month_len = i - start;
            if month_len <= 2 && i < bytes.len() && bytes[i] == b'/' {
                let year_start = i + 1;
                let mut j = year_start;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j - year_start == 4 {
                    let month: u32 = text[start..i].parse().ok()?;
                    let year: i32 = text[year_start..j].parse().ok()?;
                    if (1..=12).contains(&month) {
                        return first_of_month(year, month);
                    }
                }
                i = j;
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Parse a "dd/mm/yyyy" date anywhere in the given text.
pub fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        if !bytes[start].is_ascii_digit() {
            continue;
        }
        // Only consider the start of a digit run, so "31/02" cannot be
        // re-read as "1/02".
        if start > 0 && bytes[start - 1].is_ascii_digit() {
            continue;
        }
        let candidate = &text[start..];
        for day_len in [2usize, 1] {
            if let Some(date) = parse_day_first_at(candidate, day_len) {
                return Some(date);
            }
        }
    }
    None
}

fn parse_day_first_at(text: &str, day_len: usize) -> Option<NaiveDate> {
    let mut parts = text.splitn(3, '/');
    let day = parts.next()?;
    let month = parts.next()?;
    let rest = parts.next()?;
    if day.len() != day_len || !day.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if month.len() > 2 || month.is_empty() || !month.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if year.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Advance by `n` business days (Mon-Fri; no holiday table).
pub fn add_business_days(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = n;
    while remaining > 0 {
        current = current + Days::new(1);
        match current.weekday() {
            Weekday::Sat | Weekday::Sun => {}
            _ => remaining -= 1,
        }
    }
    current
}

/// True iff `latest` falls in the calendar month immediately before `today`.
///
/// Compares full year-months so that December data is current in January and
/// data that is a year and a month old is rejected.
pub fn is_previous_month(latest: NaiveDate, today: NaiveDate) -> bool {
    let latest_ym = latest.year() * 12 + latest.month0() as i32;
    let today_ym = today.year() * 12 + today.month0() as i32;
    today_ym - latest_ym == 1
}

/// First day of the month before `today`.
pub fn previous_month(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid month start")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_names_map_to_numbers() {
        assert_eq!(month_number("janeiro"), Some(1));
        assert_eq!(month_number("Março"), Some(3));
        assert_eq!(month_number("marco"), Some(3));
        assert_eq!(month_number("dezembro"), Some(12));
        assert_eq!(month_number("janvier"), None);
    }

    #[test]
    fn reference_period_from_prose() {
        let text = "Divulgação dos dados de março de 2024 pelo departamento";
        assert_eq!(parse_reference_period(text), Some(d(2024, 3, 1)));
    }

    #[test]
    fn reference_period_from_slash_form() {
        assert_eq!(
            parse_reference_period("IPC-S - Setembro/2024"),
            Some(d(2024, 9, 1))
        );
    }

    #[test]
    fn reference_period_from_numeric_form() {
        assert_eq!(
            parse_reference_period("Período de referência: 3/2024"),
            Some(d(2024, 3, 1))
        );
        assert_eq!(
            parse_reference_period("Período de referência: 11/2023"),
            Some(d(2023, 11, 1))
        );
    }

    #[test]
    fn reference_period_absent() {
        assert_eq!(parse_reference_period("sem data por aqui"), None);
        assert_eq!(parse_reference_period("13/2024"), None);
    }

    #[test]
    fn day_first_dates() {
        assert_eq!(parse_day_first("05/04/2024"), Some(d(2024, 4, 5)));
        assert_eq!(parse_day_first("Divulgado em 7/11/2023."), Some(d(2023, 11, 7)));
        assert_eq!(parse_day_first("31/02/2024"), None);
    }

    #[test]
    fn business_days_skip_weekends() {
        // 2024-03-07 is a Thursday; +3 business days lands on Tuesday.
        assert_eq!(add_business_days(d(2024, 3, 7), 3), d(2024, 3, 12));
        // Friday + 1 lands on Monday.
        assert_eq!(add_business_days(d(2024, 3, 8), 1), d(2024, 3, 11));
        assert_eq!(add_business_days(d(2024, 3, 7), 0), d(2024, 3, 7));
    }

    #[test]
    fn previous_month_gate() {
        assert!(is_previous_month(d(2024, 2, 1), d(2024, 3, 15)));
        assert!(!is_previous_month(d(2024, 1, 1), d(2024, 3, 15)));
    }

    #[test]
    fn previous_month_gate_year_rollover() {
        // December data is current in January.
        assert!(is_previous_month(d(2023, 12, 1), d(2024, 1, 10)));
        // Same month-of-year, one year earlier, must be rejected.
        assert!(!is_previous_month(d(2022, 12, 1), d(2024, 1, 10)));
        assert!(!is_previous_month(d(2024, 1, 1), d(2024, 1, 10)));
    }

    #[test]
    fn previous_month_start() {
        assert_eq!(previous_month(d(2024, 3, 15)), d(2024, 2, 1));
        assert_eq!(previous_month(d(2024, 1, 10)), d(2023, 12, 1));
    }
}
