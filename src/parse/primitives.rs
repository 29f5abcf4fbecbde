//! Locale-tolerant token parsers for Polish page text.

use chrono::NaiveDate;

const NBSP: char = '\u{00A0}';

/// `"12 345"` / `"12\u{a0}345"` → `12345`. Surrounding whitespace is ignored.
pub fn parse_grouped_integer(text: &str) -> Option<i64> {
    let digits: String = text.trim().chars().filter(|&c| c != ' ' && c != NBSP).collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `"67,89"` → `67.89`.
pub fn parse_locale_float(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.replace(',', ".").parse().ok()
}

/// Polish month names in the genitive, as used in "12 marca 2024".
const PL_MONTHS: &[(&str, u32)] = &[
    ("stycznia", 1),
    ("lutego", 2),
    ("marca", 3),
    ("kwietnia", 4),
    ("maja", 5),
    ("czerwca", 6),
    ("lipca", 7),
    ("sierpnia", 8),
    ("września", 9),
    ("wrzesnia", 9),
    ("października", 10),
    ("pazdziernika", 10),
    ("listopada", 11),
    ("grudnia", 12),
];

pub fn resolve_month_name(name: &str) -> Option<u32> {
    let name = name.trim().to_lowercase();
    PL_MONTHS.iter().find(|(n, _)| *n == name).map(|&(_, m)| m)
}

/// Build a date from regex captures; `None` on any bad part, including
/// a day that does not exist in that month.
pub fn compose_date(day: Option<&str>, month_name: Option<&str>, year: Option<&str>) -> Option<NaiveDate> {
    let day: u32 = day?.trim().parse().ok()?;
    let month = resolve_month_name(month_name?)?;
    let year: i32 = year?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Decode backslash escapes the way a JS/JSON string literal would.
///
/// Handles `\uXXXX` (surrogate pairs joined), the usual single-character
/// escapes, and keeps anything it does not recognise verbatim.
pub fn unescape_backslashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            '"' | '\'' | '\\' | '/' => out.push(next),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                match decode_unicode_escape(&hex, &mut chars) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

fn decode_unicode_escape(
    hex: &str,
    rest: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Option<char> {
    if hex.len() != 4 {
        return None;
    }
    let high = u32::from_str_radix(hex, 16).ok()?;
    if !(0xD800..0xDC00).contains(&high) {
        return char::from_u32(high);
    }
    // High surrogate: only valid when a `\uDC00..\uDFFF` follows.
    let mut lookahead = rest.clone();
    if lookahead.next() != Some('\\') || lookahead.next() != Some('u') {
        return None;
    }
    let low_hex: String = lookahead.by_ref().take(4).collect();
    let low = u32::from_str_radix(&low_hex, 16).ok()?;
    if !(0xDC00..0xE000).contains(&low) {
        return None;
    }
    *rest = lookahead;
    char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
}
