use serde::{Deserialize, Serialize};

const NOT_AVAILABLE: &str = "N/A";

/// Overview length used on movie cards.
pub const CARD_OVERVIEW_CHARS: usize = 150;

pub fn format_runtime(minutes: Option<u32>) -> String {
    let minutes = match minutes {
        Some(m) if m > 0 => m,
        _ => return NOT_AVAILABLE.to_string(),
    };
    let (hours, mins) = (minutes / 60, minutes % 60);
    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Whole US dollars with thousands separators, e.g. `$185,000,000`.
pub fn format_currency(amount: u64) -> String {
    if amount == 0 {
        return NOT_AVAILABLE.to_string();
    }
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn release_year(date: Option<&str>) -> String {
    date.and_then(|d| d.split('-').next())
        .filter(|y| !y.is_empty())
        .map(|y| y.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_rating(rating: f64) -> String {
    if rating <= 0.0 {
        return NOT_AVAILABLE.to_string();
    }
    format!("{rating:.1}")
}

pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

pub fn language_name(code: &str) -> String {
    let name = match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ru" => "Russian",
        "pt" => "Portuguese",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "tr" => "Turkish",
        "pl" => "Polish",
        "nl" => "Dutch",
        "sv" => "Swedish",
        "da" => "Danish",
        "no" => "Norwegian",
        "fi" => "Finnish",
        "" => return "Unknown".to_string(),
        other => return other.to_uppercase(),
    };
    name.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageItem {
    Page(u32),
    Gap,
}

/// Page links around `current`: always the first and last page, `delta`
/// neighbours on each side, and a gap marker where pages are skipped.
pub fn generate_pagination(current: u32, total: u32, delta: u32) -> Vec<PageItem> {
    if total == 0 {
        return Vec::new();
    }
    let mut items = vec![PageItem::Page(1)];
    if current.saturating_sub(delta) > 2 {
        items.push(PageItem::Gap);
    }

    let start = current.saturating_sub(delta).max(2);
    let end = current.saturating_add(delta).min(total.saturating_sub(1));
    items.extend((start..=end).map(PageItem::Page));

    if current.saturating_add(delta) < total.saturating_sub(1) {
        items.push(PageItem::Gap);
        items.push(PageItem::Page(total));
    } else if total > 1 {
        items.push(PageItem::Page(total));
    }
    items
}
