use std::sync::LazyLock;

use regex::Regex;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9,.]{4,20}").unwrap());

/// First amount in `text` as cents. Dots and commas are both accepted as
/// thousands separators; a separator three characters from the end marks
/// two trailing cent digits. `"48.600,- €"` → 4_860_000.
pub fn cents(text: &str) -> Option<i64> {
    let amount = AMOUNT_RE.find(text)?.as_str();
    let bytes = amount.as_bytes();

    let (euro_part, cents) = match bytes[bytes.len() - 3] {
        b',' | b'.' => (&amount[..amount.len() - 3], amount[amount.len() - 2..].parse::<i64>().ok()?),
        _ => (amount, 0),
    };

    let euros: String = euro_part.chars().filter(char::is_ascii_digit).collect();
    euros.parse::<i64>().ok()?.checked_mul(100)?.checked_add(cents)
}
