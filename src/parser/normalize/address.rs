use std::sync::LazyLock;

use regex::Regex;

use crate::model::Address;

// Street may hold commas, but only inside (...) or "...".
const STREET: &str = r#"(?:[\p{L}\p{N} .\-']|\([^)]*\)|"[^"]*")+"#;
const FIELD: &str = r#"[\p{L}\p{N} .\-()"']+"#;

/// Tried in order, first match wins. The district variant must come first:
/// the shorter pattern also matches a prefix of a four-part address.
static ADDRESS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(
            r"(?P<street>{STREET}),\s*(?P<postal_code>[0-9]{{5}})\s+(?P<city>{FIELD}),\s*(?P<district>{FIELD})"
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?P<street>{STREET}),\s*(?P<postal_code>[0-9]{{5}})\s+(?P<city>{FIELD})"
        ))
        .unwrap(),
    ]
});

/// Pull street, postal code, city and district out of an `Objekt/Lage`
/// text such as `Reihenhaus: Wiesenstraße 1, 52531 Übach-Palenberg`.
pub fn parse_address(text: &str) -> Option<Address> {
    ADDRESS_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let field = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());

        let street = field("street").filter(|s| !s.is_empty())?;
        let city = field("city").filter(|s| !s.is_empty())?;
        Some(Address {
            street,
            postal_code: field("postal_code")?,
            city,
            district: field("district").filter(|s| !s.is_empty()),
        })
    })
}
