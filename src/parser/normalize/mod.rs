//! Free-text field normalizers for German administrative prose.

pub mod address;
pub mod currency;
pub mod date;
pub mod locale;

pub use address::parse_address;
pub use currency::cents;
pub use date::DateNormalizer;
pub use locale::{CalendarLocale, GERMAN};
