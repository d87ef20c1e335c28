/// Month and weekday names plus number formatting conventions for one
/// locale. Passed explicitly so parsing never depends on the host locale.
#[derive(Debug, Clone, Copy)]
pub struct CalendarLocale {
    pub months: [&'static str; 12],
    pub weekdays: [&'static str; 7],
    pub thousands_sep: char,
    pub decimal_sep: char,
}

pub const GERMAN: CalendarLocale = CalendarLocale {
    months: [
        "Januar",
        "Februar",
        "März",
        "April",
        "Mai",
        "Juni",
        "Juli",
        "August",
        "September",
        "Oktober",
        "November",
        "Dezember",
    ],
    weekdays: [
        "Montag",
        "Dienstag",
        "Mittwoch",
        "Donnerstag",
        "Freitag",
        "Samstag",
        "Sonntag",
    ],
    thousands_sep: '.',
    decimal_sep: ',',
};

impl Default for CalendarLocale {
    fn default() -> Self {
        GERMAN
    }
}

impl CalendarLocale {
    /// 1-based month number, case-insensitive.
    pub fn month(&self, name: &str) -> Option<u32> {
        let name = name.to_lowercase();
        self.months
            .iter()
            .position(|m| m.to_lowercase() == name)
            .map(|i| i as u32 + 1)
    }

    pub fn is_weekday(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.weekdays.iter().any(|w| w.to_lowercase() == name)
    }

    /// `123456789` cents → `1.234.567,89 €`.
    pub fn format_euro(&self, cents: i64) -> String {
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        let euros = (cents / 100).to_string();

        let mut grouped = String::with_capacity(euros.len() + euros.len() / 3);
        for (i, ch) in euros.chars().enumerate() {
            if i > 0 && (euros.len() - i) % 3 == 0 {
                grouped.push(self.thousands_sep);
            }
            grouped.push(ch);
        }
        format!("{sign}{grouped}{}{:02} €", self.decimal_sep, cents % 100)
    }
}
