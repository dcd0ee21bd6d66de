use serde::{Deserialize, Serialize};

/// Where the currency symbol goes relative to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    Before,
    After,
}

/// A currency as stored inside settings. Settings keep their own copy, so
/// changing the table below never rewrites an existing selection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub code: String,
    pub symbol: String,
    pub name: String,
    pub position: SymbolPosition,
    pub decimal_places: u32,
}

impl Currency {
    /// Fixed-point format with the symbol attached. No grouping, no locale.
    /// Halves round away from zero.
    pub fn format(&self, amount: f64) -> String {
        let places = self.decimal_places as usize;
        let scale = 10f64.powi(self.decimal_places as i32);
        let digits = format!("{:.*}", places, (amount * scale).round() / scale);
        match self.position {
            SymbolPosition::Before => format!("{}{}", self.symbol, digits),
            SymbolPosition::After => format!("{}{}", digits, self.symbol),
        }
    }
}

const TABLE: [(&str, &str, &str, SymbolPosition, u32); 4] = [
    ("USD", "$", "US Dollar", SymbolPosition::Before, 2),
    ("EUR", "€", "Euro", SymbolPosition::After, 2),
    ("GBP", "£", "British Pound", SymbolPosition::Before, 2),
    ("JPY", "¥", "Japanese Yen", SymbolPosition::Before, 0),
];

/// Supported currencies, in display order.
pub fn available_currencies() -> Vec<Currency> {
    TABLE
        .iter()
        .map(|(code, symbol, name, position, decimal_places)| Currency {
            code: code.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            position: *position,
            decimal_places: *decimal_places,
        })
        .collect()
}

/// Look up a currency by its ISO code, ignoring case.
pub fn find_currency(code: &str) -> Option<Currency> {
    available_currencies()
        .into_iter()
        .find(|c| c.code.eq_ignore_ascii_case(code))
}

/// The currency new settings start with.
pub fn default_currency() -> Currency {
    available_currencies().remove(0)
}
