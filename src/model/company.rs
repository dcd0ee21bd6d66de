use serde::{Deserialize, Serialize};

/// The invoicing entity shown in every document header.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub logo: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub tax_id: String,
}

impl Company {
    /// The blank company first-run settings are seeded with.
    pub fn blank() -> Self {
        Self {
            id: "1".to_string(),
            ..Self::default()
        }
    }
}
