use serde::{Deserialize, Serialize};

/// Placeholder rendered for invoices whose client has been deleted.
pub const UNKNOWN_CLIENT: &str = "Unknown";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    #[serde(flatten)]
    pub details: ClientDetails,
}

/// Everything about a client except its identifier.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Client {
    pub fn name(&self) -> &str {
        &self.details.name
    }
}
