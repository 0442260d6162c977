use serde::{Deserialize, Serialize};

/// Business identity printed on every quote the user shares.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDetails {
    pub business_name: String,
    pub business_number: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub bank_name: String,
    pub bsb: String,
    pub account_number: String,
    pub gst_registered: bool,
    pub logo_ref: Option<String>,
}

impl CompanyDetails {
    pub fn has_bank_details(&self) -> bool {
        !self.bsb.trim().is_empty() && !self.account_number.trim().is_empty()
    }
}
