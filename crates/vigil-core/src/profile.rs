//! Profile attributes derived from the profile store.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to a profile.
///
/// Any value the store returns outside the known set decodes as `Unknown`
/// rather than failing the whole lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Patient,
    Pharmacy,
    PharmacyCompany,
    #[serde(other)]
    Unknown,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Patient => "patient",
            Self::Pharmacy => "pharmacy",
            Self::PharmacyCompany => "pharmacy_company",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes looked up for an identity. All fields are optional; the
/// default value is the cleared state used whenever no identity is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileAttributes {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub related_patient_id: Option<String>,
    #[serde(default)]
    pub related_pharmacy_id: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
}

impl ProfileAttributes {
    /// True when no attribute is set.
    #[must_use]
    pub const fn is_cleared(&self) -> bool {
        self.role.is_none()
            && self.related_patient_id.is_none()
            && self.related_pharmacy_id.is_none()
            && self.account_type.is_none()
    }
}
