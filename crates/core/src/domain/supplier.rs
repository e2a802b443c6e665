use serde::{Deserialize, Serialize};

use crate::domain::{contains_ignore_case, eq_ignore_case};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub i64);

impl std::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub categories_offered: Vec<String>,
}

impl Supplier {
    pub fn offers_category(&self, category: &str) -> bool {
        self.categories_offered.iter().any(|offered| eq_ignore_case(offered, category))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub categories_offered: Vec<String>,
}

impl NewSupplier {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidSupplier("name must not be empty".to_string()));
        }

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !well_formed {
            return Err(DomainError::InvalidSupplier(format!(
                "email `{email}` is not a valid address"
            )));
        }

        Ok(())
    }

    pub fn with_id(self, id: SupplierId) -> Supplier {
        Supplier {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            categories_offered: self.categories_offered,
        }
    }
}

/// Supplier lookup criteria.
///
/// When `category` or `name` is set those filters apply conjunctively and `text` is ignored.
/// Otherwise a non-empty `text` matches name, email or address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SupplierSearch {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn has_filters(&self) -> bool {
        self.category.is_some() || self.name.is_some()
    }

    /// Free text applies only when no structured filter is present.
    pub fn effective_text(&self) -> Option<&str> {
        if self.has_filters() {
            return None;
        }
        self.text.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }

    pub fn matches(&self, supplier: &Supplier) -> bool {
        if self.has_filters() {
            let category_ok =
                self.category.as_deref().map_or(true, |category| supplier.offers_category(category));
            let name_ok = self
                .name
                .as_deref()
                .map_or(true, |name| contains_ignore_case(&supplier.name, name));
            return category_ok && name_ok;
        }

        match self.effective_text() {
            Some(text) => {
                contains_ignore_case(&supplier.name, text)
                    || contains_ignore_case(&supplier.email, text)
                    || contains_ignore_case(&supplier.address, text)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NewSupplier, Supplier, SupplierId, SupplierSearch};

    fn techmaster() -> Supplier {
        NewSupplier {
            name: "TechMaster Distribution".to_string(),
            email: "sales@techmaster.example".to_string(),
            phone: "+1-555-0100".to_string(),
            address: "12 Harbor Road, Oakland".to_string(),
            categories_offered: vec!["Electronics".to_string(), "Gaming".to_string()],
        }
        .with_id(SupplierId(1))
    }

    #[test]
    fn rejects_malformed_email() {
        let mut supplier = NewSupplier {
            name: "Acme".to_string(),
            email: "not-an-email".to_string(),
            phone: String::new(),
            address: String::new(),
            categories_offered: Vec::new(),
        };
        assert!(supplier.validate().is_err());

        supplier.email = "orders@acme.example".to_string();
        assert!(supplier.validate().is_ok());
    }

    #[test]
    fn structured_filters_shadow_free_text() {
        let search = SupplierSearch {
            text: Some("nowhere".to_string()),
            category: Some("gaming".to_string()),
            name: None,
        };

        assert_eq!(search.effective_text(), None);
        assert!(search.matches(&techmaster()));
    }

    #[test]
    fn free_text_matches_any_contact_field() {
        let by_address = SupplierSearch { text: Some("oakland".to_string()), ..Default::default() };
        let by_email =
            SupplierSearch { text: Some("TECHMASTER.example".to_string()), ..Default::default() };
        let miss = SupplierSearch { text: Some("berlin".to_string()), ..Default::default() };

        assert!(by_address.matches(&techmaster()));
        assert!(by_email.matches(&techmaster()));
        assert!(!miss.matches(&techmaster()));
    }

    #[test]
    fn category_membership_folds_non_ascii_case() {
        let mut supplier = techmaster();
        supplier.categories_offered = vec!["Électronique".to_string()];

        assert!(supplier.offers_category("électronique"));
        assert!(supplier.offers_category(" ÉLECTRONIQUE"));
        assert!(!supplier.offers_category("electronique"));
    }

    #[test]
    fn category_match_requires_set_membership() {
        let search = SupplierSearch { category: Some("Elec".to_string()), ..Default::default() };
        assert!(!search.matches(&techmaster()));
    }
}
