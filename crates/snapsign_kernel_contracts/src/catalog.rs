#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::{ContractViolation, SchemaVersion, Validate};

pub const CATALOG_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Option key that contributes nothing to the total. Always present in a
/// valid catalog and always priced at zero.
pub const OPTION_NONE: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDef {
    pub key: String,
    pub label: String,
    pub price: i64,
}

impl PackageDef {
    pub fn v1(key: String, label: String, price: i64) -> Result<Self, ContractViolation> {
        let def = Self { key, label, price };
        def.validate()?;
        Ok(def)
    }
}

impl Validate for PackageDef {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_key("package_def.key", &self.key)?;
        validate_label("package_def.label", &self.label)?;
        if self.price < 0 {
            return Err(ContractViolation::InvalidValue {
                field: "package_def.price",
                reason: "must be >= 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDef {
    pub key: String,
    pub label: String,
    pub price: i64,
}

impl OptionDef {
    pub fn v1(key: String, label: String, price: i64) -> Result<Self, ContractViolation> {
        let def = Self { key, label, price };
        def.validate()?;
        Ok(def)
    }
}

impl Validate for OptionDef {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_key("option_def.key", &self.key)?;
        validate_label("option_def.label", &self.label)?;
        if self.key == OPTION_NONE && self.price != 0 {
            return Err(ContractViolation::InvalidValue {
                field: "option_def.price",
                reason: "the none option must be priced at 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountDef {
    pub id: String,
    pub label: String,
    pub price: i64,
}

impl DiscountDef {
    pub fn v1(id: String, label: String, price: i64) -> Result<Self, ContractViolation> {
        let def = Self { id, label, price };
        def.validate()?;
        Ok(def)
    }
}

impl Validate for DiscountDef {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_key("discount_def.id", &self.id)?;
        validate_label("discount_def.label", &self.label)?;
        // Discounts are negative by convention, but the contract does not
        // enforce a sign; consumers must take the value as-is.
        Ok(())
    }
}

/// Static pricing configuration. Versioned only by code change, never by
/// user data. Entry order is the display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingCatalog {
    pub schema_version: SchemaVersion,
    pub packages: Vec<PackageDef>,
    pub options: Vec<OptionDef>,
    pub discounts: Vec<DiscountDef>,
}

impl PricingCatalog {
    pub fn v1(
        packages: Vec<PackageDef>,
        options: Vec<OptionDef>,
        discounts: Vec<DiscountDef>,
    ) -> Result<Self, ContractViolation> {
        let catalog = Self {
            schema_version: CATALOG_CONTRACT_VERSION,
            packages,
            options,
            discounts,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The studio catalog locked for the MVP rollout.
    pub fn mvp_v1() -> Self {
        let packages = vec![
            PackageDef {
                key: "original".to_string(),
                label: "원본형".to_string(),
                price: 180_000,
            },
            PackageDef {
                key: "standard".to_string(),
                label: "보정형".to_string(),
                price: 220_000,
            },
            PackageDef {
                key: "film".to_string(),
                label: "영상형".to_string(),
                price: 280_000,
            },
        ];
        let options = vec![
            OptionDef {
                key: OPTION_NONE.to_string(),
                label: "선택 안함".to_string(),
                price: 0,
            },
            OptionDef {
                key: "banquet".to_string(),
                label: "연회장 촬영".to_string(),
                price: 50_000,
            },
            OptionDef {
                key: "second_shooter".to_string(),
                label: "2인 촬영".to_string(),
                price: 100_000,
            },
        ];
        let discounts = vec![
            DiscountDef {
                id: "partner".to_string(),
                label: "짝꿍 할인".to_string(),
                price: -10_000,
            },
            DiscountDef {
                id: "review".to_string(),
                label: "후기 할인".to_string(),
                price: -20_000,
            },
        ];
        Self {
            schema_version: CATALOG_CONTRACT_VERSION,
            packages,
            options,
            discounts,
        }
    }

    pub fn package_price(&self, key: &str) -> Option<i64> {
        self.packages.iter().find(|p| p.key == key).map(|p| p.price)
    }

    pub fn option_price(&self, key: &str) -> Option<i64> {
        self.options.iter().find(|o| o.key == key).map(|o| o.price)
    }

    pub fn discount_by_id(&self, id: &str) -> Option<&DiscountDef> {
        self.discounts.iter().find(|d| d.id == id)
    }

    pub fn first_package_key(&self) -> Option<&str> {
        self.packages.first().map(|p| p.key.as_str())
    }

    /// Catalog order restricted to the given selection. Display order for
    /// discount lists is defined as catalog order, not selection order.
    pub fn discounts_in_catalog_order<'a>(&'a self, selected: &[String]) -> Vec<&'a DiscountDef> {
        self.discounts
            .iter()
            .filter(|d| selected.iter().any(|id| id == &d.id))
            .collect()
    }
}

impl Validate for PricingCatalog {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != CATALOG_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "pricing_catalog.schema_version",
                reason: "must match CATALOG_CONTRACT_VERSION",
            });
        }
        if self.packages.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "pricing_catalog.packages",
                reason: "must contain at least one package",
            });
        }
        let mut package_keys: BTreeSet<&str> = BTreeSet::new();
        for package in &self.packages {
            package.validate()?;
            if !package_keys.insert(package.key.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "pricing_catalog.packages",
                    reason: "package keys must be unique",
                });
            }
        }
        let mut option_keys: BTreeSet<&str> = BTreeSet::new();
        for option in &self.options {
            option.validate()?;
            if !option_keys.insert(option.key.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "pricing_catalog.options",
                    reason: "option keys must be unique",
                });
            }
        }
        if !option_keys.contains(OPTION_NONE) {
            return Err(ContractViolation::InvalidValue {
                field: "pricing_catalog.options",
                reason: "must contain the none option",
            });
        }
        let mut discount_ids: BTreeSet<&str> = BTreeSet::new();
        for discount in &self.discounts {
            discount.validate()?;
            if !discount_ids.insert(discount.id.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "pricing_catalog.discounts",
                    reason: "discount ids must be unique",
                });
            }
        }
        Ok(())
    }
}

fn validate_key(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    if value.is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be non-empty",
        });
    }
    if value.len() > 64 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    if value
        .chars()
        .any(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
    {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be lower_snake ASCII",
        });
    }
    Ok(())
}

fn validate_label(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    if value.is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be non-empty",
        });
    }
    if value.len() > 128 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_catalog_01_mvp_catalog_is_contract_valid() {
        let catalog = PricingCatalog::mvp_v1();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.package_price("standard"), Some(220_000));
        assert_eq!(catalog.option_price("banquet"), Some(50_000));
        assert_eq!(catalog.discount_by_id("partner").map(|d| d.price), Some(-10_000));
    }

    #[test]
    fn at_catalog_02_unknown_keys_resolve_to_nothing() {
        let catalog = PricingCatalog::mvp_v1();
        assert_eq!(catalog.package_price("deluxe"), None);
        assert_eq!(catalog.option_price("drone"), None);
        assert!(catalog.discount_by_id("loyalty").is_none());
    }

    #[test]
    fn at_catalog_03_duplicate_package_keys_are_rejected() {
        let packages = vec![
            PackageDef::v1("standard".to_string(), "보정형".to_string(), 220_000).unwrap(),
            PackageDef::v1("standard".to_string(), "중복".to_string(), 1).unwrap(),
        ];
        let options = vec![OptionDef::v1(OPTION_NONE.to_string(), "선택 안함".to_string(), 0).unwrap()];
        let err = PricingCatalog::v1(packages, options, vec![]).unwrap_err();
        assert_eq!(
            err,
            ContractViolation::InvalidValue {
                field: "pricing_catalog.packages",
                reason: "package keys must be unique",
            }
        );
    }

    #[test]
    fn at_catalog_04_missing_none_option_is_rejected() {
        let packages = vec![PackageDef::v1("standard".to_string(), "보정형".to_string(), 220_000).unwrap()];
        let options = vec![OptionDef::v1("banquet".to_string(), "연회장 촬영".to_string(), 50_000).unwrap()];
        assert!(PricingCatalog::v1(packages, options, vec![]).is_err());
    }

    #[test]
    fn at_catalog_05_discount_display_order_is_catalog_order() {
        let catalog = PricingCatalog::mvp_v1();
        let selected = vec!["review".to_string(), "partner".to_string()];
        let ordered = catalog.discounts_in_catalog_order(&selected);
        let ids: Vec<&str> = ordered.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["partner", "review"]);
    }
}
