#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::catalog::{PricingCatalog, OPTION_NONE};
use crate::{ContractViolation, SchemaVersion, Validate};

pub const STATE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

const MAX_TEXT_FIELD_LEN: usize = 512;
const MAX_CUSTOM_OPTIONS: usize = 64;
const MAX_DISCOUNT_ITEMS: usize = 32;
// Signature payloads are data-URL text captured off a canvas; cap well above
// any realistic capture but low enough to keep share links bounded.
const MAX_SIGNATURE_LEN: usize = 262_144;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomOptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptionSign {
    #[default]
    Plus,
    Minus,
}

impl OptionSign {
    pub fn multiplier(self) -> i64 {
        match self {
            OptionSign::Plus => 1,
            OptionSign::Minus => -1,
        }
    }

    /// Wire form is the signed unit (1 / -1). Anything else reads as the
    /// default positive sign.
    pub fn from_wire(value: i64) -> Self {
        if value == -1 {
            OptionSign::Minus
        } else {
            OptionSign::Plus
        }
    }

    pub fn to_wire(self) -> i64 {
        self.multiplier()
    }
}

/// One operator-entered line item. `price` carries the raw form text; the
/// pricing engine coerces it (non-numeric reads as zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomOption {
    pub id: CustomOptionId,
    pub name: String,
    pub price: String,
    pub sign: OptionSign,
}

impl CustomOption {
    pub fn v1(
        id: CustomOptionId,
        name: String,
        price: String,
        sign: OptionSign,
    ) -> Result<Self, ContractViolation> {
        let option = Self {
            id,
            name,
            price,
            sign,
        };
        option.validate()?;
        Ok(option)
    }
}

impl Validate for CustomOption {
    fn validate(&self) -> Result<(), ContractViolation> {
        // Empty names are allowed; they still price, they just do not render.
        validate_text("custom_option.name", &self.name, MAX_TEXT_FIELD_LEN)?;
        validate_text("custom_option.price", &self.price, 64)?;
        Ok(())
    }
}

/// Mode fixed once at load time: a session either authors a fresh contract
/// or renders one received through a share link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionMode {
    Authoring,
    Received,
}

/// The full snapshot of one contract being authored. Mutation is always a
/// total replacement; there is no partial in-place edit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractState {
    pub schema_version: SchemaVersion,
    pub contractor_name: String,
    pub venue: String,
    pub contact: String,
    pub wedding_date: String,
    pub wedding_time: String,
    pub package_config: String,
    pub options: String,
    pub has_custom_option: bool,
    pub custom_options: Vec<CustomOption>,
    pub discount_items: Vec<String>,
    /// Derived cache of the pricing engine output. Never an input to
    /// pricing; rewritten only when the recomputed string differs.
    pub final_price: String,
    pub signature: Option<String>,
}

impl ContractState {
    /// Decoder baseline: every field at the value the encoder treats as
    /// omittable. Wire-omitted fields restore to exactly these values.
    pub fn wire_default() -> Self {
        Self {
            schema_version: STATE_CONTRACT_VERSION,
            contractor_name: String::new(),
            venue: String::new(),
            contact: String::new(),
            wedding_date: String::new(),
            wedding_time: String::new(),
            package_config: String::new(),
            options: OPTION_NONE.to_string(),
            has_custom_option: false,
            custom_options: Vec::new(),
            discount_items: Vec::new(),
            final_price: String::new(),
            signature: None,
        }
    }

    /// Fresh authoring snapshot seeded with catalog defaults: first package
    /// key, the none option, nothing else selected.
    pub fn authoring_v1(catalog: &PricingCatalog) -> Result<Self, ContractViolation> {
        let mut state = Self::wire_default();
        state.package_config = catalog
            .first_package_key()
            .ok_or(ContractViolation::InvalidValue {
                field: "pricing_catalog.packages",
                reason: "must contain at least one package",
            })?
            .to_string();
        state.validate()?;
        Ok(state)
    }

    pub fn max_custom_option_id(&self) -> Option<CustomOptionId> {
        self.custom_options.iter().map(|o| o.id).max()
    }
}

impl Validate for ContractState {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != STATE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "contract_state.schema_version",
                reason: "must match STATE_CONTRACT_VERSION",
            });
        }
        validate_text(
            "contract_state.contractor_name",
            &self.contractor_name,
            MAX_TEXT_FIELD_LEN,
        )?;
        validate_text("contract_state.venue", &self.venue, MAX_TEXT_FIELD_LEN)?;
        validate_text("contract_state.contact", &self.contact, MAX_TEXT_FIELD_LEN)?;
        validate_text(
            "contract_state.wedding_date",
            &self.wedding_date,
            MAX_TEXT_FIELD_LEN,
        )?;
        validate_text(
            "contract_state.wedding_time",
            &self.wedding_time,
            MAX_TEXT_FIELD_LEN,
        )?;
        validate_text(
            "contract_state.package_config",
            &self.package_config,
            MAX_TEXT_FIELD_LEN,
        )?;
        validate_text("contract_state.options", &self.options, MAX_TEXT_FIELD_LEN)?;
        validate_text(
            "contract_state.final_price",
            &self.final_price,
            MAX_TEXT_FIELD_LEN,
        )?;
        if self.custom_options.len() > MAX_CUSTOM_OPTIONS {
            return Err(ContractViolation::InvalidValue {
                field: "contract_state.custom_options",
                reason: "exceeds max entry count",
            });
        }
        let mut ids: BTreeSet<CustomOptionId> = BTreeSet::new();
        for option in &self.custom_options {
            option.validate()?;
            if !ids.insert(option.id) {
                return Err(ContractViolation::InvalidValue {
                    field: "contract_state.custom_options",
                    reason: "ids must be unique",
                });
            }
        }
        if self.discount_items.len() > MAX_DISCOUNT_ITEMS {
            return Err(ContractViolation::InvalidValue {
                field: "contract_state.discount_items",
                reason: "exceeds max entry count",
            });
        }
        let mut discount_ids: BTreeSet<&str> = BTreeSet::new();
        for id in &self.discount_items {
            validate_text("contract_state.discount_items", id, 64)?;
            if !discount_ids.insert(id.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "contract_state.discount_items",
                    reason: "discount ids must be unique",
                });
            }
        }
        if let Some(signature) = &self.signature {
            if signature.is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "contract_state.signature",
                    reason: "captured signature must be non-empty",
                });
            }
            if signature.len() > MAX_SIGNATURE_LEN {
                return Err(ContractViolation::InvalidValue {
                    field: "contract_state.signature",
                    reason: "exceeds max payload length",
                });
            }
        }
        Ok(())
    }
}

fn validate_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}
