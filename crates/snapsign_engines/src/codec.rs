#![forbid(unsafe_code)]

use serde::Serialize;
use serde_json::{Map, Value};
use snapsign_kernel_contracts::catalog::OPTION_NONE;
use snapsign_kernel_contracts::state::{ContractState, CustomOption, CustomOptionId, OptionSign};

/// Fixed bidirectional alias table: long wire key (the historical field
/// names) to canonical short key. New records are written short; legacy
/// records with long keys must keep decoding.
const FIELD_ALIASES: [(&str, &str); 12] = [
    ("contractorName", "n"),
    ("venue", "v"),
    ("contact", "c"),
    ("weddingDate", "d"),
    ("weddingTime", "t"),
    ("packageConfig", "p"),
    ("options", "o"),
    ("hasCustomOption", "hc"),
    ("customOptions", "co"),
    ("discountItems", "di"),
    ("finalPrice", "f"),
    ("signature", "s"),
];

const CONTRACTOR_NAME: usize = 0;
const VENUE: usize = 1;
const CONTACT: usize = 2;
const WEDDING_DATE: usize = 3;
const WEDDING_TIME: usize = 4;
const PACKAGE_CONFIG: usize = 5;
const OPTIONS: usize = 6;
const HAS_CUSTOM_OPTION: usize = 7;
const CUSTOM_OPTIONS: usize = 8;
const DISCOUNT_ITEMS: usize = 9;
const FINAL_PRICE: usize = 10;
const SIGNATURE: usize = 11;

/// Nested custom-option record in its canonical short form. Present records
/// are always encoded in full; the top-level omission rule does not recurse.
#[derive(Debug, Clone, Serialize)]
struct CustomOptionWire {
    i: u64,
    n: String,
    p: String,
    s: i64,
}

#[derive(Debug)]
pub enum CodecError {
    /// The payload is present but is not a structured record at all.
    MalformedShareData(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedShareData(reason) => {
                write!(f, "malformed share data: {reason}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Serializes contract state to and from the compact wire record.
#[derive(Debug, Clone, Default)]
pub struct StateCodec;

impl StateCodec {
    pub fn new() -> Self {
        Self
    }

    /// Emits the minified record. A top-level field sitting at its omission
    /// default (empty string, the none sentinel, false, an empty list, an
    /// absent signature) is left off the wire entirely.
    pub fn encode(&self, state: &ContractState) -> Map<String, Value> {
        let mut record = Map::new();

        encode_text(&mut record, CONTRACTOR_NAME, &state.contractor_name);
        encode_text(&mut record, VENUE, &state.venue);
        encode_text(&mut record, CONTACT, &state.contact);
        encode_text(&mut record, WEDDING_DATE, &state.wedding_date);
        encode_text(&mut record, WEDDING_TIME, &state.wedding_time);
        encode_text(&mut record, PACKAGE_CONFIG, &state.package_config);
        if state.options != OPTION_NONE {
            encode_text(&mut record, OPTIONS, &state.options);
        }
        if state.has_custom_option {
            record.insert(short_key(HAS_CUSTOM_OPTION).to_string(), Value::Bool(true));
        }
        if !state.custom_options.is_empty() {
            let wire: Vec<CustomOptionWire> = state
                .custom_options
                .iter()
                .map(|option| CustomOptionWire {
                    i: option.id.0,
                    n: option.name.clone(),
                    p: option.price.clone(),
                    s: option.sign.to_wire(),
                })
                .collect();
            // Serializing a derive-only struct vector cannot fail.
            if let Ok(value) = serde_json::to_value(wire) {
                record.insert(short_key(CUSTOM_OPTIONS).to_string(), value);
            }
        }
        if !state.discount_items.is_empty() {
            let items: Vec<Value> = state
                .discount_items
                .iter()
                .map(|id| Value::String(id.clone()))
                .collect();
            record.insert(short_key(DISCOUNT_ITEMS).to_string(), Value::Array(items));
        }
        encode_text(&mut record, FINAL_PRICE, &state.final_price);
        if let Some(signature) = &state.signature {
            if !signature.is_empty() {
                record.insert(
                    short_key(SIGNATURE).to_string(),
                    Value::String(signature.clone()),
                );
            }
        }

        record
    }

    /// Decodes either a minified or a legacy (long-key) record. Unknown keys
    /// are ignored; omitted fields restore their omission defaults; only a
    /// payload that is not a record at all is an error.
    pub fn decode(&self, payload: &Value) -> Result<ContractState, CodecError> {
        let record = payload.as_object().ok_or_else(|| {
            CodecError::MalformedShareData("payload is not a key/value record".to_string())
        })?;

        // All-or-nothing form detection: one short-form key marks the whole
        // record as minified. Never translate a record partially.
        let minified = record_is_minified(record);

        let mut state = ContractState::wire_default();

        if let Some(text) = read_text(record, minified, CONTRACTOR_NAME) {
            state.contractor_name = text;
        }
        if let Some(text) = read_text(record, minified, VENUE) {
            state.venue = text;
        }
        if let Some(text) = read_text(record, minified, CONTACT) {
            state.contact = text;
        }
        if let Some(text) = read_text(record, minified, WEDDING_DATE) {
            state.wedding_date = text;
        }
        if let Some(text) = read_text(record, minified, WEDDING_TIME) {
            state.wedding_time = text;
        }
        if let Some(text) = read_text(record, minified, PACKAGE_CONFIG) {
            state.package_config = text;
        }
        if let Some(text) = read_text(record, minified, OPTIONS) {
            state.options = text;
        }
        if let Some(Value::Bool(flag)) = read_field(record, minified, HAS_CUSTOM_OPTION) {
            state.has_custom_option = *flag;
        }
        if let Some(Value::Array(entries)) = read_field(record, minified, CUSTOM_OPTIONS) {
            state.custom_options = decode_custom_options(entries, minified);
        }
        if let Some(Value::Array(entries)) = read_field(record, minified, DISCOUNT_ITEMS) {
            state.discount_items = decode_discount_items(entries);
        }
        if let Some(text) = read_text(record, minified, FINAL_PRICE) {
            state.final_price = text;
        }
        if let Some(text) = read_text(record, minified, SIGNATURE) {
            if !text.is_empty() {
                state.signature = Some(text);
            }
        }

        Ok(state)
    }
}

fn long_key(field: usize) -> &'static str {
    FIELD_ALIASES[field].0
}

fn short_key(field: usize) -> &'static str {
    FIELD_ALIASES[field].1
}

fn record_is_minified(record: &Map<String, Value>) -> bool {
    record
        .keys()
        .any(|key| FIELD_ALIASES.iter().any(|(_, short)| key == short))
}

fn read_field<'a>(
    record: &'a Map<String, Value>,
    minified: bool,
    field: usize,
) -> Option<&'a Value> {
    let key = if minified {
        short_key(field)
    } else {
        long_key(field)
    };
    record.get(key)
}

fn read_text(record: &Map<String, Value>, minified: bool, field: usize) -> Option<String> {
    match read_field(record, minified, field) {
        Some(Value::String(text)) => Some(text.clone()),
        _ => None,
    }
}

fn encode_text(record: &mut Map<String, Value>, field: usize, value: &str) {
    if !value.is_empty() {
        record.insert(short_key(field).to_string(), Value::String(value.to_string()));
    }
}

fn decode_custom_options(entries: &[Value], minified: bool) -> Vec<CustomOption> {
    let (id_key, name_key, price_key, sign_key) = if minified {
        ("i", "n", "p", "s")
    } else {
        ("id", "name", "price", "sign")
    };

    let mut options = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(fields) = entry.as_object() else {
            continue;
        };
        // An entry without a usable id cannot be addressed by later edits;
        // drop it rather than failing the whole record.
        let Some(id) = fields.get(id_key).and_then(Value::as_u64) else {
            continue;
        };
        let name = match fields.get(name_key) {
            Some(Value::String(text)) => text.clone(),
            _ => String::new(),
        };
        let price = match fields.get(price_key) {
            Some(Value::String(text)) => text.clone(),
            // Old records carried prices as raw numbers; keep them as the
            // form text the pricing engine coerces.
            Some(Value::Number(number)) => number.to_string(),
            _ => String::new(),
        };
        let sign = fields
            .get(sign_key)
            .and_then(Value::as_i64)
            .map(OptionSign::from_wire)
            .unwrap_or_default();
        options.push(CustomOption {
            id: CustomOptionId(id),
            name,
            price,
            sign,
        });
    }
    options
}

fn decode_discount_items(entries: &[Value]) -> Vec<String> {
    let mut items: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(id) = entry.as_str() else {
            continue;
        };
        if items.iter().any(|existing| existing == id) {
            continue;
        }
        items.push(id.to_string());
    }
    items
}
