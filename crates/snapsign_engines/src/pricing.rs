#![forbid(unsafe_code)]

use snapsign_kernel_contracts::catalog::PricingCatalog;
use snapsign_kernel_contracts::state::ContractState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConfig {
    pub currency_suffix: &'static str,
}

impl PricingConfig {
    pub fn mvp_v1() -> Self {
        Self {
            currency_suffix: "원",
        }
    }
}

/// Pricing engine output: the integer total plus its display form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub total: i64,
    pub formatted: String,
}

impl PriceQuote {
    /// Convergence check for the reactive recompute loop: the cached display
    /// string is only rewritten when it actually differs.
    pub fn restates(&self, cached: &str) -> bool {
        self.formatted != cached
    }
}

/// Derives the final price from a state snapshot and the catalog. Pure: no
/// side effects, no error path. Malformed numeric inputs and unknown catalog
/// keys price as zero, never as an error.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn quote(&self, state: &ContractState, catalog: &PricingCatalog) -> PriceQuote {
        let mut total: i64 = 0;

        total += catalog.package_price(&state.package_config).unwrap_or(0);
        total += catalog.option_price(&state.options).unwrap_or(0);

        if state.has_custom_option {
            for option in &state.custom_options {
                total += coerce_price(&option.price) * option.sign.multiplier();
            }
        }

        for id in &state.discount_items {
            if let Some(discount) = catalog.discount_by_id(id) {
                total += discount.price;
            }
        }

        PriceQuote {
            total,
            formatted: format!(
                "{}{}",
                group_thousands(total),
                self.config.currency_suffix
            ),
        }
    }
}

/// Numeric coercion of raw form text: integer parse first, then float parse
/// truncated toward zero, non-numeric reads as zero.
fn coerce_price(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return value;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    let leading = digits.len() % 3;
    for (position, digit) in digits.chars().enumerate() {
        if position != 0 && (position + 3 - leading) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsign_kernel_contracts::state::{CustomOption, CustomOptionId, OptionSign};

    fn engine() -> PricingEngine {
        PricingEngine::new(PricingConfig::mvp_v1())
    }

    fn state_with(
        package: &str,
        option: &str,
        custom: Vec<CustomOption>,
        discounts: Vec<&str>,
    ) -> ContractState {
        let mut state = ContractState::wire_default();
        state.package_config = package.to_string();
        state.options = option.to_string();
        state.has_custom_option = !custom.is_empty();
        state.custom_options = custom;
        state.discount_items = discounts.into_iter().map(str::to_string).collect();
        state
    }

    fn custom(id: u64, price: &str, sign: OptionSign) -> CustomOption {
        CustomOption::v1(
            CustomOptionId(id),
            "추가 항목".to_string(),
            price.to_string(),
            sign,
        )
        .unwrap()
    }

    #[test]
    fn at_price_01_standard_banquet_partner_discount_totals_250_000() {
        let catalog = PricingCatalog::mvp_v1();
        let state = state_with(
            "standard",
            "banquet",
            vec![custom(1, "10000", OptionSign::Minus)],
            vec!["partner"],
        );
        let quote = engine().quote(&state, &catalog);
        assert_eq!(quote.total, 250_000);
        assert_eq!(quote.formatted, "250,000원");
    }

    #[test]
    fn at_price_02_unknown_keys_price_as_zero() {
        let catalog = PricingCatalog::mvp_v1();
        let state = state_with("deluxe", "none", vec![], vec![]);
        let quote = engine().quote(&state, &catalog);
        assert_eq!(quote.total, 0);
        assert_eq!(quote.formatted, "0원");
    }

    #[test]
    fn at_price_03_unknown_discount_ids_are_silently_ignored() {
        let catalog = PricingCatalog::mvp_v1();
        let state = state_with("standard", "none", vec![], vec!["loyalty", "partner"]);
        let quote = engine().quote(&state, &catalog);
        assert_eq!(quote.total, 210_000);
    }

    #[test]
    fn at_price_04_custom_options_only_count_behind_the_gate() {
        let catalog = PricingCatalog::mvp_v1();
        let mut state = state_with("standard", "none", vec![custom(1, "5000", OptionSign::Plus)], vec![]);
        state.has_custom_option = false;
        assert_eq!(engine().quote(&state, &catalog).total, 220_000);
        state.has_custom_option = true;
        assert_eq!(engine().quote(&state, &catalog).total, 225_000);
    }

    #[test]
    fn at_price_05_non_numeric_custom_price_reads_as_zero() {
        let catalog = PricingCatalog::mvp_v1();
        let state = state_with(
            "standard",
            "none",
            vec![
                custom(1, "엄청 비쌈", OptionSign::Plus),
                custom(2, " 7000 ", OptionSign::Plus),
                custom(3, "1500.9", OptionSign::Plus),
            ],
            vec![],
        );
        // 220000 + 0 + 7000 + 1500 (fraction truncated toward zero).
        assert_eq!(engine().quote(&state, &catalog).total, 228_500);
    }

    #[test]
    fn at_price_06_negative_total_formats_with_leading_minus() {
        let catalog = PricingCatalog::mvp_v1();
        let state = state_with(
            "deluxe",
            "none",
            vec![custom(1, "1234567", OptionSign::Minus)],
            vec![],
        );
        let quote = engine().quote(&state, &catalog);
        assert_eq!(quote.total, -1_234_567);
        assert_eq!(quote.formatted, "-1,234,567원");
    }

    #[test]
    fn at_price_07_quote_is_idempotent_and_detects_no_op() {
        let catalog = PricingCatalog::mvp_v1();
        let state = state_with("film", "second_shooter", vec![], vec!["review"]);
        let first = engine().quote(&state, &catalog);
        let second = engine().quote(&state, &catalog);
        assert_eq!(first, second);
        assert!(!second.restates(&first.formatted));
        assert!(second.restates(""));
    }
}
