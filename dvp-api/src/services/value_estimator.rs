//! Device value estimation
//!
//! Pure lookup logic, no I/O. Base values come from ordered per-manufacturer
//! rule tables; everything else in the breakdown derives from the base.

/// Ordered (model substring, base value) rules. First match wins, so
/// longer or more specific substrings must come before their prefixes
/// ("pro max" before "pro").
const APPLE_RULES: &[(&str, f64)] = &[
    ("pro max", 65000.0),
    ("pro", 55000.0),
    ("plus", 45000.0),
    ("15", 40000.0),
    ("14", 35000.0),
    ("13", 30000.0),
];
const APPLE_DEFAULT: f64 = 25000.0;

const SAMSUNG_RULES: &[(&str, f64)] = &[
    ("ultra", 50000.0),
    ("plus", 35000.0),
    ("s24", 30000.0),
    ("s23", 30000.0),
    ("note", 35000.0),
    ("a5", 15000.0),
    ("a7", 15000.0),
];
const SAMSUNG_DEFAULT: f64 = 20000.0;

const XIAOMI_RULES: &[(&str, f64)] = &[("ultra", 30000.0), ("pro", 25000.0)];
const XIAOMI_DEFAULT: f64 = 18000.0;

/// Base value for any manufacturer without a rule table
const GENERIC_VALUE: f64 = 15000.0;

/// Monetary breakdown derived from the base value
#[derive(Debug, Clone)]
pub struct ValueBreakdown {
    pub current_value: f64,
    pub post_repair_value: f64,
    pub parts_value: f64,
    pub repair_cost: f64,
    pub recycling_value: f64,
    pub currency: &'static str,
    pub market_positioning: &'static str,
    pub depreciation_rate: &'static str,
}

/// Look up the base value for a device.
///
/// Manufacturer is matched exactly; the model string is lowercased and the
/// manufacturer's rules are scanned top to bottom for a substring hit.
pub fn base_value(manufacturer: &str, model: &str) -> f64 {
    let (rules, default) = match manufacturer {
        "Apple" => (APPLE_RULES, APPLE_DEFAULT),
        "Samsung" => (SAMSUNG_RULES, SAMSUNG_DEFAULT),
        "Xiaomi" => (XIAOMI_RULES, XIAOMI_DEFAULT),
        _ => return GENERIC_VALUE,
    };

    let model = model.to_lowercase();
    rules
        .iter()
        .find(|(needle, _)| model.contains(needle))
        .map(|(_, value)| *value)
        .unwrap_or(default)
}

/// Full breakdown for a device: resale after repair at 1.2x the base,
/// parts value at 0.4x, flat repair and recycling figures.
pub fn estimate(manufacturer: &str, model: &str) -> ValueBreakdown {
    let base = base_value(manufacturer, model);

    ValueBreakdown {
        current_value: base,
        post_repair_value: base * 1.2,
        parts_value: base * 0.4,
        repair_cost: 2000.0,
        recycling_value: 500.0,
        currency: "PHP",
        market_positioning: "needs_assessment",
        depreciation_rate: "standard",
    }
}
