//! The customer record schema

use std::collections::BTreeMap;

pub const ID_COLUMN: &str = "customer_id";
pub const TARGET_COLUMN: &str = "churn";

pub const NUMERIC_FEATURES: [&str; 3] = ["tenure", "monthly_charges", "total_charges"];

pub const CATEGORICAL_FEATURES: [&str; 10] = [
    "contract_type",
    "payment_method",
    "paperless_billing",
    "internet_service",
    "online_security",
    "online_backup",
    "device_protection",
    "tech_support",
    "streaming_tv",
    "streaming_movies",
];

/// The six add-on service flags
pub const SERVICE_FEATURES: [&str; 6] = [
    "online_security",
    "online_backup",
    "device_protection",
    "tech_support",
    "streaming_tv",
    "streaming_movies",
];

pub const CONTRACT_TYPES: [&str; 3] = ["Month-to-month", "One year", "Two year"];

pub const PAYMENT_METHODS: [&str; 4] = [
    "Bank transfer (automatic)",
    "Credit card (automatic)",
    "Electronic check",
    "Mailed check",
];

pub const YES_NO: [&str; 2] = ["No", "Yes"];

pub const INTERNET_SERVICES: [&str; 3] = ["DSL", "Fiber optic", "No"];

pub const SERVICE_OPTIONS: [&str; 3] = ["No", "No internet service", "Yes"];

/// Every feature column in canonical order: numeric first, then categorical.
pub fn feature_columns() -> Vec<String> {
    NUMERIC_FEATURES
        .iter()
        .chain(CATEGORICAL_FEATURES.iter())
        .map(|c| c.to_string())
        .collect()
}

/// Fixed vocabularies for every categorical feature, each in lexicographic order.
pub fn churn_vocabularies() -> BTreeMap<String, Vec<String>> {
    let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();

    let mut map = BTreeMap::new();
    map.insert("contract_type".to_string(), owned(&CONTRACT_TYPES));
    map.insert("payment_method".to_string(), owned(&PAYMENT_METHODS));
    map.insert("paperless_billing".to_string(), owned(&YES_NO));
    map.insert("internet_service".to_string(), owned(&INTERNET_SERVICES));
    for service in SERVICE_FEATURES {
        map.insert(service.to_string(), owned(&SERVICE_OPTIONS));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabularies_cover_categoricals() {
        let vocab = churn_vocabularies();
        for column in CATEGORICAL_FEATURES {
            let values = vocab.get(column).unwrap();
            let mut sorted = values.clone();
            sorted.sort();
            assert_eq!(&sorted, values, "{} vocabulary not sorted", column);
        }
    }

    #[test]
    fn test_feature_columns_order() {
        let cols = feature_columns();
        assert_eq!(cols.len(), 13);
        assert_eq!(cols[0], "tenure");
        assert_eq!(cols[3], "contract_type");
    }
}
