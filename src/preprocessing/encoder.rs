//! Categorical label encoding
//!
//! A [`LabelEncoder`] maps the categories of one column to integer indices.
//! Vocabularies are either learned (distinct values, lexicographic order) or
//! seeded from a fixed list. Values outside the vocabulary are never added;
//! they encode to index 0 and are reported as a [`Degradation`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ChurnError, Degradation, Result};

/// Encoder for a single categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
    mapping: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Learn a vocabulary from observed values, sorted lexicographically
    pub fn fit<I, S>(column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();
        Self::from_vocabulary(column, distinct.into_iter().collect())
    }

    /// Seed the encoder from a fixed vocabulary, keeping its order
    pub fn from_vocabulary(column: impl Into<String>, vocabulary: Vec<String>) -> Result<Self> {
        let column = column.into();
        let mut classes = Vec::with_capacity(vocabulary.len());
        let mut mapping = HashMap::with_capacity(vocabulary.len());

        for value in vocabulary {
            if !mapping.contains_key(&value) {
                mapping.insert(value.clone(), classes.len());
                classes.push(value);
            }
        }

        if classes.is_empty() {
            return Err(ChurnError::InvalidParameter {
                name: format!("vocabulary[{}]", column),
                value: "[]".to_string(),
                reason: "an encoder needs at least one category".to_string(),
            });
        }

        Ok(Self {
            column,
            classes,
            mapping,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Vocabulary in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Index of a known category
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.mapping.get(value).copied()
    }

    /// Encode one value, substituting index 0 for unseen categories
    pub fn encode(&self, value: &str) -> (usize, Option<Degradation>) {
        match self.mapping.get(value) {
            Some(&idx) => (idx, None),
            None => (
                0,
                Some(Degradation::UnseenCategory {
                    column: self.column.clone(),
                    value: value.to_string(),
                    substitute: self.classes[0].clone(),
                }),
            ),
        }
    }

    /// Category for an index
    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|s| s.as_str())
    }

    /// Encode a string series into a Float64 series of indices.
    ///
    /// Each distinct unseen value is logged once and reported once.
    pub fn transform_series(&self, series: &Series) -> Result<(Series, Vec<Degradation>)> {
        let casted = series.cast(&DataType::String)?;
        let ca = casted.str()?;

        let mut unseen: BTreeMap<String, Degradation> = BTreeMap::new();
        let encoded: Float64Chunked = ca
            .into_iter()
            .map(|opt| {
                let value = opt.unwrap_or("");
                let (idx, degradation) = self.encode(value);
                if let Some(d) = degradation {
                    unseen.entry(value.to_string()).or_insert(d);
                }
                Some(idx as f64)
            })
            .collect();

        for value in unseen.keys() {
            warn!(
                column = %self.column,
                value = %value,
                substitute = %self.classes[0],
                "Unseen category, substituting first vocabulary entry"
            );
        }

        Ok((
            encoded.with_name(series.name().clone()).into_series(),
            unseen.into_values().collect(),
        ))
    }
}

/// Per-column label encoders
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoderRegistry {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit one encoder per column. Columns with an entry in `fixed` use that
    /// vocabulary; the rest learn theirs from `df`.
    pub fn fit(
        df: &DataFrame,
        columns: &[String],
        fixed: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for name in columns {
            let encoder = match fixed.get(name) {
                Some(vocabulary) => LabelEncoder::from_vocabulary(name.clone(), vocabulary.clone())?,
                None => {
                    let column = df
                        .column(name)
                        .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?;
                    let casted = column.cast(&DataType::String)?;
                    let values: Vec<&str> = casted.str()?.into_iter().flatten().collect();
                    LabelEncoder::fit(name.clone(), values)?
                }
            };
            registry.insert(encoder);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, encoder: LabelEncoder) {
        self.encoders.insert(encoder.column().to_string(), encoder);
    }

    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Encode every registered column present in `df`
    pub fn transform(&self, df: &DataFrame) -> Result<(DataFrame, Vec<Degradation>)> {
        let mut result = df.clone();
        let mut degradations = Vec::new();

        for (name, encoder) in &self.encoders {
            let Ok(column) = df.column(name) else {
                continue;
            };
            let (encoded, mut unseen) = encoder.transform_series(column.as_materialized_series())?;
            result.with_column(encoded)?;
            degradations.append(&mut unseen);
        }

        Ok((result, degradations))
    }
}
