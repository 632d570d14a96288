//! Stable keys for "the same" logical request.
//!
//! Input is serialized to JSON, stripped of top level fields that change
//! between retries, rendered with object keys sorted and hashed with SHA-256.

use itertools::Itertools;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const DEFAULT_IGNORED_FIELDS: [&str; 3] = ["id", "meta", "debug"];

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("Failed to normalise request input: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Fingerprinter {
    ignored_fields: Vec<String>,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::with_ignored_fields(DEFAULT_IGNORED_FIELDS)
    }
}

impl Fingerprinter {
    pub fn with_ignored_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fingerprint<T: Serialize + ?Sized>(
        &self,
        input: &T,
    ) -> Result<String, FingerprintError> {
        let mut value = serde_json::to_value(input)?;

        if let Value::Object(fields) = &mut value {
            for ignored in &self.ignored_fields {
                fields.remove(ignored);
            }
        }

        let normalised = serde_json::to_string(&canonical(value))?;

        let mut hasher = Sha256::new();
        hasher.update(normalised.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Fingerprint with the default set of ignored fields.
pub fn fingerprint<T: Serialize + ?Sized>(input: &T) -> Result<String, FingerprintError> {
    Fingerprinter::default().fingerprint(input)
}

// Rebuilt maps keep insertion order whether or not serde_json preserves it.
fn canonical(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(k, v)| (k, canonical(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        other => other,
    }
}
