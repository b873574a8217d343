// File: src/pattern.rs
// Strict allowlist check for $magic DMT mint payloads

use serde_json::Value;

/// Expected values of a DMT mint payload.
///
/// Every field must be present and equal byte for byte. `blk` is compared as
/// the decimal string of the target height; a JSON number never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintPattern {
    pub protocol: &'static str,
    pub operation: &'static str,
    pub deployment: &'static str,
    pub ticker: &'static str,
}

/// A field that did not match, as reported by [`MintPattern::mismatches`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub expected: String,
    /// `None` when the field is absent
    pub found: Option<Value>,
}

impl MintPattern {
    /// The $magic ticker anchored to its TAP deployment inscription
    pub const MAGIC: Self = Self {
        protocol: "tap",
        operation: "dmt-mint",
        deployment: "cddb01f87428f8efa89664e08e248595e20c90432a28839e1c62b357afa756e1i0",
        ticker: "magic",
    };

    /// Field name and expected string value, in payload order
    pub fn expected_fields(&self, target_height: u64) -> [(&'static str, String); 5] {
        [
            ("p", self.protocol.to_string()),
            ("op", self.operation.to_string()),
            ("dep", self.deployment.to_string()),
            ("tick", self.ticker.to_string()),
            ("blk", target_height.to_string()),
        ]
    }

    /// List the fields that keep `content` from being a mint for `target_height`.
    ///
    /// Returns the JSON error when `content` does not parse. A top-level value
    /// that is not an object reports every field as missing.
    pub fn mismatches(
        &self,
        content: &str,
        target_height: u64,
    ) -> Result<Vec<FieldMismatch>, serde_json::Error> {
        let parsed: Value = serde_json::from_str(content)?;
        let object = parsed.as_object();

        Ok(self
            .expected_fields(target_height)
            .into_iter()
            .filter_map(|(field, expected)| {
                let found = object.and_then(|o| o.get(field));
                match found.and_then(Value::as_str) {
                    Some(actual) if actual == expected => None,
                    _ => Some(FieldMismatch {
                        field,
                        expected,
                        found: found.cloned(),
                    }),
                }
            })
            .collect())
    }

    /// Fails closed: unparsable content is never a match
    pub fn matches(&self, content: &str, target_height: u64) -> bool {
        self.mismatches(content, target_height)
            .map(|fields| fields.is_empty())
            .unwrap_or(false)
    }
}

/// Whether `content` is a $magic mint for the block at `target_height`
pub fn is_valid_mint(content: &str, target_height: u64) -> bool {
    MintPattern::MAGIC.matches(content, target_height)
}

/// Text-search variants for the height field.
///
/// The search backend indexes raw text, and inscribers serialize the payload
/// both with and without a space after the colon.
pub fn search_patterns(target_height: u64) -> [String; 2] {
    [
        format!("\"blk\":\"{}\"", target_height),
        format!("\"blk\": \"{}\"", target_height),
    ]
}
