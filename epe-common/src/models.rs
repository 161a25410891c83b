//! Record types: witnesses, their sections and tokens, annotations, and
//! alignment groups.
//!
//! Witness records are stored exactly as they were posted. Only the fields
//! the server reads are typed; every other key is carried in `extra` and
//! written back unchanged, so `order_no`/`orderNo`, integer coordinates and
//! baseline polygons survive a round trip in the caller's own spelling.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Layout coordinates of a token on the page image
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// A single transcribed word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Unique within the owning witness
    pub id: String,
    pub text: String,
    /// `position`, `bbox`, `baseline` and any other keys, as stored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// 1-based index within the section
    pub fn position(&self) -> Option<u64> {
        self.extra.get("position").and_then(Value::as_u64)
    }

    /// Typed view of `bbox`; `None` when absent or not four numbers
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.extra
            .get("bbox")
            .and_then(|v| BoundingBox::deserialize(v).ok())
    }
}

/// Section identifier. Imported data carries both textual (`"sec_1"`) and
/// numeric (`1`) ids; lookups compare the textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionId {
    Text(String),
    Number(i64),
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::Text(s) => f.write_str(s),
            SectionId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl SectionId {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            SectionId::Text(s) => s == candidate,
            SectionId::Number(n) => n.to_string() == candidate,
        }
    }
}

/// Ordered grouping of tokens within a witness (usually a page)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,
    /// `order_no` (or `orderNo`), `type` and any other keys, as stored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    pub fn new(id: SectionId, tokens: Vec<Token>) -> Self {
        Self {
            id,
            tokens: Some(tokens),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn tokens(&self) -> &[Token] {
        self.tokens.as_deref().unwrap_or_default()
    }

    pub fn order_no(&self) -> Option<i64> {
        self.extra
            .get("order_no")
            .or_else(|| self.extra.get("orderNo"))
            .and_then(Value::as_i64)
    }

    /// Section type (`page`, `chapter`, ...) from the `type` key
    pub fn kind(&self) -> Option<&str> {
        self.extra.get("type").and_then(Value::as_str)
    }
}

/// One transcribed source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Witness {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
    /// `siglum`, `metadata` and any other keys, as stored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{id, label}` projection used for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessSummary {
    pub id: String,
    pub label: String,
}

impl Witness {
    /// Build a witness from an untyped import payload.
    ///
    /// `id` and `label` are checked first so the error names the field
    /// instead of surfacing a serde message about the whole record.
    pub fn from_json(value: Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidInput("witness record must be a JSON object".to_string())
        })?;

        let id = match object.get("id") {
            None | Some(Value::Null) => {
                return Err(Error::InvalidInput("missing field 'id'".to_string()))
            }
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(_) => {
                return Err(Error::InvalidInput(
                    "field 'id' must be a non-empty string".to_string(),
                ))
            }
        };

        match object.get("label") {
            None | Some(Value::Null) => {
                return Err(Error::InvalidInput(format!(
                    "missing field 'label' in witness '{}'",
                    id
                )))
            }
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(Error::InvalidInput(format!(
                    "field 'label' of witness '{}' must be a string",
                    id
                )))
            }
        }

        serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("witness '{}': {}", id, e)))
    }

    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            sections: None,
            extra: Map::new(),
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.get_or_insert_with(Vec::new).push(section);
        self
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn sections(&self) -> &[Section] {
        self.sections.as_deref().unwrap_or_default()
    }

    pub fn siglum(&self) -> Option<&str> {
        self.extra.get("siglum").and_then(Value::as_str)
    }

    /// `metadata` object, when present
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.extra.get("metadata").and_then(Value::as_object)
    }

    pub fn summary(&self) -> WitnessSummary {
        WitnessSummary {
            id: self.id.clone(),
            label: self.label.clone(),
        }
    }

    /// First section in stored order
    pub fn first_section(&self) -> Option<&Section> {
        self.sections().first()
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections().iter().find(|s| s.id.matches(section_id))
    }

    /// Search every section for a token id. Alignment groups reference
    /// tokens without naming a section.
    pub fn find_token(&self, token_id: &str) -> Option<&Token> {
        self.sections()
            .iter()
            .flat_map(|s| s.tokens().iter())
            .find(|t| t.id == token_id)
    }

    pub fn token_count(&self) -> usize {
        self.sections().iter().map(|s| s.tokens().len()).sum()
    }
}

/// A note attached to one token of one witness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// `None` only for historical records stored without an id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, alias = "witnessId")]
    pub witness_id: String,
    #[serde(default, alias = "tokenId")]
    pub token_id: String,
    #[serde(default)]
    pub annotation: String,
    #[serde(default)]
    pub timestamp: String,
    /// Keys written by other tools, kept as stored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request shape for annotation creation; every field is required
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAnnotation {
    #[serde(default, alias = "witnessId")]
    pub witness_id: Option<String>,
    #[serde(default, alias = "tokenId")]
    pub token_id: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
}

impl NewAnnotation {
    pub fn new(witness_id: &str, token_id: &str, annotation: &str) -> Self {
        Self {
            witness_id: Some(witness_id.to_string()),
            token_id: Some(token_id.to_string()),
            annotation: Some(annotation.to_string()),
        }
    }

    /// Split into `(witness_id, token_id, text)`, naming the first absent field
    pub fn into_parts(self) -> Result<(String, String, String)> {
        let witness_id = self
            .witness_id
            .ok_or_else(|| Error::InvalidInput("missing field 'witness_id'".to_string()))?;
        let token_id = self
            .token_id
            .ok_or_else(|| Error::InvalidInput("missing field 'token_id'".to_string()))?;
        let text = self
            .annotation
            .ok_or_else(|| Error::InvalidInput("missing field 'annotation'".to_string()))?;
        Ok((witness_id, token_id, text))
    }
}

/// One manually asserted row of the collation: witness id -> token id.
///
/// Sparse. A witness without an entry has no token in this row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlignmentGroup {
    tokens: BTreeMap<String, String>,
}

impl AlignmentGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, witness_id: impl Into<String>, token_id: impl Into<String>) {
        self.tokens.insert(witness_id.into(), token_id.into());
    }

    pub fn token_for(&self, witness_id: &str) -> Option<&str> {
        self.tokens.get(witness_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(w, t)| (w.as_str(), t.as_str()))
    }
}

impl<W, T> FromIterator<(W, T)> for AlignmentGroup
where
    W: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (W, T)>>(iter: I) -> Self {
        let mut group = AlignmentGroup::new();
        for (w, t) in iter {
            group.insert(w, t);
        }
        group
    }
}
