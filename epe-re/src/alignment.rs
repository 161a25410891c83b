//! Token alignment between two witnesses
//!
//! Two modes, picked by whether any alignment group is stored:
//! - **groups**: one row per stored group, in stored order; each side is the
//!   token the group names for that witness, looked up across all sections
//! - **positional**: token *n* of the base section against token *n* of the
//!   other section, padded to the longer of the two
//!
//! A side with no corresponding token becomes a placeholder, so the result
//! always covers every row. Nothing here mutates the store.

use epe_common::{AlignmentGroup, Error, Result, Section, Token, Witness};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Text rendered for a missing token
pub const PLACEHOLDER_TEXT: &str = "[—]";

/// Which witnesses and sections to align
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRequest {
    pub base_witness_id: String,
    pub base_section_id: Option<String>,
    pub other_witness_id: String,
    pub other_section_id: Option<String>,
}

impl AlignmentRequest {
    /// Align the first sections of two witnesses
    pub fn new(base_witness_id: impl Into<String>, other_witness_id: impl Into<String>) -> Self {
        Self {
            base_witness_id: base_witness_id.into(),
            base_section_id: None,
            other_witness_id: other_witness_id.into(),
            other_section_id: None,
        }
    }

    pub fn with_sections(mut self, base: Option<String>, other: Option<String>) -> Self {
        self.base_section_id = base;
        self.other_section_id = other;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    Groups,
    Positional,
}

/// One side of an aligned row
#[derive(Debug, Clone, PartialEq)]
pub enum AlignedToken {
    Token(Token),
    Placeholder,
}

impl AlignedToken {
    fn from_option(token: Option<&Token>) -> Self {
        token.map_or(AlignedToken::Placeholder, |t| AlignedToken::Token(t.clone()))
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            AlignedToken::Token(t) => Some(&t.id),
            AlignedToken::Placeholder => None,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            AlignedToken::Token(t) => &t.text,
            AlignedToken::Placeholder => PLACEHOLDER_TEXT,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AlignedToken::Placeholder)
    }
}

/// Tokens serialize as stored; a placeholder as `{"id": null, "text": "[—]"}`
impl Serialize for AlignedToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            AlignedToken::Token(token) => token.serialize(serializer),
            AlignedToken::Placeholder => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("id", &Option::<&str>::None)?;
                map.serialize_entry("text", PLACEHOLDER_TEXT)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPair {
    /// 1-based row number
    pub position: usize,
    pub base: AlignedToken,
    pub witness: AlignedToken,
    /// Texts differ (a placeholder against a token counts as a variant)
    pub variant: bool,
}

impl AlignedPair {
    fn new(position: usize, base: AlignedToken, witness: AlignedToken) -> Self {
        let variant = base.text() != witness.text();
        Self {
            position,
            base,
            witness,
            variant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub mode: AlignmentMode,
    pub alignments: Vec<AlignedPair>,
}

impl Alignment {
    pub fn variant_count(&self) -> usize {
        self.alignments.iter().filter(|p| p.variant).count()
    }
}

/// Align two witnesses against a snapshot of the witness and group collections
pub fn align(
    witnesses: &[Witness],
    groups: &[AlignmentGroup],
    request: &AlignmentRequest,
) -> Result<Alignment> {
    let base = resolve_witness(witnesses, &request.base_witness_id)?;
    let other = resolve_witness(witnesses, &request.other_witness_id)?;

    // Sections are resolved in both modes so a bad section id is reported
    // the same way whichever mode is active.
    let base_section = resolve_section(base, request.base_section_id.as_deref())?;
    let other_section = resolve_section(other, request.other_section_id.as_deref())?;

    if groups.is_empty() {
        Ok(Alignment {
            mode: AlignmentMode::Positional,
            alignments: positional_alignment(base_section.tokens(), other_section.tokens()),
        })
    } else {
        Ok(Alignment {
            mode: AlignmentMode::Groups,
            alignments: group_alignment(base, other, groups),
        })
    }
}

fn resolve_witness<'a>(witnesses: &'a [Witness], id: &str) -> Result<&'a Witness> {
    witnesses
        .iter()
        .find(|w| w.id == id)
        .ok_or_else(|| Error::WitnessNotFound(id.to_string()))
}

/// Explicit section id, or the first section in stored order
fn resolve_section<'a>(witness: &'a Witness, section_id: Option<&str>) -> Result<&'a Section> {
    match section_id {
        Some(id) => witness.section(id).ok_or_else(|| {
            Error::SectionNotFound(format!("section '{}' in witness '{}'", id, witness.id))
        }),
        None => witness.first_section().ok_or_else(|| {
            Error::SectionNotFound(format!("witness '{}' has no sections", witness.id))
        }),
    }
}

/// Look a token up in any section of the witness; a miss is not an error
pub fn resolve_token<'a>(witness: &'a Witness, token_id: &str) -> Option<&'a Token> {
    witness.find_token(token_id)
}

fn group_alignment(base: &Witness, other: &Witness, groups: &[AlignmentGroup]) -> Vec<AlignedPair> {
    groups
        .iter()
        .enumerate()
        .map(|(idx, group)| {
            let base_token = group
                .token_for(&base.id)
                .and_then(|tid| resolve_token(base, tid));
            let other_token = group
                .token_for(&other.id)
                .and_then(|tid| resolve_token(other, tid));

            AlignedPair::new(
                idx + 1,
                AlignedToken::from_option(base_token),
                AlignedToken::from_option(other_token),
            )
        })
        .collect()
}

fn positional_alignment(base_tokens: &[Token], other_tokens: &[Token]) -> Vec<AlignedPair> {
    let len = base_tokens.len().max(other_tokens.len());
    (0..len)
        .map(|idx| {
            AlignedPair::new(
                idx + 1,
                AlignedToken::from_option(base_tokens.get(idx)),
                AlignedToken::from_option(other_tokens.get(idx)),
            )
        })
        .collect()
}
