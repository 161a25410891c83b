//! # EPE Common Library
//!
//! Shared code for the edition production environment:
//! - Witness, section, token, annotation and alignment group records
//! - Error taxonomy
//! - Configuration loading
//! - Tracing setup and log retrieval
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{
    AlignmentGroup, Annotation, BoundingBox, NewAnnotation, Section, SectionId, Token, Witness,
    WitnessSummary,
};
