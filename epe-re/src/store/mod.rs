//! Record store: witnesses, annotations and alignment groups
//!
//! Collections are loaded once when the store is opened and written through
//! the backend after every mutation. A mutation is applied in memory, then
//! persisted; if the write fails the in-memory change is rolled back, so a
//! call either takes full effect or none.
//!
//! Integrity rules held here:
//! - witness ids are unique
//! - annotation ids are assigned from a counter that starts at
//!   `1 + max(existing ids)` and only moves forward
//! - deleting a witness deletes every annotation that references it
//! - stored entries that cannot be read as records are kept verbatim and
//!   written back after the records on every save

pub mod backend;

use crate::alignment::{self, Alignment, AlignmentRequest};
use crate::import;
pub use backend::{Collection, JsonDirectory, MemoryBackend, StorageBackend};
use epe_common::{
    time, AlignmentGroup, Annotation, Error, NewAnnotation, Result, Witness, WitnessSummary,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    witnesses: Vec<Witness>,
    annotations: Vec<Annotation>,
    alignment_groups: Vec<AlignmentGroup>,
    unreadable: Unreadable,
    next_annotation_id: u64,
}

/// Raw entries per collection that did not load as records
#[derive(Debug, Default)]
struct Unreadable {
    witnesses: Vec<Value>,
    annotations: Vec<Value>,
    alignment_groups: Vec<Value>,
}

impl Unreadable {
    fn get(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Witnesses => &self.witnesses,
            Collection::Annotations => &self.annotations,
            Collection::AlignmentGroups => &self.alignment_groups,
        }
    }
}

impl RecordStore {
    /// Load all three collections from `backend`.
    ///
    /// Missing collections start empty. Entries that cannot be read (wrong
    /// shape, duplicate id) are set aside with a warning and preserved on
    /// disk; only backend I/O failures abort.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let (witnesses, unreadable_witnesses) = load_witnesses(backend.load(Collection::Witnesses)?);
        let (annotations, unreadable_annotations) =
            load_annotations(backend.load(Collection::Annotations)?);
        let (alignment_groups, unreadable_groups) = load_entries::<AlignmentGroup, _>(
            backend.load(Collection::AlignmentGroups)?,
            Collection::AlignmentGroups,
            |_, _| true,
        );

        let next_annotation_id = annotations
            .iter()
            .filter_map(|a| a.id)
            .chain(unreadable_annotations.iter().filter_map(|v| v.get("id")?.as_u64()))
            .max()
            .unwrap_or(0)
            + 1;

        info!(
            "Record store loaded: {} witnesses, {} annotations, {} alignment groups",
            witnesses.len(),
            annotations.len(),
            alignment_groups.len()
        );
        let set_aside =
            unreadable_witnesses.len() + unreadable_annotations.len() + unreadable_groups.len();
        if set_aside > 0 {
            warn!("{} stored entries could not be read and are kept as stored", set_aside);
        }

        Ok(Self {
            backend,
            witnesses,
            annotations,
            alignment_groups,
            unreadable: Unreadable {
                witnesses: unreadable_witnesses,
                annotations: unreadable_annotations,
                alignment_groups: unreadable_groups,
            },
            next_annotation_id,
        })
    }

    /// Empty store backed by memory only
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new()),
            witnesses: Vec::new(),
            annotations: Vec::new(),
            alignment_groups: Vec::new(),
            unreadable: Unreadable::default(),
            next_annotation_id: 1,
        }
    }

    /// Id the next created annotation will receive
    pub fn next_annotation_id(&self) -> u64 {
        self.next_annotation_id
    }

    fn persist<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<()> {
        self.write(collection, records, self.unreadable.get(collection))
    }

    fn write<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
        unreadable: &[Value],
    ) -> Result<()> {
        let mut items = records
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<Value>>>()?;
        items.extend(unreadable.iter().cloned());
        self.backend.save(collection, &Value::Array(items))
    }

    // ------------------------------------------------------------------
    // Witnesses
    // ------------------------------------------------------------------

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    /// `{id, label}` for every witness, in store order
    pub fn list_witness_summaries(&self) -> Vec<WitnessSummary> {
        self.witnesses.iter().map(Witness::summary).collect()
    }

    pub fn find_witness(&self, id: &str) -> Option<&Witness> {
        self.witnesses.iter().find(|w| w.id == id)
    }

    pub fn get_witness(&self, id: &str) -> Result<&Witness> {
        self.find_witness(id)
            .ok_or_else(|| Error::NotFound(format!("witness '{}'", id)))
    }

    /// Validate an untyped import payload, then create it
    pub fn create_witness_from_json(&mut self, value: Value) -> Result<String> {
        let witness = Witness::from_json(value)?;
        self.create_witness(witness)
    }

    pub fn create_witness(&mut self, witness: Witness) -> Result<String> {
        if witness.id.is_empty() {
            return Err(Error::InvalidInput("missing field 'id'".to_string()));
        }
        let held_unread = self
            .unreadable
            .witnesses
            .iter()
            .any(|v| raw_str(v, &["id"]) == Some(witness.id.as_str()));
        if held_unread || self.find_witness(&witness.id).is_some() {
            return Err(Error::DuplicateId(format!(
                "witness '{}' already exists",
                witness.id
            )));
        }

        let id = witness.id.clone();
        let token_count = witness.token_count();
        self.witnesses.push(witness);

        if let Err(e) = self.persist(Collection::Witnesses, &self.witnesses) {
            self.witnesses.pop();
            return Err(e);
        }

        info!("Imported witness {} ({} tokens)", id, token_count);
        Ok(id)
    }

    /// Replace the label only; every other field is left untouched
    pub fn update_witness_label(&mut self, id: &str, label: &str) -> Result<()> {
        let index = self
            .witnesses
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| Error::NotFound(format!("witness '{}'", id)))?;

        if label.trim().is_empty() {
            return Err(Error::InvalidInput(
                "field 'label' must be a non-empty string".to_string(),
            ));
        }

        let previous = std::mem::replace(&mut self.witnesses[index].label, label.to_string());
        if let Err(e) = self.persist(Collection::Witnesses, &self.witnesses) {
            self.witnesses[index].label = previous;
            return Err(e);
        }

        info!("Relabelled witness {}: '{}' -> '{}'", id, previous, label);
        Ok(())
    }

    /// Delete a witness and every annotation referencing it.
    ///
    /// Annotations are written before witnesses, so disk never holds
    /// annotations for a missing witness. Returns the number of annotations
    /// removed.
    pub fn delete_witness(&mut self, id: &str) -> Result<usize> {
        let index = self
            .witnesses
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| Error::NotFound(format!("witness '{}'", id)))?;

        let (removed, kept): (Vec<Annotation>, Vec<Annotation>) = self
            .annotations
            .iter()
            .cloned()
            .partition(|a| a.witness_id == id);
        let (removed_unread, kept_unread): (Vec<Value>, Vec<Value>) = self
            .unreadable
            .annotations
            .iter()
            .cloned()
            .partition(|v| raw_str(v, &["witness_id", "witnessId"]) == Some(id));
        let removed_count = removed.len() + removed_unread.len();

        if removed_count > 0 {
            self.write(Collection::Annotations, &kept, &kept_unread)?;
        }

        let witness = self.witnesses.remove(index);
        if let Err(e) = self.persist(Collection::Witnesses, &self.witnesses) {
            self.witnesses.insert(index, witness);
            if removed_count > 0 {
                if let Err(restore_err) = self.persist(Collection::Annotations, &self.annotations)
                {
                    error!(
                        "Failed to restore annotations after aborted delete of witness {}: {}",
                        id, restore_err
                    );
                }
            }
            return Err(e);
        }

        self.annotations = kept;
        self.unreadable.annotations = kept_unread;
        info!("Deleted witness {} and {} annotation(s)", id, removed_count);
        Ok(removed_count)
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    /// All annotations, or those of one witness, in insertion order
    pub fn list_annotations(&self, witness_id: Option<&str>) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| witness_id.map_or(true, |w| a.witness_id == w))
            .collect()
    }

    pub fn get_annotation(&self, id: u64) -> Result<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.id == Some(id))
            .ok_or_else(|| Error::NotFound(format!("annotation {}", id)))
    }

    /// Create an annotation. The witness and token are not checked for
    /// existence.
    pub fn create_annotation(&mut self, draft: NewAnnotation) -> Result<Annotation> {
        let (witness_id, token_id, text) = draft.into_parts()?;

        let annotation = Annotation {
            id: Some(self.next_annotation_id),
            witness_id,
            token_id,
            annotation: text,
            timestamp: time::timestamp_now(),
            extra: Default::default(),
        };
        self.annotations.push(annotation.clone());

        if let Err(e) = self.persist(Collection::Annotations, &self.annotations) {
            self.annotations.pop();
            return Err(e);
        }

        self.next_annotation_id += 1;
        info!(
            "Annotation {} added to {}/{}",
            self.next_annotation_id - 1,
            annotation.witness_id,
            annotation.token_id
        );
        Ok(annotation)
    }

    /// Replace the text and re-stamp the timestamp
    pub fn update_annotation(&mut self, id: u64, text: &str) -> Result<Annotation> {
        let index = self.annotation_index(id)?;

        let entry = &mut self.annotations[index];
        let previous_text = std::mem::replace(&mut entry.annotation, text.to_string());
        let previous_stamp = std::mem::replace(&mut entry.timestamp, time::timestamp_now());

        if let Err(e) = self.persist(Collection::Annotations, &self.annotations) {
            let entry = &mut self.annotations[index];
            entry.annotation = previous_text;
            entry.timestamp = previous_stamp;
            return Err(e);
        }

        info!("Annotation {} updated", id);
        Ok(self.annotations[index].clone())
    }

    pub fn delete_annotation(&mut self, id: u64) -> Result<()> {
        let index = self.annotation_index(id)?;
        let removed = self.annotations.remove(index);

        if let Err(e) = self.persist(Collection::Annotations, &self.annotations) {
            self.annotations.insert(index, removed);
            return Err(e);
        }

        info!("Annotation {} deleted", id);
        Ok(())
    }

    fn annotation_index(&self, id: u64) -> Result<usize> {
        self.annotations
            .iter()
            .position(|a| a.id == Some(id))
            .ok_or_else(|| Error::NotFound(format!("annotation {}", id)))
    }

    // ------------------------------------------------------------------
    // Alignment
    // ------------------------------------------------------------------

    pub fn alignment_groups(&self) -> &[AlignmentGroup] {
        &self.alignment_groups
    }

    /// Replace the whole alignment group sequence; never merges
    pub fn replace_alignment_groups(&mut self, groups: Vec<AlignmentGroup>) -> Result<usize> {
        self.write(Collection::AlignmentGroups, &groups, &[])?;

        let previous = std::mem::replace(&mut self.alignment_groups, groups);
        self.unreadable.alignment_groups.clear();

        info!(
            "Alignment groups replaced: {} -> {}",
            previous.len(),
            self.alignment_groups.len()
        );
        Ok(self.alignment_groups.len())
    }

    /// Parse a raw alignment table and replace the stored groups with it
    pub fn import_alignment_table(&mut self, raw: &[u8]) -> Result<usize> {
        let text = import::decode_table(raw)?;
        let groups = import::parse_alignment_table(text)?;
        self.replace_alignment_groups(groups)
    }

    /// Align two witnesses against the current snapshot
    pub fn align(&self, request: &AlignmentRequest) -> Result<Alignment> {
        alignment::align(&self.witnesses, &self.alignment_groups, request)
    }
}

/// String field of a raw entry, under the first key present
fn raw_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k)).and_then(Value::as_str)
}

/// Split a stored collection into records and unreadable raw entries.
///
/// `accept` sees each parsed record with its index and may set it aside
/// (for example a duplicate id); set-aside entries keep their stored form.
/// A collection that is not an array is kept whole as one raw entry.
fn load_entries<T, F>(
    value: Option<Value>,
    collection: Collection,
    mut accept: F,
) -> (Vec<T>, Vec<Value>)
where
    T: DeserializeOwned,
    F: FnMut(usize, &T) -> bool,
{
    let mut records = Vec::new();
    let mut unreadable = Vec::new();

    let items = match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("{} is not a JSON array; keeping its contents unread", collection);
            unreadable.push(other);
            Vec::new()
        }
    };

    for (i, item) in items.into_iter().enumerate() {
        match T::deserialize(&item) {
            Ok(record) if accept(i, &record) => records.push(record),
            Ok(_) => unreadable.push(item),
            Err(e) => {
                warn!("Entry {} in {} kept unread: {}", i, collection, e);
                unreadable.push(item);
            }
        }
    }

    (records, unreadable)
}

fn load_witnesses(value: Option<Value>) -> (Vec<Witness>, Vec<Value>) {
    let mut seen = HashSet::new();
    load_entries(value, Collection::Witnesses, |i, w: &Witness| {
        let first = seen.insert(w.id.clone());
        if !first {
            warn!("Entry {} repeats witness id '{}'; kept unread", i, w.id);
        }
        first
    })
}

fn load_annotations(value: Option<Value>) -> (Vec<Annotation>, Vec<Value>) {
    let mut seen = HashSet::new();
    load_entries(value, Collection::Annotations, |i, a: &Annotation| match a.id {
        Some(id) if !seen.insert(id) => {
            warn!("Entry {} repeats annotation id {}; kept unread", i, id);
            false
        }
        Some(_) => true,
        None => {
            warn!(
                "Annotation on {}/{} has no id; it cannot be addressed individually",
                a.witness_id, a.token_id
            );
            true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use epe_common::{Section, SectionId, Token};
    use serde_json::json;

    fn witness(id: &str, tokens: &[(&str, &str)]) -> Witness {
        let tokens = tokens
            .iter()
            .enumerate()
            .map(|(i, (tid, text))| Token::new(*tid, *text).with_field("position", json!(i + 1)))
            .collect();
        Witness::new(id, format!("Witness {}", id))
            .with_field("siglum", json!(id.to_uppercase()))
            .with_section(
                Section::new(SectionId::Text(format!("{}_p1", id)), tokens)
                    .with_field("order_no", json!(1))
                    .with_field("type", json!("page")),
            )
    }

    fn store_with(backend: Arc<MemoryBackend>) -> RecordStore {
        RecordStore::open(backend).unwrap()
    }

    #[test]
    fn test_create_then_get_returns_equal_record() {
        let mut store = RecordStore::in_memory();
        let w = witness("w1", &[("t1", "qala")]);

        assert_eq!(store.create_witness(w.clone()).unwrap(), "w1");
        assert_eq!(store.get_witness("w1").unwrap(), &w);

        let summaries = store.list_witness_summaries();
        assert_eq!(summaries.iter().filter(|s| s.id == "w1").count(), 1);
    }

    #[test]
    fn test_duplicate_witness_leaves_store_unchanged() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone());
        store.create_witness(witness("w1", &[("t1", "a")])).unwrap();
        let persisted = backend.stored(Collection::Witnesses);

        let mut dup = witness("w1", &[("t9", "z")]);
        dup.label = "other".to_string();
        let err = store.create_witness(dup).unwrap_err();

        assert!(matches!(err, Error::DuplicateId(_)));
        assert_eq!(store.witnesses().len(), 1);
        assert_eq!(store.get_witness("w1").unwrap().label, "Witness w1");
        assert_eq!(backend.stored(Collection::Witnesses), persisted);
    }

    #[test]
    fn test_create_from_json_requires_label() {
        let mut store = RecordStore::in_memory();
        let err = store
            .create_witness_from_json(json!({"id": "w1", "sections": []}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.witnesses().is_empty());
    }

    #[test]
    fn test_update_label_only_touches_label() {
        let mut store = RecordStore::in_memory();
        let original = witness("w1", &[("t1", "a"), ("t2", "b")]);
        store.create_witness(original.clone()).unwrap();

        store.update_witness_label("w1", "Renamed").unwrap();

        let updated = store.get_witness("w1").unwrap();
        assert_eq!(updated.label, "Renamed");
        assert_eq!(updated.sections, original.sections);
        assert_eq!(updated.extra, original.extra);
    }

    #[test]
    fn test_update_label_errors() {
        let mut store = RecordStore::in_memory();
        store.create_witness(witness("w1", &[])).unwrap();

        assert!(matches!(
            store.update_witness_label("nope", "x"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.update_witness_label("w1", "  "),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(store.get_witness("w1").unwrap().label, "Witness w1");
    }

    #[test]
    fn test_delete_witness_cascades_annotations() {
        let mut store = RecordStore::in_memory();
        store.create_witness(witness("w1", &[("t1", "a")])).unwrap();
        store.create_witness(witness("w2", &[("t1", "b")])).unwrap();
        store.create_annotation(NewAnnotation::new("w1", "t1", "one")).unwrap();
        store.create_annotation(NewAnnotation::new("w2", "t1", "two")).unwrap();
        store.create_annotation(NewAnnotation::new("w1", "t1", "three")).unwrap();

        let before = store.list_annotations(None).len();
        let for_w1 = store.list_annotations(Some("w1")).len();

        assert_eq!(store.delete_witness("w1").unwrap(), 2);
        assert!(store.find_witness("w1").is_none());
        assert_eq!(store.list_annotations(None).len(), before - for_w1);
        assert_eq!(store.list_annotations(Some("w2")).len(), 1);
    }

    #[test]
    fn test_delete_witness_rolls_back_when_witness_write_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone());
        store.create_witness(witness("w1", &[("t1", "a")])).unwrap();
        store.create_annotation(NewAnnotation::new("w1", "t1", "keep me")).unwrap();

        backend.fail_saves(Collection::Witnesses, true);
        assert!(store.delete_witness("w1").is_err());

        assert!(store.find_witness("w1").is_some());
        assert_eq!(store.list_annotations(Some("w1")).len(), 1);
        let persisted = backend.stored(Collection::Annotations).unwrap();
        assert_eq!(persisted.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_witness_aborts_when_annotation_write_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone());
        store.create_witness(witness("w1", &[("t1", "a")])).unwrap();
        store.create_annotation(NewAnnotation::new("w1", "t1", "note")).unwrap();

        backend.fail_saves(Collection::Annotations, true);
        assert!(store.delete_witness("w1").is_err());
        assert!(store.find_witness("w1").is_some());
        assert_eq!(store.list_annotations(None).len(), 1);
    }

    #[test]
    fn test_delete_missing_witness() {
        let mut store = RecordStore::in_memory();
        assert!(matches!(store.delete_witness("w9"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_annotation_ids_strictly_increase() {
        let mut store = RecordStore::in_memory();
        let a = store.create_annotation(NewAnnotation::new("w1", "t1", "a")).unwrap();
        let b = store.create_annotation(NewAnnotation::new("w1", "t2", "b")).unwrap();
        store.delete_annotation(b.id.unwrap()).unwrap();
        let c = store.create_annotation(NewAnnotation::new("w1", "t3", "c")).unwrap();

        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(c.id, Some(3));
        assert!(!a.timestamp.is_empty());
    }

    #[test]
    fn test_create_annotation_does_not_check_witness() {
        let mut store = RecordStore::in_memory();
        let created = store
            .create_annotation(NewAnnotation::new("ghost", "t404", "permissive"))
            .unwrap();
        assert_eq!(created.witness_id, "ghost");
    }

    #[test]
    fn test_create_annotation_missing_field() {
        let mut store = RecordStore::in_memory();
        let draft = NewAnnotation {
            witness_id: Some("w1".to_string()),
            token_id: None,
            annotation: Some("x".to_string()),
        };
        assert!(matches!(
            store.create_annotation(draft),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(store.next_annotation_id(), 1);
    }

    #[test]
    fn test_failed_annotation_write_does_not_consume_id() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone());

        backend.fail_saves(Collection::Annotations, true);
        assert!(store
            .create_annotation(NewAnnotation::new("w1", "t1", "lost"))
            .is_err());
        assert!(store.list_annotations(None).is_empty());

        backend.fail_saves(Collection::Annotations, false);
        let created = store
            .create_annotation(NewAnnotation::new("w1", "t1", "kept"))
            .unwrap();
        assert_eq!(created.id, Some(1));
    }

    #[test]
    fn test_update_missing_annotation_leaves_state() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone());
        store.create_annotation(NewAnnotation::new("w1", "t1", "a")).unwrap();
        let persisted = backend.stored(Collection::Annotations);

        assert!(matches!(
            store.update_annotation(42, "changed"),
            Err(Error::NotFound(_))
        ));
        assert_eq!(backend.stored(Collection::Annotations), persisted);
        assert_eq!(store.list_annotations(None)[0].annotation, "a");
    }

    #[test]
    fn test_update_annotation_replaces_text() {
        let mut store = RecordStore::in_memory();
        let created = store.create_annotation(NewAnnotation::new("w1", "t1", "a")).unwrap();

        let updated = store.update_annotation(created.id.unwrap(), "b").unwrap();
        assert_eq!(updated.annotation, "b");
        assert_eq!(updated.witness_id, "w1");
        assert_eq!(store.get_annotation(created.id.unwrap()).unwrap().annotation, "b");
    }

    #[test]
    fn test_load_tolerates_malformed_history() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_collection(
                    Collection::Witnesses,
                    json!([
                        {"id": "w1", "label": "ok", "sections": []},
                        {"label": "no id"},
                        {"id": "w1", "label": "duplicate"}
                    ]),
                )
                .with_collection(
                    Collection::Annotations,
                    json!([
                        {"id": 7, "witness_id": "w1", "token_id": "t1", "annotation": "x"},
                        {"id": "bad", "witness_id": "w1", "token_id": "t1", "annotation": "y"},
                        {"witness_id": "w1", "token_id": "t2", "annotation": "legacy"},
                        "not an object"
                    ]),
                )
                .with_collection(Collection::AlignmentGroups, json!({"not": "an array"})),
        );

        let store = store_with(backend);
        assert_eq!(store.witnesses().len(), 1);
        assert_eq!(store.get_witness("w1").unwrap().label, "ok");
        assert_eq!(store.list_annotations(None).len(), 2);
        assert_eq!(store.next_annotation_id(), 8);
        assert!(store.alignment_groups().is_empty());
        assert_eq!(store.unreadable.witnesses.len(), 2);
        assert_eq!(store.unreadable.annotations.len(), 2);
        assert_eq!(store.unreadable.alignment_groups, vec![json!({"not": "an array"})]);
    }

    #[test]
    fn test_unrelated_write_keeps_unreadable_entries() {
        let legacy = json!({"id": "w_legacy", "title": "no label field"});
        let backend = Arc::new(MemoryBackend::new().with_collection(
            Collection::Witnesses,
            json!([{"id": "w1", "label": "ok"}, legacy.clone()]),
        ));
        let mut store = store_with(backend.clone());
        assert_eq!(store.witnesses().len(), 1);

        store.update_witness_label("w1", "renamed").unwrap();

        let stored = backend.stored(Collection::Witnesses).unwrap();
        assert_eq!(
            stored,
            json!([{"id": "w1", "label": "renamed"}, legacy])
        );
    }

    #[test]
    fn test_witness_id_held_by_unreadable_entry_is_taken() {
        let backend = Arc::new(MemoryBackend::new().with_collection(
            Collection::Witnesses,
            json!([{"id": "w_legacy", "label": 7}]),
        ));
        let mut store = store_with(backend);

        let err = store.create_witness(witness("w_legacy", &[])).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
    }

    #[test]
    fn test_cascade_removes_unreadable_annotations_of_witness() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_collection(Collection::Witnesses, json!([{"id": "w1", "label": "ok"}]))
                .with_collection(
                    Collection::Annotations,
                    json!([
                        {"id": "x1", "witness_id": "w1", "token_id": "t1"},
                        {"id": "x2", "witness_id": "w2", "token_id": "t1"}
                    ]),
                ),
        );
        let mut store = store_with(backend.clone());

        assert_eq!(store.delete_witness("w1").unwrap(), 1);
        assert_eq!(
            backend.stored(Collection::Annotations).unwrap(),
            json!([{"id": "x2", "witness_id": "w2", "token_id": "t1"}])
        );
    }

    #[test]
    fn test_import_replaces_unreadable_groups() {
        let backend = Arc::new(MemoryBackend::new().with_collection(
            Collection::AlignmentGroups,
            json!([{"w1": 5}]),
        ));
        let mut store = store_with(backend.clone());
        assert!(store.alignment_groups().is_empty());

        store.import_alignment_table(b"w1\nt1\n").unwrap();
        assert_eq!(
            backend.stored(Collection::AlignmentGroups).unwrap(),
            json!([{"w1": "t1"}])
        );
    }

    #[test]
    fn test_duplicate_persisted_annotation_id_is_set_aside() {
        let backend = Arc::new(MemoryBackend::new().with_collection(
            Collection::Annotations,
            json!([
                {"id": 3, "witness_id": "w1", "token_id": "t1", "annotation": "first"},
                {"id": 3, "witness_id": "w1", "token_id": "t2", "annotation": "second"}
            ]),
        ));
        let store = store_with(backend);

        assert_eq!(store.get_annotation(3).unwrap().annotation, "first");
        assert_eq!(store.list_annotations(None).len(), 1);
        assert_eq!(store.unreadable.annotations[0]["annotation"], "second");
        assert_eq!(store.next_annotation_id(), 4);
    }

    #[test]
    fn test_legacy_annotations_removed_by_cascade() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_collection(
                    Collection::Witnesses,
                    json!([{"id": "w1", "label": "ok"}]),
                )
                .with_collection(
                    Collection::Annotations,
                    json!([{"witness_id": "w1", "token_id": "t2", "annotation": "legacy"}]),
                ),
        );
        let mut store = store_with(backend);

        assert_eq!(store.delete_witness("w1").unwrap(), 1);
        assert!(store.list_annotations(None).is_empty());
    }

    #[test]
    fn test_replace_alignment_groups_rolls_back_on_failure() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone());
        store
            .replace_alignment_groups(vec![[("w1", "t1")].into_iter().collect()])
            .unwrap();

        backend.fail_saves(Collection::AlignmentGroups, true);
        assert!(store.replace_alignment_groups(Vec::new()).is_err());
        assert_eq!(store.alignment_groups().len(), 1);
    }
}
