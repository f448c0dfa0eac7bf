//! Snapshot persistence — JSON serialization of [`Partition`] and
//! [`Document`].
//!
//! Loading is tolerant of missing optional fields (annotations default
//! to empty, articulations to none) but rejects a structurally invalid
//! snapshot wholesale: the caller keeps its in-memory state and falls
//! back to a fresh partition. Nothing is ever partially imported.

use crate::error::SnapshotError;
use crate::model::{Document, InstrumentPart, Partition};

/// Serialize a partition to pretty-printed JSON.
pub fn partition_to_json(partition: &Partition) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(partition)?)
}

/// Load a partition snapshot. The sort invariant is restored and each
/// note's voice is re-derived from its part (the mapping is
/// configuration, not data).
pub fn partition_from_json(json: &str) -> Result<Partition, SnapshotError> {
    let mut partition: Partition = serde_json::from_str(json)?;
    validate_partition(&partition)?;
    normalize_partition(&mut partition);
    Ok(partition)
}

/// Serialize a whole document.
pub fn document_to_json(document: &Document) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Load a document snapshot.
pub fn document_from_json(json: &str) -> Result<Document, SnapshotError> {
    let mut document: Document = serde_json::from_str(json)?;
    if document.partitions.is_empty() {
        return Err(SnapshotError::Invalid(
            "document holds no partitions".into(),
        ));
    }
    if document.current >= document.partitions.len() {
        return Err(SnapshotError::Invalid(format!(
            "current partition index {} out of range",
            document.current
        )));
    }
    for partition in &document.partitions {
        validate_partition(partition)?;
    }
    for partition in &mut document.partitions {
        normalize_partition(partition);
    }
    Ok(document)
}

fn validate_partition(partition: &Partition) -> Result<(), SnapshotError> {
    if partition.num_measures < 1 {
        return Err(SnapshotError::Invalid("num_measures must be at least 1".into()));
    }
    if !partition.time_signature.is_valid() {
        return Err(SnapshotError::Invalid(format!(
            "invalid time signature {}/{}",
            partition.time_signature.top, partition.time_signature.bottom
        )));
    }
    if partition.tempo == 0 {
        return Err(SnapshotError::Invalid("tempo must be positive".into()));
    }
    let qpm = partition.time_signature.quarters_per_measure();
    for note in &partition.notes {
        if note.measure >= partition.num_measures {
            return Err(SnapshotError::Invalid(format!(
                "note {} in measure {} but the score has {} measures",
                note.id, note.measure, partition.num_measures
            )));
        }
        if note.beat < 0.0 || note.beat >= qpm {
            return Err(SnapshotError::Invalid(format!(
                "note {} at beat {} outside the measure",
                note.id, note.beat
            )));
        }
        if note.part == InstrumentPart::Rest && note.articulation.is_some() {
            return Err(SnapshotError::Invalid(format!(
                "rest {} carries an articulation",
                note.id
            )));
        }
    }
    Ok(())
}

fn normalize_partition(partition: &mut Partition) {
    for note in &mut partition.notes {
        note.voice = note.part.voice();
    }
    partition.sort_notes();
}
