use std::collections::HashMap;
use std::sync::Arc;

use super::{ListError, RecordList};
use crate::identity::{DetailLevel, Identity};
use crate::index::native_id;
use crate::index::{DiagnosticSink, Diagnostics, LogSink};
use crate::record::Record;

const COMPONENT: &str = "SimpleList";

/// In-memory list of fully materialized records.
///
/// Ordinals are re-assigned densely at construction; ids must be unique.
/// Every access clones the stored record and drops whatever exceeds the
/// requested detail level.
pub struct SimpleList<R: Record> {
    records: Vec<R>,
    by_id: HashMap<String, usize>,
    diagnostics: Diagnostics,
}

impl<R: Record> SimpleList<R> {
    /// Build from records, logging id scheme mismatches through `log`
    pub fn new(records: Vec<R>) -> Result<Self, ListError> {
        Self::with_diagnostics(records, Arc::new(LogSink))
    }

    /// Build from records with an explicit diagnostic sink
    pub fn with_diagnostics(mut records: Vec<R>, sink: Arc<dyn DiagnosticSink>) -> Result<Self, ListError> {
        let mut by_id = HashMap::with_capacity(records.len());
        for (index, record) in records.iter_mut().enumerate() {
            record.identity_mut().index = index;
            let id = record.identity().id.clone();
            if by_id.insert(id.clone(), index).is_some() {
                return Err(ListError::DuplicateId {
                    component: COMPONENT.to_string(),
                    id,
                });
            }
        }
        Ok(Self {
            records,
            by_id,
            diagnostics: Diagnostics::new(COMPONENT, sink),
        })
    }

    fn get(&self, index: usize) -> Result<&R, ListError> {
        self.records
            .get(index)
            .ok_or_else(|| ListError::out_of_range(COMPONENT, index, self.records.len()))
    }
}

impl<R: Record> RecordList for SimpleList<R> {
    type Record = R;

    fn size(&self) -> Result<usize, ListError> {
        Ok(self.records.len())
    }

    fn identity(&self, index: usize) -> Result<Identity, ListError> {
        Ok(self.get(index)?.identity().clone())
    }

    fn find(&self, id: &str) -> Result<usize, ListError> {
        match self.by_id.get(id) {
            Some(&index) => Ok(index),
            None => {
                let first = self.records.first().map(|r| r.identity().id.as_str());
                Ok(native_id::check_find_result(
                    self.records.len(),
                    first,
                    id,
                    &self.diagnostics,
                ))
            }
        }
    }

    fn item(&self, index: usize, detail: DetailLevel) -> Result<R, ListError> {
        let mut record = self.get(index)?.clone();
        record.trim_to(detail);
        Ok(record)
    }

    fn describe(&self) -> String {
        COMPONENT.to_string()
    }
}
