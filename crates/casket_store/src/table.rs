//! Row table shared by the bundled stores.

use crate::backend::UpdateOutcome;
use crate::entity::Entity;
use crate::types::{EntityId, Version};
use std::collections::HashMap;

/// Plain map of rows with the conditional-write rules applied.
///
/// Callers provide the locking; every method assumes exclusive access for
/// the duration of the call.
#[derive(Debug, Clone, Default)]
pub(crate) struct RowTable {
    rows: HashMap<EntityId, Entity>,
}

impl RowTable {
    pub(crate) fn from_rows(rows: HashMap<EntityId, Entity>) -> Self {
        Self { rows }
    }

    pub(crate) fn insert_if_absent(&mut self, entity: &Entity) -> bool {
        if self.rows.contains_key(&entity.id) {
            return false;
        }
        self.rows.insert(entity.id.clone(), entity.clone());
        true
    }

    pub(crate) fn update_if_version_equals(
        &mut self,
        entity: &Entity,
        expected: Version,
    ) -> UpdateOutcome {
        match self.rows.get_mut(&entity.id) {
            Some(row) if row.version == Some(expected) => {
                *row = entity.clone();
                UpdateOutcome::Applied
            }
            Some(row) => UpdateOutcome::Conflict {
                current: row.version,
            },
            None => UpdateOutcome::Conflict { current: None },
        }
    }

    pub(crate) fn delete_if_exists(&mut self, id: &EntityId) -> bool {
        self.rows.remove(id).is_some()
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.rows.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    /// Returns every row sorted by id.
    pub(crate) fn sorted_rows(&self) -> Vec<Entity> {
        let mut rows: Vec<Entity> = self.rows.values().cloned().collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}
