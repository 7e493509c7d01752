//! Projects and revision metadata
//!
//! A project is a linear history of revisions over one schema. Its first
//! revision is committed empty at creation, so every batch has a previous
//! revision to apply against. Revision `R` of a project sees every committed
//! revision of that project up to and including `R`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bimstore_core::{ProjectId, RevisionId, RevisionSet, Schema};

/// Metadata of one committed revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    /// Revision id
    pub id: RevisionId,
    /// Owning project
    pub project: ProjectId,
    /// Revision the batch was applied against; None for the initial revision
    pub base: Option<RevisionId>,
    /// Caller comment
    pub comment: String,
    /// Commit time
    pub committed_at: DateTime<Utc>,
    /// Number of changes in the batch
    pub changes: usize,
    /// Number of object states written
    pub objects_written: usize,
    /// Number of objects removed
    pub objects_removed: usize,
}

/// Project metadata and revision history
#[derive(Debug, Clone)]
pub struct Project {
    id: ProjectId,
    name: String,
    schema: Arc<Schema>,
    created_at: DateTime<Utc>,
    revisions: Vec<RevisionInfo>,
}

impl Project {
    pub(crate) fn new(id: ProjectId, name: String, schema: Arc<Schema>, initial: RevisionInfo) -> Self {
        Self {
            id,
            name,
            schema,
            created_at: initial.committed_at,
            revisions: vec![initial],
        }
    }

    /// Project id
    pub fn id(&self) -> ProjectId {
        self.id
    }

    /// Project name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema identifier
    pub fn schema_id(&self) -> &str {
        self.schema.id()
    }

    /// Schema every batch of the project is validated against
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Committed revisions, oldest first
    pub fn revisions(&self) -> &[RevisionInfo] {
        &self.revisions
    }

    /// Latest committed revision
    pub fn head(&self) -> &RevisionInfo {
        // Never empty: constructed with the initial revision
        &self.revisions[self.revisions.len() - 1]
    }

    /// Metadata of revision `id`, if it belongs to this project
    pub fn revision(&self, id: RevisionId) -> Option<&RevisionInfo> {
        self.revisions
            .binary_search_by_key(&id, |info| info.id)
            .ok()
            .map(|index| &self.revisions[index])
    }

    /// Revisions visible as of revision `id`, or None if `id` is not a
    /// revision of this project
    pub fn visible_set(&self, id: RevisionId) -> Option<RevisionSet> {
        self.revision(id)?;
        Some(
            self.revisions
                .iter()
                .map(|info| info.id)
                .take_while(|rev| *rev <= id)
                .collect(),
        )
    }

    pub(crate) fn push(&mut self, info: RevisionInfo) {
        debug_assert!(info.id > self.head().id);
        self.revisions.push(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimstore_core::SchemaBuilder;

    fn info(id: u64, base: Option<u64>) -> RevisionInfo {
        RevisionInfo {
            id: RevisionId(id),
            project: ProjectId(1),
            base: base.map(RevisionId),
            comment: String::new(),
            committed_at: Utc::now(),
            changes: 0,
            objects_written: 0,
            objects_removed: 0,
        }
    }

    fn project() -> Project {
        let schema = Arc::new(SchemaBuilder::new("ifc4").build().unwrap());
        let mut project = Project::new(ProjectId(1), "tower".into(), schema, info(2, None));
        project.push(info(5, Some(2)));
        project.push(info(9, Some(5)));
        project
    }

    #[test]
    fn test_head_is_latest() {
        let project = project();
        assert_eq!(project.head().id, RevisionId(9));
        assert_eq!(project.revisions().len(), 3);
        assert_eq!(project.schema_id(), "ifc4");
        assert_eq!(project.name(), "tower");
    }

    #[test]
    fn test_visible_set_includes_older_revisions() {
        let project = project();
        let visible = project.visible_set(RevisionId(5)).unwrap();
        assert_eq!(visible.iter().collect::<Vec<_>>(), vec![RevisionId(2), RevisionId(5)]);
        assert_eq!(project.visible_set(RevisionId(9)).unwrap().len(), 3);
    }

    #[test]
    fn test_foreign_revision_not_visible() {
        let project = project();
        assert!(project.revision(RevisionId(3)).is_none());
        assert!(project.visible_set(RevisionId(3)).is_none());
    }

    #[test]
    fn test_revision_info_serializes() {
        let json = serde_json::to_value(info(4, Some(3))).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["base"], 3);
    }
}
