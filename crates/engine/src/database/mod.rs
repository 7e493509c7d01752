//! Database facade
//!
//! This module provides the Database struct that ties together:
//! - The shared object store
//! - The batch coordinator (concrete revisions and locks)
//! - Schema provisioning
//! - Projects and their linear revision history
//!
//! ## Batch API
//!
//! 1. **Single attempt**: `db.commit_changes(project, previous, &changes, comment)`
//!    - Applies every change in order, then commits all of them or none
//!    - A lock conflict is returned to the caller as is
//!
//! 2. **Retrying**: `db.commit_with_retry(project, &retry, comment, |head| ...)`
//!    - Rebuilds the batch against the current head after a lock conflict
//!
//! ## Visibility
//!
//! A project's revision `R` sees every committed revision of the project up
//! to and including `R`. A revision becomes visible to readers in the same
//! critical section that stores its objects.

pub mod config;
pub mod project;
pub mod registry;
pub mod transactions;

pub use config::{ConfigError, EngineConfig, RetrySettings, CONFIG_FILE_NAME};
pub use project::{Project, RevisionInfo};
pub use registry::SchemaRegistry;
pub use transactions::RetryConfig;

use chrono::Utc;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use bimstore_core::{
    ChangeError, ChangeResult, Oid, ProjectId, RevisionId, RevisionSet, Schema, SnapshotReader,
    VirtualObject,
};
use bimstore_storage::{ObjectStore, StoreReader, StoredObject};

use crate::change::Change;
use crate::context::ChangeContext;
use crate::coordinator::{BatchCoordinator, BatchMetrics};
use crate::ownership::OidOwners;

// ============================================================================
// Database Struct
// ============================================================================

/// Revisioned object-model database
///
/// # Example
///
/// ```text
/// use bimstore_engine::{Change, Database};
///
/// let db = Database::new();
/// db.register_schema(schema);
/// let project = db.create_project("tower", "ifc2x3tc1")?;
/// let head = db.head(project)?.id;
/// let wall = db.allocate_oid(project, "IfcWall")?;
/// db.commit_changes(
///     project,
///     head,
///     &[Change::create_object(wall, "IfcWall"), Change::set_attribute(wall, "Name", "W-01")],
///     "add wall",
/// )?;
/// ```
pub struct Database {
    config: EngineConfig,
    store: Arc<ObjectStore>,
    coordinator: BatchCoordinator,
    schemas: SchemaRegistry,
    owners: OidOwners,
    projects: RwLock<FxHashMap<ProjectId, Project>>,
    next_project: AtomicU64,
}

impl Database {
    /// Empty database with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Empty database with `config`
    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(ObjectStore::new());
        Self {
            config,
            coordinator: BatchCoordinator::new(Arc::clone(&store)),
            store,
            schemas: SchemaRegistry::new(),
            owners: OidOwners::new(),
            projects: RwLock::new(FxHashMap::default()),
            next_project: AtomicU64::new(1),
        }
    }

    /// Empty database configured from a `bimstore.toml` file
    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::with_config(EngineConfig::from_file(path)?))
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared object store
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// Batch metrics snapshot
    pub fn metrics(&self) -> BatchMetrics {
        self.coordinator.metrics()
    }

    // ========================================================================
    // Schemas and Projects
    // ========================================================================

    /// Register a schema under its identifier
    pub fn register_schema(&self, schema: Schema) -> Arc<Schema> {
        self.schemas.register(schema)
    }

    /// Registered schemas
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Create a project over the schema registered as `schema_id`
    ///
    /// Commits an empty initial revision; the project becomes visible
    /// together with it.
    ///
    /// # Errors
    ///
    /// `SchemaNotFound` if no schema is registered under `schema_id`.
    pub fn create_project(&self, name: &str, schema_id: &str) -> ChangeResult<ProjectId> {
        let schema = self.schemas.get(schema_id)?;
        let id = ProjectId(self.next_project.fetch_add(1, Ordering::Relaxed));
        let base = self.store.version();

        let concrete = self.coordinator.begin(id, base);
        self.coordinator.commit(concrete, 0, |revision| {
            let initial = RevisionInfo {
                id: revision,
                project: id,
                base: None,
                comment: format!("create project {}", name),
                committed_at: Utc::now(),
                changes: 0,
                objects_written: 0,
                objects_removed: 0,
            };
            let project = Project::new(id, name.to_string(), Arc::clone(&schema), initial);
            self.projects.write().insert(id, project);
        })?;

        info!(
            target: "bimstore::batch",
            project = %id, name, schema = schema_id,
            "project created"
        );
        Ok(id)
    }

    /// Snapshot of a project's metadata
    pub fn project(&self, project: ProjectId) -> ChangeResult<Project> {
        self.projects
            .read()
            .get(&project)
            .cloned()
            .ok_or(ChangeError::ProjectNotFound { project })
    }

    /// All project ids, ascending
    pub fn project_ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.projects.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Latest committed revision of a project
    pub fn head(&self, project: ProjectId) -> ChangeResult<RevisionInfo> {
        self.with_project(project, |p| p.head().clone())
    }

    /// Committed revisions of a project, oldest first
    pub fn revisions(&self, project: ProjectId) -> ChangeResult<Vec<RevisionInfo>> {
        self.with_project(project, |p| p.revisions().to_vec())
    }

    /// Allocate an oid for a new object of `type_name`
    ///
    /// The oid carries the entity type; pass it to [`Change::create_object`]
    /// with the same type name. It belongs to `project` from now on.
    pub fn allocate_oid(&self, project: ProjectId, type_name: &str) -> ChangeResult<Oid> {
        let schema = self.with_project(project, |p| Arc::clone(p.schema()))?;
        let entity = schema
            .entity_type_by_name(type_name)
            .ok_or_else(|| ChangeError::EntityTypeNotFound {
                type_name: type_name.to_string(),
            })?;
        let oid = self.store.allocate_oid(entity.id())?;
        self.owners.claim(oid, project);
        Ok(oid)
    }

    /// Project owning `oid`, if any
    pub fn oid_owner(&self, oid: Oid) -> Option<ProjectId> {
        self.owners.owner(oid)
    }

    // ========================================================================
    // Batches
    // ========================================================================

    /// Apply `changes` on top of `previous` and commit them as one revision
    ///
    /// Changes apply strictly in order, each seeing the effects of the ones
    /// before it. The first failing change aborts the batch: nothing it
    /// wrote becomes visible and no revision is created.
    ///
    /// # Errors
    ///
    /// - `BatchTooLarge` if `changes` exceeds `max_batch_changes`
    /// - `ProjectNotFound` / `RevisionNotFound` for an unknown base
    /// - Any error of the failing change
    /// - `LockConflict` if another batch holds or has committed a newer
    ///   version of a written object; retry on a fresh head
    pub fn commit_changes(
        &self,
        project: ProjectId,
        previous: RevisionId,
        changes: &[Change],
        comment: &str,
    ) -> ChangeResult<RevisionInfo> {
        if changes.len() > self.config.max_batch_changes {
            return Err(ChangeError::BatchTooLarge {
                changes: changes.len(),
                limit: self.config.max_batch_changes,
            });
        }
        let (schema, visible) = self.view(project, previous)?;
        let reader = StoreReader::new(Arc::clone(&self.store), Arc::clone(&schema));

        let concrete = self.coordinator.begin(project, previous);
        let applied = {
            let mut ctx = ChangeContext::new(
                &schema,
                &reader,
                self.coordinator.manager(),
                concrete,
                &visible,
            )
            .with_strict_references(self.config.strict_references)
            .with_owners(&self.owners, project);
            match changes.iter().try_for_each(|change| ctx.apply(change)) {
                Ok(()) => {
                    let overlay = ctx.overlay();
                    Ok(overlay
                        .created_oids()
                        .chain(overlay.deleted().map(|(oid, _)| oid))
                        .collect::<Vec<Oid>>())
                }
                Err(err) => Err(err),
            }
        };
        let claimed = match applied {
            Ok(claimed) => claimed,
            Err(err) => {
                warn!(
                    target: "bimstore::batch",
                    %project, %concrete, error = %err,
                    "batch rejected"
                );
                if let Err(abort_err) = self.coordinator.abort(concrete, &err) {
                    error!(target: "bimstore::batch", %concrete, error = %abort_err, "abort failed");
                }
                return Err(err);
            }
        };

        let pending = self
            .coordinator
            .manager()
            .pending_operations(concrete)
            .unwrap_or_default();
        let mut published = None;
        self.coordinator.commit(concrete, changes.len(), |revision| {
            let info = RevisionInfo {
                id: revision,
                project,
                base: Some(previous),
                comment: comment.to_string(),
                committed_at: Utc::now(),
                changes: changes.len(),
                objects_written: pending.writes,
                objects_removed: pending.removals,
            };
            for oid in &claimed {
                self.owners.claim(*oid, project);
            }
            match self.projects.write().get_mut(&project) {
                Some(p) => p.push(info.clone()),
                None => error!(target: "bimstore::batch", %project, "project vanished during commit"),
            }
            published = Some(info);
        })?;

        let info = published.ok_or_else(|| {
            ChangeError::InvalidState(format!("commit of {} published no revision", concrete))
        })?;
        info!(
            target: "bimstore::batch",
            %project, revision = %info.id, changes = info.changes,
            written = info.objects_written, removed = info.objects_removed,
            "batch committed"
        );
        Ok(info)
    }

    /// Build and commit a batch against the current head, retrying on lock
    /// conflicts
    ///
    /// `build` receives the head revision of each attempt and returns the
    /// changes to apply on it. Only `LockConflict` is retried, at most
    /// `retry.max_retries` times with exponential back-off; every other
    /// error, including one from `build`, is returned immediately.
    pub fn commit_with_retry<F>(
        &self,
        project: ProjectId,
        retry: &RetryConfig,
        comment: &str,
        mut build: F,
    ) -> ChangeResult<RevisionInfo>
    where
        F: FnMut(RevisionId) -> ChangeResult<Vec<Change>>,
    {
        let mut attempt = 0;
        loop {
            let head = self.head(project)?.id;
            let changes = build(head)?;
            match self.commit_changes(project, head, &changes, comment) {
                Err(e) if retry.should_retry(attempt, &e) => {
                    let delay = retry.calculate_delay(attempt);
                    warn!(
                        target: "bimstore::batch",
                        %project, attempt, delay_ms = delay.as_millis() as u64,
                        "retrying after lock conflict"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Object `oid` as of `revision`, or None if it is not live there
    pub fn read_object(
        &self,
        project: ProjectId,
        revision: RevisionId,
        oid: Oid,
    ) -> ChangeResult<Option<VirtualObject>> {
        let (schema, visible) = self.view(project, revision)?;
        let reader = StoreReader::new(Arc::clone(&self.store), schema);
        Ok(reader.resolve(oid, &visible))
    }

    /// Live objects of `type_name` as of `revision`, sorted by oid
    pub fn objects_of_type(
        &self,
        project: ProjectId,
        revision: RevisionId,
        type_name: &str,
    ) -> ChangeResult<Vec<VirtualObject>> {
        let (schema, visible) = self.view(project, revision)?;
        StoreReader::new(Arc::clone(&self.store), schema).objects_of_type(type_name, &visible)
    }

    /// Committed versions of `oid` within `project`, newest first
    ///
    /// Removals appear as tombstones.
    pub fn object_history(
        &self,
        project: ProjectId,
        oid: Oid,
        limit: Option<usize>,
    ) -> ChangeResult<Vec<StoredObject>> {
        let visible: RevisionSet =
            self.with_project(project, |p| p.revisions().iter().map(|info| info.id).collect())?;
        Ok(self
            .store
            .history(oid, None)
            .into_iter()
            .filter(|stored| visible.contains(stored.revision()))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn with_project<T>(&self, project: ProjectId, f: impl FnOnce(&Project) -> T) -> ChangeResult<T> {
        self.projects
            .read()
            .get(&project)
            .map(f)
            .ok_or(ChangeError::ProjectNotFound { project })
    }

    // The projects lock is released before the caller touches the store.
    fn view(&self, project: ProjectId, revision: RevisionId) -> ChangeResult<(Arc<Schema>, RevisionSet)> {
        let projects = self.projects.read();
        let p = projects
            .get(&project)
            .ok_or(ChangeError::ProjectNotFound { project })?;
        let visible = p
            .visible_set(revision)
            .ok_or(ChangeError::RevisionNotFound { project, revision })?;
        Ok((Arc::clone(p.schema()), visible))
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("schemas", &self.schemas.ids())
            .field("projects", &self.projects.read().len())
            .field("owned_oids", &self.owners.len())
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
