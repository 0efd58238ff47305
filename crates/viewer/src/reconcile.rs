use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use catalog::{CatalogIndex, Category, Family};
use foundation::Id;
use protocol::{Cluster, EntitiesAndClusters, ViewRequest, ViewerCachedEntity};
use tracing::{debug, warn};

use crate::ViewerError;

/// An entity on screen, resolved against the catalog.
#[derive(Debug, Clone)]
pub struct DisplayableEntity {
    pub id: Id,
    pub entity_id: Id,
    pub display_name: String,
    pub tags_ids: Vec<Id>,
    /// Web Mercator `[x, y]`.
    pub coordinates: [f64; 2],
    pub family: Arc<Family>,
    pub category: Arc<Category>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayableCluster {
    pub id: Id,
    pub count: u64,
    pub coordinates: [f64; 2],
}

trait Keyed {
    fn key(&self) -> &Id;
}

impl Keyed for DisplayableEntity {
    fn key(&self) -> &Id {
        &self.id
    }
}

impl Keyed for DisplayableCluster {
    fn key(&self) -> &Id {
        &self.id
    }
}

impl Keyed for ViewerCachedEntity {
    fn key(&self) -> &Id {
        &self.id
    }
}

impl Keyed for Cluster {
    fn key(&self) -> &Id {
        &self.id
    }
}

/// Pending merge of one incoming set into one on-screen collection.
struct Merge<T> {
    keep: HashSet<Id>,
    fresh: Vec<T>,
}

impl<T: Keyed> Merge<T> {
    /// Resolves every incoming item absent from `current` before anything is
    /// touched, so a failed build leaves `current` as it was.
    fn plan<R: Keyed>(
        current: &[T],
        incoming: Vec<R>,
        mut build: impl FnMut(R) -> Result<T, ViewerError>,
    ) -> Result<Self, ViewerError> {
        let keep: HashSet<Id> = incoming.iter().map(|r| r.key().clone()).collect();
        let present: HashSet<&Id> = current
            .iter()
            .map(Keyed::key)
            .filter(|id| keep.contains(*id))
            .collect();

        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        for item in incoming {
            if present.contains(item.key()) || !seen.insert(item.key().clone()) {
                continue;
            }
            fresh.push(build(item)?);
        }
        Ok(Self { keep, fresh })
    }

    fn commit(self, current: &mut Vec<T>) -> (usize, usize) {
        let before = current.len();
        current.retain(|item| self.keep.contains(item.key()));
        let removed = before - current.len();
        let added = self.fresh.len();
        current.extend(self.fresh);
        (added, removed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub entities_added: usize,
    pub entities_removed: usize,
    pub clusters_added: usize,
    pub clusters_removed: usize,
}

/// On-screen entity and cluster collections.
///
/// After [`EntitySetCache::apply`] the id sets equal the response's id sets.
/// Items already on screen keep their position and UI state; new ones are
/// appended in server order.
#[derive(Debug, Clone, Default)]
pub struct EntitySetCache {
    entities: Vec<DisplayableEntity>,
    clusters: Vec<DisplayableCluster>,
}

impl EntitySetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &[DisplayableEntity] {
        &self.entities
    }

    pub fn clusters(&self) -> &[DisplayableCluster] {
        &self.clusters
    }

    pub fn entity(&self, id: &Id) -> Option<&DisplayableEntity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.clusters.clear();
    }

    /// All-or-nothing: an entity whose family or category cannot be resolved
    /// aborts the whole update.
    pub fn apply(
        &mut self,
        response: EntitiesAndClusters,
        catalog: &CatalogIndex,
    ) -> Result<ReconcileStats, ViewerError> {
        let entities = Merge::plan(&self.entities, response.entities, |e| {
            resolve_entity(e, catalog)
        })?;
        let clusters = Merge::plan(&self.clusters, response.clusters, |c| {
            Ok(DisplayableCluster {
                id: c.id,
                count: c.count,
                coordinates: [c.center_x, c.center_y],
            })
        })?;

        let (entities_added, entities_removed) = entities.commit(&mut self.entities);
        let (clusters_added, clusters_removed) = clusters.commit(&mut self.clusters);
        Ok(ReconcileStats {
            entities_added,
            entities_removed,
            clusters_added,
            clusters_removed,
        })
    }

    /// Highlights exactly one entity, clearing any other. Returns whether the
    /// id is on screen.
    pub fn highlight(&mut self, id: &Id) -> bool {
        let mut found = false;
        for entity in &mut self.entities {
            entity.highlighted = &entity.id == id;
            found |= entity.highlighted;
        }
        found
    }

    pub fn clear_highlight(&mut self) {
        for entity in &mut self.entities {
            entity.highlighted = false;
        }
    }
}

fn resolve_entity(
    entity: ViewerCachedEntity,
    catalog: &CatalogIndex,
) -> Result<DisplayableEntity, ViewerError> {
    let family = catalog.family(&entity.family_id).ok_or_else(|| {
        ViewerError::BrokenInvariant(format!(
            "entity {} references unknown family {}",
            entity.id, entity.family_id
        ))
    })?;
    let category = catalog.category(&entity.category_id).ok_or_else(|| {
        ViewerError::BrokenInvariant(format!(
            "entity {} references unknown category {}",
            entity.id, entity.category_id
        ))
    })?;
    Ok(DisplayableEntity {
        coordinates: [entity.web_mercator_x, entity.web_mercator_y],
        id: entity.id,
        entity_id: entity.entity_id,
        display_name: entity.display_name,
        tags_ids: entity.tags_ids,
        family: Arc::clone(family),
        category: Arc::clone(category),
        highlighted: false,
    })
}

/// Monotonic identifier of an issued viewport query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u64);

impl ViewId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewTicket {
    pub view_id: ViewId,
    pub request: ViewRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(ReconcileStats),
    /// The response was dropped: a newer view was applied first, or the
    /// ticket was issued before the last reset (`newest` is then `None`).
    Stale {
        view_id: ViewId,
        newest: Option<ViewId>,
    },
}

/// Entity cache plus ordering of in-flight viewport queries.
///
/// Queries may complete out of order. A response older than the newest one
/// already applied is discarded, so the display never regresses to an
/// earlier viewport. Tickets issued before a [`reset`](Self::reset) are
/// discarded too.
#[derive(Debug, Default)]
pub struct ViewportReconciler {
    cache: EntitySetCache,
    next_view_id: u64,
    /// Highest id issued before the last reset.
    reset_floor: u64,
    newest_applied: Option<ViewId>,
}

impl ViewportReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &EntitySetCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut EntitySetCache {
        &mut self.cache
    }

    pub fn newest_applied(&self) -> Option<ViewId> {
        self.newest_applied
    }

    pub fn begin(&mut self, request: ViewRequest) -> ViewTicket {
        self.next_view_id += 1;
        let ticket = ViewTicket {
            view_id: ViewId(self.next_view_id),
            request,
        };
        debug!(view = %ticket.view_id, request = %ticket.request, "view issued");
        ticket
    }

    pub fn apply(
        &mut self,
        ticket: &ViewTicket,
        response: EntitiesAndClusters,
        catalog: &CatalogIndex,
    ) -> Result<ApplyOutcome, ViewerError> {
        if ticket.view_id.0 <= self.reset_floor {
            debug!(view = %ticket.view_id, "dropping view issued before reset");
            return Ok(ApplyOutcome::Stale {
                view_id: ticket.view_id,
                newest: None,
            });
        }
        if let Some(newest) = self.newest_applied {
            if ticket.view_id < newest {
                warn!(view = %ticket.view_id, newest = %newest, "dropping stale view response");
                return Ok(ApplyOutcome::Stale {
                    view_id: ticket.view_id,
                    newest: Some(newest),
                });
            }
        }

        let stats = self.cache.apply(response, catalog)?;
        self.newest_applied = Some(ticket.view_id);
        debug!(
            view = %ticket.view_id,
            added = stats.entities_added,
            removed = stats.entities_removed,
            clusters = self.cache.clusters.len(),
            "view applied"
        );
        Ok(ApplyOutcome::Applied(stats))
    }

    /// Drops everything on screen and invalidates every ticket issued so far.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.reset_floor = self.next_view_id;
        self.newest_applied = None;
    }
}
