use super::fields::{FieldTable, top_level_fields};
use super::naming::{entity_name, humanize};
use super::operations::classify_operation;
use super::{Entity, EntityMetadata, EntityOperation, FieldSource, OperationKind};
use crate::diagnostics::{Diagnostic, Diagnostics, Stage, codes};
use crate::trace::{Event, Trace};
use crate::url::{ResourcePath, ResourcePathError, normalize_resource_path};
use indexmap::{IndexMap, IndexSet};

/// A network URL attributed to an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub entity: String,
    pub resource: ResourcePath,
}

impl ResourceKey {
    pub fn from_url(url: &str) -> Result<Self, ResourcePathError> {
        let resource = normalize_resource_path(url)?;
        Ok(Self {
            entity: entity_name(resource.root()),
            resource,
        })
    }
}

/// The outcome of resolving entities from a trace.
#[derive(Debug)]
pub struct ResolvedEntities {
    pub entities: Vec<Entity>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolvedEntities {
    pub fn total_operations(&self) -> usize {
        self.entities.iter().map(|e| e.operations.len()).sum()
    }
}

#[derive(Default)]
struct EntityDraft {
    fields: FieldTable,
    operations: IndexMap<String, EntityOperation>,
    endpoints: IndexSet<String>,
    observations: usize,
}

/// Clusters network traffic into entities keyed by their derived name.
pub struct EntityResolver<'a> {
    trace: &'a Trace,
}

impl<'a> EntityResolver<'a> {
    pub fn new(trace: &'a Trace) -> Self {
        Self { trace }
    }

    pub fn resolve(&self) -> ResolvedEntities {
        let mut diagnostics = Diagnostics::new(Stage::Entities);
        let mut drafts: IndexMap<String, EntityDraft> = IndexMap::new();

        for event in self.trace.network_events() {
            let Some(key) = self.attribute(event, &mut diagnostics) else {
                continue;
            };
            let draft = drafts.entry(key.entity.clone()).or_default();
            draft.observations += 1;
            draft.endpoints.insert(key.resource.path.clone());

            let kind = match event.http_method() {
                Some(method) => {
                    let kind = classify_operation(&method, &key.resource);
                    match kind {
                        Some(kind) => {
                            let operation = EntityOperation {
                                kind,
                                method,
                                path: key.resource.path.clone(),
                            };
                            draft.operations.entry(operation.key()).or_insert(operation);
                        }
                        None => diagnostics.record(
                            codes::UNSUPPORTED_METHOD,
                            Some(event.id.as_str()),
                            format!("{} {} is not a CRUD operation", method, key.resource.path),
                        ),
                    }
                    kind
                }
                None => {
                    diagnostics.record(
                        codes::MISSING_METHOD,
                        Some(event.id.as_str()),
                        "network event has no method; fields kept, operation skipped",
                    );
                    None
                }
            };

            Self::merge_shapes(event, kind, &key.entity, draft, &mut diagnostics);
        }

        let entities: Vec<Entity> = drafts
            .into_iter()
            .map(|(name, draft)| Self::finish(name, draft, &mut diagnostics))
            .collect();

        tracing::info!(
            entities = entities.len(),
            operations = entities.iter().map(|e| e.operations.len()).sum::<usize>(),
            "resolved entities"
        );
        ResolvedEntities {
            entities,
            diagnostics: diagnostics.into_vec(),
        }
    }

    fn attribute(&self, event: &Event, diagnostics: &mut Diagnostics) -> Option<ResourceKey> {
        let Some(url) = event.url.as_deref() else {
            diagnostics.record(codes::MISSING_URL, Some(event.id.as_str()), "network event has no URL");
            return None;
        };
        match ResourceKey::from_url(url) {
            Ok(key) => Some(key),
            Err(ResourcePathError::Malformed) => {
                diagnostics.record(codes::MALFORMED_URL, Some(url), "could not parse network URL");
                None
            }
            Err(ResourcePathError::StaticAsset) => {
                diagnostics.record(codes::STATIC_ASSET, Some(url), "static asset request skipped");
                None
            }
            Err(ResourcePathError::Empty) => {
                diagnostics.record(
                    codes::NO_RESOURCE_SEGMENT,
                    Some(url),
                    "no resource segment left after normalization",
                );
                None
            }
        }
    }

    fn merge_shapes(
        event: &Event,
        kind: Option<OperationKind>,
        entity: &str,
        draft: &mut EntityDraft,
        diagnostics: &mut Diagnostics,
    ) {
        let mut sides = Vec::with_capacity(2);
        if let Some(shape) = &event.request_shape {
            sides.push((FieldSource::Request, shape));
        }
        // Error bodies describe the error, not the entity.
        if let Some(shape) = event.response_shape.as_ref().filter(|_| !event.is_error_response()) {
            sides.push((FieldSource::Response, shape));
        }

        for (source, shape) in sides {
            let observations = top_level_fields(shape);
            let names: Vec<String> = observations.iter().map(|o| o.name.clone()).collect();
            for observation in observations {
                if let Some(conflict) = draft.fields.merge(observation, source) {
                    diagnostics.record(
                        codes::TYPE_CONFLICT,
                        Some(entity),
                        format!(
                            "field '{}' seen as {} and {}; keeping {}",
                            conflict.field, conflict.previous, conflict.observed, conflict.observed
                        ),
                    );
                }
            }
            if source == FieldSource::Request && kind == Some(OperationKind::Create) {
                draft.fields.record_create_request(&names);
            }
        }
    }

    fn finish(name: String, draft: EntityDraft, diagnostics: &mut Diagnostics) -> Entity {
        let primary_key = ["id", "_id"]
            .into_iter()
            .find(|k| draft.fields.contains(k))
            .map(str::to_string);
        if primary_key.is_none() {
            diagnostics.record(
                codes::NO_PRIMARY_KEY,
                Some(name.as_str()),
                "no 'id' or '_id' field observed",
            );
        }
        let created_at_field = ["createdAt", "created_at"]
            .into_iter()
            .find(|k| draft.fields.contains(k))
            .map(str::to_string);
        let updated_at_field = ["updatedAt", "updated_at"]
            .into_iter()
            .find(|k| draft.fields.contains(k))
            .map(str::to_string);

        Entity {
            label: humanize(&name),
            name,
            fields: draft.fields.into_fields(),
            operations: draft.operations.into_values().collect(),
            metadata: EntityMetadata {
                primary_key,
                created_at_field,
                updated_at_field,
                endpoints: draft.endpoints.into_iter().collect(),
                observations: draft.observations,
            },
        }
    }
}
