//! Include nodes: what to load after the base query and where to put it
//!
//! An include tree is a list of nodes per parent type. Collection nodes run
//! batched queries; reference nodes only descend into an already loaded value.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::DatabaseExecutor;
use crate::conversion::{KeyValue, NativeValue, ValueConverter};
use crate::error::{ModelError, ModelResult};
use crate::model::{
    Cardinality, Entity, EntityMetadata, FieldDescriptor, HasMany, HasOne, JunctionTable,
    NavigationDescriptor, RelationKind,
};

use super::batch_loader::{self, KeySource, LoadStats, LoaderConfig};

/// State shared by every node of one load
pub struct LoadContext<'a> {
    pub(crate) executor: &'a mut dyn DatabaseExecutor,
    pub(crate) converter: &'a dyn ValueConverter,
    pub(crate) config: &'a LoaderConfig,
    pub(crate) stats: LoadStats,
}

impl<'a> LoadContext<'a> {
    pub(crate) fn new(
        executor: &'a mut dyn DatabaseExecutor,
        converter: &'a dyn ValueConverter,
        config: &'a LoaderConfig,
    ) -> Self {
        Self {
            executor,
            converter,
            config,
            stats: LoadStats::default(),
        }
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    fn enter(&mut self, depth: usize) {
        self.stats.depth = self.stats.depth.max(depth);
    }
}

/// One node of an include tree, loading a navigation of `P`
#[async_trait]
pub trait IncludeLoader<P: Entity>: Send + Sync {
    /// Navigation name, used for path reporting
    fn name(&self) -> &str;

    /// Check the node and its children against metadata before any query runs
    fn validate(&self, path: &str, depth: usize, config: &LoaderConfig) -> ModelResult<()>;

    /// Populate the navigation on every parent, then descend
    async fn load(
        &self,
        ctx: &mut LoadContext<'_>,
        parents: &mut [&mut P],
        path: &str,
        depth: usize,
    ) -> ModelResult<()>;
}

/// Includes attached to a query of `P`
pub struct IncludeTree<P: Entity> {
    nodes: Vec<Arc<dyn IncludeLoader<P>>>,
}

impl<P: Entity> IncludeTree<P> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn include<I>(mut self, node: I) -> Self
    where
        I: IncludeLoader<P> + 'static,
    {
        self.nodes.push(Arc::new(node));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn IncludeLoader<P>>> {
        self.nodes.iter()
    }
}

impl<P: Entity> Default for IncludeTree<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Entity> Clone for IncludeTree<P> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
        }
    }
}

impl<P: Entity> fmt::Debug for IncludeTree<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|node| node.name().to_string()))
            .finish()
    }
}

/// Entry points for building include nodes
pub struct Include;

impl Include {
    /// Load a one-to-many or many-to-many collection
    pub fn many<P: Entity, C: Entity>(handle: HasMany<P, C>) -> CollectionInclude<P, C> {
        CollectionInclude {
            handle,
            children: Vec::new(),
        }
    }

    /// Descend through a single-valued reference that is already populated
    pub fn one<P: Entity, C: Entity>(handle: HasOne<P, C>) -> ReferenceInclude<P, C> {
        ReferenceInclude {
            handle,
            children: Vec::new(),
            _parent: PhantomData,
        }
    }
}

fn child_path(path: &str, name: &str) -> String {
    format!("{}.{}", path, name)
}

fn check_depth(depth: usize, config: &LoaderConfig) -> ModelResult<()> {
    if depth > config.max_depth {
        return Err(ModelError::Configuration(format!(
            "Include depth {} exceeds the maximum of {}",
            depth, config.max_depth
        )));
    }
    Ok(())
}

/// Batched loader for a collection navigation
pub struct CollectionInclude<P: Entity, C: Entity> {
    handle: HasMany<P, C>,
    children: Vec<Arc<dyn IncludeLoader<C>>>,
}

impl<P: Entity, C: Entity> CollectionInclude<P, C> {
    /// Load a navigation of each related entity as well
    pub fn then_include<I>(mut self, node: I) -> Self
    where
        I: IncludeLoader<C> + 'static,
    {
        self.children.push(Arc::new(node));
        self
    }

    fn validate_node(&self, depth: usize, config: &LoaderConfig) -> ModelResult<()> {
        check_depth(depth, config)?;
        let parent = P::metadata();
        let related = C::metadata();
        let navigation = parent.resolve_navigation(self.handle.name())?;
        if !navigation.is_collection() {
            return Err(ModelError::Configuration(format!(
                "Navigation '{}' of '{}' is not a collection",
                navigation.name,
                parent.entity_name()
            )));
        }
        parent.resolve_primary_key()?;
        match navigation.relation {
            RelationKind::OneToMany => {
                foreign_key_field(&related, navigation, &parent)?;
            }
            RelationKind::ManyToMany => {
                junction_of(navigation, &parent)?;
                related.resolve_primary_key()?;
            }
        }
        Ok(())
    }

    async fn load_node(
        &self,
        ctx: &mut LoadContext<'_>,
        parents: &mut [&mut P],
        path: &str,
        depth: usize,
    ) -> ModelResult<()> {
        ctx.enter(depth);
        let parent_metadata = P::metadata();
        let related_metadata = C::metadata();
        let navigation = parent_metadata.resolve_navigation(self.handle.name())?;
        let parent_key = parent_metadata.resolve_primary_key()?;

        let mut keys: Vec<NativeValue> = Vec::new();
        let mut seen: HashSet<KeyValue> = HashSet::new();
        let mut parent_keys: Vec<Option<KeyValue>> = Vec::with_capacity(parents.len());
        for parent in parents.iter() {
            let key = parent.primary_key_value()?;
            let identity = key.as_ref().and_then(NativeValue::to_key);
            if let (Some(value), Some(identity)) = (key, identity.clone()) {
                if seen.insert(identity) {
                    keys.push(value);
                }
            }
            parent_keys.push(identity);
        }

        if keys.is_empty() {
            tracing::debug!(path, parents = parents.len(), "no parent keys, include skipped");
            return Ok(());
        }

        let related_key_column;
        let source = match navigation.relation {
            RelationKind::OneToMany => {
                KeySource::ForeignKey(foreign_key_field(&related_metadata, navigation, &parent_metadata)?)
            }
            RelationKind::ManyToMany => {
                related_key_column = related_metadata.resolve_primary_key()?.column.clone();
                KeySource::Junction {
                    junction: junction_of(navigation, &parent_metadata)?,
                    parent_key,
                    related_key_column: &related_key_column,
                }
            }
        };

        tracing::debug!(path, keys = keys.len(), "loading collection include");
        let groups = batch_loader::load_grouped::<C>(ctx, &related_metadata, source, &keys).await?;

        // keyless parents still get an empty collection once a query has run
        for (parent, identity) in parents.iter_mut().zip(&parent_keys) {
            let related = identity
                .as_ref()
                .and_then(|identity| groups.get(identity).cloned())
                .unwrap_or_default();
            *self.handle.slot(parent) = Some(related);
        }

        if self.children.is_empty() {
            return Ok(());
        }
        let mut related: Vec<&mut C> = parents
            .iter_mut()
            .filter_map(|parent| self.handle.slot(parent).as_mut())
            .flat_map(|children| children.iter_mut())
            .collect();
        for child in &self.children {
            let path = child_path(path, child.name());
            child.load(ctx, &mut related, &path, depth + 1).await?;
        }
        Ok(())
    }
}

fn foreign_key_field<'m>(
    related: &'m EntityMetadata,
    navigation: &NavigationDescriptor,
    parent: &EntityMetadata,
) -> ModelResult<&'m FieldDescriptor> {
    let foreign_key = navigation.foreign_key.as_deref().ok_or_else(|| {
        ModelError::Configuration(format!(
            "One-to-many navigation '{}' of '{}' has no foreign key",
            navigation.name,
            parent.entity_name()
        ))
    })?;
    related.resolve_field(foreign_key)
}

fn junction_of<'n>(
    navigation: &'n NavigationDescriptor,
    parent: &EntityMetadata,
) -> ModelResult<&'n JunctionTable> {
    navigation.junction.as_ref().ok_or_else(|| {
        ModelError::Configuration(format!(
            "Many-to-many navigation '{}' of '{}' has no junction table",
            navigation.name,
            parent.entity_name()
        ))
    })
}

#[async_trait]
impl<P: Entity, C: Entity> IncludeLoader<P> for CollectionInclude<P, C> {
    fn name(&self) -> &str {
        self.handle.name()
    }

    fn validate(&self, path: &str, depth: usize, config: &LoaderConfig) -> ModelResult<()> {
        self.validate_node(depth, config)
            .map_err(|err| err.at_path(path))?;
        for child in &self.children {
            child.validate(&child_path(path, child.name()), depth + 1, config)?;
        }
        Ok(())
    }

    async fn load(
        &self,
        ctx: &mut LoadContext<'_>,
        parents: &mut [&mut P],
        path: &str,
        depth: usize,
    ) -> ModelResult<()> {
        self.load_node(ctx, parents, path, depth)
            .await
            .map_err(|err| err.at_path(path))
    }
}

/// Descends into a single-valued navigation without querying it
pub struct ReferenceInclude<P: Entity, C: Entity> {
    handle: HasOne<P, C>,
    children: Vec<Arc<dyn IncludeLoader<C>>>,
    _parent: PhantomData<fn() -> P>,
}

impl<P: Entity, C: Entity> ReferenceInclude<P, C> {
    pub fn then_include<I>(mut self, node: I) -> Self
    where
        I: IncludeLoader<C> + 'static,
    {
        self.children.push(Arc::new(node));
        self
    }

    fn validate_node(&self, depth: usize, config: &LoaderConfig) -> ModelResult<()> {
        check_depth(depth, config)?;
        let parent = P::metadata();
        let navigation = parent.resolve_navigation(self.handle.name())?;
        if navigation.cardinality != Cardinality::Single {
            return Err(ModelError::Configuration(format!(
                "Navigation '{}' of '{}' is a collection, use Include::many",
                navigation.name,
                parent.entity_name()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<P: Entity, C: Entity> IncludeLoader<P> for ReferenceInclude<P, C> {
    fn name(&self) -> &str {
        self.handle.name()
    }

    fn validate(&self, path: &str, depth: usize, config: &LoaderConfig) -> ModelResult<()> {
        self.validate_node(depth, config)
            .map_err(|err| err.at_path(path))?;
        for child in &self.children {
            child.validate(&child_path(path, child.name()), depth + 1, config)?;
        }
        Ok(())
    }

    async fn load(
        &self,
        ctx: &mut LoadContext<'_>,
        parents: &mut [&mut P],
        path: &str,
        depth: usize,
    ) -> ModelResult<()> {
        ctx.enter(depth);
        if self.children.is_empty() {
            return Ok(());
        }
        let mut related: Vec<&mut C> = parents
            .iter_mut()
            .filter_map(|parent| self.handle.get(parent))
            .collect();
        tracing::debug!(path, related = related.len(), "descending into reference include");
        for child in &self.children {
            let path = child_path(path, child.name());
            child.load(ctx, &mut related, &path, depth + 1).await?;
        }
        Ok(())
    }
}
