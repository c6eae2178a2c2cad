//! Item-group transformation engine.
//!
//! One [`SdkNormalizer`] owns one document for one run. The run goes:
//! - `collect_and_normalize` pulls every declaration out of its `ItemGroup`, fixes property
//!   groups, empties contentless declarations and synthesizes `None Remove=` exclusions.
//! - per kind: `delete_duplicates`, `delete_references_to_non_existent_files`, then
//!   `merge_and_sort_item_groups` puts the survivors back in one container.
//!
//! Every edit is appended to the caller's [`ChangeLog`], container regrouping included. Running
//! the whole sequence on its own output makes no further edits.

use crate::changes::ChangeLog;
use crate::entity::ItemGroupEntity;
use crate::error::{NormalizeError, NormalizeResult};
use crate::property_groups::{fix_property_groups, sort_property_groups};
use crate::schema::{GLOBBED_CONTENT_KINDS, RESOURCE_EXTENSION, Reserved};
use projfix_xml::query::{
    attribute_value_by_name, attribute_value_with_extension, elements_by_local_name,
    has_no_content, local_name_of,
};
use projfix_xml::{Attribute, Document, ElementLike, Indentation, NodeId, NodeKind};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Where the next rebuilt item container is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionCursor {
    /// Directly after this node, as its next sibling.
    After(NodeId),
    /// As the first child of this element.
    FirstChildOf(NodeId),
}

/// Switches for [`SdkNormalizer::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub sort: bool,
    pub delete_duplicates: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            sort: false,
            delete_duplicates: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SdkNormalizer {
    doc: Document,
    cursor: InsertionCursor,
    /// Detected before any edit, so rebuilt containers match the original layout.
    indent: Indentation,
    /// Index of the container each collected declaration was taken from.
    origins: HashMap<NodeId, usize>,
    /// First kind rebuilt out of each original container.
    rebuilt_from: HashMap<usize, String>,
    /// Highest original container index rebuilt so far.
    last_origin: Option<usize>,
}

impl SdkNormalizer {
    pub fn new(doc: Document) -> Self {
        let cursor = InsertionCursor::FirstChildOf(doc.root());
        let indent = doc.indentation();
        Self {
            doc,
            cursor,
            indent,
            origins: HashMap::new(),
            rebuilt_from: HashMap::new(),
            last_origin: None,
        }
    }

    pub fn parse(text: &str) -> NormalizeResult<Self> {
        Ok(Self::new(Document::parse(text)?))
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn cursor(&self) -> InsertionCursor {
        self.cursor
    }

    /// The full normalization sequence.
    pub fn run(
        &mut self,
        options: &NormalizeOptions,
        changes: &mut ChangeLog,
    ) -> NormalizeResult<()> {
        for mut entity in self.collect_and_normalize(changes)? {
            if options.delete_duplicates {
                self.delete_duplicates(&mut entity, changes)?;
            }
            self.delete_references_to_non_existent_files(&mut entity, changes);
            self.merge_and_sort_item_groups(&entity, options.sort, changes)?;
        }
        if options.sort {
            sort_property_groups(&mut self.doc, changes)?;
        }
        debug!(changes = changes.len(), "normalized project document");
        Ok(())
    }

    /// Detach all top-level item containers and return their declarations grouped by kind,
    /// ordinal by local name. Exclusion markers synthesized for `EmbeddedResource` and `Content`
    /// includes join the `None` group after the existing markers.
    pub fn collect_and_normalize(
        &mut self,
        changes: &mut ChangeLog,
    ) -> NormalizeResult<Vec<ItemGroupEntity>> {
        let root = self.doc.root();
        let groups: Vec<NodeId> = {
            let root_el = self.doc.root_element();
            elements_by_local_name(&root_el, Reserved::ItemGroup.as_str())
                .map(|group| group.id())
                .collect()
        };
        let anchors = self.anchors_before(groups.first().copied());
        let mut declarations = Vec::new();
        self.origins.clear();
        self.rebuilt_from.clear();
        self.last_origin = None;
        for (index, &group) in groups.iter().enumerate() {
            for id in self.child_elements(group) {
                self.origins.insert(id, index);
                declarations.push(id);
            }
        }
        debug!(
            groups = groups.len(),
            declarations = declarations.len(),
            "collected item declarations"
        );

        self.record_relocated_groups(&groups, changes);
        for &group in &groups {
            self.record_dropped_structure(group, changes);
            self.doc.remove_with_indentation(group);
        }

        fix_property_groups(&mut self.doc, changes)?;

        self.cursor = anchors
            .into_iter()
            .find(|&anchor| self.doc.is_attached(anchor))
            .map_or(InsertionCursor::FirstChildOf(root), InsertionCursor::After);

        // Markers already in the file are kept; their values are never synthesized again.
        let mut excluded: HashSet<String> = declarations
            .iter()
            .filter(|&&id| {
                self.local_name(id)
                    .is_some_and(|name| Reserved::ExcludeMarker.matches(name))
            })
            .filter_map(|&id| self.attribute(id, Reserved::Remove))
            .collect();

        let marker_name = self.qualified(Reserved::ExcludeMarker);
        let mut markers = Vec::new();
        for &id in &declarations {
            let Some(local) = self.local_name(id).map(str::to_string) else {
                continue;
            };
            let include = self.attribute(id, Reserved::Include);

            let contentless = self.doc.element(id).is_some_and(|el| has_no_content(&el));
            if contentless && self.doc.make_empty(id)? {
                changes.record(
                    &local,
                    format!("removing all empty content from {}", describe(include.as_deref())),
                );
            }

            let Some(include) = include else {
                continue;
            };
            let globbed = GLOBBED_CONTENT_KINDS.iter().any(|kind| kind.matches(&local));
            if globbed && !excluded.contains(&include) {
                let marker = self.doc.create_element(
                    &marker_name,
                    vec![Attribute::new(Reserved::Remove.as_str(), include.as_str())],
                );
                changes.record(
                    Reserved::ExcludeMarker.as_str(),
                    format!("excluding {include} from default globbing"),
                );
                markers.push(marker);
                excluded.insert(include);
            }
        }

        let mut by_kind: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for id in declarations.into_iter().chain(markers) {
            if let Some(local) = self.local_name(id) {
                by_kind.entry(local.to_string()).or_default().push(id);
            }
        }

        Ok(by_kind
            .into_iter()
            .map(|(local_name, elements)| ItemGroupEntity::new(local_name, elements))
            .collect())
    }

    /// Keep the first declaration per identity key (`Remove` for `None`, `Include` otherwise).
    /// Keys compare ordinally; every distinct removed value is logged once.
    pub fn delete_duplicates(
        &self,
        entity: &mut ItemGroupEntity,
        changes: &mut ChangeLog,
    ) -> NormalizeResult<()> {
        self.validate(entity)?;

        let key_attribute = if Reserved::ExcludeMarker.matches(&entity.local_name) {
            Reserved::Remove
        } else {
            Reserved::Include
        };

        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        entity.elements.retain(|&id| {
            let Some(value) = self.attribute(id, key_attribute) else {
                return true;
            };
            if seen.insert(value.clone()) {
                return true;
            }
            if reported.insert(value.clone()) {
                changes.record(&entity.local_name, format!("removing duplicate {value}"));
            }
            false
        });
        Ok(())
    }

    /// Drop declarations the SDK globs pick up on its own: `.resx` embedded resources and all
    /// `Compile` items. Only the grouping changes.
    pub fn delete_references_to_non_existent_files(
        &self,
        entity: &mut ItemGroupEntity,
        changes: &mut ChangeLog,
    ) {
        entity.elements.retain(|&id| {
            let Some(el) = self.doc.element(id) else {
                return true;
            };
            let local = local_name_of(el.name());
            let covered = if Reserved::Compile.matches(local) {
                Some(attribute_value_by_name(&el, Reserved::Include.as_str()))
            } else if Reserved::EmbeddedResource.matches(local) {
                attribute_value_with_extension(&el, RESOURCE_EXTENSION).map(Some)
            } else {
                None
            };

            match covered {
                Some(value) => {
                    changes.record(
                        local,
                        format!("removing {}, covered by default globbing", describe(value)),
                    );
                    false
                }
                None => true,
            }
        });
    }

    /// Put the entity's declarations back into one new container right after the cursor, then
    /// move the cursor onto that container.
    pub fn merge_and_sort_item_groups(
        &mut self,
        entity: &ItemGroupEntity,
        sort: bool,
        changes: &mut ChangeLog,
    ) -> NormalizeResult<()> {
        if entity.is_empty() {
            debug!(kind = %entity.local_name, "nothing left to merge");
            return Ok(());
        }
        self.validate(entity)?;

        self.record_regrouping(entity, changes);

        let mut elements = entity.elements.clone();
        if sort {
            elements.sort_by_cached_key(|&id| self.attribute(id, Reserved::Include));
            if elements != entity.elements {
                changes.record(&entity.local_name, "sorted");
            }
        }

        let container_name = self.qualified(Reserved::ItemGroup);
        let container = self.doc.create_element(&container_name, Vec::new());
        for id in elements {
            let lead = self.doc.create_text(&self.indent.line(2));
            self.doc.append_child(container, lead)?;
            self.doc.append_child(container, id)?;
        }
        let closing = self.doc.create_text(&self.indent.line(1));
        self.doc.append_child(container, closing)?;

        let lead = self.doc.create_text(&self.indent.line(1));
        match self.cursor {
            InsertionCursor::After(anchor) => {
                self.doc.insert_after(anchor, lead)?;
                self.doc.insert_after(lead, container)?;
            }
            InsertionCursor::FirstChildOf(parent) => {
                self.doc.prepend_child(parent, container)?;
                self.doc.prepend_child(parent, lead)?;
            }
        }
        self.cursor = InsertionCursor::After(container);
        Ok(())
    }

    /// Alphabetize the entries of unconditioned property groups.
    pub fn sort_property_groups(&mut self, changes: &mut ChangeLog) -> NormalizeResult<()> {
        sort_property_groups(&mut self.doc, changes)
    }

    /// Container attributes, comments and stray text do not survive the rebuild; say so.
    fn record_dropped_structure(&self, group: NodeId, changes: &mut ChangeLog) {
        let name = Reserved::ItemGroup.as_str();
        if let Some(el) = self.doc.element(group) {
            for attr in el.attributes() {
                changes.record(
                    name,
                    format!("flattening group with {}=\"{}\"", attr.name, attr.value.trim()),
                );
            }
        }
        let mut declarations = 0;
        for &child in self.doc.children(group) {
            match self.doc.kind(child) {
                Some(NodeKind::Element(_)) => declarations += 1,
                Some(NodeKind::Comment(text)) => {
                    changes.record(name, format!("dropping comment \"{}\"", text.trim()));
                }
                Some(NodeKind::Text(text) | NodeKind::CData(text)) if !text.trim().is_empty() => {
                    changes.record(name, format!("dropping text \"{}\"", text.trim()));
                }
                _ => {}
            }
        }
        if declarations == 0 {
            changes.record(name, "removing empty group");
        }
    }

    /// Groups separated from the first one by other markup end up next to it.
    fn record_relocated_groups(&self, groups: &[NodeId], changes: &mut ChangeLog) {
        let Some(&first) = groups.first() else {
            return;
        };
        let mut passed: Option<String> = None;
        for &child in self.doc.children(self.doc.root()).iter() {
            if child == first {
                passed = None;
                continue;
            }
            if groups.contains(&child) {
                if let Some(what) = &passed
                    && !self.child_elements(child).is_empty()
                {
                    changes.record(
                        Reserved::ItemGroup.as_str(),
                        format!("moving group from after {what}"),
                    );
                }
                continue;
            }
            match self.doc.kind(child) {
                Some(NodeKind::Element(_)) => passed = self.local_name(child).map(str::to_string),
                Some(NodeKind::Text(text)) if text.trim().is_empty() => {}
                Some(NodeKind::Comment(_)) => passed = Some("comment".to_string()),
                Some(_) => passed = Some("text".to_string()),
                None => {}
            }
        }
    }

    /// Log how the entity's container differs from the ones its declarations came from.
    fn record_regrouping(&mut self, entity: &ItemGroupEntity, changes: &mut ChangeLog) {
        let kind = &entity.local_name;
        let taken: Vec<usize> = entity
            .elements
            .iter()
            .filter_map(|id| self.origins.get(id).copied())
            .collect();
        let sources: BTreeSet<usize> = taken.iter().copied().collect();
        let (Some(&first), Some(&last)) = (sources.first(), sources.last()) else {
            return;
        };

        if sources.len() > 1 {
            changes.record(
                kind,
                format!(
                    "merging {} declarations from {} groups",
                    taken.len(),
                    sources.len()
                ),
            );
        }
        if sources
            .iter()
            .any(|s| self.rebuilt_from.get(s).is_some_and(|other| other != kind))
        {
            changes.record(
                Reserved::ItemGroup.as_str(),
                format!("moving {kind} into its own group"),
            );
        }
        if self.last_origin.is_some_and(|rebuilt| first < rebuilt) {
            changes.record(
                Reserved::ItemGroup.as_str(),
                format!("moving {kind} behind groups that followed it"),
            );
        }

        for &source in &sources {
            self.rebuilt_from
                .entry(source)
                .or_insert_with(|| kind.clone());
        }
        self.last_origin = Some(self.last_origin.map_or(last, |rebuilt| rebuilt.max(last)));
    }

    /// Siblings in front of `first` that a rebuilt container can follow, nearest first.
    fn anchors_before(&self, first: Option<NodeId>) -> Vec<NodeId> {
        let Some(first) = first else {
            return Vec::new();
        };
        let siblings = self.doc.children(self.doc.root());
        let Some(end) = siblings.iter().position(|&c| c == first) else {
            return Vec::new();
        };
        siblings[..end]
            .iter()
            .rev()
            .copied()
            .filter(|&c| !matches!(self.doc.kind(c), Some(NodeKind::Text(_))))
            .collect()
    }

    fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.doc
            .children(id)
            .iter()
            .copied()
            .filter(|&c| self.doc.element(c).is_some())
            .collect()
    }

    fn local_name(&self, id: NodeId) -> Option<&str> {
        self.doc.element(id).map(|el| local_name_of(el.name()))
    }

    fn attribute(&self, id: NodeId, name: Reserved) -> Option<String> {
        let el = self.doc.element(id)?;
        attribute_value_by_name(&el, name.as_str()).map(str::to_string)
    }

    /// `name` with the root element's namespace prefix, if it has one.
    fn qualified(&self, name: Reserved) -> String {
        match self.doc.root_element().name().rsplit_once(':') {
            Some((prefix, _)) => format!("{prefix}:{name}"),
            None => name.to_string(),
        }
    }

    fn validate(&self, entity: &ItemGroupEntity) -> NormalizeResult<()> {
        if entity.local_name.trim().is_empty() {
            return Err(NormalizeError::invalid("entity has no declaration kind"));
        }
        for &id in &entity.elements {
            match self.local_name(id) {
                Some(name) if name == entity.local_name => {}
                Some(name) => {
                    return Err(NormalizeError::invalid(format!(
                        "{id} is a {name} declaration, not {}",
                        entity.local_name
                    )));
                }
                None => {
                    return Err(NormalizeError::invalid(format!(
                        "{id} is not an element of this document"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn describe(value: Option<&str>) -> &str {
    value.unwrap_or("(no include)")
}
