//! Property-group normalization.
//!
//! Two passes, both recorded in the change log:
//! - `fix_property_groups` drops empty groups and folds groups with identical attributes
//!   (condition, label) into the first such group.
//! - `sort_property_groups` alphabetizes the entries of unconditioned groups.
//!
//! Indentation and comments travel with the entry that follows them, so reordering and merging
//! keep the file readable.

use crate::changes::ChangeLog;
use crate::error::NormalizeResult;
use crate::schema::Reserved;
use projfix_xml::query::{attribute_value_by_name, elements_by_local_name, has_no_content};
use projfix_xml::{Document, ElementLike, NodeId};
use std::collections::BTreeMap;
use tracing::debug;

pub fn fix_property_groups(doc: &mut Document, changes: &mut ChangeLog) -> NormalizeResult<()> {
    let name = Reserved::PropertyGroup.as_str();
    let mut first_by_key: BTreeMap<String, NodeId> = BTreeMap::new();

    for group in top_level_property_groups(doc) {
        let Some(el) = doc.element(group) else {
            continue;
        };
        let condition = attribute_value_by_name(&el, Reserved::Condition.as_str())
            .map(|c| c.trim().to_string());

        if has_no_content(&el) {
            doc.remove_with_indentation(group);
            match condition {
                Some(cond) => {
                    changes.record(name, format!("removing empty group conditioned on {cond}"))
                }
                None => changes.record(name, "removing empty group"),
            }
            continue;
        }

        let key = attribute_key(doc, group);
        match first_by_key.get(&key) {
            None => {
                first_by_key.insert(key, group);
            }
            Some(&target) => {
                merge_into(doc, target, group)?;
                match condition {
                    Some(cond) => {
                        changes.record(name, format!("merging group conditioned on {cond}"))
                    }
                    None => changes.record(name, "merging unconditioned group"),
                }
            }
        }
    }

    Ok(())
}

pub fn sort_property_groups(doc: &mut Document, changes: &mut ChangeLog) -> NormalizeResult<()> {
    for group in top_level_property_groups(doc) {
        let conditioned = doc
            .element(group)
            .is_some_and(|el| attribute_value_by_name(&el, Reserved::Condition.as_str()).is_some());
        if conditioned {
            continue;
        }

        let (mut units, trailing) = entry_units(doc, group);
        let before: Vec<NodeId> = units.iter().flat_map(|u| u.nodes.clone()).collect();
        units.sort_by(|a, b| a.sort_name.cmp(&b.sort_name));
        let mut after: Vec<NodeId> = units.into_iter().flat_map(|u| u.nodes).collect();

        if after == before {
            continue;
        }

        after.extend(trailing);
        doc.reorder_children(group, after)?;
        changes.record(Reserved::PropertyGroup.as_str(), "sorted");
    }

    Ok(())
}

fn top_level_property_groups(doc: &Document) -> Vec<NodeId> {
    let root = doc.root_element();
    elements_by_local_name(&root, Reserved::PropertyGroup.as_str())
        .map(|el| el.id())
        .collect()
}

/// Identity of a group for merging: every attribute, value trimmed, in name order.
fn attribute_key(doc: &Document, group: NodeId) -> String {
    let Some(el) = doc.element(group) else {
        return String::new();
    };
    let mut pairs: Vec<(String, String)> = el
        .attributes()
        .iter()
        .map(|a| (a.name.clone(), a.value.trim().to_string()))
        .filter(|(_, v)| !v.is_empty())
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

/// One entry of a group: the element plus the whitespace and comments leading up to it.
struct EntryUnit {
    sort_name: String,
    nodes: Vec<NodeId>,
}

/// Split a group's children into entry units and the trailing nodes after the last element.
fn entry_units(doc: &Document, group: NodeId) -> (Vec<EntryUnit>, Vec<NodeId>) {
    let mut units = Vec::new();
    let mut pending = Vec::new();
    for &child in doc.children(group) {
        pending.push(child);
        if let Some(el) = doc.element(child) {
            units.push(EntryUnit {
                sort_name: el.local_name().to_string(),
                nodes: std::mem::take(&mut pending),
            });
        }
    }
    (units, pending)
}

/// Move the entries of `source` to the end of `target` (before its closing indentation), then
/// drop `source`.
fn merge_into(doc: &mut Document, target: NodeId, source: NodeId) -> NormalizeResult<()> {
    let (units, _) = entry_units(doc, source);
    let (_, target_trailing) = entry_units(doc, target);

    for node in units.into_iter().flat_map(|u| u.nodes) {
        doc.append_child(target, node)?;
    }
    for node in target_trailing {
        doc.append_child(target, node)?;
    }

    debug!(%source, %target, "merged property group");
    doc.remove_with_indentation(source);
    Ok(())
}
