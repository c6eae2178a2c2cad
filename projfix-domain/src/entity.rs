use projfix_xml::NodeId;

/// All declarations of one kind, collected from the original item containers.
///
/// The grouping is transient: operations edit `elements` without touching the document, and the
/// result only lands back in the tree through `merge_and_sort_item_groups`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGroupEntity {
    pub local_name: String,
    pub elements: Vec<NodeId>,
}

impl ItemGroupEntity {
    pub fn new(local_name: impl Into<String>, elements: Vec<NodeId>) -> Self {
        Self {
            local_name: local_name.into(),
            elements,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
