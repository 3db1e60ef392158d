//! Slot selectors and live assigned-node queries over parsed documents.
//!
//! Slot lookup is structured: a [`SlotSelector`] matches slot nodes directly
//! instead of interpolating the slot name into CSS selector text, so a name
//! containing quotes or brackets can never produce a malformed query. The
//! equivalent selector text is still available for diagnostics via
//! [`SlotSelector::selector_text`].

use crate::dom::compute_slot_assignment_with_ids;
use crate::dom::enumerate_dom_ids;
use crate::dom::parse_html;
use crate::dom::DomNode;
use crate::dom::DomNodeType;
use crate::dom::ShadowRootMode;
use crate::dom::SlotAssignment;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options forwarded unmodified to assigned-node queries, mirroring the
/// platform's `AssignedNodesOptions` bag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedNodesOptions {
  /// Recursively replace assigned slots with their own assigned nodes, and
  /// substitute fallback children for unassigned slots.
  pub flatten: bool,
}

impl AssignedNodesOptions {
  pub fn flattened() -> Self {
    Self { flatten: true }
  }
}

/// Which slot element a query targets within a render root.
///
/// The empty slot name is the conventional sentinel for the default slot, so
/// [`SlotSelector::from_name`] maps `""` to [`SlotSelector::Default`]. A
/// default-slot query matches only a slot with no `name` attribute at all; a
/// named query matches the attribute value exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSelector {
  /// Matches only a slot carrying no `name` attribute.
  Default,
  /// Matches only a slot whose `name` attribute equals the string exactly.
  Named(String),
}

impl SlotSelector {
  pub fn from_name(name: &str) -> Self {
    if name.is_empty() {
      Self::Default
    } else {
      Self::Named(name.to_string())
    }
  }

  /// Whether `node` is a slot element matched by this selector.
  pub fn matches(&self, node: &DomNode) -> bool {
    if !node.is_slot() {
      return false;
    }
    match self {
      Self::Default => node.get_attribute_ref("name").is_none(),
      Self::Named(name) => node.get_attribute_ref("name") == Some(name.as_str()),
    }
  }

  /// CSS selector text equivalent to this selector, for diagnostics only.
  /// The attribute value is escaped before being embedded; the result is
  /// never parsed back into a query.
  pub fn selector_text(&self) -> String {
    match self {
      Self::Default => "slot:not([name])".to_string(),
      Self::Named(name) => format!("slot[name=\"{}\"]", escape_attribute_value(name)),
    }
  }
}

fn escape_attribute_value(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for c in value.chars() {
    if c == '"' || c == '\\' {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

/// A shadow root paired with the element hosting it, as resolved from the
/// document tree.
#[derive(Clone, Copy)]
pub struct RenderRoot<'a> {
  host: &'a DomNode,
  root: &'a DomNode,
}

impl<'a> RenderRoot<'a> {
  pub(crate) fn new(host: &'a DomNode, root: &'a DomNode) -> Self {
    Self { host, root }
  }

  pub fn host(&self) -> &'a DomNode {
    self.host
  }

  pub fn root(&self) -> &'a DomNode {
    self.root
  }

  pub fn mode(&self) -> ShadowRootMode {
    match self.root.node_type {
      DomNodeType::ShadowRoot { mode, .. } => mode,
      _ => unreachable!("render root is always a shadow root node"),
    }
  }

  /// First slot in tree order matching `selector`, or `None` when the render
  /// root contains no such slot.
  ///
  /// The walk stays inside this shadow tree: nested shadow roots are separate
  /// selector scopes, and inert template contents are not searched.
  pub fn query_selector_slot(&self, selector: &SlotSelector) -> Option<&'a DomNode> {
    fn find<'a>(node: &'a DomNode, selector: &SlotSelector) -> Option<&'a DomNode> {
      if selector.matches(node) {
        return Some(node);
      }
      if matches!(node.node_type, DomNodeType::ShadowRoot { .. }) {
        return None;
      }
      if matches!(node.tag_name(), Some(tag) if tag.eq_ignore_ascii_case("template")) {
        return None;
      }
      node.children.iter().find_map(|c| find(c, selector))
    }

    self.root.children.iter().find_map(|c| find(c, selector))
  }
}

/// A parsed document plus the live slot queries the accessor layer reads
/// through.
///
/// Assignment is recomputed from the current tree on every query; results are
/// live, never cached.
pub struct Document {
  root: DomNode,
}

impl Document {
  /// Parse an HTML string into a document.
  pub fn parse(html: &str) -> Result<Self> {
    Ok(Self {
      root: parse_html(html)?,
    })
  }

  /// Wrap an already-parsed tree.
  pub fn from_root(root: DomNode) -> Self {
    Self { root }
  }

  pub fn root(&self) -> &DomNode {
    &self.root
  }

  /// Mutable access to the tree, for callers that rewrite the document
  /// between reads.
  pub fn root_mut(&mut self) -> &mut DomNode {
    &mut self.root
  }

  /// Find an element by `id` attribute anywhere in the tree, shadow trees
  /// included.
  pub fn element_by_id(&self, id: &str) -> Option<&DomNode> {
    fn find<'a>(node: &'a DomNode, id: &str) -> Option<&'a DomNode> {
      if node.has_id(id) {
        return Some(node);
      }
      node.children.iter().find_map(|c| find(c, id))
    }
    find(&self.root, id)
  }

  /// The render root of `host`: its attached shadow root, if any.
  pub fn render_root_of<'a>(&'a self, host: &'a DomNode) -> Option<RenderRoot<'a>> {
    host
      .children
      .iter()
      .find(|c| matches!(c.node_type, DomNodeType::ShadowRoot { .. }))
      .map(|root| RenderRoot::new(host, root))
  }

  /// The nodes currently assigned to `slot`, in tree order, recomputed from
  /// the document as it stands now.
  ///
  /// A slot that is not part of this document, or that has nothing assigned,
  /// yields an empty sequence.
  pub fn assigned_nodes<'a>(
    &'a self,
    slot: &DomNode,
    options: AssignedNodesOptions,
  ) -> Vec<&'a DomNode> {
    let ids = enumerate_dom_ids(&self.root);
    let assignment = compute_slot_assignment_with_ids(&self.root, &ids);
    let mut lookup: HashMap<usize, &'a DomNode> = HashMap::new();
    build_node_lookup(&self.root, &ids, &mut lookup);

    // Re-resolve the caller's reference through the id map so recursion over
    // nested slots hands out references tied to the document's lifetime.
    let Some(slot) = ids
      .get(&(slot as *const DomNode))
      .and_then(|id| lookup.get(id).copied())
    else {
      return Vec::new();
    };

    let mut out = Vec::new();
    collect_assigned(slot, &assignment, &ids, &lookup, options.flatten, &mut out);
    out
  }

  /// Like [`Document::assigned_nodes`], filtered to element nodes.
  pub fn assigned_elements<'a>(
    &'a self,
    slot: &DomNode,
    options: AssignedNodesOptions,
  ) -> Vec<&'a DomNode> {
    self
      .assigned_nodes(slot, options)
      .into_iter()
      .filter(|n| n.is_element())
      .collect()
  }
}

fn build_node_lookup<'a>(
  node: &'a DomNode,
  ids: &HashMap<*const DomNode, usize>,
  out: &mut HashMap<usize, &'a DomNode>,
) {
  if let Some(id) = ids.get(&(node as *const DomNode)) {
    out.insert(*id, node);
  }
  for child in &node.children {
    build_node_lookup(child, ids, out);
  }
}

fn collect_assigned<'a>(
  slot: &'a DomNode,
  assignment: &SlotAssignment,
  ids: &HashMap<*const DomNode, usize>,
  lookup: &HashMap<usize, &'a DomNode>,
  flatten: bool,
  out: &mut Vec<&'a DomNode>,
) {
  let direct: Vec<&'a DomNode> = ids
    .get(&(slot as *const DomNode))
    .and_then(|id| assignment.slot_to_nodes.get(id))
    .map(|node_ids| {
      node_ids
        .iter()
        .filter_map(|id| lookup.get(id).copied())
        .collect()
    })
    .unwrap_or_default();

  if !flatten {
    out.extend(direct);
    return;
  }

  if direct.is_empty() {
    // Unassigned slot: flattening substitutes the fallback children.
    for child in &slot.children {
      if child.is_slot() {
        collect_assigned(child, assignment, ids, lookup, flatten, out);
      } else {
        out.push(child);
      }
    }
    return;
  }

  for node in direct {
    if node.is_slot() {
      collect_assigned(node, assignment, ids, lookup, flatten, out);
    } else {
      out.push(node);
    }
  }
}
