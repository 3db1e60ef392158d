use crate::error::ParseError;
use crate::error::Result;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::QuirksMode as HtmlQuirksMode;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::Handle;
use markup5ever_rcdom::NodeData;
use markup5ever_rcdom::RcDom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;
use std::io;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Document quirks mode as reported by the HTML parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuirksMode {
  NoQuirks,
  LimitedQuirks,
  Quirks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowRootMode {
  Open,
  Closed,
}

#[derive(Debug, Clone)]
pub struct DomNode {
  pub node_type: DomNodeType,
  pub children: Vec<DomNode>,
}

#[derive(Debug, Clone)]
pub enum DomNodeType {
  Document {
    quirks_mode: QuirksMode,
  },
  ShadowRoot {
    mode: ShadowRootMode,
    delegates_focus: bool,
  },
  Slot {
    namespace: String,
    attributes: Vec<(String, String)>,
  },
  Element {
    tag_name: String,
    namespace: String,
    attributes: Vec<(String, String)>,
  },
  Text {
    content: String,
  },
}

/// Mapping between light DOM nodes and their assigned slots within shadow roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAssignment {
  /// For each shadow root, the slots it exposes and their assigned node ids.
  pub shadow_to_slots: HashMap<usize, HashMap<String, Vec<usize>>>,
  /// For each slot element id, the ordered list of assigned node ids.
  pub slot_to_nodes: HashMap<usize, Vec<usize>>,
  /// For each assigned node id, which slot it was assigned to.
  pub node_to_slot: HashMap<usize, AssignedSlot>,
}

/// Slot destination for an assigned light DOM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedSlot {
  pub slot_name: String,
  pub slot_node_id: usize,
  pub shadow_root_id: usize,
}

fn map_quirks_mode(mode: HtmlQuirksMode) -> QuirksMode {
  match mode {
    HtmlQuirksMode::Quirks => QuirksMode::Quirks,
    HtmlQuirksMode::LimitedQuirks => QuirksMode::LimitedQuirks,
    HtmlQuirksMode::NoQuirks => QuirksMode::NoQuirks,
  }
}

/// Parse HTML into a DOM value tree with declarative shadow roots attached.
pub fn parse_html(html: &str) -> Result<DomNode> {
  let opts = ParseOpts {
    tree_builder: TreeBuilderOpts {
      scripting_enabled: false,
      ..Default::default()
    },
    ..Default::default()
  };

  let mut reader = io::Cursor::new(html.as_bytes());
  let dom = parse_document(RcDom::default(), opts)
    .from_utf8()
    .read_from(&mut reader)
    .map_err(|e| ParseError::InvalidHtml {
      message: format!("Failed to parse HTML: {}", e),
    })?;

  let quirks_mode = map_quirks_mode(dom.quirks_mode);

  let mut root = convert_handle_to_node(&dom.document, quirks_mode)
    .expect("DOM must have a document root node");
  attach_shadow_roots(&mut root);
  Ok(root)
}

fn convert_handle_to_node(handle: &Handle, document_quirks_mode: QuirksMode) -> Option<DomNode> {
  let node_type = match &handle.data {
    NodeData::Document => DomNodeType::Document {
      quirks_mode: document_quirks_mode,
    },
    NodeData::Element { name, attrs, .. } => {
      let namespace = if name.ns.as_ref() == HTML_NAMESPACE {
        String::new()
      } else {
        name.ns.to_string()
      };
      let attrs_ref = attrs.borrow();
      let mut attributes = Vec::with_capacity(attrs_ref.len());
      for attr in attrs_ref.iter() {
        attributes.push((attr.name.local.to_string(), attr.value.to_string()));
      }

      let is_html_slot = name.local.as_ref().eq_ignore_ascii_case("slot")
        && (namespace.is_empty() || namespace == HTML_NAMESPACE);

      if is_html_slot {
        DomNodeType::Slot {
          namespace,
          attributes,
        }
      } else {
        DomNodeType::Element {
          tag_name: name.local.to_string(),
          namespace,
          attributes,
        }
      }
    }
    NodeData::Text { contents } => DomNodeType::Text {
      content: contents.borrow().to_string(),
    },
    _ => return None,
  };

  let children: Vec<DomNode> = match &handle.data {
    NodeData::Element {
      name,
      template_contents,
      ..
    } => {
      // Template contents live in a separate fragment in the parser's tree;
      // hoist them so declarative shadow templates carry their shadow markup.
      if name.local.as_ref().eq_ignore_ascii_case("template") {
        let borrowed = template_contents.borrow();
        match &*borrowed {
          Some(content) => content
            .children
            .borrow()
            .iter()
            .filter_map(|child| convert_handle_to_node(child, document_quirks_mode))
            .collect(),
          None => Vec::new(),
        }
      } else {
        handle
          .children
          .borrow()
          .iter()
          .filter_map(|child| convert_handle_to_node(child, document_quirks_mode))
          .collect()
      }
    }
    NodeData::Document => handle
      .children
      .borrow()
      .iter()
      .filter_map(|child| convert_handle_to_node(child, document_quirks_mode))
      .collect(),
    _ => Vec::new(),
  };

  Some(DomNode {
    node_type,
    children,
  })
}

fn parse_shadow_root_definition(template: &DomNode) -> Option<(ShadowRootMode, bool)> {
  if !template
    .tag_name()
    .map(|t| t.eq_ignore_ascii_case("template"))
    .unwrap_or(false)
  {
    return None;
  }

  // Declarative shadow DOM only applies to HTML templates, not e.g. SVG <template>.
  if !matches!(template.namespace(), Some(ns) if ns.is_empty() || ns == HTML_NAMESPACE) {
    return None;
  }

  let mode_attr = template
    .get_attribute_ref("shadowroot")
    .or_else(|| template.get_attribute_ref("shadowrootmode"))?;
  let mode = match mode_attr.to_ascii_lowercase().as_str() {
    "open" => ShadowRootMode::Open,
    "closed" => ShadowRootMode::Closed,
    _ => return None,
  };

  let delegates_focus = template
    .get_attribute_ref("shadowrootdelegatesfocus")
    .is_some();

  Some((mode, delegates_focus))
}

fn attach_shadow_roots(node: &mut DomNode) {
  for child in &mut node.children {
    let is_inert_template = matches!(
      child.tag_name(),
      Some(tag) if tag.eq_ignore_ascii_case("template")
    ) && matches!(
      child.namespace(),
      Some(ns) if ns.is_empty() || ns == HTML_NAMESPACE
    ) && parse_shadow_root_definition(child).is_none();
    if is_inert_template {
      continue;
    }
    attach_shadow_roots(child);
  }

  if !node.is_element() {
    return;
  }

  let mut shadow_template = None;
  for (idx, child) in node.children.iter().enumerate() {
    if let Some((mode, delegates_focus)) = parse_shadow_root_definition(child) {
      shadow_template = Some((idx, mode, delegates_focus));
      break;
    }
  }

  let Some((template_idx, mode, delegates_focus)) = shadow_template else {
    return;
  };

  // Only the first declarative shadow template is promoted to a shadow root, matching browsers.
  // Subsequent templates remain as inert light DOM children.
  let template = node.children.remove(template_idx);
  let shadow_root = DomNode {
    node_type: DomNodeType::ShadowRoot {
      mode,
      delegates_focus,
    },
    children: template.children,
  };
  let light_children = std::mem::take(&mut node.children);
  node.children = {
    let mut combined = Vec::with_capacity(light_children.len() + 1);
    combined.push(shadow_root);
    combined.extend(light_children);
    combined
  };
}

/// Whether a child subtree belongs to this shadow tree for slotting purposes.
/// Nested shadow roots have their own hosts, and inert template contents are
/// not part of the flat tree.
fn in_same_shadow_tree(node: &DomNode) -> bool {
  if matches!(node.node_type, DomNodeType::ShadowRoot { .. }) {
    return false;
  }
  !matches!(
    node.tag_name(),
    Some(tag) if tag.eq_ignore_ascii_case("template")
  )
}

fn collect_slot_names<'a>(node: &'a DomNode, out: &mut HashSet<&'a str>) {
  if matches!(node.node_type, DomNodeType::Slot { .. }) {
    out.insert(node.get_attribute_ref("name").unwrap_or(""));
  }

  for child in node.children.iter().filter(|c| in_same_shadow_tree(c)) {
    collect_slot_names(child, out);
  }
}

fn take_assignments_for_slot_ptr(
  assignments: &mut Vec<(Option<&str>, *const DomNode)>,
  slot_name: &str,
  available_slots: &HashSet<&str>,
) -> Vec<*const DomNode> {
  let mut taken = Vec::new();
  assignments.retain(|(name, node)| {
    let target = name.unwrap_or("");
    let matches = if slot_name.is_empty() {
      name.is_none() || !available_slots.contains(target)
    } else {
      target == slot_name
    };

    if matches {
      taken.push(*node);
      false
    } else {
      true
    }
  });
  taken
}

fn fill_slot_assignments(
  node: &DomNode,
  shadow_root_id: usize,
  assignments: &mut Vec<(Option<&str>, *const DomNode)>,
  available_slots: &HashSet<&str>,
  ids: &HashMap<*const DomNode, usize>,
  out: &mut SlotAssignment,
) {
  if matches!(node.node_type, DomNodeType::Slot { .. }) {
    let slot_name = node.get_attribute_ref("name").unwrap_or("");
    let assigned = take_assignments_for_slot_ptr(assignments, slot_name, available_slots);
    if !assigned.is_empty() {
      let slot_id = ids.get(&(node as *const DomNode)).copied().unwrap_or(0);
      let assigned_ids: Vec<usize> = assigned
        .iter()
        .filter_map(|ptr| ids.get(ptr).copied())
        .collect();
      out
        .shadow_to_slots
        .entry(shadow_root_id)
        .or_default()
        .entry(slot_name.to_string())
        .or_default()
        .extend(assigned_ids.iter().copied());
      for &node_id in &assigned_ids {
        out.node_to_slot.insert(
          node_id,
          AssignedSlot {
            slot_name: slot_name.to_string(),
            slot_node_id: slot_id,
            shadow_root_id,
          },
        );
      }
      out.slot_to_nodes.insert(slot_id, assigned_ids);
      // Once a slot is assigned, its fallback subtree is not rendered; stop recursion.
      return;
    }
  }

  for child in node.children.iter().filter(|c| in_same_shadow_tree(c)) {
    fill_slot_assignments(
      child,
      shadow_root_id,
      assignments,
      available_slots,
      ids,
      out,
    );
  }
}

fn enumerate_node_ids(node: &DomNode, next: &mut usize, map: &mut HashMap<*const DomNode, usize>) {
  map.insert(node as *const DomNode, *next);
  *next += 1;
  for child in node.children.iter() {
    enumerate_node_ids(child, next, map);
  }
}

/// Assign stable pre-order traversal ids to each node in the DOM tree.
pub fn enumerate_dom_ids(root: &DomNode) -> HashMap<*const DomNode, usize> {
  let mut ids: HashMap<*const DomNode, usize> = HashMap::new();
  let mut next_id = 1usize;
  enumerate_node_ids(root, &mut next_id, &mut ids);
  ids
}

/// Compute the slot assignment map for all shadow roots in the DOM.
pub fn compute_slot_assignment(root: &DomNode) -> SlotAssignment {
  let ids = enumerate_dom_ids(root);
  compute_slot_assignment_with_ids(root, &ids)
}

/// Compute the slot assignment map for all shadow roots in the DOM using a precomputed id map.
pub fn compute_slot_assignment_with_ids(
  root: &DomNode,
  ids: &HashMap<*const DomNode, usize>,
) -> SlotAssignment {
  let mut assignment = SlotAssignment::default();

  fn walk<'a>(
    node: &'a DomNode,
    parent: Option<&'a DomNode>,
    ids: &HashMap<*const DomNode, usize>,
    out: &mut SlotAssignment,
  ) {
    if matches!(node.node_type, DomNodeType::ShadowRoot { .. }) {
      if let Some(host) = parent {
        let mut available_slots: HashSet<&str> = HashSet::new();
        collect_slot_names(node, &mut available_slots);
        let mut light_children: Vec<(Option<&str>, *const DomNode)> = host
          .children
          .iter()
          .filter(|c| !matches!(c.node_type, DomNodeType::ShadowRoot { .. }))
          .map(|child| {
            let slot_name = child
              .get_attribute_ref("slot")
              .map(|v| v.trim())
              .filter(|v| !v.is_empty());
            (slot_name, child as *const DomNode)
          })
          .collect();

        let shadow_root_id = ids.get(&(node as *const DomNode)).copied().unwrap_or(0);
        fill_slot_assignments(
          node,
          shadow_root_id,
          &mut light_children,
          &available_slots,
          ids,
          out,
        );
      }
    }

    for child in node.children.iter() {
      walk(child, Some(node), ids, out);
    }
  }

  walk(root, None, ids, &mut assignment);
  assignment
}

impl DomNode {
  pub fn get_attribute_ref(&self, name: &str) -> Option<&str> {
    match &self.node_type {
      DomNodeType::Element { attributes, .. } => attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str()),
      DomNodeType::Slot { attributes, .. } => attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str()),
      _ => None,
    }
  }

  pub fn tag_name(&self) -> Option<&str> {
    match &self.node_type {
      DomNodeType::Element { tag_name, .. } => Some(tag_name),
      DomNodeType::Slot { .. } => Some("slot"),
      _ => None,
    }
  }

  pub fn namespace(&self) -> Option<&str> {
    match &self.node_type {
      DomNodeType::Element { namespace, .. } => Some(namespace),
      DomNodeType::Slot { namespace, .. } => Some(namespace),
      _ => None,
    }
  }

  /// Quirks mode of a document node; any other node kind reads as NoQuirks.
  pub fn document_quirks_mode(&self) -> QuirksMode {
    match &self.node_type {
      DomNodeType::Document { quirks_mode } => *quirks_mode,
      _ => QuirksMode::NoQuirks,
    }
  }

  pub fn is_shadow_host(&self) -> bool {
    matches!(
      self.node_type,
      DomNodeType::Element { .. } | DomNodeType::Slot { .. }
    ) && self
      .children
      .iter()
      .any(|c| matches!(c.node_type, DomNodeType::ShadowRoot { .. }))
  }

  pub fn is_element(&self) -> bool {
    matches!(
      self.node_type,
      DomNodeType::Element { .. } | DomNodeType::Slot { .. }
    )
  }

  pub fn is_slot(&self) -> bool {
    matches!(self.node_type, DomNodeType::Slot { .. })
  }

  pub fn is_text(&self) -> bool {
    matches!(self.node_type, DomNodeType::Text { .. })
  }

  pub fn text_content(&self) -> Option<&str> {
    match &self.node_type {
      DomNodeType::Text { content } => Some(content),
      _ => None,
    }
  }

  pub fn walk_tree<F>(&self, f: &mut F)
  where
    F: FnMut(&DomNode),
  {
    f(self);
    for child in &self.children {
      child.walk_tree(f);
    }
  }

  /// Get element children (skip text nodes)
  pub fn element_children(&self) -> Vec<&DomNode> {
    self.children.iter().filter(|c| c.is_element()).collect()
  }

  /// Check if this element has a specific class
  pub fn has_class(&self, class: &str) -> bool {
    if let Some(class_attr) = self.get_attribute_ref("class") {
      class_attr.split_ascii_whitespace().any(|c| c == class)
    } else {
      false
    }
  }

  /// Check if this element has a specific ID
  pub fn has_id(&self, id: &str) -> bool {
    self.get_attribute_ref("id") == Some(id)
  }
}
