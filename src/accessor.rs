//! Computed accessor properties over shadow hosts.
//!
//! This is the declarative layer: a descriptor factory turns a slot name plus
//! query options into a read-only computed property whose getter resolves the
//! host's render root, locates the matching slot, and returns its currently
//! assigned nodes. Descriptors are installed once per property key on a
//! [`ComputedProperties`] registry at type-definition time and evaluated on
//! every read; nothing is cached between reads.

use crate::dom::DomNode;
use crate::error::AccessorError;
use crate::error::Result;
use crate::query::AssignedNodesOptions;
use crate::query::Document;
use crate::query::RenderRoot;
use crate::query::SlotSelector;
use std::collections::HashMap;

/// Capability the accessor getters read through: something that lives in a
/// document and may expose a render root.
pub trait ShadowHost {
  /// The document owning this host.
  fn owner_document(&self) -> &Document;

  /// The host's render root, or `None` when no shadow root is attached.
  fn render_root(&self) -> Option<RenderRoot<'_>>;
}

/// A host element within a document. The provided [`ShadowHost`]
/// implementation: its render root is the element's attached shadow root.
#[derive(Clone, Copy)]
pub struct HostElement<'a> {
  document: &'a Document,
  element: &'a DomNode,
}

impl<'a> HostElement<'a> {
  pub fn new(document: &'a Document, element: &'a DomNode) -> Self {
    Self { document, element }
  }

  pub fn element(&self) -> &'a DomNode {
    self.element
  }
}

impl ShadowHost for HostElement<'_> {
  fn owner_document(&self) -> &Document {
    self.document
  }

  fn render_root(&self) -> Option<RenderRoot<'_>> {
    self.document.render_root_of(self.element)
  }
}

/// Boxed getter evaluated on every property read. Returned references borrow
/// from the host for the duration of the read.
pub type Getter<H> = Box<dyn for<'h> Fn(&'h H) -> Vec<&'h DomNode>>;

/// A read-only computed property: a getter with no backing storage and no
/// setter. Enumerable and configurable, so redefinition is permitted.
pub struct PropertyDescriptor<H> {
  getter: Getter<H>,
  enumerable: bool,
  configurable: bool,
}

impl<H> PropertyDescriptor<H> {
  /// Wrap a getter in the standard accessor shape.
  pub fn computed(getter: Getter<H>) -> Self {
    Self {
      getter,
      enumerable: true,
      configurable: true,
    }
  }

  pub fn is_enumerable(&self) -> bool {
    self.enumerable
  }

  pub fn is_configurable(&self) -> bool {
    self.configurable
  }

  /// Accessor descriptors produced by this crate never carry a setter.
  pub fn has_setter(&self) -> bool {
    false
  }

  /// Evaluate the getter against `host`.
  pub fn get<'h>(&self, host: &'h H) -> Vec<&'h DomNode> {
    (self.getter)(host)
  }
}

/// Descriptor-producing function: receives the property key it is being
/// installed under and returns the descriptor. The assigned-node getters
/// ignore the key; it is part of the shape for protocol uniformity.
pub type DescriptorFactory<H> = Box<dyn FnOnce(&str) -> PropertyDescriptor<H>>;

/// Computed properties installed on a host type, keyed by property name.
///
/// This is the explicit registration step standing in for decorator-style
/// prototype mutation: call [`ComputedProperties::define`] once per property
/// when the host type is set up, then [`ComputedProperties::read`] per
/// property access.
pub struct ComputedProperties<H> {
  descriptors: HashMap<String, PropertyDescriptor<H>>,
}

impl<H: ShadowHost> ComputedProperties<H> {
  pub fn new() -> Self {
    Self {
      descriptors: HashMap::new(),
    }
  }

  /// Install the descriptor produced by `factory` under `key`. Descriptors
  /// are configurable: redefining a key replaces the previous descriptor.
  pub fn define(&mut self, key: impl Into<String>, factory: DescriptorFactory<H>) {
    let key = key.into();
    let descriptor = factory(&key);
    self.descriptors.insert(key, descriptor);
  }

  pub fn descriptor(&self, key: &str) -> Option<&PropertyDescriptor<H>> {
    self.descriptors.get(key)
  }

  /// Keys of the installed (enumerable) properties, in no particular order.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.descriptors.keys().map(String::as_str)
  }

  /// Evaluate the getter installed under `key` against `host`.
  pub fn read<'h>(&self, key: &str, host: &'h H) -> Result<Vec<&'h DomNode>> {
    match self.descriptors.get(key) {
      Some(descriptor) => Ok(descriptor.get(host)),
      None => Err(
        AccessorError::UndefinedProperty {
          key: key.to_string(),
        }
        .into(),
      ),
    }
  }

  /// Writes always fail: installed properties are accessor properties with
  /// no setter, and unknown keys are undefined.
  pub fn write(&self, key: &str) -> Result<()> {
    if self.descriptors.contains_key(key) {
      Err(
        AccessorError::ReadOnlyProperty {
          key: key.to_string(),
        }
        .into(),
      )
    } else {
      Err(
        AccessorError::UndefinedProperty {
          key: key.to_string(),
        }
        .into(),
      )
    }
  }
}

impl<H: ShadowHost> Default for ComputedProperties<H> {
  fn default() -> Self {
    Self::new()
  }
}

/// Descriptor factory whose getter returns the elements currently assigned to
/// the slot named `slot_name` in the host's render root. Pass an empty string
/// for the default slot. `options` is forwarded unmodified to the assigned
/// nodes query.
///
/// The getter resolves everything at read time: a host without a render root,
/// or a render root without a matching slot, yields an empty sequence rather
/// than an error.
pub fn assigned_elements_accessor<H: ShadowHost>(
  slot_name: &str,
  options: AssignedNodesOptions,
) -> DescriptorFactory<H> {
  let selector = SlotSelector::from_name(slot_name);
  Box::new(move |_key| {
    PropertyDescriptor::computed(Box::new(move |host: &H| {
      let Some(root) = host.render_root() else {
        return Vec::new();
      };
      let Some(slot) = root.query_selector_slot(&selector) else {
        return Vec::new();
      };
      host.owner_document().assigned_elements(slot, options)
    }))
  })
}

/// Like [`assigned_elements_accessor`], but the getter returns all assigned
/// nodes, text included.
pub fn assigned_nodes_accessor<H: ShadowHost>(
  slot_name: &str,
  options: AssignedNodesOptions,
) -> DescriptorFactory<H> {
  let selector = SlotSelector::from_name(slot_name);
  Box::new(move |_key| {
    PropertyDescriptor::computed(Box::new(move |host: &H| {
      let Some(root) = host.render_root() else {
        return Vec::new();
      };
      let Some(slot) = root.query_selector_slot(&selector) else {
        return Vec::new();
      };
      host.owner_document().assigned_nodes(slot, options)
    }))
  })
}
