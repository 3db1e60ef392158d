pub mod accessor;
pub mod dom;
pub mod error;
pub mod query;

pub use accessor::{
  assigned_elements_accessor, assigned_nodes_accessor, ComputedProperties, DescriptorFactory,
  HostElement, PropertyDescriptor, ShadowHost,
};
pub use error::{AccessorError, Error, ParseError, Result};
pub use query::{AssignedNodesOptions, Document, RenderRoot, SlotSelector};
