//! Software nodes
//!
//! A software node is a named description of a device and its properties,
//! used where there is no hardware-discovered topology. Consumers reference
//! their GPIO providers through reference-list properties:
//!
//! ```text
//! node "s3fwrn5"
//!   en-gpios   = <&"gpiochip-main" 23 0>
//!   wake-gpios = <&"gpiochip-main" 24 0>
//! node "gpiochip-main"
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Maximum number of integer arguments a reference can carry
pub const MAX_REFERENCE_ARGS: usize = 8;

/// A named device description with properties
#[derive(Debug, Clone, Default)]
pub struct SoftwareNode {
    name: Option<String>,
    properties: Vec<Property>,
}

impl SoftwareNode {
    /// Create a named node with no properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            properties: Vec::new(),
        }
    }

    /// Create a node without a name
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Add a property
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Node name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Look up a property by exact name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// All properties in declaration order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }
}

/// A single named property
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    value: PropertyValue,
}

impl Property {
    /// Create a property
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Create a reference-list property
    pub fn references(name: impl Into<String>, refs: Vec<NodeReference>) -> Self {
        Self::new(name, PropertyValue::References(refs))
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property value
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

/// Property payloads
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// Boolean flag (present means true)
    Bool,
    /// Array of integers
    U32(Vec<u32>),
    /// Array of strings
    Strings(Vec<String>),
    /// Array of references to other nodes, each with integer arguments
    References(Vec<NodeReference>),
}

/// Reference to another node plus integer arguments
#[derive(Debug, Clone)]
pub struct NodeReference {
    target: FwNode,
    args: Vec<u64>,
}

impl NodeReference {
    /// Reference `target` with `args`
    pub fn new(target: impl Into<FwNode>, args: Vec<u64>) -> Self {
        Self {
            target: target.into(),
            args,
        }
    }

    /// Referenced node
    pub fn target(&self) -> &FwNode {
        &self.target
    }

    /// Reference arguments
    pub fn args(&self) -> &[u64] {
        &self.args
    }
}

/// Handle to a firmware node
///
/// Only software nodes carry properties this crate can read. Other node
/// kinds (device tree, ACPI) are opaque and identified by path.
#[derive(Clone)]
pub enum FwNode {
    /// Software-described node
    Software(Arc<SoftwareNode>),
    /// Node described by platform firmware
    Firmware {
        /// Firmware path of the node
        path: String,
    },
}

impl FwNode {
    /// The software node behind this handle, if it is one
    pub fn as_software(&self) -> Option<&SoftwareNode> {
        match self {
            FwNode::Software(node) => Some(node),
            FwNode::Firmware { .. } => None,
        }
    }

    /// Display name of the node
    pub fn display_name(&self) -> &str {
        match self {
            FwNode::Software(node) => node.name().unwrap_or("unnamed"),
            FwNode::Firmware { path } => path,
        }
    }

    /// Fetch the `index`-th reference of property `prop`
    ///
    /// Exactly `nargs` arguments are returned. The reference must carry at
    /// least that many.
    pub fn get_reference_args(
        &self,
        prop: &str,
        nargs: usize,
        index: usize,
    ) -> Result<ReferenceArgs> {
        let node = self.as_software().ok_or_else(|| {
            Error::NotFound(format!("'{}' has no property '{}'", self.display_name(), prop))
        })?;

        let property = node.property(prop).ok_or_else(|| {
            Error::NotFound(format!("'{}' has no property '{}'", self.display_name(), prop))
        })?;

        let refs = match property.value() {
            PropertyValue::References(refs) => refs,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "property '{}' is not a reference list",
                    prop
                )))
            }
        };

        let reference = refs.get(index).ok_or_else(|| {
            Error::NotFound(format!("'{}' has no entry {}", prop, index))
        })?;

        if nargs > MAX_REFERENCE_ARGS {
            return Err(Error::InvalidArgument(format!(
                "{} reference arguments requested, at most {} supported",
                nargs, MAX_REFERENCE_ARGS
            )));
        }
        if reference.args.len() < nargs {
            return Err(Error::InvalidArgument(format!(
                "'{}[{}]' has {} arguments, expected {}",
                prop,
                index,
                reference.args.len(),
                nargs
            )));
        }

        Ok(ReferenceArgs {
            node: reference.target.clone(),
            args: reference.args[..nargs].to_vec(),
        })
    }
}

impl From<Arc<SoftwareNode>> for FwNode {
    fn from(node: Arc<SoftwareNode>) -> Self {
        FwNode::Software(node)
    }
}

impl From<SoftwareNode> for FwNode {
    fn from(node: SoftwareNode) -> Self {
        FwNode::Software(Arc::new(node))
    }
}

impl fmt::Debug for FwNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FwNode::Software(node) => write!(f, "FwNode::Software({:?})", node.name()),
            FwNode::Firmware { path } => write!(f, "FwNode::Firmware({})", path),
        }
    }
}

/// Result of a reference lookup
#[derive(Debug, Clone)]
pub struct ReferenceArgs {
    /// Referenced node
    pub node: FwNode,
    /// The requested number of arguments
    pub args: Vec<u64>,
}
