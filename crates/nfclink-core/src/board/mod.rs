//! Board descriptions
//!
//! A board file says how one controller is wired: which bus it sits on,
//! where its interrupt line goes, how the phy is tuned, and the software
//! nodes describing its `en` and `wake` lines. See [`toml`] for the format.

mod toml;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::gpio::{FwNode, SoftwareNode};
use crate::phy::PhyConfig;

/// Which bus the controller is attached to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum BusConfig {
    /// A Linux i2c-dev adapter
    Linux {
        /// Adapter device path, e.g. `/dev/i2c-1`
        dev: String,
        /// 7-bit slave address
        #[serde(deserialize_with = "toml::deserialize_hex_u16")]
        addr: u16,
    },
    /// The in-memory emulated controller
    Dummy {
        /// Emulator options, `key=value` pairs separated by commas
        #[serde(default)]
        options: String,
    },
}

/// Interrupt edge to listen for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Low to high
    #[default]
    Rising,
    /// High to low
    Falling,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Rising => write!(f, "rising"),
            Edge::Falling => write!(f, "falling"),
        }
    }
}

/// Where the controller's interrupt line is connected
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrqConfig {
    /// Label of the GPIO chip carrying the line
    pub chip: String,
    /// Line offset on that chip
    pub line: u32,
    /// Edge that signals a pending frame
    #[serde(default)]
    pub edge: Edge,
}

/// A parsed board file
#[derive(Debug, Clone)]
pub struct Board {
    /// Phy tuning
    pub phy: PhyConfig,
    /// Bus the controller is on
    pub bus: BusConfig,
    /// Interrupt line, if the bus backend does not provide one
    pub irq: Option<IrqConfig>,
    consumer: Arc<SoftwareNode>,
    nodes: BTreeMap<String, Arc<SoftwareNode>>,
}

impl Board {
    /// The controller's own node
    pub fn consumer_node(&self) -> FwNode {
        FwNode::Software(self.consumer.clone())
    }

    /// Name of the controller's node
    pub fn consumer_name(&self) -> &str {
        self.consumer.name().unwrap_or_default()
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&Arc<SoftwareNode>> {
        self.nodes.get(name)
    }

    /// All nodes, ordered by name
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<SoftwareNode>> {
        self.nodes.values()
    }
}
