//! TOML board file parsing
//!
//! ```toml
//! consumer = "s3fwrn5"
//!
//! [phy]
//! en_wait_ms = 20
//! suppress_write_echo = false
//!
//! [bus]
//! type = "linux"
//! dev = "/dev/i2c-1"
//! addr = "0x27"
//!
//! [irq]
//! chip = "gpio-main"
//! line = 21
//! edge = "rising"
//!
//! [[nodes]]
//! name = "gpio-main"
//!
//! [[nodes]]
//! name = "s3fwrn5"
//!
//! [[nodes.properties]]
//! name = "en-gpios"
//! references = [{ node = "gpio-main", args = [23, 0] }]
//!
//! [[nodes.properties]]
//! name = "wake-gpios"
//! references = [{ node = "gpio-main", args = [24, 0] }]
//! ```
//!
//! An emulated controller is selected with `type = "dummy"` and an
//! optional `options = "nacks=1"` string.
//!
//! A property carries exactly one of `references`, `values` (integers) or
//! `strings`; a property with none of them is a boolean flag.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::{Board, BusConfig, IrqConfig};
use crate::error::{Error, Result};
use crate::gpio::{NodeReference, Property, PropertyValue, SoftwareNode};
use crate::phy::PhyConfig;

/// Board file structure
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlBoardFile {
    consumer: String,
    #[serde(default)]
    phy: PhyConfig,
    bus: BusConfig,
    irq: Option<IrqConfig>,
    #[serde(default)]
    nodes: Vec<TomlNode>,
}

/// Software node definition
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlNode {
    name: String,
    #[serde(default)]
    properties: Vec<TomlProperty>,
}

/// Property definition
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlProperty {
    name: String,
    references: Option<Vec<TomlReference>>,
    values: Option<Vec<u32>>,
    strings: Option<Vec<String>>,
}

/// Reference to a node by name
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlReference {
    node: String,
    #[serde(default)]
    args: Vec<u64>,
}

/// Deserialize a u16 that can be hex (0x...) or decimal
pub(super) fn deserialize_hex_u16<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Try to deserialize as a number first, then as a string
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u16),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> std::result::Result<u16, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// Builds nodes depth first so every reference target exists before the
/// node pointing at it
struct NodeBuilder<'a> {
    defs: HashMap<&'a str, &'a TomlNode>,
    built: BTreeMap<String, Arc<SoftwareNode>>,
    visiting: HashSet<&'a str>,
}

impl<'a> NodeBuilder<'a> {
    fn new(nodes: &'a [TomlNode]) -> Result<Self> {
        let mut defs = HashMap::new();
        for node in nodes {
            if defs.insert(node.name.as_str(), node).is_some() {
                return Err(Error::Config(format!("node '{}' defined twice", node.name)));
            }
        }
        Ok(Self {
            defs,
            built: BTreeMap::new(),
            visiting: HashSet::new(),
        })
    }

    fn build(&mut self, name: &str) -> Result<Arc<SoftwareNode>> {
        if let Some(node) = self.built.get(name) {
            return Ok(node.clone());
        }
        let (&key, &def) = self
            .defs
            .get_key_value(name)
            .ok_or_else(|| Error::Config(format!("unknown node '{}'", name)))?;
        if !self.visiting.insert(key) {
            return Err(Error::Config(format!(
                "reference cycle through node '{}'",
                name
            )));
        }

        let mut node = SoftwareNode::new(key);
        for prop in &def.properties {
            let value = self.property_value(key, prop)?;
            node = node.with_property(Property::new(prop.name.as_str(), value));
        }

        self.visiting.remove(key);
        let node = Arc::new(node);
        self.built.insert(key.to_string(), node.clone());
        Ok(node)
    }

    fn property_value(&mut self, owner: &str, prop: &TomlProperty) -> Result<PropertyValue> {
        match (&prop.references, &prop.values, &prop.strings) {
            (None, None, None) => Ok(PropertyValue::Bool),
            (Some(refs), None, None) => {
                let mut out = Vec::with_capacity(refs.len());
                for r in refs {
                    let target = self.build(&r.node)?;
                    out.push(NodeReference::new(target, r.args.clone()));
                }
                Ok(PropertyValue::References(out))
            }
            (None, Some(values), None) => Ok(PropertyValue::U32(values.clone())),
            (None, None, Some(strings)) => Ok(PropertyValue::Strings(strings.clone())),
            _ => Err(Error::Config(format!(
                "property '{}' of node '{}' has more than one kind of value",
                prop.name, owner
            ))),
        }
    }
}

impl Board {
    /// Load a board from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse a board from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlBoardFile =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        file.phy.validate()?;

        let mut builder = NodeBuilder::new(&file.nodes)?;
        for node in &file.nodes {
            builder.build(&node.name)?;
        }
        let consumer = builder.build(&file.consumer)?;

        log::debug!(
            "board: {} nodes, consumer '{}', bus {:?}",
            builder.built.len(),
            file.consumer,
            file.bus
        );

        Ok(Board {
            phy: file.phy,
            bus: file.bus,
            irq: file.irq,
            consumer,
            nodes: builder.built,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Edge;
    use crate::gpio::testutil::FakeChip;
    use crate::gpio::{count_lines, find_line, ChipRegistry};

    const BOARD: &str = r#"
consumer = "s3fwrn5"

[phy]
standby_retry_ms = 115
suppress_write_echo = false

[bus]
type = "linux"
dev = "/dev/i2c-1"
addr = "0x27"

[irq]
chip = "gpio-main"
line = 21

[[nodes]]
name = "s3fwrn5"

[[nodes.properties]]
name = "en-gpios"
references = [{ node = "gpio-main", args = [23, 0] }]

[[nodes.properties]]
name = "wake-gpios"
references = [{ node = "gpio-main", args = [24, 1] }]

[[nodes.properties]]
name = "compatible"
strings = ["samsung,s3fwrn5-i2c"]

[[nodes]]
name = "gpio-main"
"#;

    #[test]
    fn test_parse_board() {
        let board = Board::from_toml_str(BOARD).unwrap();
        assert_eq!(
            board.bus,
            BusConfig::Linux {
                dev: "/dev/i2c-1".into(),
                addr: 0x27
            }
        );
        assert_eq!(board.phy.standby_retry_ms, 115);
        assert_eq!(board.phy.en_wait_ms, 20);
        assert!(!board.phy.suppress_write_echo);

        let irq = board.irq.as_ref().unwrap();
        assert_eq!(irq.chip, "gpio-main");
        assert_eq!(irq.line, 21);
        assert_eq!(irq.edge, Edge::Rising);

        assert_eq!(board.consumer_name(), "s3fwrn5");
        assert_eq!(board.nodes().count(), 2);
        assert!(board.node("gpio-main").is_some());
    }

    #[test]
    fn test_board_nodes_resolve() {
        let board = Board::from_toml_str(BOARD).unwrap();
        let mut chips = ChipRegistry::new();
        chips.register(Arc::new(FakeChip::new("gpio-main", 32)));

        let node = board.consumer_node();
        let wake = find_line(&node, Some("wake"), 0, &chips).unwrap();
        assert_eq!(wake.desc.offset(), 24);
        assert_eq!(wake.flags.bits(), 1);
        assert_eq!(count_lines(&node, Some("en")).unwrap(), 1);
    }

    #[test]
    fn test_dummy_bus_and_decimal_addr() {
        let board = Board::from_toml_str(
            "consumer = \"nfc\"\n[bus]\ntype = \"dummy\"\n[[nodes]]\nname = \"nfc\"\n",
        )
        .unwrap();
        assert!(matches!(&board.bus, BusConfig::Dummy { options } if options.is_empty()));
        assert!(board.irq.is_none());
        assert_eq!(board.phy, PhyConfig::default());

        let board = Board::from_toml_str(
            "consumer = \"nfc\"\n[bus]\ntype = \"linux\"\ndev = \"/dev/i2c-0\"\naddr = 39\n[[nodes]]\nname = \"nfc\"\n",
        )
        .unwrap();
        assert!(matches!(board.bus, BusConfig::Linux { addr: 39, .. }));
    }

    #[test]
    fn test_unknown_node_rejected() {
        let err = Board::from_toml_str(
            r#"
consumer = "nfc"
[bus]
type = "dummy"
[[nodes]]
name = "nfc"
[[nodes.properties]]
name = "en-gpios"
references = [{ node = "missing", args = [1, 0] }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("missing")));

        let err = Board::from_toml_str("consumer = \"nope\"\n[bus]\ntype = \"dummy\"\n")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_reference_cycle_rejected() {
        let err = Board::from_toml_str(
            r#"
consumer = "a"
[bus]
type = "dummy"
[[nodes]]
name = "a"
[[nodes.properties]]
name = "x-gpios"
references = [{ node = "b" }]
[[nodes]]
name = "b"
[[nodes.properties]]
name = "y-gpios"
references = [{ node = "a" }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("cycle")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        // Retry delay out of range
        assert!(Board::from_toml_str(
            "consumer = \"n\"\n[phy]\nstandby_retry_ms = 10\n[bus]\ntype = \"dummy\"\n[[nodes]]\nname = \"n\"\n"
        )
        .is_err());
        // Mixed property kinds
        assert!(Board::from_toml_str(
            "consumer = \"n\"\n[bus]\ntype = \"dummy\"\n[[nodes]]\nname = \"n\"\n[[nodes.properties]]\nname = \"p\"\nvalues = [1]\nstrings = [\"a\"]\n"
        )
        .is_err());
        // Duplicate node
        assert!(Board::from_toml_str(
            "consumer = \"n\"\n[bus]\ntype = \"dummy\"\n[[nodes]]\nname = \"n\"\n[[nodes]]\nname = \"n\"\n"
        )
        .is_err());
        // Bad address
        assert!(Board::from_toml_str(
            "consumer = \"n\"\n[bus]\ntype = \"linux\"\ndev = \"/dev/i2c-0\"\naddr = \"0xzz\"\n[[nodes]]\nname = \"n\"\n"
        )
        .is_err());
    }
}
