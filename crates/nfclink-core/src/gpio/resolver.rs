//! GPIO line resolution for software-node consumers
//!
//! A consumer names its lines through `<function>-gpios` reference
//! properties (or plain `gpios` when no function is given). Every entry
//! references the provider's software node and carries two arguments: the
//! line offset on that provider and the native lookup flags.
//!
//! The provider node's name must equal the label of a registered
//! [`GpioChip`](super::GpioChip). If no registered provider matches yet the
//! lookup is deferred rather than failed, since providers may still be
//! coming up.

use super::{ChipRegistry, FwNode, GpioDesc, LineFlags, OutputLine};
use crate::error::{Error, Result};

/// Maximum length of a generated property name
const PROP_NAME_MAX: usize = 31;

/// Upper bound on the number of entries [`count_lines`] probes
pub const MAX_LINE_PROBE: usize = 256;

/// Build the property name for `con_id`
fn gpio_property_name(con_id: Option<&str>) -> String {
    let mut name = match con_id {
        Some(id) => format!("{}-gpios", id),
        None => String::from("gpios"),
    };
    if name.len() > PROP_NAME_MAX {
        let mut end = PROP_NAME_MAX;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/// A resolved line of a consumer
#[derive(Debug, Clone)]
pub struct GpioLineRef {
    /// Function the line was resolved for (`None` for plain `gpios`)
    pub function: Option<String>,
    /// Entry index within the property
    pub index: usize,
    /// Line descriptor on the provider
    pub desc: GpioDesc,
    /// Native lookup flags, exactly as given in the reference
    pub flags: LineFlags,
}

impl GpioLineRef {
    /// Request the line as an output at logical level `initial`
    pub fn request_output(&self, consumer: &str, initial: bool) -> Result<Box<dyn OutputLine>> {
        self.desc.request_output(self.flags, consumer, initial)
    }
}

/// Resolve the `index`-th line of function `con_id` for `fwnode`
///
/// # Errors
///
/// - [`Error::NotFound`] - `fwnode` is not a software node, or the property
///   or entry does not exist
/// - [`Error::InvalidArgument`] - the entry is malformed or references an
///   unnamed or non-software node
/// - [`Error::ResolutionDeferred`] - no registered provider carries the
///   referenced label yet
pub fn find_line(
    fwnode: &FwNode,
    con_id: Option<&str>,
    index: usize,
    chips: &ChipRegistry,
) -> Result<GpioLineRef> {
    if fwnode.as_software().is_none() {
        return Err(Error::NotFound(format!(
            "'{}' is not a software node",
            fwnode.display_name()
        )));
    }

    let prop_name = gpio_property_name(con_id);

    // Entries carry (line offset, flags)
    let args = fwnode
        .get_reference_args(&prop_name, 2, index)
        .inspect_err(|_| {
            log::debug!(
                "gpio: can't parse '{}' property of node '{}[{}]'",
                prop_name,
                fwnode.display_name(),
                index
            );
        })?;

    let chip_name = args
        .node
        .as_software()
        .and_then(|node| node.name())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "'{}[{}]' does not reference a named software node",
                prop_name, index
            ))
        })?;

    let chip = chips
        .find_by_label(chip_name)
        .ok_or_else(|| Error::ResolutionDeferred {
            provider: chip_name.to_string(),
        })?;

    let offset = u32::try_from(args.args[0]).map_err(|_| {
        Error::InvalidArgument(format!(
            "'{}[{}]' line number {} out of range",
            prop_name, index, args.args[0]
        ))
    })?;
    let flags = LineFlags::from_bits_retain(args.args[1]);

    let desc = GpioDesc::new(chip, offset)?;

    log::debug!(
        "gpio: {}[{}] of '{}' -> {}:{} (flags {:#x})",
        prop_name,
        index,
        fwnode.display_name(),
        chip_name,
        offset,
        flags.bits()
    );

    Ok(GpioLineRef {
        function: con_id.map(str::to_string),
        index,
        desc,
        flags,
    })
}

/// Count the lines assigned to function `con_id` of `fwnode`
///
/// Probes entries 0, 1, 2, ... until the first one that fails to resolve.
/// There is no count property to read, so this probe is the only way to
/// learn the list length. The probe stops at [`MAX_LINE_PROBE`].
///
/// Returns [`Error::NotFound`] if no entry resolves.
pub fn count_lines(fwnode: &FwNode, con_id: Option<&str>) -> Result<usize> {
    let prop_name = gpio_property_name(con_id);

    // Lists have one or two entries in practice
    let mut count = 0;
    while count < MAX_LINE_PROBE && fwnode.get_reference_args(&prop_name, 0, count).is_ok() {
        count += 1;
    }

    if count == MAX_LINE_PROBE {
        log::warn!(
            "gpio: '{}' of '{}' has at least {} entries, stopped counting",
            prop_name,
            fwnode.display_name(),
            MAX_LINE_PROBE
        );
    }

    if count == 0 {
        return Err(Error::NotFound(format!(
            "no '{}' lines for '{}'",
            prop_name,
            fwnode.display_name()
        )));
    }
    Ok(count)
}

/// Resolve the first line of `con_id` and request it as an output
///
/// The line is requested with the reference's flags and driven to logical
/// level `initial`.
pub fn get_output(
    fwnode: &FwNode,
    con_id: Option<&str>,
    chips: &ChipRegistry,
    consumer: &str,
    initial: bool,
) -> Result<Box<dyn OutputLine>> {
    find_line(fwnode, con_id, 0, chips)?.request_output(consumer, initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::testutil::FakeChip;
    use crate::gpio::{NodeReference, Property, SoftwareNode};
    use std::sync::Arc;

    fn provider() -> Arc<SoftwareNode> {
        Arc::new(SoftwareNode::new("gpio-main"))
    }

    fn registry() -> ChipRegistry {
        let mut reg = ChipRegistry::new();
        reg.register(Arc::new(FakeChip::new("gpio-other", 8)));
        reg.register(Arc::new(FakeChip::new("gpio-main", 32)));
        reg
    }

    fn consumer() -> FwNode {
        let chip = provider();
        SoftwareNode::new("s3fwrn5")
            .with_property(Property::references(
                "en-gpios",
                vec![NodeReference::new(chip.clone(), vec![23, 0])],
            ))
            .with_property(Property::references(
                "wake-gpios",
                vec![
                    NodeReference::new(chip.clone(), vec![24, 1]),
                    NodeReference::new(chip.clone(), vec![25, 0x1_0006]),
                ],
            ))
            .with_property(Property::references(
                "gpios",
                vec![NodeReference::new(chip, vec![2, 0])],
            ))
            .into()
    }

    #[test]
    fn test_property_names() {
        assert_eq!(gpio_property_name(Some("en")), "en-gpios");
        assert_eq!(gpio_property_name(None), "gpios");
        let long = gpio_property_name(Some("a-really-long-function-name-here"));
        assert_eq!(long.len(), 31);
        assert!(long.starts_with("a-really-long-function-name-her"));
    }

    #[test]
    fn test_find_line_flags_exact() {
        let node = consumer();
        let reg = registry();

        let en = find_line(&node, Some("en"), 0, &reg).unwrap();
        assert_eq!(en.desc.offset(), 23);
        assert_eq!(en.desc.chip().label(), "gpio-main");
        assert_eq!(en.flags.bits(), 0);

        let wake1 = find_line(&node, Some("wake"), 1, &reg).unwrap();
        assert_eq!(wake1.desc.offset(), 25);
        assert_eq!(wake1.flags.bits(), 0x1_0006);
        assert_eq!(wake1.index, 1);
        assert_eq!(wake1.function.as_deref(), Some("wake"));

        let plain = find_line(&node, None, 0, &reg).unwrap();
        assert_eq!(plain.desc.offset(), 2);
    }

    #[test]
    fn test_find_line_not_software_node() {
        let node = FwNode::Firmware {
            path: "/soc/nfc".into(),
        };
        assert!(matches!(
            find_line(&node, Some("en"), 0, &registry()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_find_line_missing_property() {
        assert!(matches!(
            find_line(&consumer(), Some("irq"), 0, &registry()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_find_line_defers_until_provider_registered() {
        let node = consumer();
        let mut reg = ChipRegistry::new();
        match find_line(&node, Some("en"), 0, &reg) {
            Err(Error::ResolutionDeferred { provider }) => assert_eq!(provider, "gpio-main"),
            other => panic!("expected deferral, got {:?}", other),
        }

        reg.register(Arc::new(FakeChip::new("gpio-main", 32)));
        assert!(find_line(&node, Some("en"), 0, &reg).is_ok());
    }

    #[test]
    fn test_find_line_unnamed_provider() {
        let node: FwNode = SoftwareNode::new("nfc")
            .with_property(Property::references(
                "en-gpios",
                vec![NodeReference::new(SoftwareNode::unnamed(), vec![1, 0])],
            ))
            .into();
        assert!(matches!(
            find_line(&node, Some("en"), 0, &registry()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_find_line_missing_flags_argument() {
        let node: FwNode = SoftwareNode::new("nfc")
            .with_property(Property::references(
                "en-gpios",
                vec![NodeReference::new(provider(), vec![1])],
            ))
            .into();
        assert!(matches!(
            find_line(&node, Some("en"), 0, &registry()),
            Err(Error::InvalidArgument(_))
        ));
        // Counting does not need any arguments
        assert_eq!(count_lines(&node, Some("en")).unwrap(), 1);
    }

    #[test]
    fn test_count_lines() {
        let node = consumer();
        assert_eq!(count_lines(&node, Some("en")).unwrap(), 1);
        assert_eq!(count_lines(&node, Some("wake")).unwrap(), 2);
        assert_eq!(count_lines(&node, None).unwrap(), 1);
        assert!(matches!(
            count_lines(&node, Some("reset")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_count_lines_capped() {
        let chip = provider();
        let refs = (0..MAX_LINE_PROBE + 10)
            .map(|i| NodeReference::new(chip.clone(), vec![i as u64, 0]))
            .collect();
        let node: FwNode = SoftwareNode::new("nfc")
            .with_property(Property::references("gpios", refs))
            .into();
        assert_eq!(count_lines(&node, None).unwrap(), MAX_LINE_PROBE);
    }

    #[test]
    fn test_get_output_applies_initial_level() {
        let line = get_output(&consumer(), Some("en"), &registry(), "nfc-en", true).unwrap();
        assert_eq!(line.consumer_name(), "nfc-en");
    }
}
