//! Board file summary

use std::path::Path;

use nfclink_core::board::{Board, BusConfig};
use nfclink_core::gpio::PropertyValue;

/// Print what a board file describes
pub fn run(path: &Path, board: &Board) {
    println!("Board: {}", path.display());
    println!();

    match &board.bus {
        BusConfig::Linux { dev, addr } => println!("Bus:        linux {} @ {:#04x}", dev, addr),
        BusConfig::Dummy { options } if options.is_empty() => println!("Bus:        dummy"),
        BusConfig::Dummy { options } => println!("Bus:        dummy ({})", options),
    }
    match &board.irq {
        Some(irq) => println!("IRQ:        {}:{} ({} edge)", irq.chip, irq.line, irq.edge),
        None => println!("IRQ:        from backend"),
    }

    let phy = &board.phy;
    println!("Phy:");
    println!("  en_wait_ms          {}", phy.en_wait_ms);
    println!("  standby_retry_ms    {}", phy.standby_retry_ms);
    println!("  max_payload_len     {}", phy.max_payload_len);
    println!("  suppress_write_echo {}", phy.suppress_write_echo);

    println!("Consumer:   {}", board.consumer_name());
    println!("Nodes:");
    for node in board.nodes() {
        println!("  {}", node.name().unwrap_or("unnamed"));
        for prop in node.properties() {
            println!("    {:<16} {}", prop.name(), format_value(prop.value()));
        }
    }
}

fn format_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Bool => "true".to_string(),
        PropertyValue::U32(values) => format!("{:?}", values),
        PropertyValue::Strings(values) => format!("{:?}", values),
        PropertyValue::References(refs) => refs
            .iter()
            .map(|r| format!("<{} {:?}>", r.target().display_name(), r.args()))
            .collect::<Vec<_>>()
            .join(", "),
    }
}
