//! Line resolution report

use nfclink_core::board::Board;
use nfclink_core::gpio::{count_lines, find_line, ChipRegistry, FwNode};
use nfclink_core::Error;

use crate::backends::open_chips;

/// Functions the phy looks up, current names first
const FUNCTIONS: &[&str] = &["en", "wake", "s3fwrn5,en", "s3fwrn5,fw"];

/// Print how the controller's lines resolve
pub fn run(board: &Board, function: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let chips = open_chips(board)?;
    let node = board.consumer_node();

    println!("Lines of '{}':", board.consumer_name());
    match function {
        Some(function) => print_function(&node, function, &chips),
        None => {
            for function in FUNCTIONS {
                print_function(&node, function, &chips);
            }
        }
    }
    Ok(())
}

fn print_function(node: &FwNode, function: &str, chips: &ChipRegistry) {
    let count = match count_lines(node, Some(function)) {
        Ok(count) => count,
        Err(Error::NotFound(_)) => {
            println!("  {:<12} (none)", function);
            return;
        }
        Err(e) => {
            println!("  {:<12} error: {}", function, e);
            return;
        }
    };

    println!("  {:<12} {} line(s)", function, count);
    for index in 0..count {
        match find_line(node, Some(function), index, chips) {
            Ok(line) => println!(
                "    [{}] {}:{} flags {:#x}",
                index,
                line.desc.chip().label(),
                line.desc.offset(),
                line.flags.bits()
            ),
            Err(Error::ResolutionDeferred { provider }) => {
                println!("    [{}] waiting for provider '{}'", index, provider)
            }
            Err(e) => println!("    [{}] error: {}", index, e),
        }
    }
}
