//! Writes nfclink's man pages: `nfclink.1` plus one `nfclink-<command>.1`
//! per subcommand
//!
//! Usage: gen-manpage [output-dir]   (default: ./man)

use clap::{Command, CommandFactory};
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

/// Render `cmd` into `dir/<name>.1` and return the path written
fn render_page(cmd: Command, name: &str, dir: &Path) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    let path = dir.join(format!("{}.1", name));
    fs::write(&path, buffer)?;
    Ok(path)
}

/// Page names for the top-level command and each visible subcommand
fn pages(root: &Command) -> Vec<(String, Command)> {
    let name = root.get_name().to_string();
    let mut pages = vec![(name.clone(), root.clone())];
    for sub in root
        .get_subcommands()
        .filter(|s| !s.is_hide_set() && s.get_name() != "help")
    {
        let page = format!("{}-{}", name, sub.get_name());
        // Synopsis shows the full invocation
        let sub = sub.clone().bin_name(format!("{} {}", name, sub.get_name()));
        pages.push((page, sub));
    }
    pages
}

fn main() -> std::io::Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&dir)?;

    let root = cli::Cli::command();
    for (name, cmd) in pages(&root) {
        let path = render_page(cmd, &name, &dir)?;
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_page_per_command() {
        let root = cli::Cli::command();
        let names: Vec<String> = pages(&root).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names[0], "nfclink");
        for sub in ["lines", "mode", "send", "listen", "board", "list-backends"] {
            assert!(names.contains(&format!("nfclink-{}", sub)), "missing {}", sub);
        }
        assert!(!names.iter().any(|n| n == "nfclink-help"));
    }
}
