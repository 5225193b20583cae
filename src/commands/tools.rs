use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::core::tool_resolver::{self, ToolSource, KNOWN_TOOLS};
use crate::core::Config;

pub fn handle_set(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("tool", sub_matches)) => set_tool(sub_matches),
        _ => {
            println!("Use 'mbatch set --help' for more information.");
            Ok(())
        }
    }
}

pub fn handle_get(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("tools", _)) => get_tools(),
        _ => {
            println!("Use 'mbatch get --help' for more information.");
            Ok(())
        }
    }
}

fn set_tool(matches: &clap::ArgMatches) -> Result<()> {
    let name = matches
        .get_one::<String>("name")
        .context("Tool name is required")?;

    if matches.get_flag("unset") {
        return unset_tool(name);
    }

    let path = matches
        .get_one::<String>("path")
        .context("Path argument is required")?;

    if !KNOWN_TOOLS.contains(&name.as_str()) {
        println!(
            "{}",
            format!(
                "⚠️  Warning: '{}' is not used by mbatch (known: {})",
                name,
                KNOWN_TOOLS.join(", ")
            )
            .yellow()
        );
    }

    let path_buf = Path::new(path);
    if !path_buf.is_file() {
        println!(
            "{}",
            format!("⚠️  Warning: '{}' is not an existing file", path).yellow()
        );
        println!(
            "{}",
            "The path will be saved but launching the tool will fail until it exists.".dimmed()
        );
    }

    let stored = if path_buf.exists() {
        path_buf
            .canonicalize()
            .with_context(|| format!("Failed to resolve path: {}", path))?
            .to_string_lossy()
            .to_string()
    } else {
        path.to_string()
    };

    let mut config = Config::load()?;
    config.set_tool_path(name.clone(), stored.clone());
    config.save()?;

    println!("{} {}", format!("✓ {} path set to:", name).green(), stored);
    Ok(())
}

fn unset_tool(name: &str) -> Result<()> {
    let mut config = Config::load()?;
    if config.remove_tool_path(name) {
        config.save()?;
        println!("{}", format!("✓ {} path removed", name).green());
    } else {
        println!("{}", format!("No path configured for {}", name).dimmed());
    }
    Ok(())
}

fn get_tools() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "External tools:".white().bold());
    for tool in KNOWN_TOOLS {
        let resolved = tool_resolver::resolve_with_config(tool, &config);
        let source = match resolved.source {
            ToolSource::SystemPath => "PATH".green(),
            ToolSource::Configured => "config".cyan(),
            ToolSource::Unresolved => "not found".red(),
        };
        println!(
            "  {:<8} {} {}",
            tool,
            resolved.path.display(),
            format!("({})", source).dimmed()
        );
    }

    if let Ok(path) = Config::get_config_path() {
        println!();
        println!("{} {}", "Config file:".dimmed(), path.display());
    }
    Ok(())
}
