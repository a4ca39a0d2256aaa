//! Config command - manage the service configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use brdoc_core::models::config::BrdocConfig;

use super::{config_path, load_config};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with default values
    Init(InitArgs),

    /// Print one configuration value
    Get {
        /// Dotted key (e.g. "pdf.render_dpi")
        key: String,
    },

    /// Change one configuration value
    Set {
        /// Dotted key (e.g. "ocr.engine")
        key: String,
        /// New value, parsed as JSON when possible
        value: String,
    },

    /// Show the configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, explicit: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(explicit),
        ConfigCommand::Init(init_args) => init_config(init_args, explicit),
        ConfigCommand::Get { key } => get_config(explicit, &key),
        ConfigCommand::Set { key, value } => set_config(explicit, &key, &value),
        ConfigCommand::Path => show_path(explicit),
    }
}

fn show_config(explicit: Option<&str>) -> anyhow::Result<()> {
    if !config_path(explicit).exists() {
        println!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }

    let config = load_config(explicit)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs, explicit: Option<&str>) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| config_path(explicit));

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    write_config(&output_path, &BrdocConfig::default())?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(explicit: Option<&str>, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(load_config(explicit)?)?;
    println!("{}", serde_json::to_string_pretty(lookup(&json, key)?)?);

    Ok(())
}

fn set_config(explicit: Option<&str>, key: &str, value: &str) -> anyhow::Result<()> {
    let path = config_path(explicit);
    let config = if path.exists() {
        load_config(explicit)?
    } else {
        BrdocConfig::default()
    };

    let parsed_value: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let updated = assign(&config, key, parsed_value.clone())?;
    write_config(&path, &updated)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn show_path(explicit: Option<&str>) -> anyhow::Result<()> {
    let path = config_path(explicit);

    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'brdoc config init' to create a configuration file.");
    }

    Ok(())
}

fn write_config(path: &Path, config: &BrdocConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(path)?;
    Ok(())
}

/// Resolve a dotted key inside the serialized configuration.
fn lookup<'a>(json: &'a Value, key: &str) -> anyhow::Result<&'a Value> {
    key.split('.').try_fold(json, |current, part| {
        current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))
    })
}

/// Replace the value at an existing dotted key and re-validate the result.
fn assign(config: &BrdocConfig, key: &str, value: Value) -> anyhow::Result<BrdocConfig> {
    let mut json = serde_json::to_value(config)?;

    let mut current = &mut json;
    for part in key.split('.') {
        current = current
            .get_mut(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }
    *current = value;

    serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use brdoc_core::models::config::OcrEngineKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        let json = serde_json::to_value(BrdocConfig::default()).unwrap();

        assert_eq!(lookup(&json, "pdf.render_dpi").unwrap(), &json!(200));
        assert_eq!(lookup(&json, "ocr.language").unwrap(), &json!("por"));
        assert!(lookup(&json, "ocr.nope").is_err());
    }

    #[test]
    fn test_assign() {
        let config = assign(&BrdocConfig::default(), "ocr.engine", json!("tesseract")).unwrap();
        assert_eq!(config.ocr.engine, OcrEngineKind::Tesseract);

        let config = assign(&config, "server.port", json!(9000)).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_assign_rejects_unknown_key_and_bad_value() {
        let config = BrdocConfig::default();

        assert!(assign(&config, "server.workers", json!(4)).is_err());
        assert!(assign(&config, "ocr.engine", json!("easyocr")).is_err());
    }
}
