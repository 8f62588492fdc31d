//! Command-line interface definitions for the `armada` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use clap::Parser;

/// RAM sizes (in megabytes) that map onto a provider flavour.
pub(crate) const FLAVOR_RAM_SIZES: [u32; 7] = [512, 1024, 2048, 4096, 8192, 15360, 30720];

/// Upper bound on metadata pairs accepted by the provider.
pub(crate) const MAX_METADATA_ENTRIES: usize = 5;

/// Command-line arguments for the `armada` binary.
#[derive(Debug, Parser)]
#[command(
    name = "armada",
    about = "Provision a batch of cloud servers and report their credentials",
    version
)]
pub(crate) struct Cli {
    /// Server name prefix; each server receives a random 8 character suffix
    /// (e.g. node-54jg84d9, node-57fhd49h, ...).
    #[arg(
        short,
        long,
        value_name = "SERVER_NAME_PREFIX",
        default_value = "node-"
    )]
    pub(crate) prefix: String,
    /// Region where servers should be built.
    #[arg(
        short,
        long,
        value_name = "REGION",
        default_value = "LON",
        value_parser = ["ORD", "DFW", "LON"]
    )]
    pub(crate) region: String,
    /// Image ID (or unambiguous ID fragment) to build the servers from.
    #[arg(short, long, value_name = "SERVER_IMAGE_ID")]
    pub(crate) image: String,
    /// Server RAM size in megabytes.
    #[arg(
        short,
        long,
        value_name = "SERVER_RAM_SIZE",
        default_value_t = 512,
        value_parser = parse_ram_size
    )]
    pub(crate) size: u32,
    /// Metadata for the build requests, as a JSON object of at most five
    /// string pairs (e.g. '{"group": "web"}').
    #[arg(
        short,
        long,
        value_name = "METADATA",
        default_value = "{}",
        value_parser = parse_metadata
    )]
    pub(crate) meta: BTreeMap<String, String>,
    /// Number of servers to build.
    #[arg(
        short,
        long,
        value_name = "SERVER_COUNT",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=50)
    )]
    pub(crate) count: u8,
    /// Directory to create log files in.
    #[arg(short, long, value_name = "DIRECTORY", default_value = "/var/log")]
    pub(crate) logpath: Utf8PathBuf,
    /// Turn on debug verbosity.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

/// Parses and validates the `--size` flag against the known flavour sizes.
fn parse_ram_size(raw: &str) -> Result<u32, String> {
    let value: u32 = raw
        .parse()
        .map_err(|err| format!("invalid RAM size '{raw}': {err}"))?;
    if FLAVOR_RAM_SIZES.contains(&value) {
        Ok(value)
    } else {
        Err(format!("RAM size must be one of {FLAVOR_RAM_SIZES:?}"))
    }
}

/// Parses the `--meta` flag as a JSON object of string pairs.
fn parse_metadata(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let entries: BTreeMap<String, String> = serde_json::from_str(raw)
        .map_err(|err| format!("metadata must be a JSON object of string pairs: {err}"))?;
    if entries.len() > MAX_METADATA_ENTRIES {
        return Err(format!(
            "at most {MAX_METADATA_ENTRIES} metadata pairs are accepted, got {}",
            entries.len()
        ));
    }
    Ok(entries)
}
