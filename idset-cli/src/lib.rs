#![deny(missing_docs)]

//! # idset command line tool
//!
//! Encodes GLOBCNT values into GLOBSET buffers and inspects hex-encoded
//! GLOBSET and IDSET buffers. Every command renders its result as JSON.

pub mod config;
pub mod error;
pub mod logging;

use std::io::Cursor;

use clap::Args;
use clap::Subcommand;
use clap::ValueEnum;
use idset::Decodable;
use idset::DecodeError;
use idset::Encodable;
use idset::GlobSet;
use idset::Globcnt;
use idset::ReplguidIdset;
use idset::ReplidIdset;
use serde_json::json;
use serde_json::Value;

use crate::config::Settings;
use crate::error::Error;

/// The kind of replica key an IDSET buffer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyKind {
    /// Two-byte REPLID keys
    Replid,
    /// Sixteen-byte REPLGUID keys
    Replguid,
}

/// The operations the binary supports.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encode GLOBCNT values into a hex GLOBSET
    Encode(EncodeArgs),
    /// Decode a hex GLOBSET
    Decode(DecodeArgs),
    /// Decode a hex IDSET
    DecodeIdset(IdsetArgs),
    /// Check whether one IDSET contains another
    Contains(ContainsArgs),
    /// List every ID in an IDSET
    Ids(IdsetArgs),
}

/// Arguments for `encode`.
#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// GLOBCNT values as decimal integers, in any order
    #[clap(required = true)]
    pub values: Vec<String>,
}

/// Arguments for `decode`.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// The GLOBSET as hex
    pub hex: String,
    /// Include every decoded command in the output
    #[clap(long)]
    pub trace: bool,
}

/// Arguments for commands taking one IDSET.
#[derive(Debug, Args)]
pub struct IdsetArgs {
    /// The kind of replica key the IDSET uses
    #[clap(long, value_enum)]
    pub key: KeyKind,
    /// The IDSET as hex
    pub hex: String,
}

/// Arguments for `contains`.
#[derive(Debug, Args)]
pub struct ContainsArgs {
    /// The kind of replica key both IDSETs use
    #[clap(long, value_enum)]
    pub key: KeyKind,
    /// The containing IDSET as hex
    pub hex: String,
    /// The contained IDSET as hex
    pub other_hex: String,
}

/// Runs a command and returns its JSON result.
pub fn run(command: &Command, settings: &Settings) -> Result<Value, Error> {
    match command {
        Command::Encode(args) => encode(args),
        Command::Decode(args) => decode(args, settings),
        Command::DecodeIdset(args) => decode_idset(args),
        Command::Contains(args) => contains(args),
        Command::Ids(args) => ids(args, settings),
    }
}

/// Renders a JSON result the way the settings ask for.
pub fn render(value: &Value, settings: &Settings) -> Result<String, Error> {
    let rendered = match settings.output.pretty_json {
        true => serde_json::to_string_pretty(value)?,
        false => serde_json::to_string(value)?,
    };
    Ok(rendered)
}

fn encode(args: &EncodeArgs) -> Result<Value, Error> {
    let values = args
        .values
        .iter()
        .map(|value| -> Result<Globcnt, Error> {
            let value: u64 = value
                .parse()
                .map_err(|_| Error::InvalidValue(value.clone()))?;
            Ok(Globcnt::from_u64(value)?)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let globset = GlobSet::from_values(values);
    let encoded = globset.encode()?;
    tracing::debug!(%globset, bytes = encoded.len(), "encoded GLOBSET");

    Ok(json!({
        "hex": hex::encode(&encoded),
        "ranges": globset,
    }))
}

fn decode(args: &DecodeArgs, settings: &Settings) -> Result<Value, Error> {
    let bytes = hex::decode(&args.hex)?;
    let mut cursor = Cursor::new(bytes.as_slice());
    let decoded = GlobSet::read_traced(&mut cursor)?;

    let trailing = bytes.len() - cursor.position() as usize;
    if trailing != 0 {
        return Err(idset::Error::from(DecodeError::TrailingBytes(trailing)).into());
    }

    let mut output = json!({
        "ranges": decoded.globset,
        "count": decoded.globset.len(),
        "conformance": decoded.conformance,
        "conformant": decoded.conformance.is_conformant(),
    });
    if args.trace || settings.output.always_trace {
        output["commands"] = serde_json::to_value(&decoded.commands)?;
    }

    Ok(output)
}

fn decode_idset(args: &IdsetArgs) -> Result<Value, Error> {
    let bytes = hex::decode(&args.hex)?;
    let value = match args.key {
        KeyKind::Replid => serde_json::to_value(ReplidIdset::decode(&bytes)?)?,
        KeyKind::Replguid => serde_json::to_value(ReplguidIdset::decode(&bytes)?)?,
    };
    Ok(value)
}

fn contains(args: &ContainsArgs) -> Result<Value, Error> {
    let bytes = hex::decode(&args.hex)?;
    let other = hex::decode(&args.other_hex)?;

    let (contains, equivalent) = match args.key {
        KeyKind::Replid => {
            let this = ReplidIdset::decode(&bytes)?;
            let other = ReplidIdset::decode(&other)?;
            (this.contains(&other), this.is_equivalent(&other))
        }
        KeyKind::Replguid => {
            let this = ReplguidIdset::decode(&bytes)?;
            let other = ReplguidIdset::decode(&other)?;
            (this.contains(&other), this.is_equivalent(&other))
        }
    };

    Ok(json!({ "contains": contains, "equivalent": equivalent }))
}

fn ids(args: &IdsetArgs, settings: &Settings) -> Result<Value, Error> {
    let bytes = hex::decode(&args.hex)?;
    let limit = settings.limits.max_expanded_values;

    let value = match args.key {
        KeyKind::Replid => {
            let ids = ReplidIdset::decode(&bytes)?.to_ids_with_limit(limit)?;
            let ids: Vec<String> = ids.iter().map(|id| format!("{id:#018x}")).collect();
            serde_json::to_value(ids)?
        }
        KeyKind::Replguid => {
            let ids = ReplguidIdset::decode(&bytes)?.to_long_term_ids_with_limit(limit)?;
            serde_json::to_value(ids)?
        }
    };

    Ok(value)
}
