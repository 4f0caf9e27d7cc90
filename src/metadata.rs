//! exiftool adapter
//!
//! Reads the `-json` report, pulls GPS coordinates out of it and writes
//! records to disk as JSON, flat XML or `key: value` text.

use crate::core::error::{Result, ScribeError};
use crate::core::runner::{ExecutionRequest, ToolRunner};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXIFTOOL: &str = "exiftool";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Tag name to value, in exiftool's output order.
pub type MetadataRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetadataKind {
    All,
    Exif,
    Gps,
    Xmp,
    Iptc,
}

impl MetadataKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetadataKind::All => "all",
            MetadataKind::Exif => "exif",
            MetadataKind::Gps => "gps",
            MetadataKind::Xmp => "xmp",
            MetadataKind::Iptc => "iptc",
        }
    }

    fn tag_filter(&self) -> Option<&'static str> {
        match self {
            MetadataKind::All => None,
            MetadataKind::Exif => Some("-EXIF:all"),
            MetadataKind::Gps => Some("-GPS:all"),
            MetadataKind::Xmp => Some("-XMP:all"),
            MetadataKind::Iptc => Some("-IPTC:all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Xml,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl fmt::Display for GpsPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)?;
        if let Some(alt) = self.altitude {
            write!(f, " ({:.1} m)", alt)?;
        }
        Ok(())
    }
}

pub fn metadata_request(file: &Path, kind: MetadataKind) -> ExecutionRequest {
    let request = ExecutionRequest::new(EXIFTOOL).arg("-json");
    let request = match kind.tag_filter() {
        Some(filter) => request.arg(filter),
        None => request,
    };
    request.arg(file)
}

pub fn gps_request(file: &Path) -> ExecutionRequest {
    ExecutionRequest::new(EXIFTOOL)
        .args(["-json", "-n", "-GPSLatitude", "-GPSLongitude", "-GPSAltitude"])
        .arg(file)
}

/// Parses the JSON array exiftool prints for `-json`.
pub fn parse_exiftool_json(output: &str) -> Result<Vec<MetadataRecord>> {
    let records: Vec<MetadataRecord> = serde_json::from_str(output)
        .map_err(|e| ScribeError::unexpected("exiftool", e.to_string()))?;
    if records.is_empty() {
        return Err(ScribeError::unexpected("exiftool", "empty record list"));
    }
    Ok(records)
}

pub fn extract_metadata<R: ToolRunner>(
    runner: &R,
    file: &Path,
    kind: MetadataKind,
) -> Result<MetadataRecord> {
    let output = runner.output(&metadata_request(file, kind))?;
    let mut records = parse_exiftool_json(&output)?;
    Ok(records.swap_remove(0))
}

pub fn gps_position<R: ToolRunner>(runner: &R, file: &Path) -> Result<GpsPosition> {
    let output = runner.output(&gps_request(file))?;
    let records = parse_exiftool_json(&output)?;
    gps_from_record(&records[0], file)
}

pub fn gps_from_record(record: &MetadataRecord, file: &Path) -> Result<GpsPosition> {
    let latitude = coordinate(record, "GPSLatitude")?;
    let longitude = coordinate(record, "GPSLongitude")?;
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(GpsPosition {
            latitude,
            longitude,
            altitude: coordinate(record, "GPSAltitude")?,
        }),
        _ => Err(ScribeError::NoGpsMetadata(file.to_path_buf())),
    }
}

fn coordinate(record: &MetadataRecord, tag: &str) -> Result<Option<f64>> {
    match record.get(tag) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ScribeError::unexpected("exiftool", format!("{} is not numeric: {:?}", tag, s))),
        Some(other) => Err(ScribeError::unexpected(
            "exiftool",
            format!("{} has unexpected type: {}", tag, other),
        )),
    }
}

/// `<basename>-<kind>-<timestamp>.<ext>`
pub fn export_file_name(
    source: &Path,
    kind: MetadataKind,
    timestamp: DateTime<Local>,
    format: ExportFormat,
) -> String {
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "metadata".to_string());
    format!(
        "{}-{}-{}.{}",
        base,
        kind.name(),
        timestamp.format(TIMESTAMP_FORMAT),
        format.extension()
    )
}

pub fn render(record: &MetadataRecord, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(record).map_err(encode_err),
        ExportFormat::Text => Ok(render_text(record)),
        ExportFormat::Xml => render_xml(record),
    }
}

fn render_text(record: &MetadataRecord) -> String {
    let mut out = String::new();
    for (key, value) in record {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&value_text(value));
        out.push('\n');
    }
    out
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_xml(record: &MetadataRecord) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("metadata")))
        .map_err(encode_err)?;
    for (key, value) in record {
        let name = xml_element_name(key);
        let text = value_text(value);
        writer
            .write_event(Event::Start(BytesStart::new(name.as_str())))
            .map_err(encode_err)?;
        writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(encode_err)?;
        writer
            .write_event(Event::End(BytesEnd::new(name.as_str())))
            .map_err(encode_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("metadata")))
        .map_err(encode_err)?;

    String::from_utf8(writer.into_inner()).map_err(encode_err)
}

fn encode_err<E>(e: E) -> ScribeError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    ScribeError::Io(io::Error::other(e))
}

/// Maps an exiftool tag (e.g. `EXIF:Make`) to a valid XML element name.
pub fn xml_element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

/// Writes `record` into `out_dir` and returns the created file.
pub fn export(
    record: &MetadataRecord,
    source: &Path,
    kind: MetadataKind,
    format: ExportFormat,
    out_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(export_file_name(source, kind, Local::now(), format));
    fs::write(&path, render(record, format)?)?;
    info!(path = %path.display(), "metadata exported");
    Ok(path)
}
