mod common;

use chrono::{Local, TimeZone};
use common::ScriptedRunner;
use datascribe::ScribeError;
use datascribe::metadata::{
    ExportFormat, MetadataKind, export, export_file_name, extract_metadata, gps_position,
    parse_exiftool_json, render, xml_element_name,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const EXIF_JSON: &str = r#"[{
  "SourceFile": "/case/IMG_0042.jpg",
  "Make": "Canon",
  "Model": "Canon EOS 80D",
  "ISO": 200,
  "Comment": "a < b & c"
}]"#;

const GPS_JSON: &str = r#"[{
  "SourceFile": "/case/IMG_0042.jpg",
  "GPSLatitude": 48.8583701,
  "GPSLongitude": -2.2944813,
  "GPSAltitude": 35.2
}]"#;

// ============================================================================
// exiftool Output
// ============================================================================

#[test]
fn test_parse_exiftool_json_keeps_tag_order() {
    let records = parse_exiftool_json(EXIF_JSON).unwrap();
    assert_eq!(records.len(), 1);
    let keys: Vec<&str> = records[0].keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["SourceFile", "Make", "Model", "ISO", "Comment"]);
}

#[test]
fn test_parse_exiftool_json_fails_closed() {
    for output in ["", "[]", "{\"Make\": \"Canon\"}", "Error: File not found"] {
        assert!(
            matches!(
                parse_exiftool_json(output),
                Err(ScribeError::UnexpectedOutput { tool: "exiftool", .. })
            ),
            "{:?} should be rejected",
            output
        );
    }
}

#[test]
fn test_extract_metadata_uses_group_filter() {
    let runner = ScriptedRunner::new().ok("exiftool", EXIF_JSON);
    let record =
        extract_metadata(&runner, Path::new("/case/IMG_0042.jpg"), MetadataKind::Exif).unwrap();
    assert_eq!(record["Make"], "Canon");
    assert_eq!(
        runner.calls()[0],
        vec!["exiftool", "-json", "-EXIF:all", "/case/IMG_0042.jpg"]
    );
}

// ============================================================================
// GPS
// ============================================================================

#[test]
fn test_gps_position_reads_signed_coordinates() {
    let runner = ScriptedRunner::new().ok("exiftool", GPS_JSON);
    let position = gps_position(&runner, Path::new("/case/IMG_0042.jpg")).unwrap();
    assert!((position.latitude - 48.8583701).abs() < 1e-9);
    assert!((position.longitude + 2.2944813).abs() < 1e-9);
    assert_eq!(position.altitude, Some(35.2));
    assert_eq!(position.to_string(), "48.858370, -2.294481 (35.2 m)");
    assert!(runner.calls()[0].contains(&"-n".to_string()));
}

#[test]
fn test_gps_missing_is_no_gps_metadata() {
    let runner = ScriptedRunner::new().ok("exiftool", r#"[{"SourceFile": "/case/scan.png"}]"#);
    let err = gps_position(&runner, Path::new("/case/scan.png")).unwrap_err();
    assert!(matches!(err, ScribeError::NoGpsMetadata(p) if p == Path::new("/case/scan.png")));
}

#[test]
fn test_gps_non_numeric_is_unexpected_output() {
    let runner = ScriptedRunner::new().ok(
        "exiftool",
        r#"[{"GPSLatitude": "48 deg 51' 30.13\" N", "GPSLongitude": 2.29}]"#,
    );
    let err = gps_position(&runner, Path::new("/case/a.jpg")).unwrap_err();
    assert!(matches!(err, ScribeError::UnexpectedOutput { .. }));
}

#[test]
fn test_exiftool_failure_surfaces_stderr() {
    let runner = ScriptedRunner::new().fail("exiftool", 1, "Error: File not found - /case/x.jpg");
    let err = extract_metadata(&runner, Path::new("/case/x.jpg"), MetadataKind::All).unwrap_err();
    assert_eq!(err.tool_stderr(), Some("Error: File not found - /case/x.jpg"));
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_export_file_name() {
    let ts = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    assert_eq!(
        export_file_name(Path::new("/case/IMG_0042.jpg"), MetadataKind::Gps, ts, ExportFormat::Xml),
        "IMG_0042-gps-20240309-140507.xml"
    );
    assert_eq!(
        export_file_name(Path::new("notes"), MetadataKind::All, ts, ExportFormat::Text),
        "notes-all-20240309-140507.txt"
    );
}

#[test]
fn test_render_text_lines() {
    let record = parse_exiftool_json(EXIF_JSON).unwrap().remove(0);
    let text = render(&record, ExportFormat::Text).unwrap();
    assert_eq!(
        text,
        "SourceFile: /case/IMG_0042.jpg\nMake: Canon\nModel: Canon EOS 80D\nISO: 200\nComment: a < b & c\n"
    );
}

#[test]
fn test_render_xml_is_flat_and_escaped() {
    let record = parse_exiftool_json(EXIF_JSON).unwrap().remove(0);
    let xml = render(&record, ExportFormat::Xml).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<metadata>"));
    assert!(xml.contains("<Make>Canon</Make>"));
    assert!(xml.contains("<ISO>200</ISO>"));
    assert!(xml.contains("<Comment>a &lt; b &amp; c</Comment>"));
    assert!(xml.trim_end().ends_with("</metadata>"));
}

#[test]
fn test_xml_element_names() {
    assert_eq!(xml_element_name("EXIF:Make"), "EXIF_Make");
    assert_eq!(xml_element_name("3DTag"), "_3DTag");
    assert_eq!(xml_element_name("Composite:GPS Position"), "Composite_GPS_Position");
}

#[test]
fn test_export_writes_json_file() {
    let dir = tempdir().unwrap();
    let record = parse_exiftool_json(EXIF_JSON).unwrap().remove(0);

    let path = export(
        &record,
        Path::new("/case/IMG_0042.jpg"),
        MetadataKind::Exif,
        ExportFormat::Json,
        &dir.path().join("exports"),
    )
    .unwrap();

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("IMG_0042-exif-"));
    assert!(name.ends_with(".json"));

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["Model"], "Canon EOS 80D");
}
