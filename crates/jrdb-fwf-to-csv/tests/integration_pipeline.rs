mod common;

use std::process::Command;
use std::str::FromStr;

use jrdb_fwf_to_csv::{
    ConvertOptions, Layout, WidthMode, convert_bytes_to_csv_string, convert_file, convert_lines,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn converts_shift_jis_file_to_quoted_utf8_csv() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("SED261011.txt");
    let output = dir.path().join("SED261011.csv");

    common::write_sjis_file(&input, &["東京1200ABC   ", "中山1800ﾃｽﾄ   "])
        .expect("fixture should be written");
    let layout = Layout::from_str("place:4,dist:4,name:6").expect("layout should parse");

    let report = convert_file(&input, &output, &layout, &ConvertOptions::default())
        .expect("conversion should succeed");

    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert_eq!(
        csv,
        "\"place\",\"dist\",\"name\"\r\n\"東京\",\"1200\",\"ABC\"\r\n\"中山\",\"1800\",\"ﾃｽﾄ\"\r\n"
    );
    assert_eq!(report.row_count, 2);
    assert_eq!(report.truncated_rows, 0);
    assert!(report.warnings.is_empty(), "report: {report:?}");
}

#[test]
fn two_column_line_round_trips() {
    let layout = Layout::from_str("a:3,b:2").expect("layout should parse");
    let (csv, report) = convert_bytes_to_csv_string(b"xyz12", &layout, &ConvertOptions::default())
        .expect("conversion should succeed");

    assert_eq!(csv, "\"a\",\"b\"\r\n\"xyz\",\"12\"\r\n");
    assert_eq!(report.row_count, 1);
}

#[test]
fn empty_input_writes_header_only() {
    let layout = Layout::from_str("a:3,b:2").expect("layout should parse");
    let (csv, report) = convert_bytes_to_csv_string(b"", &layout, &ConvertOptions::default())
        .expect("conversion should succeed");

    assert_eq!(csv, "\"a\",\"b\"\r\n");
    assert_eq!(report.row_count, 0);
}

#[test]
fn embedded_delimiters_and_quotes_are_escaped() {
    let layout = Layout::from_str("a:4,b:2").expect("layout should parse");
    let (csv, _) = convert_bytes_to_csv_string(b"a\"b,12\n", &layout, &ConvertOptions::default())
        .expect("conversion should succeed");

    assert_eq!(csv, "\"a\",\"b\"\r\n\"a\"\"b,\",\"12\"\r\n");
}

#[test]
fn long_lines_fill_every_column_and_ignore_trailing_bytes() {
    let layout = Layout::from_str("a:2,b:3,c:3").expect("layout should parse");
    let line = common::sjis("ab cd ef  tail");

    let (rows, report) = convert_lines([line], &layout, &ConvertOptions::default());
    assert_eq!(rows[1], vec!["ab", " cd", " ef"]);
    assert_eq!(rows[1].len(), layout.len());
    assert_eq!(report.truncated_rows, 0);
}

#[test]
fn char_mode_slices_decoded_text() {
    let layout = Layout::from_str("place:2,dist:4").expect("layout should parse");
    let options = ConvertOptions {
        width_mode: WidthMode::Chars,
        ..ConvertOptions::default()
    };
    let line = common::sjis("東京1200\r\n");

    let (rows, _) = convert_lines([line], &layout, &options);
    assert_eq!(rows[1], vec!["東京", "1200"]);
}

#[test]
fn char_mode_keeps_declared_line_break_column() {
    let layout = Layout::from_str("a:3,b:2,nl:2").expect("layout should parse");
    let options = ConvertOptions {
        width_mode: WidthMode::Chars,
        ..ConvertOptions::default()
    };

    let (csv, report) = convert_bytes_to_csv_string(b"xyz12\r\nabc34\r\n", &layout, &options)
        .expect("conversion should succeed");

    assert_eq!(
        csv,
        "\"a\",\"b\",\"nl\"\r\n\"xyz\",\"12\",\"\"\r\n\"abc\",\"34\",\"\"\r\n"
    );
    assert_eq!(report.truncated_rows, 0);
}

#[test]
fn metadata_table_drives_conversion() {
    let dir = tempdir().expect("tempdir should be created");
    let metadata = dir.path().join("sed.csv");
    std::fs::write(&metadata, "index,name,byte\n1,dist,4\n0,place,4\n")
        .expect("metadata should be written");

    let layout = Layout::from_metadata_path(&metadata).expect("metadata should load");
    let (rows, _) = convert_lines([common::sjis("東京1200")], &layout, &ConvertOptions::default());

    assert_eq!(rows[0], vec!["place", "dist"]);
    assert_eq!(rows[1], vec!["東京", "1200"]);
}

#[test]
fn cli_exits_with_code_2_when_rows_are_truncated() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("short.txt");
    let output = dir.path().join("short.csv");
    std::fs::write(&input, b"x\n").expect("input should be written");

    let status = Command::new(env!("CARGO_BIN_EXE_fwf2csv"))
        .args([
            "convert",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
            "--columns",
            "a:3,b:2",
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(2));
    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert!(csv.starts_with("\"a\",\"b\"\r\n"), "unexpected CSV output: {csv:?}");
}
