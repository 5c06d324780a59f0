//! Fixed-width Shift-JIS text to quoted UTF-8 CSV.
//!
//! A [`Layout`] lists `(name, width)` pairs. Every source line is cut into
//! consecutive ranges of those widths, each cell is stripped of trailing
//! whitespace, and the result is written as a fully quoted CSV row below a
//! header row of the column names. A range running past the end of the line
//! is cut short to the bytes available. A column that starts beyond the end
//! is not an error either: the row ends there and a warning is recorded.

mod csv_out;
mod error;
mod layout;
mod options;
mod slice;
mod warning;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::csv_out::quoted_writer;
use crate::slice::{SlicedLine, slice_bytes, slice_chars};

pub use error::ConvertError;
pub use layout::{ColumnSpec, Layout};
pub use options::{ConvertOptions, WidthMode};
pub use warning::{ConvertWarning, WarningCode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// Data rows written, header excluded.
    pub row_count: usize,
    pub truncated_rows: usize,
    pub warnings: Vec<ConvertWarning>,
}

struct RowConverter<'a> {
    layout: &'a Layout,
    options: &'a ConvertOptions,
    report: ConversionReport,
}

impl<'a> RowConverter<'a> {
    fn new(layout: &'a Layout, options: &'a ConvertOptions) -> Self {
        Self {
            layout,
            options,
            report: ConversionReport::default(),
        }
    }

    fn convert_line(&mut self, line_number: usize, line: &[u8]) -> Vec<String> {
        let SlicedLine {
            cells,
            failed_column,
            undecodable,
        } = match self.options.width_mode {
            WidthMode::Bytes => slice_bytes(line, self.layout),
            WidthMode::Chars => slice_chars(line, self.layout),
        };

        if let Some(index) = failed_column {
            let column = self.column_name(index);
            warn!(
                line = line_number,
                column,
                kept = cells.len(),
                "column range exceeds line length; remaining columns dropped"
            );
            self.report.truncated_rows += 1;
            self.report.warnings.push(
                ConvertWarning::new(
                    WarningCode::TruncatedRow,
                    format!(
                        "line has {} byte(s); columns from '{column}' onward were dropped",
                        line.len()
                    ),
                )
                .with_line(line_number)
                .with_column(column),
            );
        }

        for index in undecodable {
            let column = self.column_name(index);
            debug!(line = line_number, column, "cell contains undecodable bytes");
            self.report.warnings.push(
                ConvertWarning::new(
                    WarningCode::UndecodableCell,
                    "cell bytes are not valid Shift-JIS; replacement characters emitted",
                )
                .with_line(line_number)
                .with_column(column),
            );
        }

        self.report.row_count += 1;
        cells
    }

    fn column_name(&self, index: usize) -> &'a str {
        self.layout
            .columns()
            .get(index)
            .map_or("", |column| column.name.as_str())
    }

    fn finish(self) -> ConversionReport {
        self.report
    }
}

fn validate_options(options: &ConvertOptions) -> Result<(), ConvertError> {
    if matches!(options.delimiter, b'"' | b'\n' | b'\r') {
        return Err(ConvertError::InvalidOption(format!(
            "delimiter {:?} cannot be used in quoted CSV output",
            char::from(options.delimiter)
        )));
    }
    Ok(())
}

/// Converts in-memory lines and returns every CSV row, header first.
///
/// Lines are raw Shift-JIS bytes, with or without their terminator.
pub fn convert_lines<I, L>(
    lines: I,
    layout: &Layout,
    options: &ConvertOptions,
) -> (Vec<Vec<String>>, ConversionReport)
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut rows = vec![layout.names().map(str::to_string).collect::<Vec<_>>()];
    let mut converter = RowConverter::new(layout, options);
    for (index, line) in lines.into_iter().enumerate() {
        rows.push(converter.convert_line(index + 1, line.as_ref()));
    }
    (rows, converter.finish())
}

/// Streams `source` line by line into `sink` as quoted CSV.
pub fn convert_reader<R, W>(
    mut source: R,
    sink: W,
    layout: &Layout,
    options: &ConvertOptions,
) -> Result<ConversionReport, ConvertError>
where
    R: BufRead,
    W: Write,
{
    validate_options(options)?;

    let mut writer = quoted_writer(sink, options.delimiter);
    writer.write_record(layout.names())?;

    let mut converter = RowConverter::new(layout, options);
    let mut buffer = Vec::new();
    let mut line_number = 0_usize;
    loop {
        buffer.clear();
        if source.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        line_number += 1;
        let row = converter.convert_line(line_number, &buffer);
        writer.write_record(&row)?;
    }
    writer.flush()?;

    Ok(converter.finish())
}

pub fn convert_file(
    input: &Path,
    output: &Path,
    layout: &Layout,
    options: &ConvertOptions,
) -> Result<ConversionReport, ConvertError> {
    let source = BufReader::new(File::open(input)?);
    let sink = BufWriter::new(File::create(output)?);
    convert_reader(source, sink, layout, options)
}

pub fn convert_bytes_to_csv_string(
    input: &[u8],
    layout: &Layout,
    options: &ConvertOptions,
) -> Result<(String, ConversionReport), ConvertError> {
    let mut buffer = Vec::new();
    let report = convert_reader(input, &mut buffer, layout, options)?;
    let csv = String::from_utf8(buffer)
        .map_err(|error| ConvertError::InvalidOption(format!("invalid utf-8 csv output: {error}")))?;
    Ok((csv, report))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::{ConvertOptions, Layout, WarningCode, convert_lines};

    #[test]
    fn empty_source_yields_only_header() {
        let layout = Layout::from_str("a:3,b:2").expect("layout");
        let (rows, report) = convert_lines(Vec::<&[u8]>::new(), &layout, &ConvertOptions::default());

        assert_eq!(rows, vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(report.row_count, 0);
    }

    #[test]
    fn short_line_is_kept_with_fewer_cells() {
        let layout = Layout::from_str("a:3,b:2,c:2").expect("layout");
        let (rows, report) = convert_lines(
            [b"xyz12ok".as_slice(), b"xy".as_slice()],
            &layout,
            &ConvertOptions::default(),
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["xyz", "12", "ok"]);
        assert_eq!(rows[2], vec!["xy"]);
        assert_eq!(report.truncated_rows, 1);
        assert_eq!(report.warnings[0].code, WarningCode::TruncatedRow);
        assert_eq!(report.warnings[0].line, Some(2));
        assert_eq!(report.warnings[0].column.as_deref(), Some("b"));
    }

    #[test]
    fn partial_last_column_keeps_its_bytes() {
        let layout = Layout::from_str("a:3,b:2").expect("layout");
        let (rows, report) = convert_lines([b"xyz1".as_slice()], &layout, &ConvertOptions::default());

        assert_eq!(rows[1], vec!["xyz", "1"]);
        assert_eq!(report.truncated_rows, 0);
        assert!(report.warnings.is_empty());
    }
}
