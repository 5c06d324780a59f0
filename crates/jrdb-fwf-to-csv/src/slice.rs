use encoding_rs::SHIFT_JIS;

use crate::layout::Layout;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SlicedLine {
    pub cells: Vec<String>,
    /// Index of the first column that starts beyond the end of the line.
    pub failed_column: Option<usize>,
    /// Columns whose bytes did not decode cleanly.
    pub undecodable: Vec<usize>,
}

pub(crate) fn decode_shift_jis(bytes: &[u8]) -> (String, bool) {
    let (decoded, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
    (decoded.into_owned(), had_errors)
}

/// `[offset, offset + width)` cut short at the end of `items`. Only a column
/// that starts past the end is unavailable.
fn clamped<T>(items: &[T], offset: usize, width: usize) -> Option<&[T]> {
    if offset > items.len() {
        return None;
    }
    let end = offset.saturating_add(width).min(items.len());
    items.get(offset..end)
}

/// Slices a raw Shift-JIS line by byte widths and decodes every cell.
pub(crate) fn slice_bytes(line: &[u8], layout: &Layout) -> SlicedLine {
    let mut sliced = SlicedLine::default();
    let mut offset = 0_usize;

    for (index, column) in layout.columns().iter().enumerate() {
        let Some(bytes) = clamped(line, offset, column.width) else {
            sliced.failed_column = Some(index);
            break;
        };
        offset = offset.saturating_add(column.width);

        let (cell, had_errors) = decode_shift_jis(bytes);
        if had_errors {
            sliced.undecodable.push(index);
        }
        sliced.cells.push(cell.trim_end().to_string());
    }

    sliced
}

/// Decodes the whole line first and slices it by character positions.
pub(crate) fn slice_chars(line: &[u8], layout: &Layout) -> SlicedLine {
    let (decoded, had_errors) = decode_shift_jis(line);
    let normalized = match decoded.strip_suffix("\r\n") {
        Some(body) => format!("{body}\n"),
        None => decoded,
    };
    let chars = normalized.chars().collect::<Vec<_>>();

    let mut sliced = SlicedLine::default();
    let mut offset = 0_usize;

    for (index, column) in layout.columns().iter().enumerate() {
        let Some(cell_chars) = clamped(&chars, offset, column.width) else {
            sliced.failed_column = Some(index);
            break;
        };
        offset = offset.saturating_add(column.width);

        let cell = cell_chars.iter().collect::<String>();
        if had_errors && cell.contains('\u{FFFD}') {
            sliced.undecodable.push(index);
        }
        sliced.cells.push(cell.trim_end().to_string());
    }

    sliced
}
