use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::ReaderBuilder;

use crate::error::ConvertError;

/// One fixed-width column: its output name and its width in the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub width: usize,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// Ordered column layout of a fixed-width record.
///
/// Column order defines both the offsets in the source line and the column
/// order of the CSV output. The sum of widths does not have to match the
/// length of the lines being converted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    columns: Vec<ColumnSpec>,
}

impl Layout {
    #[must_use]
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    #[must_use]
    pub fn total_width(&self) -> usize {
        self.columns.iter().map(|column| column.width).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reads a metadata table with `index`, `name` and `byte` columns.
    ///
    /// Rows are ordered by the numeric `index` column; rows sharing an index
    /// keep their file order. Any other columns are ignored.
    pub fn from_metadata_reader<R: Read>(reader: R, source: &str) -> Result<Self, ConvertError> {
        let metadata_error = |message: String| ConvertError::Metadata {
            path: source.to_string(),
            message,
        };

        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        let position = |wanted: &str| {
            headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| metadata_error(format!("missing required column '{wanted}'")))
        };
        let index_col = position("index")?;
        let name_col = position("name")?;
        let byte_col = position("byte")?;

        let mut indexed = Vec::new();
        for (row_number, record) in reader.records().enumerate() {
            let record = record?;
            let line = row_number + 2;
            let field = |col: usize| record.get(col).unwrap_or_default();

            let index = parse_number::<i64>(field(index_col))
                .ok_or_else(|| metadata_error(format!("line {line}: invalid index '{}'", field(index_col))))?;
            let width = parse_number::<usize>(field(byte_col))
                .ok_or_else(|| metadata_error(format!("line {line}: invalid byte width '{}'", field(byte_col))))?;
            let name = field(name_col).to_string();
            if name.is_empty() {
                return Err(metadata_error(format!("line {line}: empty column name")));
            }

            indexed.push((index, ColumnSpec { name, width }));
        }

        indexed.sort_by_key(|(index, _)| *index);
        Ok(Self::new(indexed.into_iter().map(|(_, column)| column).collect()))
    }

    pub fn from_metadata_path(path: &Path) -> Result<Self, ConvertError> {
        let file = File::open(path)?;
        Self::from_metadata_reader(file, &path.display().to_string())
    }
}

// Metadata exports sometimes carry integral numbers as floats ("3.0").
fn parse_number<T: FromStr>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    trimmed
        .parse::<T>()
        .ok()
        .or_else(|| trimmed.strip_suffix(".0").and_then(|value| value.parse::<T>().ok()))
}

impl FromIterator<ColumnSpec> for Layout {
    fn from_iter<I: IntoIterator<Item = ColumnSpec>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FromStr for Layout {
    type Err = ConvertError;

    /// Parses an inline layout such as `name:3,code:2`.
    fn from_str(inline: &str) -> Result<Self, Self::Err> {
        let mut columns = Vec::new();
        for token in inline.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, width) = token
                .rsplit_once(':')
                .ok_or_else(|| ConvertError::InvalidLayout(format!("invalid column '{token}', expected name:width")))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConvertError::InvalidLayout(format!("invalid column '{token}': empty name")));
            }
            let width: usize = width
                .trim()
                .parse()
                .map_err(|_| ConvertError::InvalidLayout(format!("invalid width in column '{token}'")))?;
            columns.push(ColumnSpec::new(name, width));
        }

        if columns.is_empty() {
            return Err(ConvertError::InvalidLayout("layout cannot be empty".to_string()));
        }

        Ok(Self::new(columns))
    }
}
