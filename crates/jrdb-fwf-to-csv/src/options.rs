use std::str::FromStr;

/// How declared column widths are applied to a source line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WidthMode {
    /// Widths are byte counts over the raw Shift-JIS line; cells are decoded
    /// after slicing.
    #[default]
    Bytes,
    /// The line is decoded first and widths count characters. A trailing
    /// CR/LF is folded to a single LF before slicing.
    Chars,
}

impl FromStr for WidthMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bytes" | "byte" => Ok(Self::Bytes),
            "chars" | "char" => Ok(Self::Chars),
            other => Err(format!("unknown width mode '{other}', expected bytes or chars")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub width_mode: WidthMode,
    pub delimiter: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            width_mode: WidthMode::Bytes,
            delimiter: b',',
        }
    }
}
