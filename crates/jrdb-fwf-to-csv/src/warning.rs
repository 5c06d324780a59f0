#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningCode {
    TruncatedRow,
    UndecodableCell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertWarning {
    pub code: WarningCode,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<String>,
}

impl ConvertWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}
