use std::io::Write;

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};

// Rows cut short by a slice failure are narrower than the header, so the
// writer has to accept ragged records.
pub(crate) fn quoted_writer<W: Write>(sink: W, delimiter: u8) -> Writer<W> {
    WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::CRLF)
        .flexible(true)
        .from_writer(sink)
}
