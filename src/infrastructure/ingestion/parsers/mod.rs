//! Document parser implementations

mod markdown;
mod pdf;
mod plain_text;

pub use markdown::MarkdownParser;
pub use pdf::PdfParser;
pub use plain_text::PlainTextParser;
