//! Built-in processors.

pub mod code_extraction;
pub mod enrichment;
pub mod formatting;
pub mod logging;

pub use code_extraction::{
    CodeBlock, CodeExtractionProcessor, Extraction, SavedFile, extract_code_blocks,
    suggest_filename,
};
pub use enrichment::ContextEnrichmentProcessor;
pub use formatting::ResponseFormattingProcessor;
pub use logging::{LoggingProcessor, RequestLogEntry};
