//! The filing pipeline: document construction and preflight, SDTM transport,
//! response decoding, and the durable submission lifecycle.

pub mod codes;
pub mod document;
pub mod response;
pub mod submission;
pub mod transport;

pub use document::{
    verify_structure, BuiltDocument, DocumentBuilder, DocumentSummary, PreflightError,
    StructureError, StructureReport,
};
pub use response::{
    parse_acknowledgement, parse_status_message, Acknowledgement, ResponseParseError,
    ResponseStatus, StatusMessage,
};
pub use submission::{
    FilingError, FilingOutcome, FilingService, PollOutcome, ReceiptSink, RepositoryError,
    Submission, SubmissionRepository, SubmissionStatus,
};
pub use transport::{SdtmGateway, TransportError};
