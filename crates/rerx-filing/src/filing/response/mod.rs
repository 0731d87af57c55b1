//! Decodes the regulator's response files into normalized results.
//!
//! Two file shapes come back over SDTM: a status message (batch accepted,
//! rejected, or accepted with warnings, plus error text) and a final
//! acknowledgement carrying one receipt identifier per activity sequence
//! number. Both are parsed by local element name so namespace prefixes and
//! unknown wrapper elements do not break decoding.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

/// Overall batch disposition reported by a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Accepted,
    Rejected,
    AcceptedWithWarnings,
}

impl ResponseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Rejected => "rejected",
            ResponseStatus::AcceptedWithWarnings => "accepted_with_warnings",
        }
    }
}

/// Normalized status-message contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub status: ResponseStatus,
    pub errors: Vec<String>,
}

/// Normalized acknowledgement contents: receipt identifiers keyed by the
/// activity sequence number the builder assigned, so multi-activity batches
/// stay addressable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub receipts: BTreeMap<u32, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseParseError {
    #[error("response file is not UTF-8 text")]
    NotUtf8,
    #[error("response file is not valid XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("status message carries no status code")]
    MissingStatus,
    #[error("status message carries unrecognized status code '{0}'")]
    UnknownStatus(String),
    #[error("acknowledgement activity is missing its sequence number")]
    MissingSequenceNumber,
    #[error("acknowledgement activity {seq} is missing its receipt identifier")]
    MissingReceipt { seq: u32 },
    #[error("acknowledgement activity sequence number is not numeric: '{0}'")]
    NonNumericSequence(String),
    #[error("acknowledgement carries no activities")]
    EmptyAcknowledgement,
}

pub fn parse_status_message(bytes: &[u8]) -> Result<StatusMessage, ResponseParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ResponseParseError::NotUtf8)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut status = None;
    let mut errors = Vec::new();
    let mut current: Option<Field> = None;

    #[derive(PartialEq)]
    enum Field {
        Status,
        Error,
    }

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                current = match start.local_name().as_ref() {
                    b"SubmissionStatusCode" => Some(Field::Status),
                    b"StatusErrorText" => Some(Field::Error),
                    _ => None,
                };
            }
            Event::Text(text) => {
                let value = text.unescape()?.trim().to_string();
                match current {
                    Some(Field::Status) if !value.is_empty() => {
                        status = Some(parse_status_code(&value)?);
                    }
                    Some(Field::Error) if !value.is_empty() => errors.push(value),
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    let status = status.ok_or(ResponseParseError::MissingStatus)?;
    Ok(StatusMessage { status, errors })
}

pub fn parse_acknowledgement(bytes: &[u8]) -> Result<Acknowledgement, ResponseParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ResponseParseError::NotUtf8)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut receipts = BTreeMap::new();
    let mut in_activity = false;
    let mut seq: Option<u32> = None;
    let mut receipt: Option<String> = None;
    let mut current: Option<Field> = None;

    #[derive(PartialEq)]
    enum Field {
        Sequence,
        Receipt,
    }

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"EFilingActivityXML" => {
                    in_activity = true;
                    seq = None;
                    receipt = None;
                }
                b"ActivitySeqNumber" if in_activity => current = Some(Field::Sequence),
                b"ReceiptIdentifier" if in_activity => current = Some(Field::Receipt),
                _ => current = None,
            },
            Event::Text(text) => {
                let value = text.unescape()?.trim().to_string();
                match current {
                    Some(Field::Sequence) if !value.is_empty() => {
                        seq = Some(
                            value
                                .parse::<u32>()
                                .map_err(|_| ResponseParseError::NonNumericSequence(value))?,
                        );
                    }
                    Some(Field::Receipt) if !value.is_empty() => receipt = Some(value),
                    _ => {}
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"EFilingActivityXML" {
                    let seq = seq.take().ok_or(ResponseParseError::MissingSequenceNumber)?;
                    let receipt = receipt
                        .take()
                        .ok_or(ResponseParseError::MissingReceipt { seq })?;
                    receipts.insert(seq, receipt);
                    in_activity = false;
                }
                current = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if receipts.is_empty() {
        return Err(ResponseParseError::EmptyAcknowledgement);
    }

    Ok(Acknowledgement { receipts })
}

fn parse_status_code(raw: &str) -> Result<ResponseStatus, ResponseParseError> {
    let normalized: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match normalized.as_str() {
        "accepted" | "a" => Ok(ResponseStatus::Accepted),
        "rejected" | "r" => Ok(ResponseStatus::Rejected),
        "acceptedwithwarnings" | "w" => Ok(ResponseStatus::AcceptedWithWarnings),
        _ => Err(ResponseParseError::UnknownStatus(raw.to_string())),
    }
}
