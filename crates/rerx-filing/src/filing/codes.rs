//! Wire-contract constants shared by the builder, validator, transport
//! naming, and response reconciliation. None of these values are local
//! naming choices; the regulator addresses filings and parties by them.

/// Form type code carried on the batch root and used as the filename prefix.
pub const FORM_TYPE_CODE: &str = "RERX";

/// Namespace the batch document is declared under.
pub const BATCH_NAMESPACE: &str = "www.regulator.gov/base";

/// Appended to the submitted filename by the regulator's status message.
pub const STATUS_MESSAGE_SUFFIX: &str = ".status";

/// Appended to the submitted filename by the final acknowledgement carrying
/// receipt identifiers.
pub const ACKNOWLEDGEMENT_SUFFIX: &str = ".acked";

/// Control code placed on the wire for every non-production submission.
pub const SANDBOX_TRANSMITTER_CONTROL_CODE: &str = "TBSATEST";

/// Party type codes: the regulator's addressing scheme for the party
/// sections inside an activity.
pub mod party_type {
    pub const REPORTING_PERSON: u16 = 30;
    pub const TRANSFEREE: u16 = 16;
    pub const TRANSFEREE_ASSOCIATED_PERSON: u16 = 17;
    pub const TRANSFEROR: u16 = 18;
    pub const FINANCIAL_INSTITUTION: u16 = 34;
    pub const TRANSMITTER: u16 = 35;
    pub const TRANSMITTER_CONTACT: u16 = 37;
}
