use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for transaction reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportId(pub String);

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transaction report already determined reportable by the intake side.
/// Read-only to the pipeline except for the receipt identifier written back
/// after the regulator accepts the filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReport {
    pub report_id: ReportId,
    pub property: PropertyAddress,
    pub closing_date: NaiveDate,
    /// Total consideration in whole dollars.
    pub purchase_price: u64,
    pub reporting_person: ReportingPerson,
    pub parties: Vec<ReportParty>,
    pub payment_sources: Vec<PaymentSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_identifier: Option<String>,
}

impl TransactionReport {
    pub fn transferees(&self) -> impl Iterator<Item = &ReportParty> {
        self.parties
            .iter()
            .filter(|party| party.role == PartyRole::Transferee)
    }

    pub fn transferors(&self) -> impl Iterator<Item = &ReportParty> {
        self.parties
            .iter()
            .filter(|party| party.role == PartyRole::Transferor)
    }
}

/// Address of the transferred property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

/// Mailing address shape shared by parties and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// The escrow business filing on behalf of the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPerson {
    pub legal_name: String,
    pub tax_id: String,
    pub address: MailingAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Which side of the transfer a party sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Transferee,
    Transferor,
}

/// One buyer or seller on the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportParty {
    pub role: PartyRole,
    pub subject: PartySubject,
}

/// Type-specific party shapes. Each variant carries exactly the fields its
/// mapping requires, so missing-data preflight stays traceable per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartySubject {
    Individual(IndividualParty),
    Entity(EntityParty),
    Trust(TrustParty),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualParty {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub address: MailingAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub identification: PersonIdentification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityParty {
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
    pub address: MailingAddress,
    pub identification: EntityIdentification,
    /// Beneficial owners and signing individuals, one associated-person
    /// sub-party each.
    pub associated_persons: Vec<AssociatedPerson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustParty {
    pub trust_name: String,
    pub execution_date: NaiveDate,
    pub revocable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    pub address: MailingAddress,
    pub trustees: Vec<AssociatedPerson>,
}

/// Identification accepted for a natural person. A foreign identification
/// alone is sufficient; no domestic tax id is required alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersonIdentification {
    Ssn { number: String },
    Foreign(ForeignIdentification),
}

/// Identification accepted for a legal entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityIdentification {
    Ein { number: String },
    Foreign(ForeignIdentification),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignIdentification {
    pub number: String,
    pub issuing_country: String,
    pub document: ForeignDocumentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignDocumentKind {
    Passport,
    ForeignTaxId,
    OtherGovernmentIssued,
}

/// Beneficial owner, signing individual, or trustee nested under a buyer or
/// seller party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedPerson {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub address: MailingAddress,
    pub identification: PersonIdentification,
    pub capacity: AssociatedPersonCapacity,
    /// Percentage of ownership, 0-100, where declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_percent: Option<u8>,
    /// Whether the person exercises substantial control.
    #[serde(default)]
    pub control_person: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociatedPersonCapacity {
    BeneficialOwner,
    SigningIndividual,
    Trustee,
}

/// One source of funds for the purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSource {
    /// Whole dollars.
    pub amount: u64,
    pub method: PaymentMethod,
    /// Set when the funds do not move through a financial-institution
    /// account; suppresses the attached institution sub-party.
    #[serde(default)]
    pub not_from_institution_account: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<FinancialInstitution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    WireTransfer,
    CertifiedCheck,
    PersonalCheck,
    BusinessCheck,
    MoneyOrder,
    Currency,
    DigitalAsset,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::WireTransfer => "wire_transfer",
            PaymentMethod::CertifiedCheck => "certified_check",
            PaymentMethod::PersonalCheck => "personal_check",
            PaymentMethod::BusinessCheck => "business_check",
            PaymentMethod::MoneyOrder => "money_order",
            PaymentMethod::Currency => "currency",
            PaymentMethod::DigitalAsset => "digital_asset",
        }
    }
}

/// The institution holding the account a payment was drawn on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialInstitution {
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    pub address: MailingAddress,
}
