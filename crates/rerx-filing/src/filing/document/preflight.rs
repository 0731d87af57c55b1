use std::collections::HashSet;

use chrono::NaiveDate;

use super::model::{DocumentModel, PartyElement, PartyName};
use crate::config::FilingConfig;
use crate::filing::codes::party_type;

/// Values that intake systems use to mark a field they never filled in.
/// Any name or address field matching one of these blocks transmission.
const PLACEHOLDER_VALUES: [&str; 5] = ["unknown", "n/a", "none", "not applicable", "see above"];

/// Data problems that block transmission. Every variant renders to a reason
/// an operator can act on without reading a stack trace.
#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("transmitter TIN not configured")]
    MissingTransmitterTin,
    #[error("transmitter control code not configured")]
    MissingTransmitterControlCode,
    #[error("filing date {filed_on} is in the future")]
    FilingDateInFuture { filed_on: NaiveDate },
    #[error("filing date {filed_on} precedes the minimum valid filing date {minimum}")]
    FilingDateBeforeMinimum {
        filed_on: NaiveDate,
        minimum: NaiveDate,
    },
    #[error("document requires exactly {expected} {section} section(s), found {found}")]
    WrongPartyCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("document requires at least one {section}")]
    MissingParty { section: &'static str },
    #[error("report carries no payment sources")]
    NoPaymentSources,
    #[error("duplicate sequence number {seq}")]
    DuplicateSequenceNumber { seq: u32 },
    #[error("missing {section} identification")]
    MissingIdentification { section: &'static str },
    #[error("missing {section} name")]
    MissingName { section: &'static str },
    #[error("{section} phone number must contain digits only, got '{value}'")]
    NonDigitPhone {
        section: &'static str,
        value: String,
    },
    #[error("{section} postal code must not contain separators, got '{value}'")]
    PostalCodeSeparators {
        section: &'static str,
        value: String,
    },
    #[error("{field} contains placeholder value '{value}'")]
    PlaceholderValue { field: String, value: String },
}

pub(super) fn validate(
    model: &DocumentModel,
    config: &FilingConfig,
    today: NaiveDate,
) -> Result<(), PreflightError> {
    let activity = &model.activity;

    check_filing_date(activity.filed_on, today, config.minimum_filing_date)?;
    check_party_counts(&activity.parties)?;
    check_transmitter_identity(&activity.parties)?;

    if activity.value_transfer.details.is_empty() {
        return Err(PreflightError::NoPaymentSources);
    }

    check_sequence_uniqueness(model)?;

    for party in &activity.parties {
        check_party_fields(party)?;
    }
    for detail in &activity.value_transfer.details {
        if let Some(institution) = &detail.institution {
            check_party_fields(institution)?;
        }
    }

    check_text_field("property street", &activity.asset.address.street)?;
    check_text_field("property city", &activity.asset.address.city)?;
    check_postal_code("property", &activity.asset.address.postal_code)?;

    Ok(())
}

fn check_filing_date(
    filed_on: NaiveDate,
    today: NaiveDate,
    minimum: NaiveDate,
) -> Result<(), PreflightError> {
    if filed_on > today {
        return Err(PreflightError::FilingDateInFuture { filed_on });
    }
    if filed_on < minimum {
        return Err(PreflightError::FilingDateBeforeMinimum { filed_on, minimum });
    }
    Ok(())
}

fn check_party_counts(parties: &[PartyElement]) -> Result<(), PreflightError> {
    let count = |code: u16| parties.iter().filter(|p| p.type_code == code).count();

    for (code, section) in [
        (party_type::REPORTING_PERSON, "reporting person"),
        (party_type::TRANSMITTER, "transmitter"),
        (party_type::TRANSMITTER_CONTACT, "transmitter contact"),
    ] {
        let found = count(code);
        if found != 1 {
            return Err(PreflightError::WrongPartyCount {
                section,
                expected: 1,
                found,
            });
        }
    }

    if count(party_type::TRANSFEREE) == 0 {
        return Err(PreflightError::MissingParty {
            section: "transferee",
        });
    }
    if count(party_type::TRANSFEROR) == 0 {
        return Err(PreflightError::MissingParty {
            section: "transferor",
        });
    }

    Ok(())
}

fn check_transmitter_identity(parties: &[PartyElement]) -> Result<(), PreflightError> {
    let transmitter = parties
        .iter()
        .find(|party| party.type_code == party_type::TRANSMITTER)
        .ok_or(PreflightError::MissingParty {
            section: "transmitter",
        })?;

    let mut idents = transmitter.identifications.iter();
    let tin_present = idents
        .next()
        .map(|ident| !ident.number.trim().is_empty())
        .unwrap_or(false);
    if !tin_present {
        return Err(PreflightError::MissingTransmitterTin);
    }

    let control_code_present = idents
        .next()
        .map(|ident| !ident.number.trim().is_empty())
        .unwrap_or(false);
    if !control_code_present {
        return Err(PreflightError::MissingTransmitterControlCode);
    }

    Ok(())
}

fn check_sequence_uniqueness(model: &DocumentModel) -> Result<(), PreflightError> {
    let mut seen = HashSet::new();
    for seq in collect_sequence_numbers(model) {
        if !seen.insert(seq) {
            return Err(PreflightError::DuplicateSequenceNumber { seq });
        }
    }
    Ok(())
}

pub(super) fn collect_sequence_numbers(model: &DocumentModel) -> Vec<u32> {
    let activity = &model.activity;
    let mut seqs = vec![activity.seq, activity.association_seq, activity.asset.seq];

    for party in &activity.parties {
        collect_party_sequences(party, &mut seqs);
    }

    seqs.push(activity.value_transfer.seq);
    for detail in &activity.value_transfer.details {
        seqs.push(detail.seq);
        if let Some(institution) = &detail.institution {
            collect_party_sequences(institution, &mut seqs);
        }
    }

    seqs
}

fn collect_party_sequences(party: &PartyElement, seqs: &mut Vec<u32>) {
    seqs.push(party.seq);
    for ident in &party.identifications {
        seqs.push(ident.seq);
    }
    for associated in &party.associated {
        collect_party_sequences(associated, seqs);
    }
}

fn check_party_fields(party: &PartyElement) -> Result<(), PreflightError> {
    let section = party.section_label();

    match &party.name {
        PartyName::Individual { last, first, .. } => {
            if last.trim().is_empty() || first.trim().is_empty() {
                return Err(PreflightError::MissingName { section });
            }
            check_text_field(&format!("{section} last name"), last)?;
            check_text_field(&format!("{section} first name"), first)?;
        }
        PartyName::Organization { legal, trade } => {
            if legal.trim().is_empty() {
                return Err(PreflightError::MissingName { section });
            }
            check_text_field(&format!("{section} legal name"), legal)?;
            if let Some(trade) = trade {
                check_text_field(&format!("{section} trade name"), trade)?;
            }
        }
    }

    if let Some(address) = &party.address {
        check_text_field(&format!("{section} street"), &address.street)?;
        check_text_field(&format!("{section} city"), &address.city)?;
        check_postal_code(section, &address.postal_code)?;
    }

    if let Some(phone) = &party.phone {
        if !phone.is_empty() && !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(PreflightError::NonDigitPhone {
                section,
                value: phone.clone(),
            });
        }
    }

    if requires_identification(party.type_code) {
        let has_identification = party
            .identifications
            .iter()
            .any(|ident| !ident.number.trim().is_empty());
        if !has_identification {
            return Err(PreflightError::MissingIdentification { section });
        }
    }

    for associated in &party.associated {
        check_party_fields(associated)?;
    }

    Ok(())
}

const fn requires_identification(type_code: u16) -> bool {
    matches!(
        type_code,
        party_type::REPORTING_PERSON
            | party_type::TRANSFEREE
            | party_type::TRANSFEREE_ASSOCIATED_PERSON
            | party_type::TRANSFEROR
    )
}

fn check_text_field(field: &str, value: &str) -> Result<(), PreflightError> {
    let normalized = value.trim().to_ascii_lowercase();
    if PLACEHOLDER_VALUES.contains(&normalized.as_str()) {
        return Err(PreflightError::PlaceholderValue {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_postal_code(section: &'static str, postal_code: &str) -> Result<(), PreflightError> {
    if postal_code.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return Err(PreflightError::PostalCodeSeparators {
            section,
            value: postal_code.to_string(),
        });
    }
    Ok(())
}
