use chrono::NaiveDate;
use serde::Serialize;

use super::model::{
    Activity, AssetSection, DocumentModel, Identification, IdentificationKind, PartyElement,
    PartyName, PaymentDetail, SequenceCounter, TrustDetail, ValueTransfer,
};
use super::preflight::{self, PreflightError};
use super::render;
use crate::config::FilingConfig;
use crate::filing::codes::{self, party_type};
use crate::report::{
    AssociatedPerson, AssociatedPersonCapacity, EntityIdentification, EntityParty,
    ForeignDocumentKind, ForeignIdentification, IndividualParty, PartySubject, PaymentSource,
    PersonIdentification, ReportParty, ReportingPerson, TransactionReport, TrustParty,
};

/// A document that has passed preflight, together with the facts the
/// lifecycle manager needs to reconcile responses later.
#[derive(Debug, Clone)]
pub struct BuiltDocument {
    pub xml: String,
    pub summary: DocumentSummary,
}

/// Shape of the built document, reported by the dry-run tool and logged at
/// submission time.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Sequence number the regulator will use to address this activity in
    /// its acknowledgement.
    pub activity_seq: u32,
    pub filed_on: NaiveDate,
    pub transferees: usize,
    pub transferors: usize,
    pub associated_persons: usize,
    pub financial_institutions: usize,
    pub payment_details: usize,
    pub total_amount: u64,
    pub sequence_count: usize,
}

/// Maps a transaction report into the batch document. Every returned
/// document has passed preflight; callers never see unvalidated XML.
#[derive(Debug)]
pub struct DocumentBuilder {
    config: FilingConfig,
}

impl DocumentBuilder {
    pub fn new(config: FilingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilingConfig {
        &self.config
    }

    pub fn build(
        &self,
        report: &TransactionReport,
        sequence_start: u32,
        filed_on: NaiveDate,
        today: NaiveDate,
    ) -> Result<BuiltDocument, PreflightError> {
        let mut seq = SequenceCounter::starting_at(sequence_start.max(1));

        let activity_seq = seq.take();
        let association_seq = seq.take();

        let mut parties = Vec::new();
        parties.push(map_reporting_person(&report.reporting_person, &mut seq));
        for party in report.transferees() {
            parties.push(map_transfer_party(party, &mut seq));
        }
        for party in report.transferors() {
            parties.push(map_transfer_party(party, &mut seq));
        }
        parties.push(self.map_transmitter(&mut seq));
        parties.push(self.map_transmitter_contact(&mut seq));

        let asset = AssetSection {
            seq: seq.take(),
            address: report.property.clone(),
        };

        let value_transfer = map_value_transfer(
            report.closing_date,
            report.purchase_price,
            &report.payment_sources,
            &mut seq,
        );

        let model = DocumentModel {
            form_type_code: codes::FORM_TYPE_CODE,
            activity: Activity {
                seq: activity_seq,
                filed_on,
                association_seq,
                parties,
                asset,
                value_transfer,
            },
        };

        preflight::validate(&model, &self.config, today)?;

        let summary = summarize(&model);
        let xml = render::to_xml(&model);

        Ok(BuiltDocument { xml, summary })
    }

    fn map_transmitter(&self, seq: &mut SequenceCounter) -> PartyElement {
        let transmitter = &self.config.transmitter;
        let party_seq = seq.take();
        let mut identifications = Vec::new();
        identifications.push(Identification {
            seq: seq.take(),
            kind: IdentificationKind::Ein,
            number: transmitter.tax_id.clone(),
            issuing_country: None,
        });
        identifications.push(Identification {
            seq: seq.take(),
            kind: IdentificationKind::OtherGovernmentIssued,
            number: self.config.effective_control_code().to_string(),
            issuing_country: None,
        });

        PartyElement {
            seq: party_seq,
            type_code: party_type::TRANSMITTER,
            name: PartyName::Organization {
                legal: transmitter.legal_name.clone(),
                trade: None,
            },
            birth_date: None,
            address: Some(transmitter.address.clone()),
            phone: Some(transmitter.phone.clone()),
            identifications,
            trust_detail: None,
            ownership_percent: None,
            control_person: false,
            capacity: None,
            associated: Vec::new(),
        }
    }

    fn map_transmitter_contact(&self, seq: &mut SequenceCounter) -> PartyElement {
        let transmitter = &self.config.transmitter;
        PartyElement {
            seq: seq.take(),
            type_code: party_type::TRANSMITTER_CONTACT,
            name: PartyName::Organization {
                legal: transmitter.contact_name.clone(),
                trade: None,
            },
            birth_date: None,
            address: Some(transmitter.address.clone()),
            phone: Some(transmitter.phone.clone()),
            identifications: Vec::new(),
            trust_detail: None,
            ownership_percent: None,
            control_person: false,
            capacity: None,
            associated: Vec::new(),
        }
    }
}

fn map_reporting_person(person: &ReportingPerson, seq: &mut SequenceCounter) -> PartyElement {
    let party_seq = seq.take();
    let identification = Identification {
        seq: seq.take(),
        kind: IdentificationKind::Ein,
        number: person.tax_id.clone(),
        issuing_country: None,
    };

    PartyElement {
        seq: party_seq,
        type_code: party_type::REPORTING_PERSON,
        name: PartyName::Organization {
            legal: person.legal_name.clone(),
            trade: None,
        },
        birth_date: None,
        address: Some(person.address.clone()),
        phone: person.phone.clone(),
        identifications: vec![identification],
        trust_detail: None,
        ownership_percent: None,
        control_person: false,
        capacity: None,
        associated: Vec::new(),
    }
}

fn map_transfer_party(party: &ReportParty, seq: &mut SequenceCounter) -> PartyElement {
    use crate::report::PartyRole;

    let type_code = match party.role {
        PartyRole::Transferee => party_type::TRANSFEREE,
        PartyRole::Transferor => party_type::TRANSFEROR,
    };

    match &party.subject {
        PartySubject::Individual(individual) => map_individual(individual, type_code, seq),
        PartySubject::Entity(entity) => map_entity(entity, type_code, seq),
        PartySubject::Trust(trust) => map_trust(trust, type_code, seq),
    }
}

fn map_individual(
    individual: &IndividualParty,
    type_code: u16,
    seq: &mut SequenceCounter,
) -> PartyElement {
    let party_seq = seq.take();
    let identification = map_person_identification(&individual.identification, seq);

    PartyElement {
        seq: party_seq,
        type_code,
        name: PartyName::Individual {
            last: individual.last_name.clone(),
            first: individual.first_name.clone(),
            middle: individual.middle_name.clone(),
        },
        birth_date: Some(individual.birth_date),
        address: Some(individual.address.clone()),
        phone: individual.phone.clone(),
        identifications: vec![identification],
        trust_detail: None,
        ownership_percent: None,
        control_person: false,
        capacity: None,
        associated: Vec::new(),
    }
}

fn map_entity(entity: &EntityParty, type_code: u16, seq: &mut SequenceCounter) -> PartyElement {
    let party_seq = seq.take();
    let identification = match &entity.identification {
        EntityIdentification::Ein { number } => Identification {
            seq: seq.take(),
            kind: IdentificationKind::Ein,
            number: number.clone(),
            issuing_country: None,
        },
        EntityIdentification::Foreign(foreign) => map_foreign_identification(foreign, seq),
    };

    let associated = entity
        .associated_persons
        .iter()
        .map(|person| map_associated_person(person, seq))
        .collect();

    PartyElement {
        seq: party_seq,
        type_code,
        name: PartyName::Organization {
            legal: entity.legal_name.clone(),
            trade: entity.trade_name.clone(),
        },
        birth_date: None,
        address: Some(entity.address.clone()),
        phone: None,
        identifications: vec![identification],
        trust_detail: None,
        ownership_percent: None,
        control_person: false,
        capacity: None,
        associated,
    }
}

fn map_trust(trust: &TrustParty, type_code: u16, seq: &mut SequenceCounter) -> PartyElement {
    let party_seq = seq.take();
    let identifications = trust
        .tax_id
        .iter()
        .map(|tin| Identification {
            seq: seq.take(),
            kind: IdentificationKind::TrustTin,
            number: tin.clone(),
            issuing_country: None,
        })
        .collect();

    let associated = trust
        .trustees
        .iter()
        .map(|person| map_associated_person(person, seq))
        .collect();

    PartyElement {
        seq: party_seq,
        type_code,
        name: PartyName::Organization {
            legal: trust.trust_name.clone(),
            trade: None,
        },
        birth_date: None,
        address: Some(trust.address.clone()),
        phone: None,
        identifications,
        trust_detail: Some(TrustDetail {
            execution_date: trust.execution_date,
            revocable: trust.revocable,
        }),
        ownership_percent: None,
        control_person: false,
        capacity: None,
        associated,
    }
}

fn map_associated_person(person: &AssociatedPerson, seq: &mut SequenceCounter) -> PartyElement {
    let party_seq = seq.take();
    let identification = map_person_identification(&person.identification, seq);

    PartyElement {
        seq: party_seq,
        type_code: party_type::TRANSFEREE_ASSOCIATED_PERSON,
        name: PartyName::Individual {
            last: person.last_name.clone(),
            first: person.first_name.clone(),
            middle: None,
        },
        birth_date: person.birth_date,
        address: Some(person.address.clone()),
        phone: None,
        identifications: vec![identification],
        trust_detail: None,
        ownership_percent: person.ownership_percent,
        control_person: person.control_person,
        capacity: Some(capacity_label(person.capacity)),
        associated: Vec::new(),
    }
}

fn map_person_identification(
    identification: &PersonIdentification,
    seq: &mut SequenceCounter,
) -> Identification {
    match identification {
        PersonIdentification::Ssn { number } => Identification {
            seq: seq.take(),
            kind: IdentificationKind::Ssn,
            number: number.clone(),
            issuing_country: None,
        },
        PersonIdentification::Foreign(foreign) => map_foreign_identification(foreign, seq),
    }
}

fn map_foreign_identification(
    foreign: &ForeignIdentification,
    seq: &mut SequenceCounter,
) -> Identification {
    let kind = match foreign.document {
        ForeignDocumentKind::Passport => IdentificationKind::Passport,
        ForeignDocumentKind::ForeignTaxId => IdentificationKind::ForeignTaxId,
        ForeignDocumentKind::OtherGovernmentIssued => IdentificationKind::OtherGovernmentIssued,
    };

    Identification {
        seq: seq.take(),
        kind,
        number: foreign.number.clone(),
        issuing_country: Some(foreign.issuing_country.clone()),
    }
}

fn map_value_transfer(
    closing_date: NaiveDate,
    total_amount: u64,
    sources: &[PaymentSource],
    seq: &mut SequenceCounter,
) -> ValueTransfer {
    let transfer_seq = seq.take();
    let details = sources
        .iter()
        .map(|source| {
            let detail_seq = seq.take();
            let institution = if source.not_from_institution_account {
                None
            } else {
                source
                    .institution
                    .as_ref()
                    .map(|institution| map_institution(institution, seq))
            };

            PaymentDetail {
                seq: detail_seq,
                amount: source.amount,
                method: source.method,
                non_account_funds: source.not_from_institution_account,
                institution,
            }
        })
        .collect();

    ValueTransfer {
        seq: transfer_seq,
        closing_date,
        total_amount,
        details,
    }
}

// The external schema reads as if an institution's country were always
// foreign, while the institutions seen here are domestic. Emit the actual
// country until the regulator's documentation settles the intent.
fn map_institution(
    institution: &crate::report::FinancialInstitution,
    seq: &mut SequenceCounter,
) -> PartyElement {
    let party_seq = seq.take();
    let identifications = institution
        .tax_id
        .iter()
        .map(|tin| Identification {
            seq: seq.take(),
            kind: IdentificationKind::Ein,
            number: tin.clone(),
            issuing_country: None,
        })
        .collect();

    PartyElement {
        seq: party_seq,
        type_code: party_type::FINANCIAL_INSTITUTION,
        name: PartyName::Organization {
            legal: institution.legal_name.clone(),
            trade: None,
        },
        birth_date: None,
        address: Some(institution.address.clone()),
        phone: None,
        identifications,
        trust_detail: None,
        ownership_percent: None,
        control_person: false,
        capacity: None,
        associated: Vec::new(),
    }
}

const fn capacity_label(capacity: AssociatedPersonCapacity) -> &'static str {
    match capacity {
        AssociatedPersonCapacity::BeneficialOwner => "beneficial_owner",
        AssociatedPersonCapacity::SigningIndividual => "signing_individual",
        AssociatedPersonCapacity::Trustee => "trustee",
    }
}

fn summarize(model: &DocumentModel) -> DocumentSummary {
    let activity = &model.activity;
    let mut transferees = 0;
    let mut transferors = 0;
    let mut associated_persons = 0;

    for party in &activity.parties {
        match party.type_code {
            code if code == party_type::TRANSFEREE => transferees += 1,
            code if code == party_type::TRANSFEROR => transferors += 1,
            _ => {}
        }
        associated_persons += party.associated.len();
    }

    let financial_institutions = activity
        .value_transfer
        .details
        .iter()
        .filter(|detail| detail.institution.is_some())
        .count();

    DocumentSummary {
        activity_seq: activity.seq,
        filed_on: activity.filed_on,
        transferees,
        transferors,
        associated_persons,
        financial_institutions,
        payment_details: activity.value_transfer.details.len(),
        total_amount: activity.value_transfer.total_amount,
        sequence_count: preflight::collect_sequence_numbers(model).len(),
    }
}
