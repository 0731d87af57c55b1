use std::fmt::Write as _;

use chrono::NaiveDate;

use super::model::{DocumentModel, PartyElement, PartyName, PaymentDetail};
use crate::filing::codes;
use crate::report::MailingAddress;

/// Render the validated model to the batch XML text. Only called after
/// preflight has passed, so this stage performs no validation of its own.
pub(super) fn to_xml(model: &DocumentModel) -> String {
    let mut xml = String::new();
    let activity = &model.activity;

    let _ = writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        xml,
        r#"<EFilingBatchXML xmlns="{}" ActivityCount="1" FormTypeCode="{}">"#,
        codes::BATCH_NAMESPACE,
        model.form_type_code
    );

    let _ = writeln!(xml, r#"  <Activity SeqNum="{}">"#, activity.seq);
    let _ = writeln!(
        xml,
        "    <FilingDateText>{}</FilingDateText>",
        date_text(activity.filed_on)
    );
    let _ = writeln!(
        xml,
        r#"    <ActivityAssociation SeqNum="{}">"#,
        activity.association_seq
    );
    let _ = writeln!(
        xml,
        "      <InitialReportIndicator>Y</InitialReportIndicator>"
    );
    let _ = writeln!(xml, "    </ActivityAssociation>");

    for party in &activity.parties {
        write_party(&mut xml, party, 4, "Party");
    }

    let _ = writeln!(xml, r#"    <Asset SeqNum="{}">"#, activity.asset.seq);
    let _ = writeln!(
        xml,
        "      <RawStreetAddress1Text>{}</RawStreetAddress1Text>",
        xml_escape(&activity.asset.address.street)
    );
    let _ = writeln!(
        xml,
        "      <RawCityText>{}</RawCityText>",
        xml_escape(&activity.asset.address.city)
    );
    let _ = writeln!(
        xml,
        "      <RawStateCodeText>{}</RawStateCodeText>",
        xml_escape(&activity.asset.address.state)
    );
    let _ = writeln!(
        xml,
        "      <RawZIPCode>{}</RawZIPCode>",
        xml_escape(&activity.asset.address.postal_code)
    );
    if let Some(county) = &activity.asset.address.county {
        let _ = writeln!(
            xml,
            "      <CountyText>{}</CountyText>",
            xml_escape(county)
        );
    }
    let _ = writeln!(xml, "    </Asset>");

    let transfer = &activity.value_transfer;
    let _ = writeln!(xml, r#"    <ValueTransfer SeqNum="{}">"#, transfer.seq);
    let _ = writeln!(
        xml,
        "      <ClosingDateText>{}</ClosingDateText>",
        date_text(transfer.closing_date)
    );
    let _ = writeln!(
        xml,
        "      <TotalConsiderationAmountText>{}</TotalConsiderationAmountText>",
        transfer.total_amount
    );
    for detail in &transfer.details {
        write_payment_detail(&mut xml, detail);
    }
    let _ = writeln!(xml, "    </ValueTransfer>");

    let _ = writeln!(xml, "  </Activity>");
    let _ = writeln!(xml, "</EFilingBatchXML>");

    xml
}

fn write_payment_detail(xml: &mut String, detail: &PaymentDetail) {
    let _ = writeln!(xml, r#"      <PaymentDetail SeqNum="{}">"#, detail.seq);
    let _ = writeln!(
        xml,
        "        <PaymentAmountText>{}</PaymentAmountText>",
        detail.amount
    );
    let _ = writeln!(
        xml,
        "        <PaymentMethodCode>{}</PaymentMethodCode>",
        detail.method.label()
    );
    if detail.non_account_funds {
        let _ = writeln!(
            xml,
            "        <NonAccountFundsIndicator>Y</NonAccountFundsIndicator>"
        );
    }
    if let Some(institution) = &detail.institution {
        write_party(xml, institution, 8, "Party");
    }
    let _ = writeln!(xml, "      </PaymentDetail>");
}

fn write_party(xml: &mut String, party: &PartyElement, indent: usize, element: &str) {
    let pad = " ".repeat(indent);
    let inner = " ".repeat(indent + 2);

    let _ = writeln!(xml, r#"{pad}<{element} SeqNum="{}">"#, party.seq);
    let _ = writeln!(
        xml,
        "{inner}<ActivityPartyTypeCode>{}</ActivityPartyTypeCode>",
        party.type_code
    );

    match &party.name {
        PartyName::Individual {
            last,
            first,
            middle,
        } => {
            let _ = writeln!(xml, "{inner}<PartyName>");
            let _ = writeln!(
                xml,
                "{inner}  <RawEntityIndividualLastName>{}</RawEntityIndividualLastName>",
                xml_escape(last)
            );
            let _ = writeln!(
                xml,
                "{inner}  <RawIndividualFirstName>{}</RawIndividualFirstName>",
                xml_escape(first)
            );
            if let Some(middle) = middle {
                let _ = writeln!(
                    xml,
                    "{inner}  <RawIndividualMiddleName>{}</RawIndividualMiddleName>",
                    xml_escape(middle)
                );
            }
            let _ = writeln!(xml, "{inner}</PartyName>");
        }
        PartyName::Organization { legal, trade } => {
            let _ = writeln!(xml, "{inner}<PartyName>");
            let _ = writeln!(
                xml,
                "{inner}  <RawPartyFullName>{}</RawPartyFullName>",
                xml_escape(legal)
            );
            if let Some(trade) = trade {
                let _ = writeln!(
                    xml,
                    "{inner}  <RawTradeNameText>{}</RawTradeNameText>",
                    xml_escape(trade)
                );
            }
            let _ = writeln!(xml, "{inner}</PartyName>");
        }
    }

    if let Some(birth_date) = party.birth_date {
        let _ = writeln!(
            xml,
            "{inner}<IndividualBirthDateText>{}</IndividualBirthDateText>",
            date_text(birth_date)
        );
    }

    if let Some(address) = &party.address {
        write_address(xml, address, indent + 2);
    }

    if let Some(phone) = &party.phone {
        let _ = writeln!(xml, "{inner}<PhoneNumber>");
        let _ = writeln!(
            xml,
            "{inner}  <PhoneNumberText>{}</PhoneNumberText>",
            xml_escape(phone)
        );
        let _ = writeln!(xml, "{inner}</PhoneNumber>");
    }

    for ident in &party.identifications {
        let _ = writeln!(
            xml,
            r#"{inner}<PartyIdentification SeqNum="{}">"#,
            ident.seq
        );
        let _ = writeln!(
            xml,
            "{inner}  <PartyIdentificationTypeCode>{}</PartyIdentificationTypeCode>",
            ident.kind.wire_code()
        );
        let _ = writeln!(
            xml,
            "{inner}  <PartyIdentificationNumberText>{}</PartyIdentificationNumberText>",
            xml_escape(&ident.number)
        );
        if let Some(country) = &ident.issuing_country {
            let _ = writeln!(
                xml,
                "{inner}  <OtherIssuerCountryText>{}</OtherIssuerCountryText>",
                xml_escape(country)
            );
        }
        let _ = writeln!(xml, "{inner}</PartyIdentification>");
    }

    if let Some(trust) = &party.trust_detail {
        let _ = writeln!(xml, "{inner}<TrustDetail>");
        let _ = writeln!(
            xml,
            "{inner}  <TrustInstrumentExecutionDateText>{}</TrustInstrumentExecutionDateText>",
            date_text(trust.execution_date)
        );
        let _ = writeln!(
            xml,
            "{inner}  <RevocableTrustIndicator>{}</RevocableTrustIndicator>",
            indicator(trust.revocable)
        );
        let _ = writeln!(xml, "{inner}</TrustDetail>");
    }

    if party.ownership_percent.is_some() || party.control_person {
        let _ = writeln!(xml, "{inner}<OwnershipDetail>");
        if let Some(percent) = party.ownership_percent {
            let _ = writeln!(
                xml,
                "{inner}  <OwnershipPercentageText>{percent}</OwnershipPercentageText>"
            );
        }
        let _ = writeln!(
            xml,
            "{inner}  <SubstantialControlIndicator>{}</SubstantialControlIndicator>",
            indicator(party.control_person)
        );
        let _ = writeln!(xml, "{inner}</OwnershipDetail>");
    }

    if let Some(capacity) = party.capacity {
        let _ = writeln!(xml, "{inner}<CapacityText>{capacity}</CapacityText>");
    }

    for associated in &party.associated {
        write_party(xml, associated, indent + 2, "AssociatedParty");
    }

    let _ = writeln!(xml, "{pad}</{element}>");
}

fn write_address(xml: &mut String, address: &MailingAddress, indent: usize) {
    let pad = " ".repeat(indent);
    let _ = writeln!(xml, "{pad}<Address>");
    let _ = writeln!(
        xml,
        "{pad}  <RawStreetAddress1Text>{}</RawStreetAddress1Text>",
        xml_escape(&address.street)
    );
    let _ = writeln!(
        xml,
        "{pad}  <RawCityText>{}</RawCityText>",
        xml_escape(&address.city)
    );
    let _ = writeln!(
        xml,
        "{pad}  <RawStateCodeText>{}</RawStateCodeText>",
        xml_escape(&address.state)
    );
    let _ = writeln!(
        xml,
        "{pad}  <RawZIPCode>{}</RawZIPCode>",
        xml_escape(&address.postal_code)
    );
    let _ = writeln!(
        xml,
        "{pad}  <RawCountryCodeText>{}</RawCountryCodeText>",
        xml_escape(&address.country)
    );
    let _ = writeln!(xml, "{pad}</Address>");
}

fn date_text(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

const fn indicator(value: bool) -> &'static str {
    if value {
        "Y"
    } else {
        "N"
    }
}

pub(crate) fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
