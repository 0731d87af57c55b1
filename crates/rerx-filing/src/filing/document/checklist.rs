use std::collections::{BTreeMap, HashSet};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::filing::codes::{self, party_type};

/// Structural verification of a rendered document, used by the validator
/// tool. This is a checklist pass, not a schema engine: it re-parses the
/// XML and confirms the facts the regulator rejects batches over.
#[derive(Debug, Clone)]
pub struct StructureReport {
    pub form_type_code: Option<String>,
    pub declared_activity_count: Option<u64>,
    pub activities: usize,
    pub party_type_counts: BTreeMap<u16, usize>,
    pub sequence_numbers: usize,
    pub violations: Vec<String>,
}

impl StructureReport {
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("document is not valid XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("document attribute is not valid: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("document is empty")]
    Empty,
}

pub fn verify_structure(xml: &str) -> Result<StructureReport, StructureError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut violations = Vec::new();
    let mut form_type_code = None;
    let mut declared_activity_count = None;
    let mut activities = 0usize;
    let mut assets = 0usize;
    let mut value_transfers = 0usize;
    let mut party_type_counts: BTreeMap<u16, usize> = BTreeMap::new();
    let mut sequence_numbers: Vec<u64> = Vec::new();
    let mut saw_root = false;
    let mut capture_party_type = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) | Event::Empty(start) => {
                let local = start.local_name();
                let name = local.as_ref();

                if !saw_root {
                    saw_root = true;
                    if name != b"EFilingBatchXML" {
                        violations.push(format!(
                            "root element must be EFilingBatchXML, found {}",
                            String::from_utf8_lossy(name)
                        ));
                    }
                    for attr in start.attributes() {
                        let attr = attr?;
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"FormTypeCode" => form_type_code = Some(value),
                            b"ActivityCount" => {
                                declared_activity_count = value.parse::<u64>().ok();
                                if declared_activity_count.is_none() {
                                    violations.push(format!(
                                        "ActivityCount attribute is not numeric: '{value}'"
                                    ));
                                }
                            }
                            _ => {}
                        }
                    }
                    continue;
                }

                match name {
                    b"Activity" => activities += 1,
                    b"Asset" => assets += 1,
                    b"ValueTransfer" => value_transfers += 1,
                    b"ActivityPartyTypeCode" => capture_party_type = true,
                    _ => {}
                }

                for attr in start.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"SeqNum" {
                        let value = attr.unescape_value()?;
                        match value.parse::<u64>() {
                            Ok(seq) => sequence_numbers.push(seq),
                            Err(_) => violations.push(format!(
                                "sequence number is not numeric: '{value}'"
                            )),
                        }
                    }
                }
            }
            Event::Text(text) => {
                if capture_party_type {
                    let value = text.unescape()?;
                    match value.trim().parse::<u16>() {
                        Ok(code) => *party_type_counts.entry(code).or_default() += 1,
                        Err(_) => violations
                            .push(format!("party type code is not numeric: '{value}'")),
                    }
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"ActivityPartyTypeCode" {
                    capture_party_type = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(StructureError::Empty);
    }

    match &form_type_code {
        Some(code) if code == codes::FORM_TYPE_CODE => {}
        Some(code) => violations.push(format!(
            "FormTypeCode must be {}, found '{code}'",
            codes::FORM_TYPE_CODE
        )),
        None => violations.push("FormTypeCode attribute missing from root".to_string()),
    }

    if let Some(declared) = declared_activity_count {
        if declared as usize != activities {
            violations.push(format!(
                "ActivityCount declares {declared} activities, document contains {activities}"
            ));
        }
    } else if form_type_code.is_some() {
        violations.push("ActivityCount attribute missing from root".to_string());
    }

    if activities == 0 {
        violations.push("document contains no Activity element".to_string());
    }

    let mut seen = HashSet::new();
    for seq in &sequence_numbers {
        if !seen.insert(*seq) {
            violations.push(format!("duplicate sequence number {seq}"));
        }
    }

    for (code, section) in [
        (party_type::REPORTING_PERSON, "reporting person"),
        (party_type::TRANSMITTER, "transmitter"),
        (party_type::TRANSMITTER_CONTACT, "transmitter contact"),
    ] {
        let found = party_type_counts.get(&code).copied().unwrap_or(0);
        if found != activities {
            violations.push(format!(
                "each activity requires exactly one {section} party, found {found} across {activities} activities"
            ));
        }
    }
    for (code, section) in [
        (party_type::TRANSFEREE, "transferee"),
        (party_type::TRANSFEROR, "transferor"),
    ] {
        let found = party_type_counts.get(&code).copied().unwrap_or(0);
        if found < activities {
            violations.push(format!(
                "each activity requires at least one {section} party, found {found} across {activities} activities"
            ));
        }
    }

    if assets != activities {
        violations.push(format!(
            "each activity requires exactly one property section, found {assets}"
        ));
    }
    if value_transfers != activities {
        violations.push(format!(
            "each activity requires exactly one value-transfer section, found {value_transfers}"
        ));
    }

    Ok(StructureReport {
        form_type_code,
        declared_activity_count,
        activities,
        party_type_counts,
        sequence_numbers: sequence_numbers.len(),
        violations,
    })
}
