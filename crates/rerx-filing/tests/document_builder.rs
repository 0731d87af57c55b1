use chrono::NaiveDate;
use rerx_filing::config::{
    FilingConfig, FilingEnvironment, TelemetryConfig, TransmitterConfig, TransportConfig,
    TransportMode,
};
use rerx_filing::filing::codes;
use rerx_filing::filing::{verify_structure, DocumentBuilder, PreflightError};
use rerx_filing::report::{
    AssociatedPerson, AssociatedPersonCapacity, EntityIdentification, EntityParty,
    FinancialInstitution, ForeignDocumentKind, ForeignIdentification, IndividualParty,
    MailingAddress, PartyRole, PartySubject, PaymentMethod, PaymentSource, PersonIdentification,
    PropertyAddress, ReportId, ReportParty, ReportingPerson, TransactionReport, TrustParty,
};

fn address(street: &str, city: &str) -> MailingAddress {
    MailingAddress {
        street: street.to_string(),
        city: city.to_string(),
        state: "IA".to_string(),
        postal_code: "50309".to_string(),
        country: "US".to_string(),
    }
}

fn sandbox_config() -> FilingConfig {
    FilingConfig {
        environment: FilingEnvironment::Sandbox,
        transmitter: TransmitterConfig {
            tax_id: "912223333".to_string(),
            transmitter_control_code: "TCCIGNORED".to_string(),
            legal_name: "Harbor Title & Escrow LLC".to_string(),
            contact_name: "Compliance Desk".to_string(),
            phone: "5155550100".to_string(),
            address: address("400 Walnut St", "Des Moines"),
        },
        transport: TransportConfig {
            mode: TransportMode::LocalDir,
            host: String::new(),
            port: 22,
            username: String::new(),
            password: None,
            private_key_path: None,
            submission_dir: "/sdtm-test/submissions".to_string(),
            response_dir: "/sdtm-test/responses".to_string(),
            timeout_secs: 5,
            local_root: std::path::PathBuf::from("./unused"),
        },
        telemetry: TelemetryConfig {
            log_level: "info".to_string(),
        },
        minimum_filing_date: NaiveDate::from_ymd_opt(2025, 12, 1).expect("valid date"),
    }
}

fn production_config() -> FilingConfig {
    let mut config = sandbox_config();
    config.environment = FilingEnvironment::Production;
    config.transmitter.transmitter_control_code = "TCC00042".to_string();
    config
}

fn individual_buyer() -> ReportParty {
    ReportParty {
        role: PartyRole::Transferee,
        subject: PartySubject::Individual(IndividualParty {
            first_name: "Maya".to_string(),
            last_name: "Okafor".to_string(),
            middle_name: None,
            birth_date: NaiveDate::from_ymd_opt(1984, 6, 15).expect("valid date"),
            address: address("12 Prairie Ln", "Ankeny"),
            phone: Some("5155550123".to_string()),
            identification: PersonIdentification::Ssn {
                number: "453001122".to_string(),
            },
        }),
    }
}

fn individual_seller() -> ReportParty {
    ReportParty {
        role: PartyRole::Transferor,
        subject: PartySubject::Individual(IndividualParty {
            first_name: "Dale".to_string(),
            last_name: "Rasmussen".to_string(),
            middle_name: Some("J".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1961, 2, 3).expect("valid date"),
            address: address("88 Court Ave", "Des Moines"),
            phone: None,
            identification: PersonIdentification::Ssn {
                number: "480119933".to_string(),
            },
        }),
    }
}

fn wire_payment(amount: u64) -> PaymentSource {
    PaymentSource {
        amount,
        method: PaymentMethod::WireTransfer,
        not_from_institution_account: false,
        institution: Some(FinancialInstitution {
            legal_name: "Great Plains Bank".to_string(),
            tax_id: Some("420001111".to_string()),
            address: address("100 Locust St", "Des Moines"),
        }),
    }
}

fn base_report(id: &str, parties: Vec<ReportParty>, payments: Vec<PaymentSource>) -> TransactionReport {
    TransactionReport {
        report_id: ReportId(id.to_string()),
        property: PropertyAddress {
            street: "901 Grand Ave".to_string(),
            city: "West Des Moines".to_string(),
            state: "IA".to_string(),
            postal_code: "50265".to_string(),
            county: Some("Polk".to_string()),
        },
        closing_date: NaiveDate::from_ymd_opt(2026, 1, 20).expect("valid date"),
        purchase_price: 450_000,
        reporting_person: ReportingPerson {
            legal_name: "Harbor Title & Escrow LLC".to_string(),
            tax_id: "912223333".to_string(),
            address: address("400 Walnut St", "Des Moines"),
            phone: Some("5155550100".to_string()),
        },
        parties,
        payment_sources: payments,
        receipt_identifier: None,
    }
}

fn filing_dates() -> (NaiveDate, NaiveDate) {
    let today = NaiveDate::from_ymd_opt(2026, 2, 10).expect("valid date");
    (today, today)
}

#[test]
fn individual_buyer_and_seller_build_a_compliant_document() {
    let builder = DocumentBuilder::new(sandbox_config());
    let report = base_report(
        "rpt-1",
        vec![individual_buyer(), individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let built = builder
        .build(&report, 1, filed_on, today)
        .expect("document builds");

    assert_eq!(built.summary.transferees, 1);
    assert_eq!(built.summary.transferors, 1);
    assert_eq!(built.summary.associated_persons, 0);
    assert_eq!(built.summary.payment_details, 1);
    assert_eq!(built.summary.activity_seq, 1);

    let structure = verify_structure(&built.xml).expect("structure parses");
    assert!(
        structure.is_compliant(),
        "violations: {:?}",
        structure.violations
    );
    assert_eq!(structure.activities, 1);
    assert_eq!(
        structure
            .party_type_counts
            .get(&codes::party_type::REPORTING_PERSON),
        Some(&1)
    );
    assert_eq!(
        structure
            .party_type_counts
            .get(&codes::party_type::TRANSMITTER),
        Some(&1)
    );
    assert_eq!(
        structure
            .party_type_counts
            .get(&codes::party_type::TRANSMITTER_CONTACT),
        Some(&1)
    );
}

#[test]
fn entity_buyer_attaches_one_associated_person_per_beneficial_owner() {
    let builder = DocumentBuilder::new(sandbox_config());
    let owners = vec![
        AssociatedPerson {
            first_name: "Priya".to_string(),
            last_name: "Natarajan".to_string(),
            birth_date: Some(NaiveDate::from_ymd_opt(1975, 9, 1).expect("valid date")),
            address: address("5 Harbor Way", "Clive"),
            identification: PersonIdentification::Ssn {
                number: "411778899".to_string(),
            },
            capacity: AssociatedPersonCapacity::BeneficialOwner,
            ownership_percent: Some(60),
            control_person: true,
        },
        AssociatedPerson {
            first_name: "Tom".to_string(),
            last_name: "Whitaker".to_string(),
            birth_date: Some(NaiveDate::from_ymd_opt(1980, 3, 22).expect("valid date")),
            address: address("19 Elm Ct", "Urbandale"),
            identification: PersonIdentification::Ssn {
                number: "433221100".to_string(),
            },
            capacity: AssociatedPersonCapacity::BeneficialOwner,
            ownership_percent: Some(40),
            control_person: false,
        },
    ];

    let entity_buyer = ReportParty {
        role: PartyRole::Transferee,
        subject: PartySubject::Entity(EntityParty {
            legal_name: "Bluestem Holdings LLC".to_string(),
            trade_name: None,
            address: address("700 2nd Ave", "Des Moines"),
            identification: EntityIdentification::Ein {
                number: "861234567".to_string(),
            },
            associated_persons: owners,
        }),
    };

    let report = base_report(
        "rpt-2",
        vec![entity_buyer, individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let built = builder
        .build(&report, 1, filed_on, today)
        .expect("document builds");

    assert_eq!(built.summary.transferees, 1);
    assert_eq!(built.summary.transferors, 1);
    assert_eq!(built.summary.associated_persons, 2);
    assert!(built.xml.contains("<OwnershipPercentageText>60</OwnershipPercentageText>"));
    assert!(built.xml.contains("<OwnershipPercentageText>40</OwnershipPercentageText>"));

    let structure = verify_structure(&built.xml).expect("structure parses");
    assert!(structure.is_compliant());
    assert_eq!(
        structure
            .party_type_counts
            .get(&codes::party_type::TRANSFEREE_ASSOCIATED_PERSON),
        Some(&2)
    );
}

#[test]
fn foreign_buyer_with_passport_passes_preflight_on_the_foreign_path() {
    let builder = DocumentBuilder::new(sandbox_config());
    let foreign_buyer = ReportParty {
        role: PartyRole::Transferee,
        subject: PartySubject::Individual(IndividualParty {
            first_name: "Henrik".to_string(),
            last_name: "Johansson".to_string(),
            middle_name: None,
            birth_date: NaiveDate::from_ymd_opt(1979, 11, 30).expect("valid date"),
            address: MailingAddress {
                street: "Storgatan 4".to_string(),
                city: "Malmo".to_string(),
                state: "".to_string(),
                postal_code: "21142".to_string(),
                country: "SE".to_string(),
            },
            phone: None,
            identification: PersonIdentification::Foreign(ForeignIdentification {
                number: "PA8812345".to_string(),
                issuing_country: "SE".to_string(),
                document: ForeignDocumentKind::Passport,
            }),
        }),
    };

    let report = base_report(
        "rpt-3",
        vec![foreign_buyer, individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let built = builder
        .build(&report, 1, filed_on, today)
        .expect("foreign identification alone is sufficient");

    assert!(built
        .xml
        .contains("<PartyIdentificationNumberText>PA8812345</PartyIdentificationNumberText>"));
    assert!(built
        .xml
        .contains("<OtherIssuerCountryText>SE</OtherIssuerCountryText>"));
}

#[test]
fn trust_buyer_renders_trust_detail_and_trustee() {
    let builder = DocumentBuilder::new(sandbox_config());
    let trust_buyer = ReportParty {
        role: PartyRole::Transferee,
        subject: PartySubject::Trust(TrustParty {
            trust_name: "Okafor Family Revocable Trust".to_string(),
            execution_date: NaiveDate::from_ymd_opt(2019, 5, 14).expect("valid date"),
            revocable: true,
            tax_id: Some("876600123".to_string()),
            address: address("12 Prairie Ln", "Ankeny"),
            trustees: vec![AssociatedPerson {
                first_name: "Maya".to_string(),
                last_name: "Okafor".to_string(),
                birth_date: Some(NaiveDate::from_ymd_opt(1984, 6, 15).expect("valid date")),
                address: address("12 Prairie Ln", "Ankeny"),
                identification: PersonIdentification::Ssn {
                    number: "453001122".to_string(),
                },
                capacity: AssociatedPersonCapacity::Trustee,
                ownership_percent: None,
                control_person: true,
            }],
        }),
    };

    let report = base_report(
        "rpt-4",
        vec![trust_buyer, individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let built = builder
        .build(&report, 1, filed_on, today)
        .expect("document builds");
    assert!(built.xml.contains("<RevocableTrustIndicator>Y</RevocableTrustIndicator>"));
    assert!(built.xml.contains("<CapacityText>trustee</CapacityText>"));
    assert_eq!(built.summary.associated_persons, 1);
}

#[test]
fn trust_without_tin_fails_preflight() {
    let builder = DocumentBuilder::new(sandbox_config());
    let trust_buyer = ReportParty {
        role: PartyRole::Transferee,
        subject: PartySubject::Trust(TrustParty {
            trust_name: "Okafor Family Revocable Trust".to_string(),
            execution_date: NaiveDate::from_ymd_opt(2019, 5, 14).expect("valid date"),
            revocable: true,
            tax_id: None,
            address: address("12 Prairie Ln", "Ankeny"),
            trustees: Vec::new(),
        }),
    };

    let report = base_report(
        "rpt-5",
        vec![trust_buyer, individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("missing TIN must fail");
    assert!(matches!(
        err,
        PreflightError::MissingIdentification {
            section: "transferee"
        }
    ));
}

#[test]
fn filing_date_before_minimum_fails_preflight() {
    let builder = DocumentBuilder::new(sandbox_config());
    let report = base_report(
        "rpt-6",
        vec![individual_buyer(), individual_seller()],
        vec![wire_payment(450_000)],
    );

    let filed_on = NaiveDate::from_ymd_opt(2025, 11, 30).expect("valid date");
    let today = NaiveDate::from_ymd_opt(2026, 2, 10).expect("valid date");
    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("date below minimum must fail");
    assert!(matches!(err, PreflightError::FilingDateBeforeMinimum { .. }));
}

#[test]
fn filing_date_in_the_future_fails_preflight() {
    let builder = DocumentBuilder::new(sandbox_config());
    let report = base_report(
        "rpt-7",
        vec![individual_buyer(), individual_seller()],
        vec![wire_payment(450_000)],
    );

    let today = NaiveDate::from_ymd_opt(2026, 2, 10).expect("valid date");
    let filed_on = today + chrono::Duration::days(1);
    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("future date must fail");
    assert!(matches!(err, PreflightError::FilingDateInFuture { .. }));
}

#[test]
fn missing_transmitter_identity_fails_preflight_in_production() {
    let mut config = production_config();
    config.transmitter.tax_id = String::new();
    let builder = DocumentBuilder::new(config);
    let report = base_report(
        "rpt-8",
        vec![individual_buyer(), individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("missing TIN must fail");
    assert!(matches!(err, PreflightError::MissingTransmitterTin));

    let mut config = production_config();
    config.transmitter.transmitter_control_code = String::new();
    let builder = DocumentBuilder::new(config);
    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("missing control code must fail");
    assert!(matches!(err, PreflightError::MissingTransmitterControlCode));
}

#[test]
fn sandbox_forces_the_test_control_code_onto_the_wire() {
    let builder = DocumentBuilder::new(sandbox_config());
    let report = base_report(
        "rpt-9",
        vec![individual_buyer(), individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let built = builder
        .build(&report, 1, filed_on, today)
        .expect("document builds");
    assert!(built.xml.contains(codes::SANDBOX_TRANSMITTER_CONTROL_CODE));
    assert!(!built.xml.contains("TCCIGNORED"));
}

#[test]
fn placeholder_values_are_rejected() {
    let builder = DocumentBuilder::new(sandbox_config());
    let mut buyer = individual_buyer();
    if let PartySubject::Individual(individual) = &mut buyer.subject {
        individual.address.city = "N/A".to_string();
    }
    let report = base_report(
        "rpt-10",
        vec![buyer, individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("placeholder must fail");
    match err {
        PreflightError::PlaceholderValue { field, value } => {
            assert!(field.contains("transferee"));
            assert_eq!(value, "N/A");
        }
        other => panic!("expected PlaceholderValue, got {other:?}"),
    }
}

#[test]
fn formatted_phone_numbers_are_rejected() {
    let builder = DocumentBuilder::new(sandbox_config());
    let mut buyer = individual_buyer();
    if let PartySubject::Individual(individual) = &mut buyer.subject {
        individual.phone = Some("515-555-0123".to_string());
    }
    let report = base_report(
        "rpt-11",
        vec![buyer, individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("formatted phone must fail");
    assert!(matches!(err, PreflightError::NonDigitPhone { .. }));
}

#[test]
fn separated_postal_codes_are_rejected() {
    let builder = DocumentBuilder::new(sandbox_config());
    let mut buyer = individual_buyer();
    if let PartySubject::Individual(individual) = &mut buyer.subject {
        individual.address.postal_code = "50309-1234".to_string();
    }
    let report = base_report(
        "rpt-12",
        vec![buyer, individual_seller()],
        vec![wire_payment(450_000)],
    );
    let (filed_on, today) = filing_dates();

    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("separated postal code must fail");
    assert!(matches!(err, PreflightError::PostalCodeSeparators { .. }));
}

#[test]
fn report_without_sellers_fails_preflight() {
    let builder = DocumentBuilder::new(sandbox_config());
    let report = base_report("rpt-13", vec![individual_buyer()], vec![wire_payment(450_000)]);
    let (filed_on, today) = filing_dates();

    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("missing transferor must fail");
    assert!(matches!(
        err,
        PreflightError::MissingParty {
            section: "transferor"
        }
    ));
}

#[test]
fn report_without_payments_fails_preflight() {
    let builder = DocumentBuilder::new(sandbox_config());
    let report = base_report(
        "rpt-14",
        vec![individual_buyer(), individual_seller()],
        Vec::new(),
    );
    let (filed_on, today) = filing_dates();

    let err = builder
        .build(&report, 1, filed_on, today)
        .expect_err("missing payments must fail");
    assert!(matches!(err, PreflightError::NoPaymentSources));
}

#[test]
fn non_account_payment_suppresses_the_institution_party() {
    let builder = DocumentBuilder::new(sandbox_config());
    let cash_payment = PaymentSource {
        amount: 450_000,
        method: PaymentMethod::Currency,
        not_from_institution_account: true,
        institution: None,
    };
    let report = base_report(
        "rpt-15",
        vec![individual_buyer(), individual_seller()],
        vec![cash_payment],
    );
    let (filed_on, today) = filing_dates();

    let built = builder
        .build(&report, 1, filed_on, today)
        .expect("document builds");
    assert!(built
        .xml
        .contains("<NonAccountFundsIndicator>Y</NonAccountFundsIndicator>"));
    assert_eq!(built.summary.financial_institutions, 0);

    let structure = verify_structure(&built.xml).expect("structure parses");
    assert_eq!(
        structure
            .party_type_counts
            .get(&codes::party_type::FINANCIAL_INSTITUTION),
        None
    );
}
