use mail_normalize::*;

// --- Address normalizer ---

#[test]
fn test_clean_address_with_display_name() {
    let (canonical, original) = clean_email_address("\"Name\" <user+tag@Example.COM>").unwrap();
    assert_eq!(canonical, "user@example.com");
    assert_eq!(original, "user+tag@Example.COM");
}

#[test]
fn test_clean_bare_address() {
    let (canonical, original) = clean_email_address("Jane@Example.com").unwrap();
    assert_eq!(canonical, "jane@example.com");
    assert_eq!(original, "Jane@Example.com");
}

#[test]
fn test_clean_address_without_at_fails() {
    assert!(matches!(
        clean_email_address("Jane Doe"),
        Err(ParseError::InvalidAddress(_))
    ));
    assert!(matches!(
        clean_email_address("<@example.com>"),
        Err(ParseError::InvalidAddress(_))
    ));
    assert!(matches!(
        clean_email_address("a@b@c"),
        Err(ParseError::InvalidAddress(_))
    ));
}

#[test]
fn test_recipient_parse_keeps_display_name() {
    let r = RecipientAddress::parse("\"Jane Doe\" <jane+work@example.com>", RecipientRole::Cc)
        .unwrap();
    assert_eq!(r.canonical_address, "jane@example.com");
    assert_eq!(r.raw_address, "jane+work@example.com");
    assert_eq!(r.display_name.as_deref(), Some("Jane Doe"));
    assert_eq!(r.role, RecipientRole::Cc);
    assert_eq!(r.to_string(), "Jane Doe <jane+work@example.com>");
}

#[test]
fn test_parse_recipients_drops_invalid_entries() {
    let recipients = parse_recipients(
        "\"Smith, Ann\" <ann@example.com>, bob+x@Example.org",
        RecipientRole::To,
    );
    let addresses: Vec<&str> = recipients
        .iter()
        .map(|r| r.canonical_address.as_str())
        .collect();
    assert_eq!(addresses, vec!["ann@example.com", "bob@example.org"]);
    assert_eq!(recipients[0].display_name.as_deref(), Some("Smith, Ann"));
}

#[test]
fn test_parse_address_list_flattens_groups() {
    let parsed = parse_address_list(
        "c@example.com, team: a@example.com, b@example.com;",
        RecipientRole::Bcc,
    );
    let addresses: Vec<String> = parsed
        .into_iter()
        .map(|r| r.unwrap().canonical_address)
        .collect();
    assert_eq!(
        addresses,
        vec!["c@example.com", "a@example.com", "b@example.com"]
    );
}

// --- Header grouper ---

#[test]
fn test_group_headers_preserves_relative_order() {
    let raw = vec![
        RawHeader::new("Received", "first"),
        RawHeader::new("Subject", "hi"),
        RawHeader::new("received", "second"),
    ];
    let (table, degradations) = group_headers(&raw);

    assert!(degradations.is_empty());
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("RECEIVED").unwrap(), ["first", "second"]);
    assert_eq!(table.first("subject"), Some("hi"));
}

#[test]
fn test_group_headers_decodes_charsets() {
    let raw = vec![
        RawHeader::new("Subject", "=?ISO-8859-1?Q?Caf=E9?="),
        RawHeader::new("X-Legacy", &b"caf\xe9"[..]),
    ];
    let (table, _) = group_headers(&raw);
    assert_eq!(table.first("Subject"), Some("Café"));
    assert_eq!(table.first("X-Legacy"), Some("café"));
}

#[test]
fn test_header_table_iterates_sorted() {
    let table: HeaderTable = [("to", "x"), ("Date", "y"), ("from", "z")]
        .into_iter()
        .collect();
    let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["Date", "From", "To"]);
}

// --- Privacy / signals ---

#[test]
fn test_spam_policy_thresholds() {
    let policy = SpamPolicy::default();
    assert!(policy.level(4.9).abs() < 1e-9);
    assert!((policy.level(5.0) - 50.0).abs() < 1e-9);
    assert!((policy.level(14.9) - 100.0).abs() < 1e-9);
    assert!((policy.level(15.0) - 100.0).abs() < 1e-9);
    assert!((policy.level(1000.0) - 100.0).abs() < 1e-9);
}

#[test]
fn test_privacy_index_scores() {
    let config = PrivacyConfig::default();
    let mut features = PrivacyFeatures::default();
    assert_eq!(config.privacy_index(MessageType::Mail, &features), 10);

    features.content_security.insert(ContentSecurity::Pgp);
    assert_eq!(config.privacy_index(MessageType::Mail, &features), 30);

    features.transport_security = Some(true);
    assert_eq!(config.privacy_index(MessageType::Mail, &features), 40);

    features.transport_security = Some(false);
    assert_eq!(config.privacy_index(MessageType::Mail, &features), 30);
}

#[test]
fn test_privacy_index_without_type_score() {
    let config = PrivacyConfig {
        message_type_scores: std::collections::BTreeMap::new(),
        ..PrivacyConfig::default()
    };
    assert_eq!(
        config.privacy_index(MessageType::Mail, &PrivacyFeatures::default()),
        0
    );
}

#[test]
fn test_analyze_reads_headers_and_parts() {
    let parts = vec![MessagePart {
        content_type: "application/pgp-encrypted".into(),
        filename: None,
        size: 9,
        can_index: false,
        charset: None,
        data: PartData::Binary(b"Version 1".to_vec()),
    }];
    let headers: HeaderTable = [("X-Spam-Score", " 7.5 ")].into_iter().collect();

    let signals = analyze(&parts, &headers, None, &SpamPolicy::default());
    assert!(signals.features.has(ContentSecurity::Pgp));
    assert_eq!(signals.features.transport_security, None);
    assert!((signals.spam_level - 75.0).abs() < 1e-9);
}

#[test]
fn test_content_security_serializes_as_tags() {
    let mut features = PrivacyFeatures::default();
    features.content_security.insert(ContentSecurity::PgpSigned);
    features.content_security.insert(ContentSecurity::Pgp);
    let json = serde_json::to_value(&features).unwrap();
    assert_eq!(json["content_security"], serde_json::json!(["PGP", "PGPSIGNED"]));
    assert_eq!(json["transport_security"], serde_json::Value::Null);
}

#[test]
fn test_content_security_display_matches_tag() {
    for tag in [ContentSecurity::Pgp, ContentSecurity::PgpSigned] {
        let json = serde_json::to_value(tag).unwrap();
        assert_eq!(json, tag.as_str());
        assert_eq!(tag.to_string(), tag.as_str());
    }
}

#[test]
fn test_recipient_roles_cover_address_headers() {
    let names: Vec<&str> = RecipientRole::ALL.iter().map(|r| r.header_name()).collect();
    assert_eq!(names, vec!["From", "To", "Cc", "Bcc"]);
}

// --- Thread lookup ---

#[test]
fn test_lookup_sequence_full() {
    let seq = lookup_sequence(
        Some("abc"),
        &["list1".to_string(), "list2".to_string()],
        Some("a@b.com"),
    );
    assert_eq!(
        seq,
        vec![
            ThreadLookupKey::Parent("abc".into()),
            ThreadLookupKey::List("list1".into()),
            ThreadLookupKey::List("list2".into()),
            ThreadLookupKey::From("a@b.com".into()),
        ]
    );
}

#[test]
fn test_lookup_sequence_may_be_empty() {
    assert!(lookup_sequence(None, &[], None).is_empty());
    assert_eq!(
        lookup_sequence(None, &[], Some("a@b.com")),
        vec![ThreadLookupKey::From("a@b.com".into())]
    );
}

#[test]
fn test_lookup_key_json_shape() {
    let json = serde_json::to_string(&ThreadLookupKey::List("dev.example.org".into())).unwrap();
    assert_eq!(json, r#"{"kind":"list","value":"dev.example.org"}"#);
}

// --- Errors and config ---

#[test]
fn test_validation_error_lists_every_problem() {
    let err = ValidationError {
        problems: vec![
            FieldProblem::missing("from"),
            FieldProblem::invalid("date", "unparsable date \"soon\""),
        ],
    };
    assert_eq!(
        err.to_string(),
        "Message validation failed: from is missing, date is invalid (unparsable date \"soon\")"
    );
    assert!(err.contains("date"));
    assert!(!err.contains("text"));
}

#[test]
fn test_config_overrides_spam_policy() {
    let config = ParserConfig::from_toml_str("[spam]\nlow = 2.0\nfactor = 5.0\n").unwrap();
    assert!((config.spam.level(3.0) - 15.0).abs() < 1e-9);
    assert!((config.spam.high - 15.0).abs() < 1e-9);
    assert_eq!(config.max_depth, 32);
}
