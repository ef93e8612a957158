use super::*;
use crate::model::DEFAULT_STACK_NAME;
use std::io::Write;

#[test]
fn test_parse_full_settings() {
    let kdl = r#"
        stack "NetworkStack" {
            region "ap-northeast-1"
            account "123456789012"
            key-pair "my-key"
        }
    "#;

    let settings = parse_settings_string(kdl).unwrap();
    assert_eq!(settings.stack_name, Some("NetworkStack".to_string()));
    assert_eq!(settings.region, Some("ap-northeast-1".to_string()));
    assert_eq!(settings.account, Some("123456789012".to_string()));
    assert_eq!(settings.key_pair, Some("my-key".to_string()));

    let context = settings.context();
    assert_eq!(context.stack_name, "NetworkStack");
    assert_eq!(context.region.as_deref(), Some("ap-northeast-1"));
}

#[test]
fn test_parse_empty_document_uses_defaults() {
    let settings = parse_settings_string("").unwrap();
    assert_eq!(settings, StackSettings::default());
    assert_eq!(settings.context().stack_name, DEFAULT_STACK_NAME);
}

#[test]
fn test_parse_snake_case_key_pair() {
    let kdl = r#"
        stack {
            key_pair "snake-key"
        }
    "#;

    let settings = parse_settings_string(kdl).unwrap();
    assert_eq!(settings.stack_name, None);
    assert_eq!(settings.key_pair, Some("snake-key".to_string()));
    assert_eq!(settings.context().stack_name, DEFAULT_STACK_NAME);
}

#[test]
fn test_parse_unquoted_account() {
    let kdl = r#"
        stack "s" {
            account 12345678901
        }
    "#;

    let settings = parse_settings_string(kdl).unwrap();
    // leading zero restored
    assert_eq!(settings.account, Some("012345678901".to_string()));
}

#[test]
fn test_unknown_children_kept_in_extra() {
    let kdl = r#"
        stack "s" {
            owner "platform-team"
        }
        comment "ignored"
    "#;

    let settings = parse_settings_string(kdl).unwrap();
    assert_eq!(
        settings.extra.get("owner"),
        Some(&"platform-team".to_string())
    );
}

#[test]
fn test_duplicate_stack_rejected() {
    let kdl = r#"
        stack "a"
        stack "b"
    "#;

    let result = parse_settings_string(kdl);
    assert!(matches!(result, Err(SettingsError::InvalidConfig(_))));
}

#[test]
fn test_empty_stack_name_rejected() {
    let result = parse_settings_string(r#"stack "  ""#);
    assert!(matches!(result, Err(SettingsError::InvalidConfig(_))));
}

#[test]
fn test_stack_name_with_path_rejected() {
    for kdl in [r#"stack "../escape""#, r#"stack "out/nested""#, r#"stack "a\\b""#] {
        let result = parse_settings_string(kdl);
        assert!(
            matches!(result, Err(SettingsError::InvalidConfig(_))),
            "{} should be rejected",
            kdl
        );
    }
}

#[test]
fn test_out_of_range_account_rejected() {
    for account in ["-1", "1000000000000"] {
        let kdl = format!("stack \"s\" {{\n    account {}\n}}", account);
        let result = parse_settings_string(&kdl);
        assert!(
            matches!(result, Err(SettingsError::InvalidConfig(_))),
            "account {} should be rejected",
            account
        );
    }

    let settings = parse_settings_string("stack \"s\" {\n    account 999999999999\n}").unwrap();
    assert_eq!(settings.account, Some("999999999999".to_string()));
}

#[test]
fn test_invalid_kdl() {
    let result = parse_settings_string("stack \"unterminated {");
    assert!(matches!(result, Err(SettingsError::KdlParse(_))));
}

#[test]
fn test_parse_settings_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"stack "FromFile" {{ region "us-east-1" }}"#).unwrap();

    let settings = parse_settings_file(file.path()).unwrap();
    assert_eq!(settings.stack_name, Some("FromFile".to_string()));
    assert_eq!(settings.region, Some("us-east-1".to_string()));
}

#[test]
fn test_parse_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_settings_file(dir.path().join("stack.kdl"));
    assert!(matches!(result, Err(SettingsError::Io { .. })));
}
