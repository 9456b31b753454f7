//! Server configuration from the process environment

#![cfg(feature = "ssr")]

use serial_test::serial;
use std::io::Write;

use pairchat::backend::ServerConfig;
use pairchat::shared::{ConfigError, ParticipantId};

const VARS: &[&str] = &[
    "SERVER_PORT",
    "DATABASE_URL",
    "CHAT_PASSWORD",
    "PAIRCHAT_CONFIG",
    "USER1_NAME",
    "USER2_NAME",
    "ADMIN_EMAIL",
    "FILE_SIZE_LIMIT_BYTES",
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USERNAME",
    "SMTP_PASSWORD",
    "SMTP_FROM",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_with_config_file() {
    clear_env();
    let path = std::env::temp_dir().join(format!("pairchat-{}.toml", uuid::Uuid::new_v4()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
admin = "user2"
file_size_limit_bytes = 2048

[participant_names]
user1 = "Ana"
user2 = "Ben"
"#
    )
    .unwrap();

    std::env::set_var("PAIRCHAT_CONFIG", &path);
    std::env::set_var("USER1_NAME", "Alice");
    std::env::set_var("ADMIN_EMAIL", "ben@example.com");
    std::env::set_var("CHAT_PASSWORD", "hunter2");

    let config = ServerConfig::from_env().unwrap();
    clear_env();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.chat.admin, ParticipantId::B);
    assert_eq!(config.chat.display_name(ParticipantId::A), "Alice");
    assert_eq!(config.chat.display_name(ParticipantId::B), "Ben");
    assert_eq!(config.chat.contact(ParticipantId::B), "ben@example.com");
    assert_eq!(config.chat.file_size_limit_bytes, 2048);
    assert_eq!(config.chat_password.as_deref(), Some("hunter2"));
}

#[test]
#[serial]
fn test_from_env_rejects_bad_values() {
    clear_env();
    std::env::set_var("FILE_SIZE_LIMIT_BYTES", "0");
    let result = ServerConfig::from_env();
    clear_env();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

    std::env::set_var("PAIRCHAT_CONFIG", "/nonexistent/pairchat.toml");
    let result = ServerConfig::from_env();
    clear_env();
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
