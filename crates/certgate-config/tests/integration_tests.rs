// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
#![allow(clippy::unwrap_used)]

use certgate_config::{Config, ConfigError, ConfigFormat, ConfigLoader, Validator};
use certgate_tls::{ChainError, HashAlgorithm, ValidationPolicy};
use std::fs;
use tempfile::TempDir;

const PIN: &str = "sha1:28b88504f609f685f168b9a49c8f0ec49ead8bc2";

#[tokio::test]
async fn test_load_toml_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certgate.toml");
    fs::write(
        &path,
        format!(
            r#"
[validation]
policy = "ignored-errors-plus-custom"
ignorable_errors = ["untrusted", "invalid-name"]
trusted_pin = "{PIN}"
budget_ms = 300

[transport]
connect_timeout_secs = 5
request_timeout_secs = 15

[observability]
log_level = "debug"
log_format = "compact"
"#
        ),
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(
        config.validation.policy,
        ValidationPolicy::IgnoredErrorsPlusCustom
    );
    let ignorable = config.validation.ignorable_set().unwrap();
    assert!(ignorable.contains(ChainError::Untrusted));
    assert!(ignorable.contains(ChainError::InvalidName));
    let pin = config.validation.trusted_pin.as_ref().unwrap();
    assert_eq!(pin.algorithm(), HashAlgorithm::Sha1);
    assert_eq!(pin.to_string(), PIN);
    assert_eq!(config.validation.budget().as_millis(), 300);
    assert_eq!(config.transport.connect_timeout().as_secs(), 5);
    assert_eq!(config.observability.log_format, "compact");
}

#[tokio::test]
async fn test_load_yaml_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certgate.yml");
    fs::write(
        &path,
        format!(
            "validation:\n  policy: platform-default-plus-custom\n  trusted_pin: \"{PIN}\"\n"
        ),
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(
        config.validation.policy,
        ValidationPolicy::PlatformDefaultPlusCustom
    );
    assert_eq!(config.transport.request_timeout_secs, 30);
}

#[tokio::test]
async fn test_load_json_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certgate.json");
    fs::write(&path, r#"{"observability": {"log_format": "json"}}"#).unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.observability.log_format, "json");
    assert_eq!(config.validation.policy, ValidationPolicy::PlatformDefault);
}

#[tokio::test]
async fn test_missing_file() {
    let temp = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .load_file(temp.path().join("absent.toml"))
        .await;
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[tokio::test]
async fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certgate.ini");
    fs::write(&path, "policy=platform-default").unwrap();

    let result = ConfigLoader::new().load_file(&path).await;
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_custom_policy_without_pin_fails_validation() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certgate.toml");
    fs::write(&path, "[validation]\npolicy = \"ignored-errors-plus-custom\"\n").unwrap();

    let err = ConfigLoader::new().load_file(&path).await.unwrap_err();
    assert!(matches!(err, ConfigError::MissingRequired(_)));
    assert!(err.to_string().contains("validation.trusted_pin"));
}

#[tokio::test]
async fn test_overrides_are_validated_after_applying() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certgate.toml");
    fs::write(&path, "[validation]\npolicy = \"platform-default-plus-custom\"\n").unwrap();
    let loader = ConfigLoader::new();

    // The file alone is invalid; a pin supplied through the environment fixes it
    let mut config = ConfigLoader::without_validation()
        .load_file(&path)
        .await
        .unwrap();
    assert!(config.validate().is_err());
    loader
        .apply_overrides_from(&mut config, |name| {
            (name == certgate_config::ENV_TRUSTED_PIN).then(|| PIN.to_string())
        })
        .unwrap();
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_extra_roots_are_loaded() {
    let temp = TempDir::new().unwrap();
    let root = certgate_tls::CertificateBuilder::new("certgate test root")
        .generate_self_signed()
        .unwrap();
    let cert_path = temp.path().join("root.pem");
    root.save_pem_files(cert_path.clone(), temp.path().join("root.key"))
        .unwrap();

    let mut config = Config::default();
    config.validation.webpki_roots = false;
    config.validation.extra_roots = vec![cert_path];
    config.validate().unwrap();

    let anchors = config.validation.trust_anchors().unwrap();
    assert_eq!(anchors.extra_count(), 1);
}

#[test]
fn test_unreadable_root_names_its_path() {
    let temp = TempDir::new().unwrap();
    let not_pem = temp.path().join("roots.pem");
    fs::write(&not_pem, "no certificates here").unwrap();
    let absent = temp.path().join("absent.pem");

    for path in [not_pem, absent] {
        let mut config = Config::default();
        config.validation.extra_roots = vec![path.clone()];

        match config.validation.trust_anchors() {
            Err(ConfigError::TrustAnchor { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected a trust anchor error, got {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_render_round_trip_keeps_pin() {
    let mut config = Config::default();
    config.validation.policy = ValidationPolicy::PlatformDefaultPlusCustom;
    config.validation.trusted_pin = Some(PIN.parse().unwrap());

    let rendered = config.render(ConfigFormat::Toml).unwrap();
    assert!(rendered.contains(PIN));
    let parsed = ConfigLoader::new()
        .load_from_string(&rendered, ConfigFormat::Toml)
        .unwrap();
    assert_eq!(parsed, config);
}
