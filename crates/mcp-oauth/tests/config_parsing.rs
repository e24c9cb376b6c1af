use std::time::Duration;

use mcp_oauth::config::loader::load_config;
use mcp_oauth::config::ConfigError;

fn write_config(dir: &tempfile::TempDir, contents: &str) -> String {
    let path = dir.path().join("mcp-oauth.toml");
    std::fs::write(&path, contents).expect("write config");
    path.to_string_lossy().into_owned()
}

#[test]
fn loads_toml_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
issuer = "https://auth.example.com"
resource = "https://mcp.example.com"
base_path = "/auth"

[oauth]
session_lifetime = "5m"
access_token_lifetime = "15m"
refresh_token_lifetime = "7d"
hmac_secret = "an-hmac-secret-that-is-long-enough-to-use"

[registration]
enabled = false

[cookies]
prefix = "mcp"
secure = false
"#,
    );

    let config = load_config(Some(&path)).expect("load config");
    assert_eq!(config.issuer, "https://auth.example.com");
    assert_eq!(config.resource, "https://mcp.example.com");
    assert_eq!(config.base_path, "/auth");
    assert_eq!(config.oauth.session_lifetime, Duration::from_secs(300));
    assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(900));
    assert_eq!(
        config.oauth.refresh_token_lifetime,
        Duration::from_secs(7 * 24 * 3600)
    );
    // Unset values keep their defaults
    assert_eq!(
        config.oauth.authorization_code_lifetime,
        Duration::from_secs(600)
    );
    assert!(!config.registration.enabled);
    assert_eq!(config.cookies.prefix, "mcp");
    assert!(!config.cookies.secure);
    assert_eq!(
        config.endpoint_url("/token"),
        "https://auth.example.com/auth/token"
    );
}

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
[oauth]
hmac_secret = "an-hmac-secret-that-is-long-enough-to-use"

[discovery]
resource_documentation = "https://docs.example.com/file"
"#,
    );

    // Only this test touches the variable
    unsafe {
        std::env::set_var(
            "MCP_OAUTH__DISCOVERY__RESOURCE_DOCUMENTATION",
            "https://docs.example.com/env",
        );
    }
    let config = load_config(Some(&path));
    unsafe {
        std::env::remove_var("MCP_OAUTH__DISCOVERY__RESOURCE_DOCUMENTATION");
    }

    let config = config.expect("load config");
    assert_eq!(
        config.discovery.resource_documentation.as_deref(),
        Some("https://docs.example.com/env")
    );
}

#[test]
fn rejects_short_hmac_secret() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
[oauth]
hmac_secret = "short"
"#,
    );

    let err = load_config(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue(_)));
}

#[test]
fn rejects_malformed_duration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
[oauth]
hmac_secret = "an-hmac-secret-that-is-long-enough-to-use"
access_token_lifetime = "soon"
"#,
    );

    let err = load_config(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}
