use zg_domain::config::{Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3900);
}

#[test]
fn default_instance_cap_is_two() {
    let config = Config::default();
    assert_eq!(config.instances.max_free, 2);
    assert_eq!(config.instances.reconnect_delay_secs, 5);
    assert_eq!(config.instances.country_code, "55");
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3900
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://localhost:*".to_string()));
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn partial_toml_fills_defaults() {
    let toml_str = r#"
[instances]
max_free = 5
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.instances.max_free, 5);
    assert_eq!(config.instances.country_code, "55");
    assert_eq!(config.webhook.timeout_secs, 10);
}

#[test]
fn zero_cap_is_a_validation_error() {
    let toml_str = r#"
[instances]
max_free = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("max_free")));
}

#[test]
fn empty_webhook_url_is_only_a_warning() {
    let toml_str = r#"
[webhook]
url = ""
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues.iter().all(|i| i.severity != ConfigSeverity::Error));
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Warning && i.message.contains("webhook")));
}

#[test]
fn non_numeric_country_code_rejected() {
    let toml_str = r#"
[instances]
country_code = "BR"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("country_code")));
}
