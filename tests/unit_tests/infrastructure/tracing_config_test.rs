use anonsocial::infrastructure::observability::TracingConfig;
use anonsocial::presentation::config::LoggingSettings;

#[test]
fn given_default_config_when_created_then_environment_is_set() {
    let config = TracingConfig::default();
    assert!(!config.environment.is_empty());
    assert_eq!(config.default_level, "info");
}

#[test]
fn given_logging_settings_when_building_config_then_copies_level_and_format() {
    let logging = LoggingSettings {
        level: "warn".to_string(),
        enable_json: true,
    };

    let config = TracingConfig::from_settings("prod", &logging);

    assert_eq!(config.environment, "prod");
    assert_eq!(config.default_level, "warn");
    assert!(config.json_format);
}
