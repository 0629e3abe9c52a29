use anonsocial::presentation::config::{Environment, Settings};

#[test]
fn given_known_names_when_parsing_environment_then_matches_case_insensitively() {
    assert_eq!(
        Environment::try_from("LOCAL".to_string()),
        Ok(Environment::Local)
    );
    assert_eq!(
        Environment::try_from("production".to_string()),
        Ok(Environment::Prod)
    );
    assert!(Environment::try_from("staging".to_string()).is_err());
}

#[test]
fn given_environment_when_naming_settings_file_then_uses_lowercase_name() {
    assert_eq!(Environment::Test.settings_file(), "appsettings.test");
}

#[test]
fn given_no_settings_file_when_loading_then_falls_back_to_defaults() {
    let settings = Settings::load(Environment::Test).expect("defaults should deserialize");

    assert_eq!(settings.messaging.max_write_attempts, 3);
    assert_eq!(settings.messaging.store_timeout().as_millis(), 5000);
    assert_eq!(settings.database.acquire_timeout().as_secs(), 5);
    assert!(!settings.logging.enable_json);
}
