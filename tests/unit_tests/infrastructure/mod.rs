mod content_sanitizer_test;
mod settings_test;
mod tracing_config_test;
