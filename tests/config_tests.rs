use std::io::Write;

use marketbus::error::{ConfigError, Error};
use marketbus::infrastructure::config::settings::Config;
use marketbus::infrastructure::config::LogFormat;
use marketbus::testkit::config::SAMPLE_TOML;
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn loads_sample_config() {
    let file = write_temp_config(SAMPLE_TOML);
    let config = Config::load(file.path()).expect("valid config");

    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Compact);
    assert_eq!(config.engine.order_book_depth, 5);
    assert_eq!(config.exchanges.len(), 2);

    let kraken = &config.exchanges[0];
    assert!(kraken.streaming);
    assert_eq!(kraken.balances["BTC"], dec!(1.5));

    let bitstamp = &config.exchanges[1];
    assert_eq!(bitstamp.rate_limit_calls, Some(8));
    assert_eq!(bitstamp.start_price, dec!(2000));

    let subscriptions = config.startup_subscriptions().expect("parsed");
    assert_eq!(subscriptions.len(), 2);
    assert_eq!(subscriptions[0].to_string(), "kraken:BTC/USD:ticker");
}

#[test]
fn worker_settings_follow_engine_section() {
    let config = Config::parse_toml(SAMPLE_TOML).expect("valid config");
    let settings = config.engine.worker_settings();

    assert_eq!(settings.default_poll_interval.as_millis(), 200);
    assert_eq!(settings.order_book_depth, 5);
    assert_eq!(settings.trade_history_limit, 10);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = Config::load(dir.path().join("absent.toml"));

    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_temp_config("[engine\norder_book_depth = 5");
    let result = Config::load(file.path());

    assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
}

#[test]
fn rejects_bad_subscription() {
    let file = write_temp_config(r#"subscriptions = ["kraken:BTCUSD:ticker"]"#);
    let result = Config::load(file.path());

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "subscriptions",
            ..
        }))
    ));
}

#[test]
fn rejects_duplicate_exchange() {
    let file = write_temp_config(
        r#"
        [[exchanges]]
        name = "kraken"

        [[exchanges]]
        name = "kraken"
        "#,
    );
    let result = Config::load(file.path());

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "exchanges.name",
            ..
        }))
    ));
}

#[test]
fn rejects_zero_poll_interval() {
    let file = write_temp_config("[engine]\ndefault_poll_interval_ms = 0\n");
    let result = Config::load(file.path());

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "default_poll_interval_ms",
            ..
        }))
    ));
}
