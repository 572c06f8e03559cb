//! End-to-end integration tests

use floor_scan::cache::FetchMode;
use floor_scan::config::Config;
use floor_scan::lines::AmericanOdds;

#[test]
fn test_config_example_exists() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.floor.lookback, 10);
    assert_eq!(config.scheduler.lead_minutes, 180);
    assert_eq!(config.odds.bookmaker, "draftkings");
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [matcher]
        price_floor = -300
        min_sample_size = 6

        [scheduler]
        early_start_grace_minutes = 15
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    let scan = config.scan_config(FetchMode::Fresh);
    assert_eq!(scan.matcher.price_floor, AmericanOdds::new(-300));
    assert_eq!(scan.matcher.min_sample_size, Some(6));
    assert_eq!(
        config.scheduler_config().early_start_grace,
        chrono::Duration::minutes(15)
    );
}

#[test]
fn test_config_load_missing_file() {
    assert!(Config::load("/nonexistent/floor-scan.toml").is_err());
}
