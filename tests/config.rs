use finboard_cli::config::{
    Config, DEFAULT_API_URL, config_path, load_config, resolve_api_url, save_config,
};
use std::fs;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[test]
fn save_and_load_config_work_and_permissions_are_locked_down() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("conf").join("config.json");
    let cfg = Config {
        api_url: Some("http://localhost:9000".to_string()),
        page_size: Some(25),
    };
    save_config(&p, &cfg).unwrap();
    assert_eq!(load_config(&p).unwrap(), cfg);

    #[cfg(unix)]
    {
        let mode = fs::metadata(&p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}

#[test]
fn missing_or_empty_config_is_default() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("config.json");
    assert_eq!(load_config(&p).unwrap(), Config::default());
    fs::write(&p, "\n").unwrap();
    assert_eq!(load_config(&p).unwrap(), Config::default());
}

#[test]
fn malformed_config_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("config.json");
    fs::write(&p, "{not json").unwrap();
    let err = load_config(&p).unwrap_err();
    assert!(err.to_string().contains("invalid config"));
}

#[test]
fn api_url_resolution_order() {
    let cfg = Config {
        api_url: Some("http://from-config".to_string()),
        page_size: None,
    };
    assert_eq!(resolve_api_url(Some("http://flag"), &cfg), "http://flag");
    assert_eq!(resolve_api_url(Some("  "), &cfg), "http://from-config");
    assert_eq!(resolve_api_url(None, &Config::default()), DEFAULT_API_URL);
}

#[test]
fn config_path_has_expected_suffix() {
    let p = config_path();
    let s = p.to_string_lossy();
    assert!(
        s.ends_with("/.config/finboard-cli/config.json")
            || s.ends_with("\\.config\\finboard-cli\\config.json")
    );
}
