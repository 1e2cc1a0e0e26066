use crate::cli::{Cli, Command, ConfigAction, storages};

use ncalayer_core::{ClientConfig, Storages};

use std::path::{Path, PathBuf};

use clap::Parser;

/// **VALUE**: Verifies flags override the config file field by field.
///
/// **BUG THIS CATCHES**: Would catch an absent flag resetting a configured value to
/// its default.
#[test]
fn given_url_and_locale_flags_when_applied_then_only_those_fields_change() {
    let cli = Cli::try_parse_from([
        "ncasign",
        "--ncalayer-url",
        "ws://127.0.0.1:14000",
        "--locale",
        "kk",
        "info",
    ])
    .expect("arguments should parse");
    let file_config = ClientConfig {
        kmd_http_api_url: "https://127.0.0.1:25000/".to_string(),
        ..ClientConfig::default()
    };

    let config = cli.apply_overrides(file_config);

    assert_eq!(config.ncalayer_url, "ws://127.0.0.1:14000");
    assert_eq!(config.default_locale, "kk");
    assert_eq!(config.kmd_http_api_url, "https://127.0.0.1:25000/");
    assert!(config.allow_kmd_http_api);
}

#[test]
fn given_no_kmd_http_api_flag_when_applied_then_http_api_disallowed() {
    let cli = Cli::try_parse_from(["ncasign", "cms", "a.pdf", "--no-kmd-http-api"])
        .expect("arguments should parse");

    let config = cli.apply_overrides(ClientConfig::default());

    assert!(!config.allow_kmd_http_api);
}

/// **VALUE**: Verifies `cms` keeps file order and repeatable storages.
#[test]
fn given_cms_arguments_when_parsed_then_files_in_order() {
    let cli = Cli::try_parse_from([
        "ncasign",
        "cms",
        "b.pdf",
        "a.pdf",
        "--attached",
        "--storage",
        "PKCS12",
        "--storage",
        "AKKaztokenStore",
    ])
    .expect("arguments should parse");

    match cli.command {
        Command::Cms {
            files,
            attached,
            storages: names,
            out_dir,
        } => {
            let expected: Vec<PathBuf> = vec!["b.pdf".into(), "a.pdf".into()];
            assert_eq!(files, expected);
            assert!(attached);
            assert_eq!(
                storages(&names),
                Storages::Only(vec!["PKCS12".to_string(), "AKKaztokenStore".to_string()])
            );
            assert_eq!(out_dir, None);
        }
        other => panic!("expected cms command, got {other:?}"),
    }
}

#[test]
fn given_no_files_when_cms_parsed_then_rejected() {
    assert!(Cli::try_parse_from(["ncasign", "cms"]).is_err());
}

#[test]
fn given_no_storage_flags_when_storages_then_all() {
    assert_eq!(storages(&[]), Storages::All);
}

#[test]
fn given_config_save_when_parsed_then_save_action() {
    let cli = Cli::try_parse_from(["ncasign", "config", "save", "--config-dir", "/tmp/ncasign"])
        .expect("arguments should parse");

    assert!(matches!(
        cli.command,
        Command::Config {
            action: ConfigAction::Save
        }
    ));
    assert_eq!(
        cli.config_dir.as_deref(),
        Some(Path::new("/tmp/ncasign"))
    );
}
