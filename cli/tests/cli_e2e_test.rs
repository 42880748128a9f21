use assert_cmd::{Command, cargo_bin_cmd};
use predicates::prelude::*;

fn actionsync() -> Command {
    let mut cmd = cargo_bin_cmd!("actionsync");
    for key in [
        "NOTION_API_KEY",
        "NOTION_DATABASE_ID",
        "ANTHROPIC_API_KEY",
        "ACTIONSYNC_NOTES_DIR",
        "ACTIONSYNC_LOOKBACK_DAYS",
        "ACTIONSYNC_CONFIG"
    ] {
        cmd.env_remove(key);
    }
    cmd
}

mod help_and_version {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        actionsync()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("sync"))
            .stdout(predicate::str::contains("setup"))
            .stdout(predicate::str::contains("fingerprint"));
    }

    #[test]
    fn test_version_flag() {
        actionsync()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("actionsync"));
    }

    #[test]
    fn test_no_args_shows_usage() {
        actionsync()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage:"));
    }
}

mod fingerprint_subcommand {
    use super::*;

    #[test]
    fn test_prints_stable_fingerprint() {
        actionsync()
            .args(["fingerprint", "Send proposal to client"])
            .assert()
            .success()
            .stdout("72a0080a\n");
    }

    #[test]
    fn test_normalizes_case_and_joins_words() {
        actionsync()
            .args(["fingerprint", "SEND", "proposal", "to", "Client"])
            .assert()
            .success()
            .stdout("72a0080a\n");
    }

    #[test]
    fn test_json_output() {
        actionsync()
            .args(["fingerprint", "--json", "Book flight for offsite"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"fingerprint\": \"7a109068\""))
            .stdout(predicate::str::contains(
                "\"normalized\": \"book flight for offsite\""
            ));
    }

    #[test]
    fn test_requires_description() {
        actionsync().arg("fingerprint").assert().failure();
    }
}

mod sync_subcommand {
    use super::*;

    #[test]
    fn test_missing_credentials_fail_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[notes]\nlookback_days = 1\n").unwrap();

        actionsync()
            .args(["sync", "--config"])
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("NOTION_API_KEY"));
    }

    #[test]
    fn test_unreadable_config_fails() {
        let dir = tempfile::tempdir().unwrap();

        actionsync()
            .args(["sync", "--config"])
            .arg(dir.path().join("missing.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("loading configuration"));
    }

    #[test]
    fn test_rejects_negative_lookback() {
        actionsync()
            .args(["sync", "--lookback-days", "-1"])
            .assert()
            .failure();
    }
}

mod sync_report {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_items_keep_summary_on_stdout() {
        let notion = MockServer::start().await;
        let anthropic = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/databases/db1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&notion)
            .await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("validation_error"))
            .mount(&notion)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{
                    "type": "text",
                    "text": "[{\"description\": \"Book flight for offsite\"}]"
                }]
            })))
            .mount(&anthropic)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes");
        std::fs::create_dir(&notes).unwrap();
        let today = chrono::Local::now().date_naive();
        std::fs::write(
            notes.join(format!("{} Offsite planning.md", today.format("%Y-%m-%d"))),
            "Book flights for the offsite."
        )
        .unwrap();

        let config = dir.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[notes]\ndirectory = {:?}\n\n[store]\napi_key = \"secret_test\"\n\
                 database_id = \"db1\"\nbase_url = {:?}\n\n[extraction]\napi_key = \
                 \"sk-test\"\nbase_url = {:?}\n\n[retry]\nmax_retries = 0\n",
                notes.display().to_string(),
                notion.uri(),
                anthropic.uri()
            )
        )
        .unwrap();

        actionsync()
            .env("NO_COLOR", "1")
            .args(["sync", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Pushed 0 new item(s). Skipped 0 duplicate(s). 1 item(s) failed."
            ))
            .stderr(predicate::str::contains("warning:"))
            .stderr(predicate::str::contains("item(s) failed").not());
    }
}

mod setup_subcommand {
    use super::*;

    #[test]
    fn test_requires_database_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[store]\napi_key = \"secret_x\"\n").unwrap();

        actionsync()
            .args(["setup", "--config"])
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("NOTION_DATABASE_ID"));
    }
}
