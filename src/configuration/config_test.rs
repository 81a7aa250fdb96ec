extern crate tempdir;

use std::fs;

use anyhow::Result;
use tempdir::TempDir;

use super::Config;
use super::ConfigKey;
use crate::application::cli;

#[test]
fn it_serializes_to_valid_toml() -> Result<()> {
    let res = Config::serialize_default(cli::build());
    let doc = res.parse::<toml_edit::Document>()?;

    assert_eq!(
        doc.get("api-url").and_then(|val| return val.as_str()),
        Some("http://localhost:8000/api/v1")
    );
    assert_eq!(
        doc.get("request-timeout").and_then(|val| return val.as_integer()),
        Some(30000)
    );
    assert!(doc.get("credentials-file").is_some());
    assert!(doc.get("config-file").is_none());
    assert!(res.contains("# Base URL of the agent server API."));

    return Ok(());
}

#[tokio::test]
async fn it_layers_defaults_file_and_args() -> Result<()> {
    let tmp_dir = TempDir::new("agentdesk")?;
    let config_path = tmp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        "api-url = \"https://agents.example.com/api/v1\"\nrequest-timeout = 5000\n",
    )?;
    let config_path = config_path.to_string_lossy().to_string();

    let matches = cli::build().try_get_matches_from(vec![
        "agentdesk",
        "whoami",
        "-c",
        &config_path,
    ])?;
    Config::load(vec![&matches]).await?;

    assert_eq!(
        Config::get(ConfigKey::ApiUrl),
        "https://agents.example.com/api/v1"
    );
    assert_eq!(Config::request_timeout()?.as_millis(), 5000);
    assert_eq!(
        Config::get(ConfigKey::CredentialsFile),
        Config::default(ConfigKey::CredentialsFile)
    );

    let matches = cli::build().try_get_matches_from(vec![
        "agentdesk",
        "whoami",
        "-c",
        &config_path,
        "--request-timeout",
        "250",
    ])?;
    Config::load(vec![&matches]).await?;
    assert_eq!(Config::request_timeout()?.as_millis(), 250);

    Config::set(ConfigKey::RequestTimeout, "soon");
    assert!(Config::request_timeout().is_err());

    fs::write(tmp_dir.path().join("bad.toml"), "api-url = [\n")?;
    let bad_path = tmp_dir.path().join("bad.toml").to_string_lossy().to_string();
    let matches =
        cli::build().try_get_matches_from(vec!["agentdesk", "whoami", "-c", &bad_path])?;
    assert!(Config::load(vec![&matches]).await.is_err());

    return Ok(());
}
