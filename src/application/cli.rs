#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use dialoguer::Password;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::sync::watch;
use yansi::Paint;

use crate::application::client::Client;
use crate::application::ui;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatSummary;
use crate::domain::models::Event;
use crate::domain::models::Workflow;
use crate::domain::services::CallbackOutcome;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

fn format_chat(chat: &ChatSummary) -> String {
    let mut res = format!("- (ID: {}) {}", chat.id, chat.title);
    if !chat.last_activity.is_empty() {
        res = format!("{res}, Last activity: {}", chat.last_activity);
    }

    return res;
}

fn format_workflow(workflow: &Workflow) -> String {
    let state = if workflow.is_active { "active" } else { "inactive" };
    let mut res = format!("- (ID: {}) {} [{state}]", workflow.id, workflow.name);
    if let Some(workflow_type) = &workflow.workflow_type {
        res = format!("{res}, Type: {workflow_type}");
    }

    return res;
}

fn format_workflow_detail(workflow: &Workflow) -> String {
    let mut lines = vec![
        format!("{} (ID: {})", workflow.name, workflow.id),
        format!("Status: {}", workflow.status),
        format!("Active: {}", if workflow.is_active { "yes" } else { "no" }),
    ];
    if let Some(description) = &workflow.description {
        lines.push(format!("Description: {description}"));
    }

    lines.push("Nodes:".to_string());
    for node in &workflow.nodes {
        lines.push(format!("- {} ({})", node.id, node.node_type));
    }

    lines.push("Edges:".to_string());
    for edge in &workflow.edges {
        let mut line = format!("- {} -> {}", edge.source_node, edge.target_node);
        if let Some(condition) = &edge.condition {
            line = format!("{line} when {condition}");
        }
        lines.push(line);
    }

    return lines.join("\n");
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn prompt_text(prompt: &str) -> Result<String> {
    let res = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?;

    return Ok(res);
}

fn prompt_password(confirm: bool) -> Result<String> {
    let theme = ColorfulTheme::default();
    let mut password = Password::with_theme(&theme).with_prompt("Password");
    if confirm {
        password = password.with_confirmation("Confirm password", "Passwords do not match");
    }

    return Ok(password.interact()?);
}

fn arg_or_prompt(matches: &ArgMatches, id: &str, prompt: &str) -> Result<String> {
    if let Some(val) = matches.get_one::<String>(id) {
        return Ok(val.to_string());
    }

    return prompt_text(prompt);
}

async fn login(client: &Client, matches: &ArgMatches) -> Result<()> {
    let email = arg_or_prompt(matches, "email", "Email")?;
    let password = match matches.get_one::<String>("password") {
        Some(password) => password.to_string(),
        None => prompt_password(false)?,
    };

    let identity = client.auth.login(&email, &password).await?;
    println!("Logged in as {}", Paint::new(&identity.username).bold());
    return Ok(());
}

async fn signup(client: &Client, matches: &ArgMatches) -> Result<()> {
    let username = arg_or_prompt(matches, "username", "Username")?;
    let email = arg_or_prompt(matches, "email", "Email")?;
    let password = match matches.get_one::<String>("password") {
        Some(password) => password.to_string(),
        None => prompt_password(true)?,
    };

    let identity = client.auth.signup(&username, &email, &password).await?;
    println!("Signed up as {}", Paint::new(&identity.username).bold());
    return Ok(());
}

async fn whoami(client: &Client) -> Result<()> {
    match client.auth.restore().await? {
        Some(identity) => println!("{} <{}>", identity.username, identity.email),
        None => println!("Not logged in. Run `agentdesk login` to sign in."),
    }

    return Ok(());
}

async fn chats(client: &Client, matches: &ArgMatches) -> Result<()> {
    let mut session = client.chat_session();

    match matches.subcommand() {
        Some(("list", _)) => {
            let chats = session.load_chats().await?.unwrap_or_default();
            if chats.is_empty() {
                println!("There are no chats yet. You should start your first one!");
            } else {
                let lines = chats.iter().map(format_chat).collect::<Vec<String>>();
                println!("{}", lines.join("\n"));
            }
        }
        Some(("rename", rename_matches)) => {
            let chat_id = arg_or_prompt(rename_matches, "chat-id", "Chat ID")?;
            let title = arg_or_prompt(rename_matches, "title", "Title")?;
            let summary = session.rename_chat(&chat_id, &title).await?;
            println!("Renamed chat {} to {}", summary.id, summary.title);
        }
        Some(("delete", delete_matches)) => {
            if let Some(chat_id) = delete_matches.get_one::<String>("chat-id") {
                session.delete_chat(chat_id).await?;
                println!("Deleted chat {chat_id}");
            } else if delete_matches.get_flag("all") {
                session.delete_all_chats().await?;
                println!("Deleted all chats");
            } else {
                subcommand_chats_delete().print_long_help()?;
            }
        }
        _ => {
            subcommand_chats().print_long_help()?;
        }
    }

    return Ok(());
}

async fn integrations(client: &Client, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("status", _)) => {
            let res = client.integrations.status().await?;
            for provider in client.providers.providers() {
                let connected = res
                    .status
                    .get(provider.id())
                    .map(|status| return status.connected)
                    .unwrap_or(false);
                let state = if connected {
                    Paint::green("connected")
                } else {
                    Paint::new("not connected").dimmed()
                };
                println!("- {} ({}): {state}", provider.name(), provider.id());
            }
        }
        Some(("connect", connect_matches)) => {
            let provider = required(connect_matches, "provider")?;
            let return_to = connect_matches
                .get_one::<String>("return-to")
                .map(|val| return val.as_str());
            let auth_url = client.providers.connect(provider, return_to).await?;
            println!("Open the following URL to grant access:\n\n{auth_url}\n");
            println!("Then run `agentdesk integrations callback --url <redirect url>`.");
        }
        Some(("disconnect", disconnect_matches)) => {
            let provider = required(disconnect_matches, "provider")?;
            client.providers.disconnect(provider).await?;
        }
        Some(("callback", callback_matches)) => {
            let url = required(callback_matches, "url")?;
            match client.providers.handle_callback(url).await? {
                CallbackOutcome::Connected {
                    provider,
                    return_url,
                } => {
                    tracing::debug!(%provider, %return_url, "OAuth callback handled");
                    println!("{provider} is ready. Continue at {return_url}");
                }
                CallbackOutcome::Ignored => {
                    println!("The callback names a provider this client does not know.");
                }
                CallbackOutcome::NotACallback => {
                    bail!("The URL carries no OAuth code and state");
                }
            }
        }
        _ => {
            subcommand_integrations().print_long_help()?;
        }
    }

    return Ok(());
}

async fn workflows(client: &Client, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("list", list_matches)) => {
            let workflows = match list_matches.get_one::<String>("chat-id") {
                Some(chat_id) => client.workflows.for_chat(chat_id).await?,
                None => client.workflows.list().await?,
            };
            if workflows.is_empty() {
                println!("There are no workflows yet. Ask the agent to build one in a chat.");
            } else {
                let lines = workflows.iter().map(format_workflow).collect::<Vec<String>>();
                println!("{}", lines.join("\n"));
            }
        }
        Some(("show", show_matches)) => {
            let workflow_id = required(show_matches, "workflow-id")?;
            let workflow = client.workflows.get(workflow_id).await?;
            println!("{}", format_workflow_detail(&workflow));
        }
        Some(("activate", activate_matches)) => {
            let workflow_id = required(activate_matches, "workflow-id")?;
            let res = client.workflows.toggle_active(workflow_id).await?;
            let state = if res.is_active { "activated" } else { "deactivated" };
            println!("Workflow {workflow_id} {state}");
        }
        Some(("execute", execute_matches)) => {
            let workflow_id = required(execute_matches, "workflow-id")?;
            let res = client.workflows.execute(workflow_id).await?;
            tracing::debug!(%workflow_id, execution_id = %res.execution_id, "Workflow started");
            println!("Started execution {} ({})", res.execution_id, res.status);
        }
        _ => {
            subcommand_workflows().print_long_help()?;
        }
    }

    return Ok(());
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    match matches.get_one::<String>(id) {
        Some(val) => return Ok(val),
        None => bail!(format!("Missing required argument '{id}'")),
    }
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Agentdesk")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Agentdesk with environment variable RUST_LOG=agentdesk")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_login() -> Command {
    return Command::new("login")
        .about("Log in and store the session. Prompts for missing values.")
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .help("Account email")
                .num_args(1),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .env("AGENTDESK_PASSWORD")
                .hide_env_values(true)
                .help("Account password")
                .num_args(1),
        );
}

fn subcommand_signup() -> Command {
    return Command::new("signup")
        .about("Create an account and store the session. Prompts for missing values.")
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .help("User name")
                .num_args(1),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .help("Account email")
                .num_args(1),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .env("AGENTDESK_PASSWORD")
                .hide_env_values(true)
                .help("Account password")
                .num_args(1),
        );
}

fn arg_chat_id() -> Arg {
    return Arg::new("chat-id")
        .short('i')
        .long("id")
        .help("Chat ID")
        .num_args(1);
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Start a new chat, or continue a saved one.")
        .after_help(ui::help_text())
        .arg(arg_chat_id());
}

fn subcommand_chats_delete() -> Command {
    return Command::new("delete")
        .about("Delete one or all chats.")
        .arg(arg_chat_id())
        .arg(
            clap::Arg::new("all")
                .long("all")
                .help("Delete all chats.")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("delete-args")
                .args(["chat-id", "all"])
                .required(true),
        );
}

fn subcommand_chats() -> Command {
    return Command::new("chats")
        .about("Manage saved chats.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all chats with their ids and titles."))
        .subcommand(
            Command::new("rename")
                .about("Rename a chat.")
                .arg(arg_chat_id())
                .arg(
                    Arg::new("title")
                        .short('t')
                        .long("title")
                        .help("New title")
                        .num_args(1),
                ),
        )
        .subcommand(subcommand_chats_delete());
}

fn arg_provider() -> Arg {
    return Arg::new("provider")
        .short('p')
        .long("provider")
        .help("Provider ID, such as google_gmail")
        .num_args(1)
        .required(true);
}

fn subcommand_integrations() -> Command {
    return Command::new("integrations")
        .about("Connect third party accounts the agent can act on.")
        .arg_required_else_help(true)
        .subcommand(Command::new("status").about("Show which integrations are connected."))
        .subcommand(
            Command::new("connect")
                .about("Print the URL that grants the agent access to a provider.")
                .arg(arg_provider())
                .arg(
                    Arg::new("return-to")
                        .long("return-to")
                        .help("Where to continue once access was granted")
                        .num_args(1),
                ),
        )
        .subcommand(
            Command::new("disconnect")
                .about("Revoke access to a provider.")
                .arg(arg_provider()),
        )
        .subcommand(
            Command::new("callback")
                .about("Finish connecting with the URL the provider redirected to.")
                .arg(
                    Arg::new("url")
                        .short('u')
                        .long("url")
                        .help("Redirect URL containing code and state")
                        .num_args(1)
                        .required(true),
                ),
        );
}

fn arg_workflow_id() -> Arg {
    return Arg::new("workflow-id")
        .short('i')
        .long("id")
        .help("Workflow ID")
        .num_args(1)
        .required(true);
}

fn subcommand_workflows() -> Command {
    return Command::new("workflows")
        .about("Inspect and run the workflows the agent built.")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List all workflows, or the ones built in one chat.")
                .arg(
                    Arg::new("chat-id")
                        .long("chat")
                        .help("Only list workflows of this chat")
                        .num_args(1),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show the nodes and edges of a workflow.")
                .arg(arg_workflow_id()),
        )
        .subcommand(
            Command::new("activate")
                .about("Switch a workflow between active and inactive.")
                .arg(arg_workflow_id()),
        )
        .subcommand(
            Command::new("execute")
                .about("Run a workflow now.")
                .arg(arg_workflow_id()),
        );
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("agentdesk")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_login())
        .subcommand(subcommand_signup())
        .subcommand(Command::new("logout").about("Log out and forget the stored session."))
        .subcommand(Command::new("whoami").about("Show the logged in user."))
        .subcommand(subcommand_chat())
        .subcommand(subcommand_chats())
        .subcommand(subcommand_integrations())
        .subcommand(subcommand_workflows())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("AGENTDESK_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::ApiUrl.to_string())
                .long(ConfigKey::ApiUrl.to_string())
                .env("AGENTDESK_API_URL")
                .num_args(1)
                .help(format!("Base URL of the agent server API. [default: {}]", Config::default(ConfigKey::ApiUrl)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::CredentialsFile.to_string())
                .long(ConfigKey::CredentialsFile.to_string())
                .env("AGENTDESK_CREDENTIALS_FILE")
                .num_args(1)
                .help(format!("File the session is stored in between runs. [default: {}]", Config::default(ConfigKey::CredentialsFile)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("AGENTDESK_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before a request times out. Streamed replies are not limited. [default: {}]", Config::default(ConfigKey::RequestTimeout)))
                .global(true),
        );
}

async fn run(
    matches: &ArgMatches,
    events: mpsc::UnboundedSender<Event>,
    printed: watch::Receiver<u64>,
) -> Result<()> {
    let Some((name, subcmd_matches)) = matches.subcommand() else {
        build().print_long_help()?;
        return Ok(());
    };

    Config::load(vec![matches, subcmd_matches]).await?;
    let client = Client::from_config(events)?;

    match name {
        "login" => login(&client, subcmd_matches).await?,
        "signup" => signup(&client, subcmd_matches).await?,
        "logout" => client.auth.logout().await,
        "whoami" => whoami(&client).await?,
        "chat" => {
            if !client.auth.is_authenticated() {
                bail!("Not logged in. Run `agentdesk login` first.");
            }
            let chat_id = subcmd_matches
                .get_one::<String>("chat-id")
                .map(|val| return val.as_str());
            ui::start_chat(&client, chat_id, printed).await?;
        }
        "chats" => chats(&client, subcmd_matches).await?,
        "integrations" => integrations(&client, subcmd_matches).await?,
        "workflows" => workflows(&client, subcmd_matches).await?,
        _ => {
            build().print_long_help()?;
        }
    }

    return Ok(());
}

pub async fn parse(
    events: mpsc::UnboundedSender<Event>,
    printed: watch::Receiver<u64>,
) -> Result<()> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => match debug_matches.subcommand() {
            Some(("log-path", _)) => {
                println!("{}", crate::log_dir().join("debug.log").to_string_lossy());
            }
            Some(("enum-config", _)) => {
                let res = ConfigKey::VARIANTS.join("\n");
                println!("{}", res);
            }
            _ => {
                subcommand_debug().print_long_help()?;
            }
        },
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        _ => {
            run(&matches, events, printed).await?;
        }
    }

    return Ok(());
}
