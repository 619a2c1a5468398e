use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

mod adapters;
mod application;
mod domain;
mod ports;

use adapters::{
    api::BoardClient, config::FileConfigStore, metrics::AtomicMetrics, notify::LogNotifier,
    scheduler::TokioScheduler, store::MemoryStore,
};
use application::{AppError, NewTaskRequest, NewTaskWatcher, TaskService, TaskVerifier};
use domain::{ChatId, TaskId, User, UserId, UserRole};
use ports::{AppConfig, ConfigStore};

fn cli() -> Command {
    Command::new("board-relay")
        .version("0.1.0")
        .about("Relays tasks between chat users and a remote task board")
        .long_about("Creates tasks on a remote board, checks that they landed intact, and announces new tasks.\n\nEvery created task is re-checked after a delay and re-created once if it went missing.")
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("Board API token (can also be set via BOARD_TOKEN env var)")
                .global(true),
        )
        .arg(
            Arg::new("board")
                .long("board")
                .value_name("BOARD_ID")
                .help("Board ID (can also be set via BOARD_ID env var)")
                .value_parser(value_parser!(i64))
                .global(true),
        )
        .arg(
            Arg::new("config_dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Keep config and token in DIR instead of the user config directory and keyring")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("tasks")
                .about("Task operations")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list").about("List tasks as JSON").arg(
                        Arg::new("limit")
                            .long("limit")
                            .value_name("N")
                            .help("Maximum number of tasks to fetch")
                            .value_parser(value_parser!(usize)),
                    ),
                )
                .subcommand(
                    Command::new("create")
                        .about("Create a task and schedule its verification")
                        .arg(
                            Arg::new("title")
                                .long("title")
                                .value_name("TITLE")
                                .required(true),
                        )
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .value_name("TEXT")
                                .default_value(""),
                        )
                        .arg(
                            Arg::new("image")
                                .long("image")
                                .value_name("PATH")
                                .help("Image to attach to the task")
                                .value_parser(value_parser!(PathBuf)),
                        )
                        .arg(
                            Arg::new("verify")
                                .long("verify")
                                .help("Wait for the verification check before exiting")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("complete").about("Mark a task as done").arg(
                        Arg::new("task_id")
                            .help("Task ID to complete")
                            .required(true)
                            .value_parser(value_parser!(i64))
                            .index(1),
                    ),
                )
                .subcommand(
                    Command::new("comment")
                        .about("Add a comment to a task")
                        .arg(
                            Arg::new("task_id")
                                .help("Task ID to comment on")
                                .required(true)
                                .value_parser(value_parser!(i64))
                                .index(1),
                        )
                        .arg(
                            Arg::new("text")
                                .help("Comment text")
                                .required(true)
                                .index(2),
                        ),
                ),
        )
        .subcommand(Command::new("watch").about("Announce new board tasks until interrupted"))
}

/// The identity tasks from the command line are submitted as.
fn operator(config: &AppConfig) -> User {
    User {
        id: UserId(config.operator_id),
        username: "operator".to_string(),
        first_name: "Board".to_string(),
        last_name: "Operator".to_string(),
        role: UserRole::Admin,
        approved: true,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Initialize logging to file
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("board-relay.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let matches = cli().get_matches();

    // Load configuration, then environment, then flags
    let config_store = match matches.get_one::<PathBuf>("config_dir") {
        Some(dir) => FileConfigStore::at(dir),
        None => FileConfigStore::new()?,
    };
    let mut config = config_store.load_config().await?;
    config.apply_overrides(|key| std::env::var(key).ok());

    if let Some(token) = matches.get_one::<String>("token") {
        config.api_token = Some(token.clone());
    }
    if let Some(board) = matches.get_one::<i64>("board") {
        config.board_id = Some(*board);
    }

    let api_token = config.api_token.clone().ok_or_else(|| {
        eprintln!("❌ No board API token found!");
        eprintln!();
        eprintln!("Run: export BOARD_TOKEN=your_token_here");
        eprintln!("Or:  board-relay --token your_token_here");
        AppError::AuthenticationRequired
    })?;
    let board_id = config.board_id.ok_or_else(|| {
        eprintln!("❌ No board selected. Pass --board or set BOARD_ID.");
        AppError::BoardNotConfigured
    })?;

    config_store.save_config(&config).await?;

    let metrics = Arc::new(AtomicMetrics::new());
    let mut client = BoardClient::new(api_token, board_id.to_string(), config.http_timeout)?
        .with_base_url(config.base_url.clone())
        .with_metrics(metrics.clone());
    client.set_retry_policy(
        config.retry_count,
        config.retry_wait,
        config.max_retry_elapsed,
    );
    let repository = Arc::new(client);

    let operator = operator(&config);
    let store = Arc::new(MemoryStore::new());
    store.add_user(operator.clone());
    store.subscribe(ChatId::from(operator.id));

    let notifier = Arc::new(LogNotifier);
    let scheduler = Arc::new(TokioScheduler::new());
    let verifier = TaskVerifier::new(
        repository.clone(),
        store.clone(),
        notifier.clone(),
        scheduler.clone(),
    )
    .with_delay(config.verification_delay);
    let service = TaskService::new(
        repository.clone(),
        store.clone(),
        store.clone(),
        verifier,
        board_id,
    );

    match matches.subcommand() {
        Some(("tasks", tasks_matches)) => {
            run_tasks(tasks_matches, &service, &scheduler, &operator, &config).await?;
        }
        Some(("watch", _)) => {
            let watcher = NewTaskWatcher::new(repository, store, notifier, config.tasks_limit)
                .with_interval(config.check_interval);

            println!("👀 Watching board {board_id}, press Ctrl-C to stop");
            watcher
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                })
                .await;
        }
        _ => {
            cli().print_help()?;
        }
    }

    let aborted = scheduler.shutdown();
    if aborted > 0 {
        eprintln!("⚠️  {aborted} pending verification checks were cancelled");
    }
    tracing::info!("API metrics: {:?}", metrics.snapshot());

    Ok(())
}

async fn run_tasks(
    matches: &ArgMatches,
    service: &TaskService,
    scheduler: &TokioScheduler,
    operator: &User,
    config: &AppConfig,
) -> Result<()> {
    match matches.subcommand() {
        Some(("list", list_matches)) => {
            let limit = list_matches
                .get_one::<usize>("limit")
                .copied()
                .unwrap_or(config.tasks_limit);
            match service.list_tasks(limit).await {
                Ok(tasks) => println!("{}", serde_json::to_string_pretty(&tasks)?),
                Err(e) => {
                    eprintln!("❌ Failed to list tasks: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(("create", create_matches)) => {
            let image = match create_matches.get_one::<PathBuf>("image") {
                Some(path) => Some(tokio::fs::read(path).await?),
                None => None,
            };
            let request = NewTaskRequest {
                title: create_matches
                    .get_one::<String>("title")
                    .cloned()
                    .unwrap_or_default(),
                description: create_matches
                    .get_one::<String>("description")
                    .cloned()
                    .unwrap_or_default(),
                image,
            };

            match service.submit(operator.id, request).await {
                Ok(task) => {
                    println!("{}", serde_json::to_string_pretty(&task)?);
                    if create_matches.get_flag("verify") {
                        eprintln!(
                            "⏳ Verifying task {} in {:?}...",
                            task.id, config.verification_delay
                        );
                        scheduler.drain().await;
                    }
                }
                Err(e) => {
                    eprintln!("❌ Failed to create task: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(("complete", complete_matches)) => {
            let id = TaskId(complete_matches.get_one::<i64>("task_id").copied().unwrap_or_default());
            match service.complete_task(id, config.tasks_limit).await {
                Ok(task) => println!("{}", serde_json::to_string_pretty(&task)?),
                Err(e) => {
                    eprintln!("❌ Failed to complete task: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(("comment", comment_matches)) => {
            let id = TaskId(comment_matches.get_one::<i64>("task_id").copied().unwrap_or_default());
            let text = comment_matches
                .get_one::<String>("text")
                .map(String::as_str)
                .unwrap_or_default();
            match service.add_comment(id, operator, text).await {
                Ok(comment) => println!("{}", serde_json::to_string_pretty(&comment)?),
                Err(e) => {
                    eprintln!("❌ Failed to add comment: {e}");
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("❌ Unknown tasks subcommand");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn test_create_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "board-relay",
                "--board",
                "7",
                "--config-dir",
                "/tmp/relay",
                "tasks",
                "create",
                "--title",
                "Broken window",
                "--verify",
            ])
            .unwrap();

        assert_eq!(matches.get_one::<i64>("board"), Some(&7));
        assert_eq!(
            matches.get_one::<PathBuf>("config_dir"),
            Some(&PathBuf::from("/tmp/relay"))
        );
        let (_, tasks) = matches.subcommand().unwrap();
        let (name, create) = tasks.subcommand().unwrap();
        assert_eq!(name, "create");
        assert!(create.get_flag("verify"));
        assert_eq!(create.get_one::<String>("description").unwrap(), "");
    }
}
