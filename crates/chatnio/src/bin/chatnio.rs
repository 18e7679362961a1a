//! chatnio: command-line client for the Chat Nio API.
//! Reads config, builds a session, then either streams a chat answer to
//! stdout or runs one REST operation.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use chatnio::config::{self, Config};
use chatnio::{Chat, Client, Session};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chatnio", version, about = "Chat Nio API client")]
struct Cli {
    /// Config file path (default: ~/.chatnio/config.yaml).
    #[arg(long, global = true, env = "CHATNIO_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a question and stream the answer (question read from stdin if omitted).
    Ask {
        question: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Enable web search.
        #[arg(long)]
        web: bool,
        /// Conversation to continue (-1 starts a new one).
        #[arg(long, allow_negative_numbers = true)]
        conversation: Option<i64>,
    },
    /// List, show or delete conversations.
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Show remaining quota.
    Quota,
    /// Buy quota.
    BuyQuota { amount: i64 },
    /// Show subscription status.
    Subscription,
    /// Buy a subscription.
    Subscribe {
        #[arg(long)]
        level: i64,
        #[arg(long)]
        months: i64,
    },
    /// Show package flags.
    Package,
}

#[derive(Subcommand, Debug)]
enum ConversationAction {
    List,
    Show { id: i64 },
    Delete { id: i64 },
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("chatnio=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "chatnio=warn".into())
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn load_config(explicit: Option<PathBuf>) -> Result<Config, String> {
    match explicit {
        Some(path) => config::load(&path)
            .map_err(|e| format!("failed to load config from {}: {}", path.display(), e)),
        None => match config::default_config_path() {
            Some(path) => config::load_or_default(&path)
                .map_err(|e| format!("failed to load config from {}: {}", path.display(), e)),
            None => Ok(Config::default()),
        },
    }
}

fn read_question(question: Option<String>) -> Result<String, String> {
    let question = match question {
        Some(q) => q,
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            line
        }
    };
    let question = question.trim().to_string();
    if question.is_empty() {
        return Err("no question provided".to_string());
    }
    Ok(question)
}

async fn ask(
    session: &Session,
    cfg: &Config,
    question: Option<String>,
    model: Option<String>,
    web: bool,
    conversation: Option<i64>,
) -> Result<(), String> {
    let question = read_question(question)?;
    let model = model.unwrap_or_else(|| cfg.model().to_string());
    let web = web || cfg.web();
    let id = conversation.unwrap_or_else(|| cfg.conversation_id());

    let chat = Chat::new(session.clone(), id);
    chat.connect()
        .await
        .map_err(|e| format!("connection failed: {e}"))?;

    let stdout = io::stdout();
    let result = chat
        .ask_with(&question, &model, web, |frame| {
            let mut out = stdout.lock();
            let _ = write!(out, "{}", frame.message);
            let _ = out.flush();
        })
        .await;
    chat.close().await;
    result.map_err(|e| format!("ask failed: {e}"))?;

    println!();
    Ok(())
}

async fn rest(client: Client, command: Command) -> Result<(), chatnio::Error> {
    match command {
        Command::Ask { .. } => {}
        Command::Conversations { action } => match action {
            ConversationAction::List => {
                for conversation in client.list_conversations().await? {
                    println!(
                        "{}\t{}\t{}",
                        conversation.id,
                        conversation.name,
                        conversation.length()
                    );
                }
            }
            ConversationAction::Show { id } => {
                let conversation = client.load_conversation(id).await?;
                println!("{conversation}");
                for message in &conversation {
                    println!("[{}] {}", message.role, message.content);
                }
            }
            ConversationAction::Delete { id } => {
                println!("{}", client.delete_conversation(id).await?);
            }
        },
        Command::Quota => println!("{}", client.get_quota().await?),
        Command::BuyQuota { amount } => println!("{}", client.buy_quota(amount).await?),
        Command::Subscription => {
            let subscription = client.get_subscription().await?;
            println!(
                "subscribed: {}\nexpired: {}",
                subscription.is_subscribed, subscription.expired_in_days
            );
        }
        Command::Subscribe { level, months } => {
            println!("{}", client.buy_subscription(level, months).await?);
        }
        Command::Package => {
            for (key, value) in &client.get_package().await?.0 {
                println!("{key}: {value}");
            }
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), String> {
    let cfg = load_config(cli.config)?;
    let session = cfg.session().map_err(|e| e.to_string())?;

    match cli.command {
        Command::Ask {
            question,
            model,
            web,
            conversation,
        } => ask(&session, &cfg, question, model, web, conversation).await,
        command => {
            let client = Client::new(session).map_err(|e| e.to_string())?;
            rest(client, command).await.map_err(|e| e.to_string())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    if let Err(e) = rt.block_on(run(cli)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
