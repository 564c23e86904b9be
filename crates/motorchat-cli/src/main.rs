//! motorchat - terminal client for a streamed car-dealership chat

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use motorchat_api::ApiClient;
use motorchat_api::types::{Message, Sender};
use motorchat_session::{
    RestHistoryLoader, SessionController, SessionEvent, WebSocketChannel,
};

/// motorchat - streamed chat client
#[derive(Parser, Debug)]
#[command(name = "motorchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket endpoint (default: ws://localhost:3001/chat)
    #[arg(long)]
    server_url: Option<String>,

    /// REST API root (default: http://localhost:3001/api/v1/chat-bot)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token (or set MOTORCHAT_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// Numeric user id attached to outbound messages
    #[arg(short, long)]
    user_id: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("motorchat=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "motorchat=warn".into()),
            )
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Load config file; CLI args take precedence
    let cfg = config::Config::load();
    let server_url = args
        .server_url
        .or(cfg.server_url.clone())
        .unwrap_or_else(|| "ws://localhost:3001/chat".to_string());
    let api_url = args
        .api_url
        .or(cfg.api_url.clone())
        .unwrap_or_else(|| "http://localhost:3001/api/v1/chat-bot".to_string());
    let Some(token) = args.token.or_else(|| cfg.get_token()) else {
        anyhow::bail!("no bearer token: pass --token or set MOTORCHAT_TOKEN");
    };
    let user_id = args.user_id.or(cfg.user_id).unwrap_or(0);

    let channel = Arc::new(WebSocketChannel::new(server_url));
    let api = Arc::new(ApiClient::new(api_url, token.clone()));
    let history = Arc::new(RestHistoryLoader::new(api.clone()));
    let mut controller = SessionController::new(channel, api, history, token, user_id);

    let mut channel_rx = controller.channel_events();
    let mut session_rx = controller.subscribe();

    if let Err(e) = controller.start().await {
        if matches!(&e, motorchat_session::Error::Api(api) if api.is_auth()) {
            anyhow::bail!("authentication failed ({e}): check --token / MOTORCHAT_TOKEN");
        }
        return Err(e.into());
    }
    print_conversations(&controller);
    print_messages(controller.messages());
    println!("Type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = channel_rx.recv() => match event {
                Ok(event) => controller.handle_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("event loop lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            event = session_rx.recv() => {
                if let Ok(event) = event {
                    render_event(&controller, &event);
                }
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                if !handle_line(&mut controller, line.trim()).await {
                    break;
                }
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// Process one input line. Returns `false` to quit.
async fn handle_line(controller: &mut SessionController, line: &str) -> bool {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "/quit" | "/exit" => return false,
        "/help" => {
            println!(
                "/list           show conversations\n\
                 /switch <n>     activate conversation by number\n\
                 /new [title]    create a conversation\n\
                 /rename <title> rename the active conversation\n\
                 /delete         delete the active conversation\n\
                 /quit           exit"
            );
        }
        "/list" => print_conversations(controller),
        "/switch" => {
            let target = rest
                .parse::<usize>()
                .ok()
                .and_then(|n| controller.conversations().get(n.saturating_sub(1)))
                .map(|c| c.id.clone());
            match target {
                Some(id) => {
                    if let Err(e) = controller.switch_to(&id).await {
                        eprintln!("switch failed: {}", e);
                    }
                }
                None => eprintln!("usage: /switch <number from /list>"),
            }
        }
        "/new" => {
            let title = if rest.is_empty() { "New Conversation" } else { rest };
            match controller.create(title).await {
                Ok(_) => print_conversations(controller),
                Err(e) => eprintln!("create failed: {}", e),
            }
        }
        "/rename" => {
            let Some(active) = controller.active_conversation().map(|c| c.id.clone()) else {
                eprintln!("no active conversation");
                return true;
            };
            if rest.is_empty() {
                eprintln!("usage: /rename <title>");
            } else if let Err(e) = controller.rename(&active, rest).await {
                eprintln!("rename failed: {}", e);
            }
        }
        "/delete" => {
            let Some(active) = controller.active_conversation().map(|c| c.id.clone()) else {
                eprintln!("no active conversation");
                return true;
            };
            if let Err(e) = controller.remove(&active).await {
                eprintln!("delete failed: {}", e);
            }
        }
        _ => {
            if let Err(e) = controller.send(line).await {
                eprintln!("send failed: {}", e);
            }
        }
    }
    true
}

fn render_event(controller: &SessionController, event: &SessionEvent) {
    match event {
        SessionEvent::ConnectionChanged { connected } => {
            println!("[{}]", if *connected { "connected" } else { "disconnected" });
        }
        SessionEvent::ActiveChanged { conversation_id } => match conversation_id {
            Some(id) => {
                let title = controller
                    .conversations()
                    .iter()
                    .find(|c| &c.id == id)
                    .map(|c| c.title.as_str())
                    .unwrap_or(id.as_str());
                println!("--- {} ---", title);
            }
            None => println!("--- no conversation ---"),
        },
        SessionEvent::TypingChanged { typing: false } => {
            // a reply just finalized (or was aborted); show it
            if let Some(message) = controller.messages().last() {
                if message.sender == Sender::Bot && message.is_complete {
                    print_message(message);
                }
            }
        }
        SessionEvent::Alert { message } => eprintln!("Error: {}", message),
        _ => {}
    }
}

fn print_conversations(controller: &SessionController) {
    let active = controller.active_conversation().map(|c| c.id.clone());
    if controller.conversations().is_empty() {
        println!("No conversations yet. Use /new to start one.");
        return;
    }
    for (index, conversation) in controller.conversations().iter().enumerate() {
        let marker = if active.as_deref() == Some(&conversation.id) { "*" } else { " " };
        println!("{} {}. {}", marker, index + 1, conversation.title);
    }
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let prefix = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };
    println!("{}> {}", prefix, message.text);

    if let Some(props) = &message.car_props {
        for prop in props {
            println!("    {} {}: {}", prop.emoji, prop.key, prop.value);
        }
    }
    if let Some(query) = &message.sql_query {
        println!("    [sql] {}", query);
    }
}
