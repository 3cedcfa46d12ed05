//! `codewright chat`: interactive session.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use codewright_agent::{ChatOptions, CodingAgent, Mode, SmartAgent};
use codewright_core::session::SessionStore;
use codewright_session::InMemorySessionStore;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::ask::print_footer;
use super::{Overrides, current_user, ensure_api_key, load_config};

/// A line starting with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Tools,
    Context,
    History,
    Clear,
    /// Show the mode, or switch to the given one.
    Mode(Option<Mode>),
    /// Print the export, or write it to a file.
    Export(Option<PathBuf>),
    /// Code blocks attached to this session (smart sessions only).
    Resources,
    Exit,
}

impl SlashCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.trim().trim_start_matches('/').split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        match name {
            "help" | "h" | "?" => Ok(Self::Help),
            "tools" => Ok(Self::Tools),
            "context" => Ok(Self::Context),
            "history" => Ok(Self::History),
            "clear" => Ok(Self::Clear),
            "mode" => arg.map(str::parse::<Mode>).transpose().map(Self::Mode),
            "export" => Ok(Self::Export(arg.map(PathBuf::from))),
            "resources" => Ok(Self::Resources),
            "exit" | "quit" | "q" => Ok(Self::Exit),
            other => Err(format!("unknown command '/{other}', try /help")),
        }
    }
}

enum Runner {
    Plain(CodingAgent),
    Smart(Box<SmartAgent>),
}

impl Runner {
    fn agent(&self) -> &CodingAgent {
        match self {
            Self::Plain(agent) => agent,
            Self::Smart(smart) => smart.agent(),
        }
    }

    fn agent_mut(&mut self) -> &mut CodingAgent {
        match self {
            Self::Plain(agent) => agent,
            Self::Smart(smart) => smart.agent_mut(),
        }
    }

    async fn send(&mut self, input: &str) -> Result<String, codewright_core::Error> {
        match self {
            Self::Plain(agent) => {
                let reply = agent.chat(input, ChatOptions::default()).await?;
                print_footer(&reply);
                Ok(reply.message)
            }
            Self::Smart(smart) => {
                let response = smart.execute(input).await?;
                print_footer(&response.reply);
                Ok(response.message)
            }
        }
    }
}

pub async fn run(overrides: &Overrides, standard: bool, smart: bool) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    ensure_api_key(&config)?;
    let mut agent = CodingAgent::from_config(&config)?;
    if standard {
        agent.set_mode(Mode::Standard);
    }

    let store = Arc::new(InMemorySessionStore::new());
    let mut runner = if smart {
        let mut builder = SmartAgent::builder(agent, &config.pipeline, config.resolved_working_dir())
            .session_store(store.clone());
        if let Some(user) = current_user() {
            builder = builder.user(user);
        }
        Runner::Smart(Box::new(builder.build()))
    } else {
        Runner::Plain(agent)
    };

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Codewright, Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!("  Mode:      {}", runner.agent().mode());
    println!("  Pipeline:  {}", if smart { "on" } else { "off" });
    println!("  Tools:     {}", runner.agent().tools().names().join(", "));
    println!();
    println!("  Type your message and press Enter. /help lists commands.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match SlashCommand::parse(input) {
                Ok(SlashCommand::Exit) => break,
                Ok(command) => {
                    if let Err(e) = handle(command, &mut runner, store.as_ref()).await {
                        eprintln!("  [Error] {e}");
                    }
                }
                Err(e) => eprintln!("  {e}"),
            }
            continue;
        }

        eprint!("  ...");
        match runner.send(input).await {
            Ok(response) => {
                eprint!("\r     \r");
                println!();
                for line in response.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

async fn handle(
    command: SlashCommand,
    runner: &mut Runner,
    store: &InMemorySessionStore,
) -> anyhow::Result<()> {
    match command {
        SlashCommand::Help => {
            println!("  /help                  Show this list");
            println!("  /tools                 List available tools");
            println!("  /context               Show the agent context");
            println!("  /history               Show the conversation");
            println!("  /clear                 Clear the conversation");
            println!("  /mode [intelligent|standard]");
            println!("                         Show or switch the mode");
            println!("  /export [path]         Export the conversation as JSON");
            println!("  /resources             Code saved in this session (--smart)");
            println!("  /exit                  Quit");
        }
        SlashCommand::Tools => {
            for spec in runner.agent().tool_specs() {
                println!("  {:<18} {}", spec.name, spec.description);
            }
        }
        SlashCommand::Context => {
            let context = serde_json::Value::Object(runner.agent().context().clone());
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
        SlashCommand::History => {
            let conversation = runner.agent().conversation();
            if conversation.is_empty() {
                println!("  (empty)");
            }
            for message in conversation.messages() {
                let preview: String = message.content.chars().take(100).collect();
                println!("  [{}] {}", message.role.as_str(), preview.replace('\n', " "));
            }
        }
        SlashCommand::Clear => {
            runner.agent_mut().clear_history();
            println!("  History cleared.");
        }
        SlashCommand::Mode(None) => println!("  Mode: {}", runner.agent().mode()),
        SlashCommand::Mode(Some(mode)) => {
            runner.agent_mut().set_mode(mode);
            println!("  Mode set to {mode}.");
        }
        SlashCommand::Export(path) => {
            let export = serde_json::to_string_pretty(&runner.agent().export_conversation()?)?;
            match path {
                Some(path) => {
                    std::fs::write(&path, export)?;
                    println!("  Exported to {}", path.display());
                }
                None => println!("{export}"),
            }
        }
        SlashCommand::Resources => {
            let Runner::Smart(smart) = runner else {
                println!("  Resources are only collected with --smart.");
                return Ok(());
            };
            let resources = store.list_resources(smart.session_id()).await;
            if resources.is_empty() {
                println!("  (none)");
            }
            for resource in resources {
                let language = resource.content["language"].as_str().unwrap_or("text");
                println!("  {} ({language})", resource.uri);
            }
        }
        SlashCommand::Exit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(SlashCommand::parse("/help"), Ok(SlashCommand::Help));
        assert_eq!(SlashCommand::parse("/quit"), Ok(SlashCommand::Exit));
        assert_eq!(SlashCommand::parse("/mode"), Ok(SlashCommand::Mode(None)));
        assert_eq!(
            SlashCommand::parse("/mode standard"),
            Ok(SlashCommand::Mode(Some(Mode::Standard)))
        );
        assert_eq!(
            SlashCommand::parse("/export out.json"),
            Ok(SlashCommand::Export(Some(PathBuf::from("out.json"))))
        );
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(SlashCommand::parse("/mode turbo").unwrap_err().contains("turbo"));
        assert!(SlashCommand::parse("/frobnicate").unwrap_err().contains("/frobnicate"));
    }
}
