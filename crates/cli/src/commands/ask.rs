//! `codewright ask`: one message, one reply.

use codewright_agent::{AgentReply, ChatOptions, CodingAgent, Mode, SmartAgent};

use super::{Overrides, current_user, ensure_api_key, load_config};

pub async fn run(
    overrides: &Overrides,
    message: &str,
    standard: bool,
    smart: bool,
) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    ensure_api_key(&config)?;
    let mut agent = CodingAgent::from_config(&config)?;
    if standard {
        agent.set_mode(Mode::Standard);
    }

    if smart {
        let mut builder = SmartAgent::builder(agent, &config.pipeline, config.resolved_working_dir());
        if let Some(user) = current_user() {
            builder = builder.user(user);
        }
        let mut smart = builder.build();
        let response = smart.execute(message).await?;
        println!("{}", response.message);
        print_footer(&response.reply);
        return Ok(());
    }

    let reply = agent.chat(message, ChatOptions::default()).await?;
    println!("{}", reply.message);
    print_footer(&reply);
    Ok(())
}

/// Mode, tools and token usage, on stderr so stdout stays pipeable.
pub fn print_footer(reply: &AgentReply) {
    let tools: Vec<&str> = reply.tools_used.iter().map(|t| t.tool_name.as_str()).collect();
    eprintln!();
    eprintln!(
        "  [{} mode] tools: {} | tokens: {} in / {} out",
        reply.mode,
        if tools.is_empty() { "none".to_string() } else { tools.join(", ") },
        reply.usage.prompt_tokens,
        reply.usage.completion_tokens,
    );
}
