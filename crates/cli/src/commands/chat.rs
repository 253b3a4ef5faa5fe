//! `assemble chat`: a line-oriented conversation with one agent.
//!
//! Every turn goes through the same [`AgentHandle`], so the agent's
//! memory carries across turns.

use std::io::Write;

use assemble_agent::AgentHandle;
use assemble_core::message::Query;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::build_agent;

pub async fn run(rewrite_question: bool, summarize: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (config, agent) = build_agent(rewrite_question, summarize, None)?;

    println!();
    println!("  Assemble chat");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Agent:     {}", agent.name());
    println!("  Tools:     {}", config.tools.enabled.join(", "));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let handle = AgentHandle::spawn(agent);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if is_exit(line) {
            break;
        }
        if line.is_empty() {
            prompt()?;
            continue;
        }

        eprint!("  ...");
        match handle.ask(Query::new(line)).await {
            Ok(response) => {
                eprint!("\r     \r");
                println!();
                for line in response.final_output.lines() {
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
        prompt()?;
    }

    handle.shutdown().await?;
    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn is_exit(line: &str) -> bool {
    matches!(line.to_ascii_lowercase().as_str(), "exit" | "quit")
}
