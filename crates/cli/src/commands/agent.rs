//! `clerk agent`: interactive or single-message chat mode.

use clerk_agent::{TurnOutcome, TurnRequest, TurnRunner};
use clerk_config::AppConfig;
use clerk_core::message::{ContentBlock, ConversationId};
use clerk_core::TranscriptStore;
use clerk_transcript::CsvTranscriptStore;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

pub async fn run(
    config: AppConfig,
    message: Option<String>,
    conversation: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Check for API key early and give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in .env):");
        eprintln!("    OPENAI_API_KEY = 'sk-...'");
        eprintln!("    CLERK_API_KEY  = 'sk-...'   (takes precedence)");
        eprintln!();
        eprintln!("  Or add `api_key` to clerk.toml.");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = clerk_providers::build_from_config(&config)?;
    let transcript: Arc<dyn TranscriptStore> = Arc::new(CsvTranscriptStore::new(
        config.transcript.path.clone(),
        config.retry.policy(),
    ));
    let runner = clerk_agent::build_runner(&config, provider, transcript);

    let conversation_id = conversation
        .map(ConversationId::from)
        .unwrap_or_default();

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = ask(&runner, &conversation_id, msg).await;
        eprint!("\r              \r");
        println!("{}", reply?);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Clerk Agent (interactive)");
    println!();
    println!("  Agent:        {}", runner.agent().name);
    println!("  Model:        {}", config.model);
    println!("  Conversation: {conversation_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if !line.is_empty() {
            eprint!("  ...");
            let reply = ask(&runner, &conversation_id, line.to_string()).await;
            eprint!("\r     \r");
            match reply {
                Ok(text) => {
                    println!();
                    for l in text.lines() {
                        println!("  Assistant > {l}");
                    }
                    println!();
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

async fn ask(
    runner: &TurnRunner,
    conversation_id: &ConversationId,
    text: String,
) -> Result<String, Box<dyn std::error::Error>> {
    let outcome = runner
        .run_turn(TurnRequest {
            conversation_id: conversation_id.clone(),
            message_id: Uuid::new_v4().to_string(),
            content: vec![ContentBlock::text(text)],
        })
        .await?;
    Ok(render(&outcome))
}

fn render(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Answered(message) => message.text(),
        TurnOutcome::RoundLimitReached { rounds, .. } => format!(
            "(no final answer after {rounds} rounds of tool calls; try rephrasing the question)"
        ),
    }
}
