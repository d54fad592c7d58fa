//! CLI command: autointerp prompt
//!
//! Render the messages that `explain` would send for one stored record.
//!
//! Usage:
//!   autointerp prompt --records <dir> <feature> [--cot] [--activations] [--json]

use anyhow::Context;
use autointerp_core::providers::llm::fake::FakeGenerator;
use autointerp_core::{Message, RecordStore, Role};
use std::sync::Arc;

use super::setup;
use crate::cli::args::PromptArgs;
use crate::exit_codes;

fn render_text(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            format!("--- {role} ---\n{}\n", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn run(args: PromptArgs) -> anyhow::Result<i32> {
    let config = setup::load_config(&args.opts)?;
    let decoder = setup::load_decoder(&args.opts)?;
    let feature = setup::parse_feature(&args.feature)?;

    let mut record = RecordStore::new(&args.records)
        .load_record(&feature)
        .await
        .with_context(|| format!("failed to load record {feature}"))?;

    let generator = Arc::new(FakeGenerator::failing("prompt preview never calls the backend"));
    let explainer = setup::build_explainer(generator, &config, decoder);
    let messages = match explainer.build_messages(&mut record) {
        Ok(messages) => messages,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_codes::RECORD_FAILED);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else {
        print!("{}", render_text(&messages));
    }
    Ok(exit_codes::SUCCESS)
}
