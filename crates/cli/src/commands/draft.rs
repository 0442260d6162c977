use std::fs;

use anyhow::Context;
use quickquote_core::flows::DraftManager;
use serde_json::json;
use tracing::info;

use crate::commands::{
    ai_extractor, build_runtime, lifecycle_failure, load_config, open_store, session_context,
    CommandResult, Failure,
};
use crate::DraftArgs;

pub fn run(args: &DraftArgs) -> CommandResult {
    let transcript = match read_transcript(args) {
        Ok(transcript) => transcript,
        Err(error) => return CommandResult::failure("draft", "input", format!("{error:#}"), 12),
    };
    let config = match load_config("draft") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let extractor = match ai_extractor(&config) {
        Ok(extractor) => extractor,
        Err(failure) => return CommandResult::from_failure("draft", failure),
    };
    let runtime = match build_runtime("draft") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let store = open_store(&config).await?;
        let drafts = DraftManager::new(store, session_context(&config));
        let outcome = drafts
            .record_and_commit(&extractor, &transcript)
            .await
            .map_err(|error| lifecycle_failure(&error))?;
        drafts.store().pool().close().await;
        Ok::<_, Failure>(outcome)
    });

    match result {
        Ok(outcome) => {
            info!(
                event_name = "cli.draft.saved",
                record_id = %outcome.record_id,
                created = outcome.created,
                "draft saved"
            );
            let data = json!({
                "record_id": outcome.record_id.0,
                "created": outcome.created,
                "status": outcome.quote.status().as_str(),
                "total": outcome.quote.total(),
                "quote": outcome.quote,
            });
            CommandResult::success_with_data(
                "draft",
                format!("saved draft {}", outcome.record_id),
                Some(data),
            )
        }
        Err(failure) => CommandResult::from_failure("draft", failure),
    }
}

fn read_transcript(args: &DraftArgs) -> anyhow::Result<String> {
    match (&args.transcript, &args.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript from {}", path.display())),
        (None, None) => anyhow::bail!("either --transcript or --file is required"),
    }
}
