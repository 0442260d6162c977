use serde_json::json;

use crate::commands::{
    ai_extractor, build_runtime, extraction_failure, load_config, CommandResult,
};

pub fn run(text: &str) -> CommandResult {
    let config = match load_config("rewrite") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let extractor = match ai_extractor(&config) {
        Ok(extractor) => extractor,
        Err(failure) => return CommandResult::from_failure("rewrite", failure),
    };
    let runtime = match build_runtime("rewrite") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    match runtime.block_on(extractor.rewrite_summary(text)) {
        Ok(rewritten) => CommandResult::success_with_data(
            "rewrite",
            "scope rewritten",
            Some(json!({ "scope_summary": rewritten })),
        ),
        Err(error) => CommandResult::from_failure("rewrite", extraction_failure(&error)),
    }
}
