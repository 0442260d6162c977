use quickquote_core::domain::quote::{to_csv_line, CSV_HEADER};
use quickquote_core::sync::{QuoteStore, StoredQuote};
use serde_json::json;

use crate::commands::{
    build_runtime, load_config, open_store, session_context, store_failure, CommandResult,
    Failure,
};

pub fn run(csv: bool) -> CommandResult {
    let config = match load_config("history") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("history") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let scope = session_context(&config).scope;
    let result = runtime.block_on(async {
        let store = open_store(&config).await?;
        let mut subscription = store.subscribe(&scope).await.map_err(store_failure)?;
        let records = subscription.next().await.unwrap_or_default();
        subscription.unsubscribe();
        store.pool().close().await;
        Ok::<Vec<StoredQuote>, Failure>(records)
    });

    let records = match result {
        Ok(records) => records,
        Err(failure) => return CommandResult::from_failure("history", failure),
    };

    if csv {
        let mut lines = vec![to_csv_line(&CSV_HEADER)];
        lines.extend(records.iter().map(|stored| to_csv_line(&stored.to_csv_row())));
        return CommandResult::text(lines.join("\n"));
    }

    let count = records.len();
    CommandResult::success_with_data(
        "history",
        format!("{count} quote(s) for {}", scope.user_id()),
        Some(json!({ "records": records })),
    )
}
