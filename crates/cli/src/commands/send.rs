use chrono::Utc;
use quickquote_agent::WebhookNotifier;
use quickquote_core::errors::StoreError;
use quickquote_core::flows::{DraftManager, SentReceipt};
use quickquote_core::share::{QuoteRenderer, SentQuotePayload, ShareError};
use quickquote_core::sync::{QuoteStore, RecordId};
use serde_json::json;
use tracing::{info, warn};

use crate::commands::{
    build_runtime, lifecycle_failure, load_config, open_store, session_context, store_failure,
    CommandResult, Failure,
};
use crate::SendArgs;

fn share_failure(error: ShareError) -> Failure {
    ("share_delivery", error.to_string(), 11)
}

pub fn run(args: &SendArgs) -> CommandResult {
    let config = match load_config("send") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let notifier = if args.notify {
        match WebhookNotifier::from_config(&config.share) {
            Ok(Some(notifier)) => Some(notifier),
            Ok(None) => {
                return CommandResult::failure(
                    "send",
                    "share_delivery",
                    "--notify needs share.webhook_url (or QUICKQUOTE_SHARE_WEBHOOK_URL)",
                    11,
                );
            }
            Err(error) => return CommandResult::from_failure("send", share_failure(error)),
        }
    } else {
        None
    };

    let renderer = match QuoteRenderer::new() {
        Ok(renderer) => renderer,
        Err(error) => return CommandResult::from_failure("send", share_failure(error)),
    };
    let runtime = match build_runtime("send") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let context = session_context(&config);
    let record_id = RecordId(args.record_id.clone());

    let result = runtime.block_on(async {
        let store = open_store(&config).await?;
        let stored = store
            .get(&context.scope, &record_id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| store_failure(StoreError::NotFound(record_id.clone())))?;

        let drafts = DraftManager::new(store, context.clone());
        drafts.resume(&stored).map_err(|error| lifecycle_failure(&error))?;
        let receipt = drafts.finalize_send().await.map_err(|error| lifecycle_failure(&error))?;
        drafts.store().pool().close().await;

        let notified = match &notifier {
            Some(notifier) => {
                let payload = SentQuotePayload::new(&receipt, &context.company, Utc::now());
                if let Err(error) = notifier.deliver(&payload).await {
                    warn!(
                        event_name = "cli.send.notify_failed",
                        record_id = %receipt.record_id,
                        "quote sent but webhook delivery failed"
                    );
                    return Err((
                        "share_delivery",
                        format!("quote {} was sent but notification failed: {error}", receipt.record_id),
                        11,
                    ));
                }
                true
            }
            None => false,
        };
        Ok::<(SentReceipt, bool), Failure>((receipt, notified))
    });

    let (receipt, notified) = match result {
        Ok(sent) => sent,
        Err(failure) => return CommandResult::from_failure("send", failure),
    };

    let email = match renderer.email(&receipt.quote, &context.company) {
        Ok(email) => email,
        Err(error) => return CommandResult::from_failure("send", share_failure(error)),
    };
    let message = match renderer.message(&receipt.quote, &context.company) {
        Ok(message) => message,
        Err(error) => return CommandResult::from_failure("send", share_failure(error)),
    };

    info!(
        event_name = "cli.send.completed",
        record_id = %receipt.record_id,
        total = %receipt.total,
        notified,
        "quote sent"
    );
    let data = json!({
        "record_id": receipt.record_id.0,
        "total": receipt.total,
        "status": receipt.quote.status().as_str(),
        "notified": notified,
        "email": { "to": email.to, "subject": email.subject, "body": email.body },
        "message": message,
    });
    CommandResult::success_with_data("send", format!("sent quote {}", receipt.record_id), Some(data))
}
