use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::warn;

use crate::cli::output::*;
use crate::model::{MessageId, NoticeEvent, NoticesConfig};
use crate::ops::{Confirmation, MessageService};
use crate::parse::{Command, ScriptLine};

type Output = Arc<Mutex<Vec<String>>>;

fn push(out: &Output, line: String) {
    out.lock().unwrap_or_else(PoisonError::into_inner).push(line);
}

fn json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":{:?}}}", e.to_string()))
}

/// Let spawned timers and the api-error bridge catch up
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Run a script against a fresh service and return the output lines:
/// every fan-out event, confirmation outcomes, and `list`/`counts` results.
/// Must run inside a tokio runtime; timers use its clock.
pub async fn run_script(config: &NoticesConfig, script: &[ScriptLine], json: bool) -> Vec<String> {
    let service = MessageService::new(config);
    let bridge = service.attach_api_errors();
    let out: Output = Arc::new(Mutex::new(Vec::new()));

    let sink = out.clone();
    service.subscribe(move |event| {
        let line = if json {
            json_line(event)
        } else {
            format_event(event)
        };
        push(&sink, line);
    });

    let mut pending: BTreeMap<MessageId, Confirmation> = BTreeMap::new();
    for step in script {
        match &step.command {
            Command::Post {
                kind,
                text,
                options,
            } => {
                service.post(*kind, text.clone(), options.clone());
            }
            Command::Confirm { text, options } => {
                let confirmation = service.confirm(text.clone(), options.clone());
                pending.insert(confirmation.id(), confirmation);
            }
            Command::Accept(id) => {
                if !service.accept(*id) {
                    warn!(line = step.line, %id, "No pending confirmation to accept");
                }
            }
            Command::Reject(id) => {
                if !service.reject(*id) {
                    warn!(line = step.line, %id, "No pending confirmation to reject");
                }
            }
            Command::Dismiss(id) => service.dismiss(*id),
            Command::Clear => service.clear(),
            Command::Wait(duration) => tokio::time::sleep(*duration).await,
            Command::ApiError { operation, error } => {
                let event = NoticeEvent::ApiError {
                    operation: operation.clone(),
                    error: error.clone(),
                };
                push(&out, if json { json_line(&event) } else { format_event(&event) });
                service.bus().publish(event);
            }
            Command::List(filter) => {
                let messages = service.list(filter);
                if json {
                    push(&out, json_line(&ListJson { list: &messages }));
                } else {
                    for line in format_list(&messages) {
                        push(&out, line);
                    }
                }
            }
            Command::Counts => {
                let counts = service.active_counts();
                let line = if json {
                    json_line(&CountsJson { counts })
                } else {
                    format_counts(&counts)
                };
                push(&out, line);
            }
        }
        settle().await;

        pending.retain(|id, confirmation| match confirmation.try_outcome() {
            Some(accepted) => {
                let line = if json {
                    json_line(&settled_to_json(*id, accepted))
                } else {
                    format_settled(*id, accepted)
                };
                push(&out, line);
                false
            }
            None => true,
        });
    }

    if let Some(bridge) = bridge {
        bridge.abort();
    }
    out.lock().unwrap_or_else(PoisonError::into_inner).clone()
}
