//! Free-form requests dispatched through function calling.

use chrono::NaiveDate;
use serde_json::json;
use tracing::debug;

use super::dates::repair_date;
use super::scan::{json_number, json_str};
use super::{prompts, renewal, DraftSource, Intent, Interpreter, ServiceDraft};
use crate::completion::{ToolReply, ToolSpec};

pub const ADD_SERVICE: &str = "add_service";
pub const LIST_SERVICES: &str = "list_services";
pub const RENEW_SERVICES: &str = "renew_services";

/// Tools offered to the model.
pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: ADD_SERVICE,
            description: "Добавить сервис или домен с датой окончания",
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "expires_at": {"type": "string", "description": "YYYY-MM-DD"},
                    "cost": {"type": "number"},
                    "project": {"type": "string"},
                    "provider": {"type": "string"}
                },
                "required": ["name"]
            }),
        },
        ToolSpec {
            name: LIST_SERVICES,
            description: "Показать все отслеживаемые сервисы",
            parameters: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            name: RENEW_SERVICES,
            description: "Продлить сервисы или домены на срок",
            parameters: json!({
                "type": "object",
                "properties": {
                    "domains": {"type": "array", "items": {"type": "string"}},
                    "extension_days": {"type": "integer"},
                    "extension_months": {"type": "integer"}
                },
                "required": ["domains", "extension_days"]
            }),
        },
    ]
}

/// Turn a validated tool call into an intent.
pub fn intent_from_reply(reply: ToolReply, today: NaiveDate) -> Option<Intent> {
    let ToolReply::Call { name, arguments } = reply else {
        return None;
    };
    match name.as_str() {
        LIST_SERVICES => Some(Intent::ListServices),
        RENEW_SERVICES => renewal::from_json(&arguments).map(Intent::Renew),
        ADD_SERVICE => {
            let service_name = json_str(&arguments, "name")?;
            let raw_date = json_str(&arguments, "expires_at").unwrap_or_default();
            let expires_at = repair_date(&raw_date, today);
            let mut draft = ServiceDraft::new(service_name, expires_at, DraftSource::Assistant);
            draft.cost = json_number(&arguments, "cost").filter(|c| *c > 0.0);
            draft.project = json_str(&arguments, "project");
            draft.provider = json_str(&arguments, "provider");
            Some(Intent::AddService(draft))
        }
        other => {
            debug!(tool = other, "Unknown tool requested");
            None
        }
    }
}

impl Interpreter {
    pub(super) async fn assistant_dispatch(&self, text: &str, today: NaiveDate) -> Option<Intent> {
        let reply = self.ask_with_tools(prompts::ASSISTANT, text, &tools()).await?;
        intent_from_reply(reply, today)
    }
}
