use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::envelope::render_reply;
use crate::i18n::Localizer;
use crate::workflows::conversation::ConversationEngine;
use crate::workflows::lending::LoanId;

/// Form payload posted by the messaging provider.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageRequest {
    pub identity: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageReply {
    pub reply: String,
}

/// Router exposing the webhook plus JSON endpoints for messaging and loan lookups.
pub fn conversation_router<L>(engine: Arc<ConversationEngine<L>>) -> Router
where
    L: Localizer + 'static,
{
    Router::new()
        .route("/webhook/whatsapp", post(webhook_handler::<L>))
        .route("/api/v1/messages", post(message_handler::<L>))
        .route("/api/v1/loans/:loan_id", get(loan_status_handler::<L>))
        .with_state(engine)
}

pub(crate) async fn webhook_handler<L>(
    State(engine): State<Arc<ConversationEngine<L>>>,
    Form(message): Form<InboundMessage>,
) -> Response
where
    L: Localizer + 'static,
{
    if message.from.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "missing sender").into_response();
    }

    let reply = engine.handle(&message.from, &message.body);
    match render_reply(&reply) {
        Ok(xml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml")],
            xml,
        )
            .into_response(),
        Err(err) => {
            error!(%err, "reply envelope failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) async fn message_handler<L>(
    State(engine): State<Arc<ConversationEngine<L>>>,
    Json(request): Json<MessageRequest>,
) -> Response
where
    L: Localizer + 'static,
{
    if request.identity.trim().is_empty() {
        let payload = json!({ "error": "identity is required" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    let reply = engine.handle(&request.identity, &request.text);
    (StatusCode::OK, Json(MessageReply { reply })).into_response()
}

pub(crate) async fn loan_status_handler<L>(
    State(engine): State<Arc<ConversationEngine<L>>>,
    Path(loan_id): Path<String>,
) -> Response
where
    L: Localizer + 'static,
{
    let loan = loan_id
        .parse::<LoanId>()
        .ok()
        .and_then(|id| engine.ledger().get(id));

    match loan {
        Some(loan) => (StatusCode::OK, Json(loan.status_view())).into_response(),
        None => {
            let payload = json!({
                "loan_id": loan_id,
                "error": "loan not found",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}
