use crate::middleware::{bearer_token, error_handling};
use crate::state::AppState;
use crate::websocket::session::WsSession;
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// GET /ws
///
/// The credential comes from `Authorization: Bearer` or `?token=`. A failed
/// handshake is answered with 401 and the socket is never upgraded.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let token = bearer_token(&req).or_else(|| query.into_inner().token);

    let (connection, outbound) = match state.gateway.connect(token.as_deref()).await {
        Ok(accepted) => accepted,
        Err(err) => {
            tracing::warn!(error = %err, "websocket connection rejected");
            return Ok(error_handling::gateway_rejection(&err));
        }
    };

    let session = WsSession::new(
        state.gateway.clone(),
        connection.clone(),
        outbound,
        state.config.ws.heartbeat_interval,
        state.config.ws.client_timeout,
    );

    match ws::start(session, &req, stream) {
        Ok(response) => Ok(response),
        Err(e) => {
            state.gateway.disconnect(&connection).await;
            Err(e)
        }
    }
}
