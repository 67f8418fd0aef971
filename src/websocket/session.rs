use crate::metrics;
use crate::state::AppState;
use crate::websocket::events::ClientEvent;
use crate::websocket::{ConnectionRegistry, SubscriberId};
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: Uuid,
}

/// Payload forwarded into the session from the connection registry.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct PushText(pub String);

/// One WebSocket connection for one user.
///
/// Outbound events arrive through the registry bridge; inbound frames are
/// parsed as [`ClientEvent`]s and dispatched to the services off the actor
/// thread.
pub struct WsSession {
    user_id: Uuid,
    subscriber_id: SubscriberId,
    registry: ConnectionRegistry,
    state: AppState,
    hb: Instant,
}

impl WsSession {
    fn new(
        user_id: Uuid,
        subscriber_id: SubscriberId,
        registry: ConnectionRegistry,
        state: AppState,
    ) -> Self {
        Self {
            user_id,
            subscriber_id,
            registry,
            state,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user = %act.user_id, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user = %self.user_id, "WebSocket session started");
        metrics::ws_connection_opened();
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user = %self.user_id, "WebSocket session stopped");
        metrics::ws_connection_closed();

        let registry = self.registry.clone();
        let user_id = self.user_id;
        let subscriber_id = self.subscriber_id;
        actix::spawn(async move {
            registry.remove_subscriber(user_id, subscriber_id).await;
        });
    }
}

impl Handler<PushText> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: PushText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match ClientEvent::from_json(&text) {
                Ok(event) => {
                    let state = self.state.clone();
                    let user_id = self.user_id;
                    actix::spawn(async move {
                        handle_client_event(state, user_id, event).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(user = %self.user_id, error = %e, "Unparseable WebSocket frame");
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(user = %self.user_id, "Binary WebSocket frames not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(user = %self.user_id, "WebSocket close frame: {:?}", reason);
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Runs one inbound event against the services. Failures are logged; the
/// socket stays open either way.
async fn handle_client_event(state: AppState, user_id: Uuid, event: ClientEvent) {
    match event {
        ClientEvent::Send {
            receiver_id,
            content,
            message_type,
            media_url,
        } => {
            let result = state
                .messages
                .send_message(
                    user_id,
                    receiver_id,
                    content.unwrap_or_default(),
                    message_type.unwrap_or_default(),
                    media_url,
                )
                .await;
            if let Err(e) = result {
                tracing::warn!(user = %user_id, error = %e, "WebSocket send rejected");
            }
        }
        ClientEvent::Typing {
            receiver_id,
            is_typing,
        } => {
            state.messages.relay_typing(user_id, receiver_id, is_typing).await;
        }
        ClientEvent::MarkAllRead { sender_id } => {
            if let Err(e) = state.messages.mark_all_read(user_id, sender_id).await {
                tracing::warn!(user = %user_id, error = %e, "WebSocket read receipt rejected");
            }
        }
    }
}

#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let params = query.into_inner();

    let (subscriber_id, mut rx) = state.registry.add_subscriber(params.user_id).await;

    let session = WsSession::new(
        params.user_id,
        subscriber_id,
        state.registry.clone(),
        state.as_ref().clone(),
    );

    let (addr, resp) = ws::WsResponseBuilder::new(session, &req, stream).start_with_addr()?;

    // Bridge the registry channel into the actor. The sender side is dropped
    // when the session deregisters, which ends this task.
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            addr.do_send(PushText(payload));
        }
    });

    Ok(resp)
}
