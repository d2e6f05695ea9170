use actix::{Actor, ActorContext, ActorFutureExt, AsyncContext, StreamHandler, WrapFuture};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::gateway::{Connection, Gateway};

/// Socket actor bridging one websocket to the gateway.
///
/// Inbound frames are handled one at a time (`ctx.wait`), so events from a
/// single connection take effect in the order they were sent. The heartbeat
/// is paused while a frame is handled and restamped when it finishes.
pub struct WsSession {
    gateway: Gateway,
    connection: Connection,
    outbound: Option<UnboundedReceiver<String>>,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl WsSession {
    pub fn new(
        gateway: Gateway,
        connection: Connection,
        outbound: UnboundedReceiver<String>,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            connection,
            outbound: Some(outbound),
            hb: Instant::now(),
            heartbeat_interval,
            client_timeout,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!(
                    connection_id = %act.connection.id(),
                    "websocket heartbeat failed, disconnecting"
                );
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
        tracing::debug!(
            connection_id = %self.connection.id(),
            user_id = %self.connection.user_id(),
            "websocket session started"
        );
        self.hb(ctx);
        if let Some(outbound) = self.outbound.take() {
            ctx.add_stream(UnboundedReceiverStream::new(outbound));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let gateway = self.gateway.clone();
        let connection = self.connection.clone();
        actix::spawn(async move {
            gateway.disconnect(&connection).await;
        });
    }
}

/// Frames produced by the gateway for this connection.
impl StreamHandler<String> for WsSession {
    fn handle(&mut self, frame: String, ctx: &mut Self::Context) {
        ctx.text(frame);
    }

    // The session owns a sender, so the channel only ends with the session.
    fn finished(&mut self, _ctx: &mut Self::Context) {}
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
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                let gateway = self.gateway.clone();
                let connection = self.connection.clone();
                let frame = text.to_string();
                ctx.wait(
                    async move {
                        gateway.dispatch(&connection, &frame).await;
                    }
                    .into_actor(self)
                    .map(|_, act, _ctx| {
                        act.hb = Instant::now();
                    }),
                );
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("binary websocket frames are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(?reason, "websocket close received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(error = %e, "websocket protocol error");
                ctx.stop();
            }
        }
    }
}
