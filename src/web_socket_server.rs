use actix::prelude::*;
use actix_web::{web, Error, HttpMessage, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::debug;
use std::time::{Duration, Instant};

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::chat_server::{ChatServer, Connect, Disconnect, WsMessage};
use crate::errors::ApiError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// One live WebSocket session for an authenticated user. Registers itself
/// with the `ChatServer` on start and deregisters on stop, so the fanout
/// only ever sees open connections.
pub struct WebSocketConnection {
    pub user_id: String,
    pub hb: Instant,
    pub addr: Addr<ChatServer>,
}

impl WebSocketConnection {
    pub fn new(user_id: String, addr: Addr<ChatServer>) -> Self {
        WebSocketConnection {
            user_id,
            hb: Instant::now(),
            addr,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                debug!("WebSocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WebSocketConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        self.addr.do_send(Connect {
            user_id: self.user_id.clone(),
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        self.addr.do_send(Disconnect {
            user_id: self.user_id.clone(),
            addr: ctx.address().recipient(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WebSocketConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            // This channel only pushes; inbound frames are ignored.
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                debug!("WebSocket error for user {}: {}", self.user_id, e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl Handler<WsMessage> for WebSocketConnection {
    type Result = ();

    fn handle(&mut self, msg: WsMessage, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.text(msg.0);
    }
}

// GET /ws
// Upgrades to a WebSocket session for the authenticated user.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized access".to_string()))?;
    ws::start(
        WebSocketConnection::new(user.id.to_hex(), data.chat_server.clone()),
        &req,
        stream,
    )
}
