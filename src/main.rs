// src/main.rs

mod app_state;
mod auth;
mod chat;
mod chat_db;
mod chat_repo;
mod chat_server;
mod config;
mod errors;
mod models;
mod views;
mod web_socket_server;

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpServer, ResponseError,
};
use env_logger::Env;
use futures::future::{ok, Ready};
use log::info;

use crate::app_state::AppState;
use crate::chat::{add_participants, create_group, create_one_to_one_chat, remove_participants};
use crate::web_socket_server::ws_index;

/// Bearer-credential middleware: validates the token (cookie first, then the
/// Authorization header), resolves it to a stored user and attaches the
/// `AuthUser` context. Every route behind it is authenticated; failures are
/// answered with the 401 envelope before the handler runs.
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            // CORS preflights carry no credential.
            if req.method() == http::Method::OPTIONS {
                let res = service.call(req).await?;
                return Ok(res.map_into_boxed_body());
            }
            let state = match req.app_data::<web::Data<AppState>>() {
                Some(state) => state.clone(),
                None => {
                    let err = errors::ApiError::Internal("Missing application state".to_string());
                    let (req_parts, _payload) = req.into_parts();
                    let resp = err.error_response().map_into_boxed_body();
                    return Ok(ServiceResponse::new(req_parts, resp));
                }
            };
            match auth::authenticate(&req, &state).await {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                    let res = service.call(req).await?;
                    Ok(res.map_into_boxed_body())
                }
                Err(err) => {
                    let (req_parts, _payload) = req.into_parts();
                    let resp = err.error_response().map_into_boxed_body();
                    Ok(ServiceResponse::new(req_parts, resp))
                }
            }
        })
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(chat_db::MongoDB::init(&config.mongo_uri, &config.database_name).await);
    let chat_server = chat_server::ChatServer::new().start();

    let frontend_origin = config.frontend_origin.clone();

    info!("Server running at http://0.0.0.0:8080");
    info!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(AppState {
                chat_server: chat_server.clone(),
                mongodb: mongodb.clone(),
                config: config.clone(),
            }))
            // CHATS
            .service(
                web::scope("/chats")
                    .route(
                        "/one-to-one/{receiver_id}",
                        web::post().to(create_one_to_one_chat),
                    )
                    .route("/group", web::post().to(create_group))
                    .service(
                        web::scope("/group/participants")
                            .route("", web::post().to(add_participants))
                            .route("", web::delete().to(remove_participants)),
                    ),
            )
            // WEBSOCKET route for real-time
            .service(web::resource("/ws").route(web::get().to(ws_index)))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
