use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use services::broadcast::BroadcastActor;
use services::voting::VotingActor;

use crate::{config::VotingConfig, managers::voting::VotingManager, services, websocket};

async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    voting: web::Data<Addr<VotingActor>>,
    broadcast: web::Data<Addr<BroadcastActor>>,
) -> Result<HttpResponse, Error> {
    ws::start(
        websocket::WsClient::new(voting.get_ref().clone(), broadcast.get_ref().clone()),
        &req,
        stream,
    )
}

/// Addresses of the actors shared by every connection.
#[derive(Clone)]
pub struct SystemActors {
    pub voting: Addr<VotingActor>,
    pub broadcast: Addr<BroadcastActor>,
}

/// Starts the voting and broadcast actors on the current arbiter.
pub fn start_system_actors(pool: sqlx::SqlitePool, config: VotingConfig) -> SystemActors {
    let broadcast = BroadcastActor::new().start();
    let voting = VotingActor::new(VotingManager::new(pool, config), broadcast.clone()).start();
    SystemActors { voting, broadcast }
}

pub fn configure(cfg: &mut web::ServiceConfig, actors: SystemActors) {
    // websocket
    cfg.app_data(web::Data::new(actors.voting))
        .app_data(web::Data::new(actors.broadcast))
        .service(web::resource("/ws/").route(web::get().to(ws_route)));
}
