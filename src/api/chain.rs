use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;
use std::sync::Arc;

use super::models::{AppState, BlockResponse, StatusResponse};
use crate::chain::producer;

fn status_of(state: &AppState) -> StatusResponse {
    StatusResponse {
        running: state.chain.is_running(),
        height: state.chain.height(),
        last_block_time: state.chain.last_block_time(),
    }
}

/// Current chain status.
#[get("/status")]
pub async fn get_status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(status_of(&state))
}

/// The most recent block; zeros before genesis.
#[get("/block/latest")]
pub async fn get_latest_block(state: web::Data<AppState>) -> impl Responder {
    let resp = match state.chain.latest_block() {
        Some(block) => BlockResponse {
            number: block.number,
            timestamp: block.timestamp,
        },
        None => BlockResponse {
            number: 0,
            timestamp: 0,
        },
    };
    HttpResponse::Ok().json(resp)
}

/// Start block production. A no-op when already running.
#[post("/chain/start")]
pub async fn start_chain(state: web::Data<AppState>) -> impl Responder {
    if state.chain.start() {
        let _ = producer::spawn(Arc::clone(&state.chain));
        info!("chain started via API");
    }
    HttpResponse::Ok().json(status_of(&state))
}

/// Stop block production. A no-op when already stopped.
#[post("/chain/stop")]
pub async fn stop_chain(state: web::Data<AppState>) -> impl Responder {
    if state.chain.is_running() {
        state.chain.stop();
        info!("chain stopped via API");
    }
    HttpResponse::Ok().json(status_of(&state))
}
