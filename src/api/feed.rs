use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;
use serde_json::{Map, Value};

use super::models::{AllFeedsResponse, AppState, FeedHistoryQuery, FeedQuery};
use crate::feed::{FeedHistory, FeedPoint};

/// Latest record for a feed; 404 when the feed is unknown.
#[get("/feed/latest")]
pub async fn get_feed(state: web::Data<AppState>, query: web::Query<FeedQuery>) -> impl Responder {
    match state.feeds.feed(&query.name) {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().body(format!("feed not found: {}", query.name)),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// Feed history: the last `limit` points or the full history document.
#[get("/feed/history")]
pub async fn get_feed_history(
    state: web::Data<AppState>,
    query: web::Query<FeedHistoryQuery>,
) -> impl Responder {
    if let Some(limit) = query.limit {
        if limit == 0 {
            return HttpResponse::BadRequest().body("limit must be > 0");
        }
        return match state.feeds.history(&query.name) {
            Ok(history) => {
                let points = history.map(|h| h.points).unwrap_or_default();
                let start = points.len().saturating_sub(limit);
                HttpResponse::Ok().json(&points[start..])
            }
            Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
        };
    }

    match state.feeds.history(&query.name) {
        Ok(Some(history)) => HttpResponse::Ok().json(history),
        Ok(None) => HttpResponse::Ok().json(FeedHistory {
            name: query.name.clone(),
            latest: None,
            points: Vec::<FeedPoint>::new(),
        }),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// Every known feed mapped to its latest record.
#[get("/feed/list")]
pub async fn list_feeds(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(AllFeedsResponse {
        feeds: state.feeds.all_feeds(),
    })
}

/// Write a feed payload (a JSON object) and echo the stored record.
#[post("/feed/inject")]
pub async fn inject_feed(
    state: web::Data<AppState>,
    query: web::Query<FeedQuery>,
    body: web::Json<Map<String, Value>>,
) -> impl Responder {
    if query.name.trim().is_empty() {
        return HttpResponse::BadRequest().body("name required");
    }

    let record = state
        .feeds
        .set_feed(&query.name, Value::Object(body.into_inner()));
    info!("injected feed: {}", record.name);
    HttpResponse::Ok().json(record)
}
