use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;

use super::models::{AllPricesResponse, AppState, InjectPriceQuery, PriceHistoryQuery, PriceQuery};
use crate::ledger::SeriesHistory;
use crate::oracle::{PricePoint, PriceRecord};

/// Latest price for an asset, or the point at/before `timestamp` when one
/// is given. 404 when no data qualifies.
#[get("/price/latest")]
pub async fn get_price(state: web::Data<AppState>, query: web::Query<PriceQuery>) -> impl Responder {
    if let Some(timestamp) = query.timestamp {
        return match state.prices.price_at(&query.asset, timestamp) {
            Ok(Some(point)) => HttpResponse::Ok().json(point),
            Ok(None) => HttpResponse::NotFound()
                .body(format!("price not found for asset at timestamp: {}", query.asset)),
            Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
        };
    }

    match state.prices.price(&query.asset) {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => {
            HttpResponse::NotFound().body(format!("price not found for asset: {}", query.asset))
        }
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// Price history for an asset: last `limit` points, an inclusive
/// `from`/`to` range, or the full history document.
#[get("/price/history")]
pub async fn get_price_history(
    state: web::Data<AppState>,
    query: web::Query<PriceHistoryQuery>,
) -> impl Responder {
    if let Some(limit) = query.limit {
        if limit == 0 {
            return HttpResponse::BadRequest().body("limit must be > 0");
        }
        return match state.prices.history(&query.asset) {
            Ok(history) => {
                let points = history.map(|h| h.points).unwrap_or_default();
                let start = points.len().saturating_sub(limit);
                HttpResponse::Ok().json(&points[start..])
            }
            Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
        };
    }

    if let (Some(from), Some(to)) = (query.from, query.to) {
        return match state.prices.history_range(&query.asset, from, to) {
            Ok(points) => HttpResponse::Ok().json(points),
            Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
        };
    }

    match state.prices.history(&query.asset) {
        Ok(Some(history)) => HttpResponse::Ok().json(history),
        Ok(None) => HttpResponse::Ok().json(SeriesHistory::<f64> {
            name: query.asset.clone(),
            latest: None,
            points: Vec::<PricePoint>::new(),
        }),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// Every known asset mapped to its latest price.
#[get("/price/all")]
pub async fn get_all_prices(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(AllPricesResponse {
        prices: state.prices.all_prices(),
    })
}

/// Write a price and echo the stored record.
#[post("/price/inject")]
pub async fn inject_price(
    state: web::Data<AppState>,
    query: web::Query<InjectPriceQuery>,
) -> impl Responder {
    if query.asset.trim().is_empty() {
        return HttpResponse::BadRequest().body("asset required");
    }
    if !query.price.is_finite() {
        return HttpResponse::BadRequest().body("price must be a finite number");
    }

    let record: PriceRecord = state.prices.set_price(&query.asset, query.price);
    info!("injected price: {} = {:.2}", record.name, record.value);
    HttpResponse::Ok().json(record)
}
