mod chain;
mod feed;
mod health;
pub mod models;
mod price;
mod rpc;

use actix_web::web::ServiceConfig;

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(health::health_check)
        .service(chain::get_status)
        .service(chain::get_latest_block)
        .service(chain::start_chain)
        .service(chain::stop_chain)
        .service(price::get_price)
        .service(price::get_price_history)
        .service(price::get_all_prices)
        .service(price::inject_price)
        .service(feed::get_feed)
        .service(feed::get_feed_history)
        .service(feed::list_feeds)
        .service(feed::inject_feed)
        .service(rpc::json_rpc);
}
