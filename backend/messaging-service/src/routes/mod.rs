pub mod messages;
pub mod wsroute;

use crate::metrics;
use crate::middleware::error_handling::{json_error_handler, query_error_handler};
use actix_web::{get, web, HttpResponse};

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(health)
        .route("/metrics", web::get().to(metrics::metrics_handler))
        .service(wsroute::ws_handler)
        .service(messages::send_message)
        .service(messages::list_conversations)
        .service(messages::get_conversation_messages)
        .service(messages::mark_read)
        .service(messages::unread_count);
}
