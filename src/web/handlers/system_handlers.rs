// src/web/handlers/system_handlers.rs
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;

pub async fn health_handler(config: &State<ServerConfig>) -> Json<ActionResponse> {
    let message = if config.slot.is_running() {
        "Mention scraper is running a scrape"
    } else {
        "Mention scraper is idle"
    };

    Json(ActionResponse {
        success: true,
        message: message.to_string(),
    })
}
