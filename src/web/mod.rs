// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::core::ConfigManager;
use crate::run_status::{RunSlot, RunStatus};
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use tracing::info;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[post("/start_scraping", data = "<request>")]
pub async fn start_scraping(
    request: Json<StartScrapingRequest>,
    config: &State<ServerConfig>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::start_scraping_handler(request, config).await
}

#[get("/scraping_status")]
pub async fn scraping_status(config: &State<ServerConfig>) -> Json<RunStatus> {
    handlers::scraping_status_handler(config).await
}

#[get("/export_results?<format>")]
pub async fn export_results(
    format: Option<&str>,
    config: &State<ServerConfig>,
) -> Result<ExportResponse, ApiError> {
    handlers::export_results_handler(format, config).await
}

#[get("/health")]
pub async fn health(config: &State<ServerConfig>) -> Json<ActionResponse> {
    handlers::health_handler(config).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Invalid request format", "BAD_REQUEST"))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Not found", "NOT_FOUND"))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Request body does not match the expected fields",
        "BAD_REQUEST",
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Internal server error", "INTERNAL_ERROR"))
}

pub fn build_rocket(server_config: ServerConfig) -> Rocket<Build> {
    rocket::build()
        .attach(Cors)
        .manage(server_config)
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![start_scraping, scraping_status, export_results, health, options],
        )
}

pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    config.ensure_directories().await?;

    let server_config = ServerConfig {
        slot: RunSlot::new(),
        export_dir: config.environment.export_path.clone(),
        snapshot_dir: config.environment.snapshot_path.clone(),
        session: config.session_config(),
    };

    info!("Starting mention scraper control panel");
    info!("Environment: {}", config.environment_name);
    info!("Snapshots: {}", server_config.snapshot_dir.display());
    info!("Exports: {}", server_config.export_dir.display());

    let figment = rocket::Config::figment().merge(("port", config.environment.port));
    let _rocket = build_rocket(server_config)
        .configure(figment)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Web server failed: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention_scan::SessionConfig;
    use rocket::http::ContentType;
    use rocket::local::blocking::Client;
    use rocket::serde::json::Value;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const PAGE: &str = r#"<html><body>
        <div data-urn="urn:li:activity:7">
          <span>1 day ago</span>
          <div class="feed-shared-text">Congrats @Acme! hr@acme.io</div>
        </div>
    </body></html>"#;

    struct TestServer {
        client: Client,
        slot: Arc<RunSlot>,
        dir: PathBuf,
    }

    impl TestServer {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("web-{}", uuid::Uuid::new_v4()));
            let snapshot_dir = dir.join("snapshots");
            std::fs::create_dir_all(&snapshot_dir).unwrap();
            std::fs::write(snapshot_dir.join("00.html"), PAGE).unwrap();

            let slot = RunSlot::new();
            let config = ServerConfig {
                slot: slot.clone(),
                export_dir: dir.join("exports"),
                snapshot_dir,
                session: SessionConfig::without_delays(),
            };
            let client = Client::tracked(build_rocket(config)).unwrap();
            Self { client, slot, dir }
        }

        fn start(&self, body: &str) -> (Status, Value) {
            let response = self
                .client
                .post("/api/start_scraping")
                .header(ContentType::JSON)
                .body(body)
                .dispatch();
            let status = response.status();
            (status, response.into_json().unwrap())
        }

        fn wait_until_idle(&self) {
            let started = Instant::now();
            while self.slot.is_running() {
                assert!(started.elapsed() < Duration::from_secs(10), "run never finished");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn test_start_while_running_is_a_conflict() {
        let server = TestServer::new();
        let handle = server.slot.begin().unwrap();
        handle.progress(30, "Scroll 1/3");

        let (status, body) = server.start(r#"{"companyName": "Acme"}"#);
        assert_eq!(status, Status::Conflict);
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "ALREADY_RUNNING");
        assert_eq!(body["error"], "Scraping is already in progress");

        // the running job is untouched
        let snapshot = server.slot.snapshot();
        assert!(snapshot.is_running);
        assert_eq!(snapshot.progress, 30);
        handle.complete(Vec::new());
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        let server = TestServer::new();

        let (status, body) = server.start(r#"{"companyName": ""}"#);
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["error"], "Company name is required");

        let (status, body) = server.start(r#"{"companyName": "Acme", "daysFilter": -1}"#);
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["error_code"], "NOT_POSITIVE");
        assert!(!server.slot.is_running());
    }

    #[test]
    fn test_export_without_results() {
        let server = TestServer::new();
        let response = server.client.get("/api/export_results").dispatch();
        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["error"], "No results to export");
    }

    #[test]
    fn test_full_run_then_export() {
        let server = TestServer::new();

        let (status, body) = server.start(r#"{"companyName": "Acme", "scrollCount": "1"}"#);
        assert_eq!(status, Status::Ok);
        assert_eq!(body["message"], "Scraping started");
        server.wait_until_idle();

        let response = server.client.get("/api/scraping_status").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let status: Value = response.into_json().unwrap();
        assert_eq!(status["is_running"], false);
        assert_eq!(status["error"], false);
        assert_eq!(status["progress"], 100);
        assert_eq!(status["results"][0]["Emails Found"], "hr@acme.io");

        let response = server.client.get("/api/export_results?format=csv").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let disposition = response
            .headers()
            .get_one("Content-Disposition")
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"linkedin_scrape_"));
        let body = response.into_string().unwrap();
        assert!(body.starts_with("Post Date,Post Link,Time Text,Post Text,Emails Found"));
        assert!(body.contains("https://www.linkedin.com/feed/update/7"));
    }

    #[test]
    fn test_health_and_cors() {
        let server = TestServer::new();
        let response = server.client.get("/api/health").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("*")
        );
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], true);
    }
}
