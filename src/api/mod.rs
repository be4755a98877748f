pub mod kill;
pub mod metrics;
pub mod table;

pub use metrics::get_metrics;

use actix_web::{web, HttpResponse, Responder};

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/table", web::get().to(table::get_table))
        .route("/api/state", web::get().to(table::get_state))
        .route("/api/system", web::get().to(table::get_system))
        .route("/api/refresh", web::post().to(table::refresh))
        .route("/api/search", web::put().to(table::set_search))
        .route("/api/status-filter", web::put().to(table::set_status_filter))
        .route("/api/page", web::put().to(table::set_page))
        .route("/api/sort/{field}", web::post().to(table::toggle_sort))
        .route("/api/pins", web::post().to(table::toggle_pin))
        .route("/api/freeze", web::put().to(table::set_frozen))
        .route("/api/settings", web::get().to(table::get_settings))
        .route("/api/settings", web::put().to(table::update_settings))
        .route("/api/processes/{pid}/details", web::post().to(kill::show_details))
        .route("/api/details", web::get().to(kill::get_details))
        .route("/api/details", web::delete().to(kill::close_details))
        .route("/api/processes/{pid}/kill", web::post().to(kill::request_kill))
        .route("/api/kill/confirm", web::post().to(kill::confirm_kill))
        .route("/api/kill", web::delete().to(kill::cancel_kill))
        .route("/metrics", web::get().to(get_metrics))
        .route("/health", web::get().to(health));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableSettings;
    use crate::state::new_state;
    use crate::state::tests::{chrome, sshd, ScriptedBackend};
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;

    async fn seeded() -> (Arc<ScriptedBackend>, crate::state::AppState) {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_snapshot(vec![chrome(), sshd()]);
        let store = new_state(backend.clone(), TableSettings::default());
        store.get_processes().await;
        (backend, store)
    }

    #[actix_web::test]
    async fn table_reflects_search_and_pins() {
        let (_, store) = seeded().await;
        let app = test::init_service(App::new().app_data(web::Data::new(store.clone())).configure(routes)).await;

        let req = test::TestRequest::put()
            .uri("/api/search")
            .set_json(serde_json::json!({ "term": "chr,ssh" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_matching"], 2);

        let req = test::TestRequest::post()
            .uri("/api/pins")
            .set_json(serde_json::json!({ "command": "/usr/sbin/sshd" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pinned"], true);

        let req = test::TestRequest::get().uri("/api/table").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"][0]["pid"], 2);
        assert_eq!(body["rows"][0]["pinned"], true);
        assert_eq!(body["rows"][0]["status"], "S");
    }

    #[actix_web::test]
    async fn unknown_sort_field_is_rejected() {
        let (_, store) = seeded().await;
        let app = test::init_service(App::new().app_data(web::Data::new(store)).configure(routes)).await;

        let req = test::TestRequest::post().uri("/api/sort/disk_usage").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::post().uri("/api/sort/name").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["sort"]["field"], "name");
        assert_eq!(body["sort"]["direction"], "desc");
    }

    #[actix_web::test]
    async fn kill_requires_confirmation() {
        let (backend, store) = seeded().await;
        backend.push_kill(Ok(true));
        backend.push_snapshot(vec![sshd()]);
        let app = test::init_service(App::new().app_data(web::Data::new(store.clone())).configure(routes)).await;

        let req = test::TestRequest::post().uri("/api/processes/404/kill").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::post().uri("/api/kill/confirm").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 409);
        assert!(backend.killed.lock().unwrap().is_empty());

        let req = test::TestRequest::post().uri("/api/processes/1/kill").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "confirm");

        let req = test::TestRequest::get().uri("/api/state").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["show_confirm_modal"], true);
        assert_eq!(body["process_to_kill"]["pid"], 1);

        let req = test::TestRequest::post().uri("/api/kill/confirm").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert_eq!(*backend.killed.lock().unwrap(), vec![1]);

        let req = test::TestRequest::get().uri("/api/state").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["show_confirm_modal"], false);
        assert_eq!(body["process_to_kill"], Value::Null);
        assert_eq!(body["generation"], 2);
    }

    #[actix_web::test]
    async fn details_follow_selection() {
        let (_, store) = seeded().await;
        let app = test::init_service(App::new().app_data(web::Data::new(store)).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/details").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::post().uri("/api/processes/2/details").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "sshd");

        let req = test::TestRequest::get().uri("/api/details").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pid"], 2);

        let req = test::TestRequest::delete().uri("/api/details").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 204);

        let req = test::TestRequest::get().uri("/api/details").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn settings_are_validated() {
        let (_, store) = seeded().await;
        let app = test::init_service(App::new().app_data(web::Data::new(store)).configure(routes)).await;

        let req = test::TestRequest::put()
            .uri("/api/settings")
            .set_json(serde_json::json!({
                "refresh_rate_ms": 3000,
                "items_per_page": 15,
                "default_status_filter": "all"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::put()
            .uri("/api/settings")
            .set_json(serde_json::json!({
                "refresh_rate_ms": 1000,
                "items_per_page": 15,
                "default_status_filter": "bogus"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("bogus"));

        let req = test::TestRequest::put()
            .uri("/api/settings")
            .set_json(serde_json::json!({
                "refresh_rate_ms": 2000,
                "items_per_page": 50,
                "default_status_filter": "running"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items_per_page"], 50);
    }

    #[actix_web::test]
    async fn health_and_metrics_respond() {
        let (_, store) = seeded().await;
        let app = test::init_service(App::new().app_data(web::Data::new(store)).configure(routes)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
