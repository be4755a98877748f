use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::models::{SortField, TableSettings};
use crate::state::{AppState, RefreshOutcome};

#[derive(Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub term: String,
}

#[derive(Deserialize)]
pub struct StatusFilterRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct PageRequest {
    pub page: usize,
}

#[derive(Deserialize)]
pub struct PinRequest {
    pub command: String,
}

#[derive(Deserialize)]
pub struct FreezeRequest {
    pub frozen: bool,
}

pub async fn get_table(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.view())
}

pub async fn get_state(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.status())
}

pub async fn get_system(data: web::Data<AppState>) -> impl Responder {
    match data.system_stats() {
        Some(stats) => HttpResponse::Ok().json(stats),
        None => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "error",
            "message": "No snapshot has been collected yet"
        })),
    }
}

pub async fn refresh(data: web::Data<AppState>) -> impl Responder {
    match data.get_processes().await {
        RefreshOutcome::Applied { generation } => HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "generation": generation
        })),
        RefreshOutcome::Coalesced | RefreshOutcome::Frozen => {
            HttpResponse::Accepted().json(serde_json::json!({
                "status": "pending",
                "message": "A refresh is already running; another one will follow it"
            }))
        }
        RefreshOutcome::Failed(e) => HttpResponse::BadGateway().json(serde_json::json!({
            "status": "error",
            "message": e.to_string()
        })),
    }
}

pub async fn set_search(data: web::Data<AppState>, req: web::Json<SearchRequest>) -> impl Responder {
    data.set_search_term(&req.term);
    HttpResponse::Ok().json(data.view())
}

pub async fn set_status_filter(
    data: web::Data<AppState>,
    req: web::Json<StatusFilterRequest>,
) -> impl Responder {
    data.set_status_filter(&req.status);
    HttpResponse::Ok().json(data.view())
}

pub async fn set_page(data: web::Data<AppState>, req: web::Json<PageRequest>) -> impl Responder {
    data.set_current_page(req.page);
    HttpResponse::Ok().json(data.view())
}

pub async fn toggle_sort(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let field = match path.into_inner().parse::<SortField>() {
        Ok(field) => field,
        Err(message) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "status": "error",
                "message": message
            }))
        }
    };

    data.toggle_sort(field);
    HttpResponse::Ok().json(data.view())
}

pub async fn toggle_pin(data: web::Data<AppState>, req: web::Json<PinRequest>) -> impl Responder {
    let pinned = data.toggle_pin(&req.command);
    HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "command": req.command,
        "pinned": pinned
    }))
}

pub async fn set_frozen(data: web::Data<AppState>, req: web::Json<FreezeRequest>) -> impl Responder {
    data.set_frozen(req.frozen);
    HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "frozen": req.frozen
    }))
}

pub async fn get_settings(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.settings())
}

pub async fn update_settings(
    data: web::Data<AppState>,
    req: web::Json<TableSettings>,
) -> impl Responder {
    match data.update_settings(req.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(data.settings()),
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({
            "status": "error",
            "message": e.to_string()
        })),
    }
}
