use actix_web::{web, HttpResponse, Responder};

use crate::services::KillError;
use crate::state::{AppState, KillOutcome};

fn not_found(pid: u32) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "status": "error",
        "message": format!("Process {} not found", pid)
    }))
}

pub async fn show_details(data: web::Data<AppState>, path: web::Path<u32>) -> impl Responder {
    let pid = path.into_inner();
    match data.find_process(pid) {
        Some(process) => {
            data.show_process_details(&process);
            HttpResponse::Ok().json(process)
        }
        None => not_found(pid),
    }
}

pub async fn get_details(data: web::Data<AppState>) -> impl Responder {
    match data.selected_process() {
        Some(process) => HttpResponse::Ok().json(process),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "status": "error",
            "message": "No process selected"
        })),
    }
}

pub async fn close_details(data: web::Data<AppState>) -> impl Responder {
    data.close_process_details();
    HttpResponse::NoContent().finish()
}

/// First step: stage the process and ask for confirmation
pub async fn request_kill(data: web::Data<AppState>, path: web::Path<u32>) -> impl Responder {
    let pid = path.into_inner();
    let Some(process) = data.find_process(pid) else {
        return not_found(pid);
    };

    if data.confirm_kill_process(&process) {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "confirm",
            "message": format!("Confirm killing '{}' (PID {})", process.name, pid),
            "process": process
        }))
    } else {
        HttpResponse::Conflict().json(serde_json::json!({
            "status": "error",
            "message": "Another kill is in progress"
        }))
    }
}

pub async fn cancel_kill(data: web::Data<AppState>) -> impl Responder {
    data.close_confirm_kill();
    HttpResponse::NoContent().finish()
}

/// Second step: kill the staged process
pub async fn confirm_kill(data: web::Data<AppState>) -> impl Responder {
    match data.handle_confirm_kill().await {
        Ok(KillOutcome::Killed { pid }) => HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "message": format!("Process {} killed", pid),
            "pid": pid
        })),
        Ok(KillOutcome::NothingPending) => HttpResponse::Conflict().json(serde_json::json!({
            "status": "error",
            "message": "No kill is awaiting confirmation"
        })),
        Err(e @ KillError::Refused { .. }) => HttpResponse::Forbidden().json(serde_json::json!({
            "status": "error",
            "message": e.to_string()
        })),
        Err(e @ KillError::Backend(_)) => HttpResponse::BadGateway().json(serde_json::json!({
            "status": "error",
            "message": e.to_string()
        })),
    }
}
