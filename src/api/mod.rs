// ============================================================================
// Command API - HTTP entry point for order commands
// ============================================================================
//
//   POST   /pedido        create   201 | 409 | 400
//   DELETE /pedido/{id}   cancel   200 | 204 | 400
//   GET    /pedido/{id}   find     200 | 404 | 400   (?status=CREATED|...)
//
// Rejections are not broken down for the caller: a missing customer and
// an out-of-stock product both answer 409.
//
// ============================================================================

use std::sync::Arc;

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::domain::order::{
    CancelOutcome, CreateOrder, CreateOutcome, OrderCommandHandler, OrderError, OrderStatus,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pedido")
            .route("", web::post().to(create_order))
            .route("/{id}", web::delete().to(cancel_order))
            .route("/{id}", web::get().to(get_order)),
    );
}

pub fn handler_data(handler: Arc<OrderCommandHandler>) -> web::Data<OrderCommandHandler> {
    web::Data::from(handler)
}

impl ResponseError for OrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::Store(_) | OrderError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            OrderError::Validation(e) => e.to_string(),
            other => {
                tracing::error!(error = %other, "Order command failed");
                "Internal error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

async fn create_order(
    handler: web::Data<OrderCommandHandler>,
    body: web::Json<CreateOrder>,
) -> Result<HttpResponse, OrderError> {
    match handler.create(body.into_inner()).await? {
        CreateOutcome::Created(order) => Ok(HttpResponse::Created().json(order)),
        CreateOutcome::Rejected(_) => Ok(HttpResponse::Conflict()
            .json(serde_json::json!({ "error": "Order could not be created" }))),
    }
}

async fn cancel_order(
    handler: web::Data<OrderCommandHandler>,
    path: web::Path<i64>,
) -> Result<HttpResponse, OrderError> {
    match handler.cancel(path.into_inner()).await? {
        CancelOutcome::Cancelled(order) => Ok(HttpResponse::Ok().json(order)),
        CancelOutcome::NotApplicable => Ok(HttpResponse::NoContent().finish()),
    }
}

#[derive(Debug, Deserialize)]
struct StatusFilter {
    status: Option<OrderStatus>,
}

async fn get_order(
    handler: web::Data<OrderCommandHandler>,
    path: web::Path<i64>,
    filter: web::Query<StatusFilter>,
) -> Result<HttpResponse, OrderError> {
    match handler.find(path.into_inner(), filter.status).await? {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Ok(HttpResponse::NotFound().finish()),
    }
}
