use crate::{
    api::service::{self, AppState, ServiceError},
    types::{BalancesRequest, ErrorBody},
};
use actix_web::{post, web, HttpResponse, HttpResponseBuilder};
use serde::Serialize;
use vault_aggregator::AccessorError;

fn respond<T: Serialize>(result: Result<T, ServiceError>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => {
            log::warn!("{e}");

            let mut builder: HttpResponseBuilder = match &e {
                ServiceError::UnknownToken { .. } => HttpResponse::NotFound(),
                ServiceError::Accessor(AccessorError::UnsupportedKind { .. }) => {
                    HttpResponse::UnprocessableEntity()
                }
                ServiceError::Accessor(AccessorError::Connection(_)) => HttpResponse::BadGateway(),
                ServiceError::Batch(_) => HttpResponse::ServiceUnavailable(),
            };

            builder.json(ErrorBody {
                error: e.to_string(),
            })
        }
    }
}

#[post("/balances")]
async fn balances(state: web::Data<AppState>, body: web::Json<BalancesRequest>) -> HttpResponse {
    log::info!("balances - {} on {} for {} wallets", body.token, body.chain, body.wallets.len());
    respond(service::balances(&state, &body).await)
}

#[post("/details")]
async fn details(state: web::Data<AppState>, body: web::Json<BalancesRequest>) -> HttpResponse {
    log::info!("details - {} on {} for {} wallets", body.token, body.chain, body.wallets.len());
    respond(service::details(&state, &body).await)
}
