pub mod endpoints;
pub mod middleware;
pub mod rest;
pub mod state;

use actix_web::web;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Registers every endpoint of the API.
 */
pub fn configure_routes(config: &mut web::ServiceConfig) {
    config
        .service(endpoints::cars_list)
        .service(endpoints::insurance_valid)
        .service(endpoints::claim_add)
        .service(endpoints::claim_get)
        .service(endpoints::car_history)
        .service(endpoints::policy_add)
        .service(endpoints::policy_update);
}

/**
 * JSON extractor configuration turning unreadable bodies into bad requests.
 */
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _request| {
        tracing::debug!("Invalid request body: {}", err);
        ApplicationError::new(ErrorType::BadRequest, format!("Invalid request body: {err}")).into()
    })
}
