use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header,
    post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{CarEventResponse, CarResponse, ClaimAddRequest, ClaimResponse, InsuranceValidQuery, InsuranceValidityResponse, PolicyAddUpdateRequest, PolicyResponse},
        state::AppState,
    },
    model::apperror::ApplicationError,
};

/**
 * Endpoint to retrieve all cars with their owners.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listCars", trace_id = get_trace_id(&http_request), result))]
#[get("/api/cars")]
pub async fn cars_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let cars = app_state.car_service.get_car_list().instrument(span).await?;
    Ok(HttpResponse::Ok().json(cars.into_iter().map(CarResponse::from).collect::<Vec<CarResponse>>()))
}

/**
 * Endpoint to check whether a car is insured on a date.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "insuranceValid", trace_id = get_trace_id(&http_request), result))]
#[get("/api/cars/{carId}/insurance-valid")]
pub async fn insurance_valid(path: Path<i64>, query: web::Query<InsuranceValidQuery>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let car_id = path.into_inner();
    let date = query.validate()?;
    let valid = app_state.car_service.is_insurance_valid(car_id, date).instrument(span).await?;
    Ok(HttpResponse::Ok().json(InsuranceValidityResponse::new(car_id, date, valid)))
}

/**
 * Endpoint to register a claim against a car.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "addClaim", trace_id = get_trace_id(&http_request), result))]
#[post("/api/cars/{carId}/claims")]
pub async fn claim_add(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ClaimAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let car_id = path.into_inner();
    let claim_add_input = request_body.into_inner().validate(car_id)?;
    let claim = app_state.car_service.register_claim(claim_add_input).instrument(span).await?;
    let location = format!("/api/cars/{}/claims/{}", car_id, claim.id);
    Ok(HttpResponse::Created().insert_header((header::LOCATION, location)).json(ClaimResponse::from(claim)))
}

/**
 * Endpoint to retrieve a single claim of a car.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "getClaim", trace_id = get_trace_id(&http_request), result))]
#[get("/api/cars/{carId}/claims/{claimId}")]
pub async fn claim_get(path: Path<(i64, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (car_id, claim_id) = path.into_inner();
    let claim = app_state.car_service.get_claim(car_id, claim_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ClaimResponse::from(claim)))
}

/**
 * Endpoint to retrieve the policy and claim history of a car.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "carHistory", trace_id = get_trace_id(&http_request), result))]
#[get("/api/cars/{carId}/history")]
pub async fn car_history(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let car_id = path.into_inner();
    let events = app_state.car_service.get_history(car_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(events.into_iter().map(CarEventResponse::from).collect::<Vec<CarEventResponse>>()))
}

/**
 * Endpoint to create a policy.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "addPolicy", trace_id = get_trace_id(&http_request), result))]
#[post("/api/policies")]
pub async fn policy_add(http_request: HttpRequest, request_body: web::Json<PolicyAddUpdateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let policy_add_input = request_body.into_inner().validate()?;
    let policy = app_state.policy_service.create_policy(policy_add_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(PolicyResponse::from(policy)))
}

/**
 * Endpoint to update a policy.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "updatePolicy", trace_id = get_trace_id(&http_request), result))]
#[put("/api/policies/{policyId}")]
pub async fn policy_update(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<PolicyAddUpdateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let policy_id = path.into_inner();
    let policy_update_input = request_body.into_inner().validate()?;
    let policy = app_state.policy_service.update_policy(policy_id, policy_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(PolicyResponse::from(policy)))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
