use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType, FieldError},
    models::{CarEventType, CarSummaryType, ClaimAddInputType, ClaimType, PolicyAddUpdateInputType, PolicyType, VALIDITY_FIRST_YEAR, VALIDITY_LAST_YEAR, is_within_validity_range},
};

const MUST_NOT_BE_NULL: &str = "must not be null";
const MUST_NOT_BE_BLANK: &str = "must not be blank";
const MUST_BE_POSITIVE: &str = "must be greater than 0";

/***************** Cars models *********************/

/**
 * Car as returned by the car list.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarResponse {
    id: i64,
    vin: String,
    make: String,
    model: String,
    year: i32,
    owner_id: Option<i64>,
    owner_name: Option<String>,
    owner_email: Option<String>,
}

impl From<CarSummaryType> for CarResponse {
    fn from(car: CarSummaryType) -> Self {
        CarResponse {
            id: car.id,
            vin: car.vin,
            make: car.make,
            model: car.model,
            year: car.year_of_manufacture,
            owner_id: car.owner_id,
            owner_name: car.owner_name,
            owner_email: car.owner_email,
        }
    }
}

/***************** Insurance validity models *********************/

/**
 * Query parameters for the insurance validity check.
 */
#[derive(Debug, Deserialize)]
pub struct InsuranceValidQuery {
    /**
     * The date to check, formatted `YYYY-MM-DD`.
     */
    pub date: Option<String>,
}

impl InsuranceValidQuery {
    /**
     * Parses the date and checks it lies within the accepted range.
     *
     * # Returns
     * The parsed date or a validation error on `date`.
     */
    pub fn validate(&self) -> Result<NaiveDate, ApplicationError> {
        let Some(value) = &self.date else {
            return Err(ApplicationError::validation(vec![FieldError::new("date", MUST_NOT_BE_NULL)]));
        };
        let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") else {
            return Err(ApplicationError::validation(vec![FieldError::new("date", "Invalid date format. Must be YYYY-MM-DD.")]));
        };
        if !is_within_validity_range(date) {
            let message = format!("must be between {VALIDITY_FIRST_YEAR}-01-01 and {VALIDITY_LAST_YEAR}-12-31");
            return Err(ApplicationError::validation(vec![FieldError::new("date", &message)]));
        }
        Ok(date)
    }
}

/**
 * Result of the insurance validity check.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceValidityResponse {
    car_id: i64,
    date: String,
    valid: bool,
}

impl InsuranceValidityResponse {
    pub fn new(car_id: i64, date: NaiveDate, valid: bool) -> Self {
        InsuranceValidityResponse { car_id, date: date.to_string(), valid }
    }
}

/***************** Claims models *********************/

/**
 * Request body for registering a claim. Every field is optional so missing values surface as field errors.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimAddRequest {
    pub car_id: Option<i64>,
    pub claim_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
}

impl ClaimAddRequest {
    /**
     * Validates the request against the car id from the path.
     *
     * # Arguments
     * `path_car_id`: The car id the claim is posted under.
     *
     * # Returns
     * The validated claim or a validation error listing every failed field.
     */
    pub fn validate(self, path_car_id: i64) -> Result<ClaimAddInputType, ApplicationError> {
        let mut field_errors: Vec<FieldError> = vec![];
        match self.car_id {
            None => field_errors.push(FieldError::new("carId", MUST_NOT_BE_NULL)),
            Some(car_id) if car_id != path_car_id => field_errors.push(FieldError::new("carId", "must match the car id in the path")),
            Some(_) => {}
        }
        if self.claim_date.is_none() {
            field_errors.push(FieldError::new("claimDate", MUST_NOT_BE_NULL));
        }
        if is_blank(self.description.as_deref()) {
            field_errors.push(FieldError::new("description", MUST_NOT_BE_BLANK));
        }
        match self.amount {
            None => field_errors.push(FieldError::new("amount", MUST_NOT_BE_NULL)),
            Some(amount) if amount <= Decimal::ZERO => field_errors.push(FieldError::new("amount", MUST_BE_POSITIVE)),
            Some(_) => {}
        }
        match (self.car_id, self.claim_date, self.description, self.amount) {
            (Some(car_id), Some(claim_date), Some(description), Some(amount)) if field_errors.is_empty() => Ok(ClaimAddInputType { car_id, claim_date, description, amount }),
            _ => Err(ApplicationError::validation(field_errors)),
        }
    }
}

/**
 * Claim as returned by the API.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    car_id: i64,
    id: i64,
    claim_date: NaiveDate,
    description: String,
    amount: Decimal,
}

impl From<ClaimType> for ClaimResponse {
    fn from(claim: ClaimType) -> Self {
        ClaimResponse { car_id: claim.car_id, id: claim.id, claim_date: claim.claim_date, description: claim.description, amount: claim.amount }
    }
}

/***************** History models *********************/

/**
 * Entry in the history of a car.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarEventResponse {
    event_type: String,
    event_date: NaiveDate,
    description: String,
}

impl From<CarEventType> for CarEventResponse {
    fn from(event: CarEventType) -> Self {
        CarEventResponse { event_type: event.event_kind.to_string(), event_date: event.event_date, description: event.description }
    }
}

/***************** Policies models *********************/

/**
 * Request body for creating or updating a policy.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAddUpdateRequest {
    pub car_id: Option<i64>,
    pub provider: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PolicyAddUpdateRequest {
    /**
     * Validates the request.
     *
     * # Returns
     * The validated policy or a validation error listing every failed field.
     */
    pub fn validate(self) -> Result<PolicyAddUpdateInputType, ApplicationError> {
        let mut field_errors: Vec<FieldError> = vec![];
        if self.car_id.is_none() {
            field_errors.push(FieldError::new("carId", MUST_NOT_BE_NULL));
        }
        if is_blank(self.provider.as_deref()) {
            field_errors.push(FieldError::new("provider", MUST_NOT_BE_BLANK));
        }
        if self.start_date.is_none() {
            field_errors.push(FieldError::new("startDate", MUST_NOT_BE_NULL));
        }
        match (self.start_date, self.end_date) {
            (_, None) => field_errors.push(FieldError::new("endDate", MUST_NOT_BE_NULL)),
            (Some(start_date), Some(end_date)) if end_date < start_date => field_errors.push(FieldError::new("endDate", "must not be before startDate")),
            _ => {}
        }
        match (self.car_id, self.provider, self.start_date, self.end_date) {
            (Some(car_id), Some(provider), Some(start_date), Some(end_date)) if field_errors.is_empty() => Ok(PolicyAddUpdateInputType { car_id, provider, start_date, end_date }),
            _ => Err(ApplicationError::validation(field_errors)),
        }
    }
}

/**
 * Policy as returned by the API.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    car_id: i64,
    id: i64,
    provider: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl From<PolicyType> for PolicyResponse {
    fn from(policy: PolicyType) -> Self {
        PolicyResponse { car_id: policy.car_id, id: policy.id, provider: policy.provider, start_date: policy.start_date, end_date: policy.end_date }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error. Field errors are rendered as a field to message map.
     */
    fn error_response(&self) -> HttpResponse {
        if !self.field_errors.is_empty() {
            let mut fields = serde_json::Map::new();
            for field_error in &self.field_errors {
                fields.entry(field_error.field.clone()).or_insert_with(|| serde_json::Value::String(field_error.message.clone()));
            }
            return HttpResponse::build(self.status_code()).json(fields);
        }
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(self.status_code()).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::BadRequest | ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::Initialization | ErrorType::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::NotFound => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::BadRequest => 1004,
        ErrorType::Validation => 1005,
        ErrorType::ConstraintViolation => 1006,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn fields(error: &ApplicationError) -> Vec<(&str, &str)> {
        error.field_errors.iter().map(|field_error| (field_error.field.as_str(), field_error.message.as_str())).collect()
    }

    #[test]
    fn test_insurance_valid_query() {
        let query = InsuranceValidQuery { date: Some("2025-09-10".to_string()) };
        assert_eq!(query.validate().unwrap(), date("2025-09-10"));
    }

    #[test]
    fn test_insurance_valid_query_errors() {
        let error = InsuranceValidQuery { date: Some("2125-09-10".to_string()) }.validate().unwrap_err();
        assert_eq!(fields(&error), vec![("date", "must be between 1900-01-01 and 2100-12-31")]);
        let error = InsuranceValidQuery { date: Some("09-10-2025".to_string()) }.validate().unwrap_err();
        assert_eq!(fields(&error), vec![("date", "Invalid date format. Must be YYYY-MM-DD.")]);
        let error = InsuranceValidQuery { date: Some("2025-02-30".to_string()) }.validate().unwrap_err();
        assert_eq!(fields(&error), vec![("date", "Invalid date format. Must be YYYY-MM-DD.")]);
        let error = InsuranceValidQuery { date: None }.validate().unwrap_err();
        assert_eq!(fields(&error), vec![("date", "must not be null")]);
    }

    #[test]
    fn test_claim_validate() {
        let request = ClaimAddRequest { car_id: Some(1), claim_date: Some(date("2025-09-10")), description: Some("Collision".to_string()), amount: Some(Decimal::from(1000)) };
        let input = request.validate(1).unwrap();
        assert_eq!(input, ClaimAddInputType { car_id: 1, claim_date: date("2025-09-10"), description: "Collision".to_string(), amount: Decimal::from(1000) });
    }

    #[test]
    fn test_claim_validate_missing_fields() {
        let request = ClaimAddRequest { car_id: Some(1), claim_date: None, description: Some("  ".to_string()), amount: Some(Decimal::from(-100)) };
        let error = request.validate(1).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(fields(&error), vec![("claimDate", "must not be null"), ("description", "must not be blank"), ("amount", "must be greater than 0")]);
        let request = ClaimAddRequest { car_id: None, claim_date: None, description: None, amount: Some(Decimal::ZERO) };
        let error = request.validate(1).unwrap_err();
        assert_eq!(fields(&error), vec![("carId", "must not be null"), ("claimDate", "must not be null"), ("description", "must not be blank"), ("amount", "must be greater than 0")]);
    }

    #[test]
    fn test_claim_validate_car_id_mismatch() {
        let request = ClaimAddRequest { car_id: Some(2), claim_date: Some(date("2025-09-10")), description: Some("Collision".to_string()), amount: Some(Decimal::from(1000)) };
        let error = request.validate(1).unwrap_err();
        assert_eq!(fields(&error), vec![("carId", "must match the car id in the path")]);
    }

    #[test]
    fn test_policy_validate() {
        let request = PolicyAddUpdateRequest { car_id: Some(1), provider: Some("Allianz".to_string()), start_date: Some(date("2025-01-01")), end_date: Some(date("2026-01-01")) };
        let input = request.validate().unwrap();
        assert_eq!(input.provider, "Allianz");
        assert_eq!(input.end_date, date("2026-01-01"));
        let request = PolicyAddUpdateRequest { car_id: Some(1), provider: Some("Allianz".to_string()), start_date: Some(date("2025-01-01")), end_date: Some(date("2025-01-01")) };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_policy_validate_errors() {
        let request = PolicyAddUpdateRequest { car_id: Some(1), provider: Some("Allianz".to_string()), start_date: Some(date("2025-01-01")), end_date: None };
        assert_eq!(fields(&request.validate().unwrap_err()), vec![("endDate", "must not be null")]);
        let request = PolicyAddUpdateRequest { car_id: None, provider: Some("".to_string()), start_date: None, end_date: None };
        assert_eq!(
            fields(&request.validate().unwrap_err()),
            vec![("carId", "must not be null"), ("provider", "must not be blank"), ("startDate", "must not be null"), ("endDate", "must not be null")]
        );
        let request = PolicyAddUpdateRequest { car_id: Some(1), provider: Some("Allianz".to_string()), start_date: Some(date("2025-01-01")), end_date: Some(date("2024-12-31")) };
        assert_eq!(fields(&request.validate().unwrap_err()), vec![("endDate", "must not be before startDate")]);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApplicationError::new(ErrorType::NotFound, "".to_string()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApplicationError::new(ErrorType::BadRequest, "".to_string()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApplicationError::validation(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApplicationError::new(ErrorType::ConstraintViolation, "".to_string()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ApplicationError::new(ErrorType::DatabaseError, "".to_string()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_claim_amount_keeps_json_precision() {
        let request: ClaimAddRequest = serde_json::from_str(r#"{ "carId": 1, "claimDate": "2025-09-10", "description": "Collision", "amount": 12345678901234567.891 }"#).unwrap();
        assert_eq!(request.amount, Some("12345678901234567.891".parse::<Decimal>().unwrap()));
        let request: ClaimAddRequest = serde_json::from_str(r#"{ "amount": 0.001 }"#).unwrap();
        assert_eq!(request.amount.unwrap().to_string(), "0.001");
        let claim = ClaimType { id: 1, car_id: 1, claim_date: date("2025-09-10"), description: "Collision".to_string(), amount: Decimal::from(1500) };
        assert_eq!(serde_json::to_string(&ClaimResponse::from(claim)).unwrap(), r#"{"carId":1,"id":1,"claimDate":"2025-09-10","description":"Collision","amount":1500}"#);
    }
}
