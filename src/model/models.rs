use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/**
 * First year accepted by the insurance validity check.
 */
pub const VALIDITY_FIRST_YEAR: i32 = 1900;

/**
 * Last year accepted by the insurance validity check.
 */
pub const VALIDITY_LAST_YEAR: i32 = 2100;

/**
 * Checks that a date lies within [1900-01-01, 2100-12-31].
 */
pub fn is_within_validity_range(date: NaiveDate) -> bool {
    (VALIDITY_FIRST_YEAR..=VALIDITY_LAST_YEAR).contains(&date.year())
}

/***************** Cars *********************/

/**
 * Car together with the owner it references, if any.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct CarSummaryType {
    pub id: i64,
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year_of_manufacture: i32,
    pub owner_id: Option<i64>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
}

impl From<(i64, String, String, String, i32, Option<i64>, Option<String>, Option<String>)> for CarSummaryType {
    fn from(row: (i64, String, String, String, i32, Option<i64>, Option<String>, Option<String>)) -> Self {
        CarSummaryType { id: row.0, vin: row.1, make: row.2, model: row.3, year_of_manufacture: row.4, owner_id: row.5, owner_name: row.6, owner_email: row.7 }
    }
}

/***************** Policies *********************/

/**
 * Insurance policy as stored.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyType {
    pub id: i64,
    pub car_id: i64,
    pub provider: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub expiry_notified: bool,
}

impl PolicyType {
    pub fn new(id: i64, car_id: i64, provider: String, start_date: NaiveDate, end_date: NaiveDate, expiry_notified: bool) -> Self {
        PolicyType { id, car_id, provider, start_date, end_date, expiry_notified }
    }
}

impl From<(i64, i64, String, NaiveDate, NaiveDate, bool)> for PolicyType {
    fn from(row: (i64, i64, String, NaiveDate, NaiveDate, bool)) -> Self {
        PolicyType::new(row.0, row.1, row.2, row.3, row.4, row.5)
    }
}

/**
 * Validated input for creating or updating a policy.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAddUpdateInputType {
    pub car_id: i64,
    pub provider: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/**
 * Policy picked up by the expiry job.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiredPolicyType {
    pub id: i64,
    pub car_id: i64,
    pub end_date: NaiveDate,
}

impl From<(i64, i64, NaiveDate)> for ExpiredPolicyType {
    fn from(row: (i64, i64, NaiveDate)) -> Self {
        ExpiredPolicyType { id: row.0, car_id: row.1, end_date: row.2 }
    }
}

/***************** Claims *********************/

/**
 * Insurance claim as stored.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimType {
    pub id: i64,
    pub car_id: i64,
    pub claim_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

impl ClaimType {
    pub fn new(id: i64, car_id: i64, claim_date: NaiveDate, description: String, amount: Decimal) -> Self {
        ClaimType { id, car_id, claim_date, description, amount }
    }
}

impl From<(i64, i64, NaiveDate, String, Decimal)> for ClaimType {
    fn from(row: (i64, i64, NaiveDate, String, Decimal)) -> Self {
        ClaimType::new(row.0, row.1, row.2, row.3, row.4)
    }
}

/**
 * Validated input for registering a claim.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimAddInputType {
    pub car_id: i64,
    pub claim_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

/***************** History *********************/

/**
 * Kind of entry in a car history.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Policy,
    Claim,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventKind::Policy => write!(f, "POLICY"),
            EventKind::Claim => write!(f, "CLAIM"),
        }
    }
}

/**
 * A single entry in the history of a car.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct CarEventType {
    pub event_kind: EventKind,
    pub event_date: NaiveDate,
    pub description: String,
}

impl From<&PolicyType> for CarEventType {
    fn from(policy: &PolicyType) -> Self {
        CarEventType {
            event_kind: EventKind::Policy,
            event_date: policy.start_date,
            description: format!("Policy {} ({}) from {} to {}", policy.id, policy.provider, policy.start_date, policy.end_date),
        }
    }
}

impl From<&ClaimType> for CarEventType {
    fn from(claim: &ClaimType) -> Self {
        CarEventType { event_kind: EventKind::Claim, event_date: claim.claim_date, description: format!("Claim {}: {} (${})", claim.id, claim.description, claim.amount) }
    }
}

/**
 * Merges policies and claims into one timeline ordered by event date.
 *
 * Policies are appended before claims and the sort is stable, so a policy starting on the same
 * day as a claim comes first and the store order is kept otherwise.
 *
 * # Arguments
 * `policies`: Policies of the car.
 * `claims`: Claims of the car, ordered by claim date.
 *
 * # Returns
 * The merged history.
 */
pub fn merge_history(policies: &[PolicyType], claims: &[ClaimType]) -> Vec<CarEventType> {
    let mut events: Vec<CarEventType> = Vec::with_capacity(policies.len() + claims.len());
    events.extend(policies.iter().map(CarEventType::from));
    events.extend(claims.iter().map(CarEventType::from));
    events.sort_by_key(|event| event.event_date);
    events
}
