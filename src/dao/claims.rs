use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::handle_database_error,
    model::{
        apperror::ApplicationError,
        models::{ClaimAddInputType, ClaimType},
    },
};

/**
 * Database response type for querying claims.
 */
pub type QueryClaimDbResp = (i64, i64, NaiveDate, String, Decimal);

/**
 * SQL query to retrieve the claims of a car, oldest first.
 */
const QUERY_CLAIMS_BY_CAR: &str = "SELECT id, car_id, claim_date, description, amount FROM insurance_claim WHERE car_id = $1 ORDER BY claim_date, id";

/**
 * SQL query to retrieve a single claim of a car.
 */
const QUERY_CLAIM: &str = "SELECT id, car_id, claim_date, description, amount FROM insurance_claim WHERE car_id = $1 AND id = $2";

/**
 * SQL query to add a claim.
 */
const ADD_CLAIM: &str = "INSERT INTO insurance_claim (car_id, claim_date, description, amount) VALUES ($1, $2, $3, $4)
                         RETURNING id, car_id, claim_date, description, amount";

/**
 * DAO for claim related database operations.
 */
pub struct ClaimDao {}

impl ClaimDao {
    /**
     * Creates a new instance of `ClaimDao`.
     *
     * # Returns
     * A new instance of `ClaimDao`.
     */
    pub fn new() -> Self {
        ClaimDao {}
    }

    /**
     * Retrieves the claims of a car ordered by claim date.
     *
     * # Arguments
     * `connection`: The database connection.
     * `car_id`: The ID of the car.
     *
     * # Returns
     * A Result containing the claims or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_claims_by_car(&self, connection: &mut PgConnection, car_id: i64) -> Result<Vec<ClaimType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryClaimDbResp> = sqlx::query_as(QUERY_CLAIMS_BY_CAR).bind(car_id).fetch_all(connection).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(results.into_iter().map(ClaimType::from).collect())
    }

    /**
     * Retrieves a claim belonging to a car.
     *
     * # Arguments
     * `connection`: The database connection.
     * `car_id`: The ID of the car.
     * `claim_id`: The ID of the claim.
     *
     * # Returns
     * A Result containing the claim if it exists.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_claim(&self, connection: &mut PgConnection, car_id: i64, claim_id: i64) -> Result<Option<ClaimType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryClaimDbResp> = sqlx::query_as(QUERY_CLAIM).bind(car_id).bind(claim_id).fetch_optional(connection).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(result.map(ClaimType::from))
    }

    /**
     * Adds a new claim to the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `claim_add_input`: The input containing details of the claim to be added.
     *
     * # Returns
     * A Result containing the stored claim.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_claim(&self, transaction: &mut PgConnection, claim_add_input: ClaimAddInputType) -> Result<ClaimType, ApplicationError> {
        let span = tracing::Span::current();
        let result: QueryClaimDbResp = sqlx::query_as(ADD_CLAIM)
            .bind(claim_add_input.car_id)
            .bind(claim_add_input.claim_date)
            .bind(claim_add_input.description)
            .bind(claim_add_input.amount)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(ClaimType::from(result))
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::test_support::{init_db, insert_car};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[sqlx::test]
    async fn test_add_then_list_claims() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let claim_dao = ClaimDao::new();
        let car_id = insert_car(&mut transaction, "TESTVIN-CLAIMS").await;
        let later = ClaimAddInputType { car_id, claim_date: date("2024-09-01"), description: "Hail".to_string(), amount: Decimal::new(80050, 2) };
        let earlier = ClaimAddInputType { car_id, claim_date: date("2024-06-15"), description: "Collision".to_string(), amount: Decimal::from(1500) };
        let later = claim_dao.add_claim(&mut transaction, later).await.unwrap();
        let earlier = claim_dao.add_claim(&mut transaction, earlier).await.unwrap();
        assert_eq!(earlier.amount, Decimal::from(1500));
        let claims = claim_dao.get_claims_by_car(&mut transaction, car_id).await.unwrap();
        assert_eq!(claims, vec![earlier.clone(), later]);
        assert_eq!(claim_dao.get_claim(&mut transaction, car_id, earlier.id).await.unwrap(), Some(earlier));
        assert_eq!(claim_dao.get_claim(&mut transaction, car_id, -1).await.unwrap(), None);
        transaction.rollback().await.unwrap();
    }
}
