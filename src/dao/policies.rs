use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::handle_database_error,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{ExpiredPolicyType, PolicyAddUpdateInputType, PolicyType},
    },
};

/**
 * Database response type for querying policies.
 */
pub type QueryPolicyDbResp = (i64, i64, String, NaiveDate, NaiveDate, bool);

/**
 * Database response type for querying expired policies.
 */
pub type QueryExpiredPolicyDbResp = (i64, i64, NaiveDate);

/**
 * SQL query to check if a car has a policy covering a date. Both ends of the range are inclusive.
 */
const POLICY_ACTIVE_ON_DATE: &str = "SELECT EXISTS (SELECT 1 FROM insurance_policy WHERE car_id = $1 AND start_date <= $2 AND end_date >= $2)";

/**
 * SQL query to retrieve the policies of a car.
 */
const QUERY_POLICIES_BY_CAR: &str = "SELECT id, car_id, provider, start_date, end_date, expiry_notified FROM insurance_policy WHERE car_id = $1 ORDER BY id";

/**
 * SQL query to retrieve a policy.
 */
const QUERY_POLICY: &str = "SELECT id, car_id, provider, start_date, end_date, expiry_notified FROM insurance_policy WHERE id = $1";

/**
 * SQL query to add a policy.
 */
const ADD_POLICY: &str = "INSERT INTO insurance_policy (car_id, provider, start_date, end_date, expiry_notified) VALUES ($1, $2, $3, $4, FALSE)
                          RETURNING id, car_id, provider, start_date, end_date, expiry_notified";

/**
 * SQL query to update a policy. The expiry flag is owned by the expiry job and left alone.
 */
const UPDATE_POLICY: &str = "UPDATE insurance_policy SET car_id = $1, provider = $2, start_date = $3, end_date = $4 WHERE id = $5
                             RETURNING id, car_id, provider, start_date, end_date, expiry_notified";

/**
 * SQL query to retrieve expired policies not yet notified. Rows are locked until the transaction ends.
 */
const QUERY_EXPIRED_NOT_NOTIFIED: &str = "SELECT id, car_id, end_date FROM insurance_policy WHERE end_date < $1 AND expiry_notified = FALSE ORDER BY id FOR UPDATE";

/**
 * SQL query to flag a policy as notified.
 */
const SET_EXPIRY_NOTIFIED: &str = "UPDATE insurance_policy SET expiry_notified = TRUE WHERE id = $1";

/**
 * DAO for policy related database operations.
 */
pub struct PolicyDao {}

impl PolicyDao {
    /**
     * Creates a new instance of `PolicyDao`.
     *
     * # Returns
     * A new instance of `PolicyDao`.
     */
    pub fn new() -> Self {
        PolicyDao {}
    }

    /**
     * Checks whether a car has a policy covering the given date.
     *
     * # Arguments
     * `connection`: The database connection.
     * `car_id`: The ID of the car.
     * `date`: The date to check.
     *
     * # Returns
     * A Result containing true if a policy covers the date.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn exists_active_on_date(&self, connection: &mut PgConnection, car_id: i64, date: NaiveDate) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(POLICY_ACTIVE_ON_DATE).bind(car_id).bind(date).fetch_one(connection).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(exists.0)
    }

    /**
     * Retrieves the policies of a car ordered by id.
     *
     * # Arguments
     * `connection`: The database connection.
     * `car_id`: The ID of the car.
     *
     * # Returns
     * A Result containing the policies or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_policies_by_car(&self, connection: &mut PgConnection, car_id: i64) -> Result<Vec<PolicyType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryPolicyDbResp> = sqlx::query_as(QUERY_POLICIES_BY_CAR).bind(car_id).fetch_all(connection).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(results.into_iter().map(PolicyType::from).collect())
    }

    /**
     * Retrieves a policy by its ID.
     *
     * # Arguments
     * `connection`: The database connection.
     * `policy_id`: The ID of the policy.
     *
     * # Returns
     * A Result containing the policy if it exists.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_policy(&self, connection: &mut PgConnection, policy_id: i64) -> Result<Option<PolicyType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryPolicyDbResp> = sqlx::query_as(QUERY_POLICY).bind(policy_id).fetch_optional(connection).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(result.map(PolicyType::from))
    }

    /**
     * Adds a new policy to the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `policy_add_input`: The input containing details of the policy to be added.
     *
     * # Returns
     * A Result containing the stored policy.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_policy(&self, transaction: &mut PgConnection, policy_add_input: PolicyAddUpdateInputType) -> Result<PolicyType, ApplicationError> {
        let span = tracing::Span::current();
        let result: QueryPolicyDbResp = sqlx::query_as(ADD_POLICY)
            .bind(policy_add_input.car_id)
            .bind(policy_add_input.provider)
            .bind(policy_add_input.start_date)
            .bind(policy_add_input.end_date)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(PolicyType::from(result))
    }

    /**
     * Updates an existing policy in the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `policy_id`: The ID of the policy to be updated.
     * `policy_update_input`: The input containing updated details of the policy.
     *
     * # Returns
     * A Result containing the updated policy.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_policy(&self, transaction: &mut PgConnection, policy_id: i64, policy_update_input: PolicyAddUpdateInputType) -> Result<PolicyType, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryPolicyDbResp> = sqlx::query_as(UPDATE_POLICY)
            .bind(policy_update_input.car_id)
            .bind(policy_update_input.provider)
            .bind(policy_update_input.start_date)
            .bind(policy_update_input.end_date)
            .bind(policy_id)
            .fetch_optional(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        let Some(result) = result else {
            tracing::debug!("Policy with id {} not found for update", policy_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Policy not found".to_string()));
        };
        Ok(PolicyType::from(result))
    }

    /**
     * Retrieves policies that ended before `today` and have not been flagged yet.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `today`: The current date.
     *
     * # Returns
     * A Result containing the expired policies ordered by id.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn get_expired_not_notified(&self, transaction: &mut PgConnection, today: NaiveDate) -> Result<Vec<ExpiredPolicyType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryExpiredPolicyDbResp> = sqlx::query_as(QUERY_EXPIRED_NOT_NOTIFIED).bind(today).fetch_all(transaction).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(results.into_iter().map(ExpiredPolicyType::from).collect())
    }

    /**
     * Flags a policy as notified about its expiry.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `policy_id`: The ID of the policy.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn set_expiry_notified(&self, transaction: &mut PgConnection, policy_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(SET_EXPIRY_NOTIFIED).bind(policy_id).execute(transaction).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Policy with id {} not found when flagging expiry", policy_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Policy not found".to_string()));
        }
        Ok(())
    }
}
