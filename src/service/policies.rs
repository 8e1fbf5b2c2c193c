use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{cars::CarDao, policies::PolicyDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PolicyAddUpdateInputType, PolicyType},
    },
};

/**
 * Represents the service for managing insurance policies.
 */
pub struct PolicyService {
    car_dao: CarDao,
    policy_dao: PolicyDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl PolicyService {
    /**
     * Creates a new instance of `PolicyService`.
     *
     * # Arguments
     * `car_dao`: The DAO for car operations.
     * `policy_dao`: The DAO for policy operations.
     * `connection_pool`: Optional connection pool for database operations.
     *
     * # Returns
     * A new instance of `PolicyService`.
     */
    pub fn new(car_dao: CarDao, policy_dao: PolicyDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        PolicyService { car_dao, policy_dao, connection_pool }
    }

    /**
     * Creates a policy for an existing car.
     *
     * # Arguments
     * `policy_add_input`: The validated policy.
     *
     * # Returns
     * A Result containing the stored policy, or `BadRequest` when the car is unknown.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn create_policy(&self, policy_add_input: PolicyAddUpdateInputType) -> Result<PolicyType, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()));
        };
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let result = match self.ensure_car_exists(&mut transaction, policy_add_input.car_id).await {
            Ok(()) => self.policy_dao.add_policy(&mut transaction, policy_add_input).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(policy) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(policy)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Overwrites car, provider and dates of an existing policy. The expiry flag is kept.
     *
     * # Arguments
     * `policy_id`: The ID of the policy to update.
     * `policy_update_input`: The validated policy.
     *
     * # Returns
     * A Result containing the updated policy, `NotFound` when the policy is unknown or `BadRequest` when the car is unknown.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn update_policy(&self, policy_id: i64, policy_update_input: PolicyAddUpdateInputType) -> Result<PolicyType, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()));
        };
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let result = match self.ensure_policy_and_car_exist(&mut transaction, policy_id, policy_update_input.car_id).await {
            Ok(()) => self.policy_dao.update_policy(&mut transaction, policy_id, policy_update_input).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(policy) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(policy)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Fails with `BadRequest` unless the referenced car exists.
     */
    async fn ensure_car_exists(&self, connection: &mut PgConnection, car_id: i64) -> Result<(), ApplicationError> {
        if self.car_dao.car_exists(connection, car_id).await? {
            return Ok(());
        }
        tracing::debug!("Policy references unknown car {}", car_id);
        Err(ApplicationError::new(ErrorType::BadRequest, format!("Car {car_id} does not exist")))
    }

    /**
     * Policy existence is checked first so an unknown policy wins over an unknown car.
     */
    async fn ensure_policy_and_car_exist(&self, connection: &mut PgConnection, policy_id: i64, car_id: i64) -> Result<(), ApplicationError> {
        if self.policy_dao.get_policy(connection, policy_id).await?.is_none() {
            tracing::debug!("Policy with id {} not found for update", policy_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Policy not found".to_string()));
        }
        self.ensure_car_exists(connection, car_id).await
    }
}
