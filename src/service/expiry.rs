use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{Instrument, info, instrument};

use crate::{
    dao::policies::PolicyDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::ExpiredPolicyType,
    },
};

/**
 * Service flagging policies whose end date has passed.
 */
pub struct PolicyExpiryService {
    policy_dao: PolicyDao,
    connection_pool: Option<Pool<Postgres>>,
}

impl PolicyExpiryService {
    /**
     * Creates a new instance of `PolicyExpiryService`.
     *
     * # Arguments
     * `policy_dao`: The DAO for policy operations.
     * `connection_pool`: Optional connection pool for database operations.
     */
    pub fn new(policy_dao: PolicyDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        PolicyExpiryService { policy_dao, connection_pool }
    }

    /**
     * Runs one expiry check and swallows any failure after logging it.
     *
     * # Arguments
     * `today`: The date the check runs for.
     */
    pub async fn run_expiry_check(&self, today: NaiveDate) {
        match self.process_expired_policies(today).await {
            Ok(expired) => info!("Expiry check for {} flagged {} policies", today, expired.len()),
            Err(err) => tracing::error!("Error processing expired policies: {}", err),
        }
    }

    /**
     * Flags every expired, not yet notified policy in one transaction.
     *
     * # Arguments
     * `today`: Policies ending strictly before this date are expired.
     *
     * # Returns
     * A Result containing the policies flagged by this run.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn process_expired_policies(&self, today: NaiveDate) -> Result<Vec<ExpiredPolicyType>, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()));
        };
        let mut transaction = connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.flag_expired_policies(&mut transaction, today).await {
            Ok(expired) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(expired)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    async fn flag_expired_policies(&self, transaction: &mut PgConnection, today: NaiveDate) -> Result<Vec<ExpiredPolicyType>, ApplicationError> {
        let expired = self.policy_dao.get_expired_not_notified(transaction, today).await?;
        for policy in &expired {
            info!("Policy {} for car {} expired on {}", policy.id, policy.car_id, policy.end_date);
            self.policy_dao.set_expiry_notified(transaction, policy.id).await?;
        }
        Ok(expired)
    }
}

/**
 * Parses the configured time of day, `HH:MM:SS`.
 */
pub fn parse_run_time(value: &str) -> Result<NaiveTime, ApplicationError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid expiry check time {value}: {err}")))
}

/**
 * Time left until the next occurrence of `run_at`. A run time equal to `now` is scheduled for tomorrow.
 *
 * # Arguments
 * `now`: The current local date and time.
 * `run_at`: The time of day the job runs.
 */
pub fn duration_until_next_run(now: NaiveDateTime, run_at: NaiveTime) -> Duration {
    let mut next_run = now.date().and_time(run_at);
    if next_run <= now {
        next_run += TimeDelta::days(1);
    }
    (next_run - now).to_std().unwrap_or(Duration::ZERO)
}

/**
 * Background task running the expiry check once a day at `run_at` local time.
 *
 * Each run is spawned as its own task, so even a panic inside a run only costs that day's run.
 *
 * # Arguments
 * `expiry_service`: The service doing the work.
 * `run_at`: The time of day the job runs.
 */
pub async fn run_expiry_scheduler(expiry_service: Arc<PolicyExpiryService>, run_at: NaiveTime) {
    info!("Policy expiry check scheduled daily at {}", run_at);
    loop {
        let wait = duration_until_next_run(Local::now().naive_local(), run_at);
        tracing::debug!("Next policy expiry check in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;
        let today = Local::now().date_naive();
        let service = expiry_service.clone();
        let span = tracing::info_span!("policy_expiry_check", %today);
        let run = tokio::spawn(async move { service.run_expiry_check(today).await }.instrument(span));
        if let Err(err) = run.await {
            tracing::error!("Policy expiry check aborted: {}", err);
        }
    }
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::test_support::{init_db, insert_car, insert_committed_car},
        model::models::PolicyAddUpdateInputType,
    };

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[sqlx::test]
    async fn test_flag_expired_policies_is_idempotent() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let policy_dao = PolicyDao::new();
        let car_id = insert_car(&mut transaction, "TESTVIN-EXPIRY").await;
        let policy = policy_dao
            .add_policy(&mut transaction, PolicyAddUpdateInputType { car_id, provider: "Allianz".to_string(), start_date: date("2020-01-01"), end_date: date("2020-12-31") })
            .await
            .unwrap();
        let service = PolicyExpiryService::new(PolicyDao::new(), None);
        let first = service.flag_expired_policies(&mut transaction, date("2021-01-01")).await.unwrap();
        assert!(first.iter().any(|expired| expired.id == policy.id));
        let second = service.flag_expired_policies(&mut transaction, date("2021-01-01")).await.unwrap();
        assert!(second.is_empty());
        let stored = policy_dao.get_policy(&mut transaction, policy.id).await.unwrap().unwrap();
        assert!(stored.expiry_notified);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_process_expired_policies_commits_once() {
        let pool = init_db().await;
        let policy_dao = PolicyDao::new();
        let car_id = insert_committed_car(&pool).await;
        let mut connection = pool.acquire().await.unwrap();
        let policy = policy_dao
            .add_policy(&mut connection, PolicyAddUpdateInputType { car_id, provider: "Groupama".to_string(), start_date: date("2019-01-01"), end_date: date("2019-12-31") })
            .await
            .unwrap();
        drop(connection);
        let service = PolicyExpiryService::new(PolicyDao::new(), Some(pool.clone()));
        let first = service.process_expired_policies(date("2020-01-01")).await.unwrap();
        assert!(first.iter().any(|expired| expired.id == policy.id && expired.car_id == car_id));
        let second = service.process_expired_policies(date("2020-01-01")).await.unwrap();
        assert!(second.is_empty());
        let mut connection = pool.acquire().await.unwrap();
        let stored = policy_dao.get_policy(&mut connection, policy.id).await.unwrap().unwrap();
        assert!(stored.expiry_notified);
    }
}
