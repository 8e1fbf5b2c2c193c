use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{cars::CarDao, claims::ClaimDao, policies::PolicyDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{CarEventType, CarSummaryType, ClaimAddInputType, ClaimType, merge_history},
    },
};

/**
 * Represents the service for cars, their insurance validity, history and claims.
 */
pub struct CarService {
    car_dao: CarDao,
    policy_dao: PolicyDao,
    claim_dao: ClaimDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl CarService {
    /**
     * Creates a new instance of `CarService`.
     *
     * # Arguments
     * `car_dao`: The DAO for car operations.
     * `policy_dao`: The DAO for policy operations.
     * `claim_dao`: The DAO for claim operations.
     * `connection_pool`: Optional connection pool for database operations.
     *
     * # Returns
     * A new instance of `CarService`.
     */
    pub fn new(car_dao: CarDao, policy_dao: PolicyDao, claim_dao: ClaimDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        CarService { car_dao, policy_dao, claim_dao, connection_pool }
    }

    fn connection_pool(&self) -> Result<&Pool<Postgres>, ApplicationError> {
        self.connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
    }

    /**
     * Fails with `NotFound` unless the car exists.
     */
    async fn ensure_car_exists(&self, connection: &mut PgConnection, car_id: i64) -> Result<(), ApplicationError> {
        if self.car_dao.car_exists(connection, car_id).await? {
            return Ok(());
        }
        tracing::debug!("Car with id {} not found", car_id);
        Err(ApplicationError::new(ErrorType::NotFound, "Car not found".to_string()))
    }

    /**
     * Retrieves all cars with their owners.
     *
     * # Returns
     * A Result containing the cars or an `ApplicationError`.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_car_list(&self) -> Result<Vec<CarSummaryType>, ApplicationError> {
        let mut connection = self.connection_pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.car_dao.get_car_list(&mut connection).await
    }

    /**
     * Checks whether a car is insured on a date.
     *
     * # Arguments
     * `car_id`: The ID of the car.
     * `date`: The date to check, already validated by the caller.
     *
     * # Returns
     * A Result containing true when a policy covers the date, or `NotFound` for an unknown car.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn is_insurance_valid(&self, car_id: i64, date: NaiveDate) -> Result<bool, ApplicationError> {
        let mut connection = self.connection_pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.ensure_car_exists(&mut connection, car_id).await?;
        let valid = self.policy_dao.exists_active_on_date(&mut connection, car_id, date).await?;
        tracing::Span::current().record("result", valid);
        Ok(valid)
    }

    /**
     * Retrieves the policies and claims of a car as one timeline.
     *
     * # Arguments
     * `car_id`: The ID of the car.
     *
     * # Returns
     * A Result containing the events ordered by date, or `NotFound` for an unknown car.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_history(&self, car_id: i64) -> Result<Vec<CarEventType>, ApplicationError> {
        let mut connection = self.connection_pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.ensure_car_exists(&mut connection, car_id).await?;
        let policies = self.policy_dao.get_policies_by_car(&mut connection, car_id).await?;
        let claims = self.claim_dao.get_claims_by_car(&mut connection, car_id).await?;
        Ok(merge_history(&policies, &claims))
    }

    /**
     * Registers a claim against a car.
     *
     * # Arguments
     * `claim_add_input`: The validated claim.
     *
     * # Returns
     * A Result containing the stored claim, or `NotFound` for an unknown car.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn register_claim(&self, claim_add_input: ClaimAddInputType) -> Result<ClaimType, ApplicationError> {
        let mut transaction = self.connection_pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        let result = match self.ensure_car_exists(&mut transaction, claim_add_input.car_id).await {
            Ok(()) => self.claim_dao.add_claim(&mut transaction, claim_add_input).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(claim) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(claim)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Retrieves a claim of a car.
     *
     * # Arguments
     * `car_id`: The ID of the car.
     * `claim_id`: The ID of the claim.
     *
     * # Returns
     * A Result containing the claim, or `NotFound` when the car or claim is unknown.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_claim(&self, car_id: i64, claim_id: i64) -> Result<ClaimType, ApplicationError> {
        let mut connection = self.connection_pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))?;
        self.ensure_car_exists(&mut connection, car_id).await?;
        self.claim_dao.get_claim(&mut connection, car_id, claim_id).await?.ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "Claim not found".to_string()))
    }
}

#[cfg(test)]
mod test {
    use rust_decimal::Decimal;

    use super::*;

    fn service_without_database() -> CarService {
        CarService::new(CarDao::new(), PolicyDao::new(), ClaimDao::new(), None)
    }

    #[actix_web::test]
    async fn test_no_database_connection() {
        let service = service_without_database();
        let date = NaiveDate::parse_from_str("2025-09-10", "%Y-%m-%d").unwrap();
        let result = service.is_insurance_valid(1, date).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::DatabaseError);
        let result = service.get_history(1).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::DatabaseError);
        let claim_add_input = ClaimAddInputType { car_id: 1, claim_date: date, description: "Collision".to_string(), amount: Decimal::from(1000) };
        let result = service.register_claim(claim_add_input).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::DatabaseError);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        dao::test_support::{init_db, insert_committed_car},
        model::models::EventKind,
    };

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[sqlx::test]
    async fn test_unknown_car() {
        let pool = init_db().await;
        let service = CarService::new(CarDao::new(), PolicyDao::new(), ClaimDao::new(), Some(pool));
        assert_eq!(service.is_insurance_valid(-1, date("2025-09-10")).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.get_history(-1).await.unwrap_err().error_type, ErrorType::NotFound);
        let claim_add_input = ClaimAddInputType { car_id: -1, claim_date: date("2025-09-10"), description: "Collision".to_string(), amount: Decimal::from(1000) };
        assert_eq!(service.register_claim(claim_add_input).await.unwrap_err().error_type, ErrorType::NotFound);
    }

    #[sqlx::test]
    async fn test_seeded_car_history_and_validity() {
        let pool = init_db().await;
        let service = CarService::new(CarDao::new(), PolicyDao::new(), ClaimDao::new(), Some(pool));
        let cars = service.get_car_list().await.unwrap();
        let car = cars.iter().find(|car| car.vin == "VIN12345").unwrap();
        assert_eq!(car.owner_name.as_deref(), Some("Ana Pop"));
        assert!(service.is_insurance_valid(car.id, date("2025-09-10")).await.unwrap());
        assert!(!service.is_insurance_valid(car.id, date("2023-09-10")).await.unwrap());
        let history = service.get_history(car.id).await.unwrap();
        assert!(history.windows(2).all(|pair| pair[0].event_date <= pair[1].event_date));
        assert!(history.iter().any(|event| event.event_kind == EventKind::Policy && event.event_date == date("2024-01-01")));
    }

    #[sqlx::test]
    async fn test_claim_amount_keeps_its_precision() {
        let pool = init_db().await;
        let car_id = insert_committed_car(&pool).await;
        let service = CarService::new(CarDao::new(), PolicyDao::new(), ClaimDao::new(), Some(pool));
        let collision = ClaimAddInputType { car_id, claim_date: date("2025-06-15"), description: "Collision".to_string(), amount: Decimal::from(1500) };
        let collision = service.register_claim(collision).await.unwrap();
        let scratch = ClaimAddInputType { car_id, claim_date: date("2025-07-01"), description: "Scratch".to_string(), amount: Decimal::new(10125, 3) };
        let scratch = service.register_claim(scratch).await.unwrap();
        let chip = ClaimAddInputType { car_id, claim_date: date("2025-08-01"), description: "Chip".to_string(), amount: Decimal::new(1, 3) };
        let chip = service.register_claim(chip).await.unwrap();
        assert_eq!(chip.amount.to_string(), "0.001");
        let history = service.get_history(car_id).await.unwrap();
        let descriptions: Vec<String> = history.into_iter().map(|event| event.description).collect();
        assert_eq!(
            descriptions,
            vec![
                format!("Claim {}: Collision ($1500)", collision.id),
                format!("Claim {}: Scratch ($10.125)", scratch.id),
                format!("Claim {}: Chip ($0.001)", chip.id),
            ]
        );
        assert_eq!(service.get_claim(car_id, scratch.id).await.unwrap().amount, Decimal::new(10125, 3));
    }
}
