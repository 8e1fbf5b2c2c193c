use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::handle_database_error,
    model::{apperror::ApplicationError, models::CarSummaryType},
};

/**
 * Database response type for querying the car list.
 */
pub type QueryCarListDbResp = (i64, String, String, String, i32, Option<i64>, Option<String>, Option<String>);

/**
 * SQL query to retrieve all cars with their owner.
 */
const QUERY_CAR_LIST: &str = "SELECT c.id, c.vin, c.make, c.model, c.year_of_manufacture, o.id, o.name, o.email
                              FROM car c LEFT JOIN owner o ON c.owner_id = o.id
                              ORDER BY c.id";

/**
 * SQL query to check if a car exists.
 */
const CAR_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM car WHERE id = $1)";

/**
 * DAO for car related database operations.
 */
pub struct CarDao {}

impl CarDao {
    /**
     * Creates a new instance of `CarDao`.
     *
     * # Returns
     * A new instance of `CarDao`.
     */
    pub fn new() -> Self {
        CarDao {}
    }

    /**
     * Retrieves all cars together with their owners.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A Result containing the cars or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_car_list(&self, connection: &mut PgConnection) -> Result<Vec<CarSummaryType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryCarListDbResp> = sqlx::query_as(QUERY_CAR_LIST).fetch_all(connection).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(results.into_iter().map(CarSummaryType::from).collect())
    }

    /**
     * Checks whether a car exists.
     *
     * # Arguments
     * `connection`: The database connection.
     * `car_id`: The ID of the car.
     *
     * # Returns
     * A Result containing true if the car exists.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn car_exists(&self, connection: &mut PgConnection, car_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(CAR_EXISTS).bind(car_id).fetch_one(connection).instrument(span).await.map_err(|err| handle_database_error(&err))?;
        Ok(exists.0)
    }
}
