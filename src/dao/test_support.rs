use sqlx::{PgConnection, PgPool};

/**
 * Initialize the database connection pool.
 */
pub async fn init_db() -> PgPool {
    dotenv::from_filename("./.env-test").ok();
    let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/**
 * Inserts a car without owner and returns its id.
 */
pub async fn insert_car(connection: &mut PgConnection, vin: &str) -> i64 {
    let car_id: (i64,) = sqlx::query_as("INSERT INTO car (vin, make, model, year_of_manufacture) VALUES ($1, 'Dacia', 'Logan', 2018) RETURNING id")
        .bind(vin)
        .fetch_one(connection)
        .await
        .unwrap();
    car_id.0
}

/**
 * Commits a car with a unique VIN and returns its id.
 */
pub async fn insert_committed_car(pool: &PgPool) -> i64 {
    let mut connection = pool.acquire().await.unwrap();
    insert_car(&mut connection, &format!("TESTVIN-{}", uuid::Uuid::new_v4())).await
}
