use crate::service::{cars::CarService, policies::PolicyService};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The car service for validity checks, history and claims.
     */
    pub car_service: CarService,
    /**
     * The policy service for creating and updating policies.
     */
    pub policy_service: PolicyService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `car_service`: The car service for validity checks, history and claims.
 * `policy_service`: The policy service for creating and updating policies.
 */
impl AppState {
    pub fn new(car_service: CarService, policy_service: PolicyService) -> Self {
        AppState { car_service, policy_service }
    }
}
