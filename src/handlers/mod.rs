pub mod health;
pub mod orders;

use crate::db::DbPool;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<crate::services::orders::OrderIntakeService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            orders: Arc::new(crate::services::orders::OrderIntakeService::new(db_pool)),
        }
    }
}
