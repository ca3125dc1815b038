use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity};
use crate::errors::ServiceError;
use crate::models::order::OrderRequest;

/// Outcome of a successful intake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub customer_name: String,
    pub order_status: String,
    pub order_date: DateTime<Utc>,
    /// Rows reported by the insert; zero is logged but not treated as a failure
    pub rows_affected: u64,
}

/// Stores cake orders, at most one per customer email and delivery date
#[derive(Clone)]
pub struct OrderIntakeService {
    db_pool: Arc<DatabaseConnection>,
}

impl OrderIntakeService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Checks for an existing order with the same dedup key, then inserts.
    ///
    /// Both statements run in one transaction. Dropping it on an early return
    /// rolls it back and hands the connection back to the pool.
    #[instrument(skip(self, request), fields(customer_email = %request.customer_email, delivery_date = %request.delivery_date))]
    pub async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order intake");
            ServiceError::DatabaseError(e)
        })?;

        let existing =
            count_matching_orders(&txn, &request.customer_email, request.delivery_date).await?;
        if existing > 0 {
            warn!(existing, "Rejecting duplicate order");
            counter!("cakehaven.orders.duplicate", 1);
            return Err(ServiceError::DuplicateOrder);
        }

        let order_date = Utc::now();
        let order_status = request.effective_status();
        let rows_affected = insert_order(&txn, &request, &order_status, order_date).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order intake transaction");
            ServiceError::from_insert_error(e)
        })?;

        if rows_affected > 0 {
            info!("Order successfully added for {}.", request.customer_name);
            counter!("cakehaven.orders.placed", 1);
        } else {
            error!("Failed to insert the order into the database.");
        }

        Ok(PlacedOrder {
            customer_name: request.customer_name,
            order_status,
            order_date,
            rows_affected,
        })
    }
}

/// Counts stored orders with exactly this email and delivery date
pub async fn count_matching_orders<C: ConnectionTrait>(
    db: &C,
    customer_email: &str,
    delivery_date: DateTime<Utc>,
) -> Result<u64, ServiceError> {
    OrderEntity::find()
        .filter(order::Column::CustomerEmail.eq(customer_email))
        .filter(order::Column::DeliveryDate.eq(delivery_date))
        .count(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Duplicate check failed");
            ServiceError::DatabaseError(e)
        })
}

/// Inserts the order and returns the rows affected.
///
/// A unique-index violation comes back as [`ServiceError::DuplicateOrder`].
pub async fn insert_order<C: ConnectionTrait>(
    db: &C,
    request: &OrderRequest,
    order_status: &str,
    order_date: DateTime<Utc>,
) -> Result<u64, ServiceError> {
    let active = OrderActiveModel {
        id: NotSet,
        customer_name: Set(request.customer_name.clone()),
        customer_email: Set(request.customer_email.clone()),
        customer_phone: Set(request.customer_phone.clone()),
        cake_type: Set(request.cake_type.clone()),
        cake_size: Set(request.cake_size.clone()),
        delivery_date: Set(request.delivery_date),
        special_instructions: Set(request.special_instructions.clone()),
        order_status: Set(order_status.to_string()),
        order_date: Set(order_date),
    };

    OrderEntity::insert(active)
        .exec_without_returning(db)
        .await
        .map_err(|e| {
            let err = ServiceError::from_insert_error(e);
            if matches!(err, ServiceError::DuplicateOrder) {
                warn!("Insert hit the dedup index");
                counter!("cakehaven.orders.duplicate", 1);
            } else {
                error!(error = %err, "Order insert failed");
            }
            err
        })
}
