use sea_orm_migration::prelude::*;

/// Name of the unique index backing the duplicate-order rule
const ORDERS_DEDUP_INDEX: &str = "idx_orders_customer_email_delivery_date";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                    .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                    .col(ColumnDef::new(Orders::CustomerPhone).string().not_null())
                    .col(ColumnDef::new(Orders::CakeType).string().not_null())
                    .col(ColumnDef::new(Orders::CakeSize).string().not_null())
                    .col(
                        ColumnDef::new(Orders::DeliveryDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::SpecialInstructions).text().null())
                    .col(
                        ColumnDef::new(Orders::OrderStatus)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::OrderDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(ORDERS_DEDUP_INDEX)
                    .table(Orders::Table)
                    .col(Orders::CustomerEmail)
                    .col(Orders::DeliveryDate)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Dropping the table drops the dedup index with it
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    CakeType,
    CakeSize,
    DeliveryDate,
    SpecialInstructions,
    OrderStatus,
    OrderDate,
}
