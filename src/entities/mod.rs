pub mod order;
pub mod order_item;
pub mod product;
pub mod review;
pub mod user;
pub mod verification_token;

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::debug;

use crate::entities::{
    order::Entity as Order,
    order_item::Entity as OrderItem,
    product::Entity as Product,
    review::Entity as Review,
    user::Entity as User,
    verification_token::Entity as VerificationToken,
};

/// Currency every price and order total is expressed in.
pub const DEFAULT_CURRENCY: &str = "MDL";

pub async fn setup_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    // Parents before children so foreign keys resolve on Postgres.
    create_table(db, &schema, User).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Order).await?;
    create_table(db, &schema, OrderItem).await?;
    create_table(db, &schema, Review).await?;
    create_table(db, &schema, VerificationToken).await?;

    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait + Copy,
{
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    db.execute(backend.build(table.if_not_exists())).await?;

    for mut index in schema.create_index_from_entity(entity) {
        db.execute(backend.build(index.if_not_exists())).await?;
    }

    debug!(table = entity.table_name(), "Schema ready");
    Ok(())
}
