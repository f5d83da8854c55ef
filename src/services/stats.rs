use sea_orm::{
    sea_query::{Alias, Expr, Func, SimpleExpr},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::Serialize;

use crate::entities::{order, product, review, user};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub pending_approvals: u64,
    pub total_revenue: f64,
    pub average_rating: f64,
}

/// Back-office counters. Every figure is a fresh aggregate over its table.
pub async fn dashboard_stats<C: ConnectionTrait>(db: &C) -> Result<DashboardStats, DbErr> {
    let (total_users, total_products, total_orders, pending_approvals, total_revenue, average_rating) =
        tokio::try_join!(
            user::Entity::find().count(db),
            product::Entity::find().count(db),
            order::Entity::find().count(db),
            product::Entity::find()
                .filter(product::Column::IsApproved.eq(false))
                .count(db),
            aggregate(db, order::Entity::find(), Func::sum(Expr::col(order::Column::Total)).into()),
            aggregate(db, review::Entity::find(), Func::avg(Expr::col(review::Column::Rating)).into()),
        )?;

    Ok(DashboardStats {
        total_users,
        total_products,
        total_orders,
        pending_approvals,
        total_revenue: total_revenue.unwrap_or(0.0),
        average_rating: average_rating.unwrap_or(0.0),
    })
}

/// Single floating point aggregate; `None` on an empty table.
async fn aggregate<C, E>(
    db: &C,
    select: sea_orm::Select<E>,
    expr: SimpleExpr,
) -> Result<Option<f64>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    // Postgres returns NUMERIC for AVG over integers.
    let value = Expr::expr(expr).cast_as(Alias::new("DOUBLE PRECISION"));

    let row = select
        .select_only()
        .column_as(value, "value")
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?;

    Ok(row.flatten())
}
