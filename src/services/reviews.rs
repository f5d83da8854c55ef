use chrono::Utc;
use sea_orm::{
    sea_query::{Alias, Expr, Func},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};

use crate::entities::{
    product::Entity as ProductEntity,
    review,
    user::{self, Entity as UserEntity, Role},
};
use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct NewReview {
    pub rating: i32,
    pub comment: Option<String>,
    pub cook_id: i32,
    pub product_id: Option<i32>,
}

/// Stores a review and refreshes the cook's average rating.
pub async fn create_review<C: ConnectionTrait>(
    db: &C,
    customer_id: i32,
    new: NewReview,
) -> AppResult<review::Model> {
    if !(1..=5).contains(&new.rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".into()));
    }

    let cook = UserEntity::find_by_id(new.cook_id)
        .one(db)
        .await?
        .filter(|u| u.role.permits(Role::Cook))
        .ok_or_else(|| AppError::NotFound(format!("No cook with {} id was found", new.cook_id)))?;

    if let Some(product_id) = new.product_id {
        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
        if product.cook_id != cook.id {
            return Err(AppError::Validation(
                "Product does not belong to this cook".into(),
            ));
        }
    }

    let review = review::ActiveModel {
        rating: Set(new.rating),
        comment: Set(new.comment.filter(|c| !c.trim().is_empty())),
        customer_id: Set(customer_id),
        cook_id: Set(cook.id),
        product_id: Set(new.product_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let average = review::Entity::find()
        .filter(review::Column::CookId.eq(cook.id))
        .select_only()
        .column_as(
            Expr::expr(Func::avg(Expr::col(review::Column::Rating))).cast_as(Alias::new("DOUBLE PRECISION")),
            "average",
        )
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(0.0);

    let mut cook: user::ActiveModel = cook.into();
    cook.rating = Set(average);
    cook.update(db).await?;

    Ok(review)
}
