//! Catalogue queries and the admin side of product management.

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, error};

use crate::entities::{
    product::{self, Entity as ProductEntity},
    review,
    user::{self, Entity as UserEntity, Role},
    DEFAULT_CURRENCY,
};
use crate::error::{AppError, AppResult};

/// Reviews embedded per product in list views.
pub const LISTING_REVIEW_LIMIT: usize = 3;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price_range: Option<String>,
    pub sort: Option<String>,
    /// Accepted from the explore page but not used for filtering.
    pub delivery: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Newest,
    Rating,
}

impl ProductSort {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("price-asc") => Self::PriceAsc,
            Some("price-desc") => Self::PriceDesc,
            Some("rating") => Self::Rating,
            _ => Self::Newest,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    /// Parses `"min-max"`. Either side may be empty or garbage, which
    /// leaves that side unbounded.
    pub fn parse(raw: &str) -> Self {
        let (min, max) = raw.split_once('-').unwrap_or((raw, ""));
        Self {
            min: parse_bound(min),
            max: parse_bound(max),
        }
    }
}

fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: product::Model,
    pub cook: Option<CookSummary>,
    pub reviews: Vec<ReviewSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookSummary {
    pub id: i32,
    pub name: String,
    pub avatar: Option<String>,
    pub city: Option<String>,
    pub rating: f64,
}

impl From<user::Model> for CookSummary {
    fn from(cook: user::Model) -> Self {
        Self {
            id: cook.id,
            name: cook.name,
            avatar: cook.avatar,
            city: cook.city,
            rating: cook.rating,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub customer: Option<Reviewer>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Reviewer {
    pub name: String,
}

/// Public catalogue. Store failures are logged and surface as an empty list.
pub async fn list_products<C: ConnectionTrait>(db: &C, filters: &ProductFilters) -> Vec<ProductListing> {
    match query_products(db, filters).await {
        Ok(products) => products,
        Err(err) => {
            error!(?filters, "Failed to fetch products: {err}");
            Vec::new()
        }
    }
}

async fn query_products<C: ConnectionTrait>(
    db: &C,
    filters: &ProductFilters,
) -> Result<Vec<ProductListing>, DbErr> {
    let mut condition = Condition::all().add(product::Column::IsApproved.eq(true));

    if let Some(search) = non_empty(&filters.search) {
        condition = condition.add(
            Condition::any()
                .add(lower(product::Column::Name).like(contains(search)))
                .add(lower(product::Column::Description).like(contains(search)))
                .add(lower(product::Column::Category).like(contains(search))),
        );
    }

    if let Some(category) = non_empty(&filters.category) {
        condition = condition.add(product::Column::Category.eq(category));
    }

    if let Some(raw) = non_empty(&filters.price_range) {
        let range = PriceRange::parse(raw);
        if let Some(min) = range.min {
            condition = condition.add(product::Column::Price.gte(min));
        }
        if let Some(max) = range.max {
            condition = condition.add(product::Column::Price.lte(max));
        }
    }

    if let Some(delivery) = non_empty(&filters.delivery) {
        debug!(delivery, "Ignoring delivery filter");
    }

    let sort = ProductSort::from_param(filters.sort.as_deref());
    let finder = ordered(ProductEntity::find().filter(condition), sort);

    let rows = finder.find_also_related(UserEntity).all(db).await?;
    let mut listings = assemble(db, rows).await?;

    if sort == ProductSort::Rating {
        listings.sort_by(|a, b| compare_ratings(&b.reviews, &a.reviews));
    }
    for listing in &mut listings {
        listing.reviews.truncate(LISTING_REVIEW_LIMIT);
    }

    Ok(listings)
}

/// Single approved product with every review.
pub async fn find_product<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<ProductListing>, DbErr> {
    let rows = ProductEntity::find_by_id(id)
        .filter(product::Column::IsApproved.eq(true))
        .find_also_related(UserEntity)
        .all(db)
        .await?;

    Ok(assemble(db, rows).await?.into_iter().next())
}

fn lower(column: product::Column) -> Expr {
    Expr::expr(Func::lower(Expr::col((ProductEntity, column))))
}

/// Case-folded substring pattern; `%`, `_` and `\` in the needle match literally.
fn contains(needle: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    LikeExpr::new(pattern).escape('\\')
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn ordered(select: Select<ProductEntity>, sort: ProductSort) -> Select<ProductEntity> {
    let select = match sort {
        ProductSort::PriceAsc => select.order_by_asc(product::Column::Price),
        ProductSort::PriceDesc => select.order_by_desc(product::Column::Price),
        // Rating is applied after the reviews are loaded.
        ProductSort::Newest | ProductSort::Rating => select.order_by_desc(product::Column::CreatedAt),
    };
    select.order_by_desc(product::Column::Id)
}

/// Compares by average rating, then review count. Unrated compares lowest.
fn compare_ratings(a: &[ReviewSummary], b: &[ReviewSummary]) -> Ordering {
    let average = |reviews: &[ReviewSummary]| {
        if reviews.is_empty() {
            None
        } else {
            Some(reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / reviews.len() as f64)
        }
    };

    match (average(a), average(b)) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(Ordering::Equal)
            .then(a.len().cmp(&b.len())),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

async fn assemble<C: ConnectionTrait>(
    db: &C,
    rows: Vec<(product::Model, Option<user::Model>)>,
) -> Result<Vec<ProductListing>, DbErr> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<i32> = rows.iter().map(|(product, _)| product.id).collect();
    let reviews = review::Entity::find()
        .filter(review::Column::ProductId.is_in(product_ids))
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .all(db)
        .await?;

    let mut reviewer_ids: Vec<i32> = reviews.iter().map(|r| r.customer_id).collect();
    reviewer_ids.sort_unstable();
    reviewer_ids.dedup();
    let reviewers: HashMap<i32, String> = if reviewer_ids.is_empty() {
        HashMap::new()
    } else {
        UserEntity::find()
            .filter(user::Column::Id.is_in(reviewer_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect()
    };

    let mut by_product: HashMap<i32, Vec<ReviewSummary>> = HashMap::new();
    for review in reviews {
        let Some(product_id) = review.product_id else {
            continue;
        };
        by_product.entry(product_id).or_default().push(ReviewSummary {
            id: review.id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
            customer: reviewers
                .get(&review.customer_id)
                .map(|name| Reviewer { name: name.clone() }),
        });
    }

    Ok(rows
        .into_iter()
        .map(|(product, cook)| {
            let reviews = by_product.remove(&product.id).unwrap_or_default();
            ProductListing {
                product,
                cook: cook.map(CookSummary::from),
                reviews,
            }
        })
        .collect())
}

// ADMIN

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: Option<String>,
    pub image: String,
    pub category: String,
    pub cook_id: i32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProduct {
    #[serde(flatten)]
    pub product: product::Model,
    pub cook: Option<user::Model>,
}

/// New products start available but unapproved.
pub async fn create_product<C: ConnectionTrait>(db: &C, new: NewProduct) -> AppResult<product::Model> {
    if !new.price.is_finite() || new.price <= 0.0 {
        return Err(AppError::Validation("Price must be a positive number".into()));
    }

    match UserEntity::find_by_id(new.cook_id).one(db).await? {
        Some(cook) if cook.role.permits(Role::Cook) => {}
        _ => {
            return Err(AppError::Validation(format!(
                "No cook with {} id was found",
                new.cook_id
            )))
        }
    }

    let now = Utc::now();
    let product = product::ActiveModel {
        name: Set(new.name),
        description: Set(new.description),
        price: Set(new.price),
        currency: Set(new.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_owned())),
        image: Set(new.image),
        category: Set(new.category),
        is_available: Set(true),
        is_approved: Set(false),
        cook_id: Set(new.cook_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(product)
}

pub async fn pending_products<C: ConnectionTrait>(db: &C) -> Result<Vec<PendingProduct>, DbErr> {
    let rows = ProductEntity::find()
        .filter(product::Column::IsApproved.eq(false))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .find_also_related(UserEntity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(product, cook)| PendingProduct { product, cook })
        .collect())
}

/// Approving an approved product returns it unchanged.
pub async fn approve_product<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<product::Model> {
    let product = ProductEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No product with {} id was found", id)))?;

    if product.is_approved {
        return Ok(product);
    }

    let mut product: product::ActiveModel = product.into();
    product.is_approved = Set(true);
    product.updated_at = Set(Utc::now());

    Ok(product.update(db).await?)
}
