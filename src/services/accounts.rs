use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AdminBootstrap;
use crate::entities::{
    user::{self, Entity as UserEntity, Role},
    verification_token::{self, Entity as TokenEntity},
};
use crate::error::{AppError, AppResult};
use crate::mailer::{verification_link, Mailer};
use crate::middleware::auth::generate_token;

pub const VERIFICATION_TTL_HOURS: i64 = 24;
pub const GUEST_NAME: &str = "Guest";

/// Shape of a verification token: 32 random bytes, hex encoded.
pub static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub role: Role,
    pub is_verified: bool,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    #[serde(flatten)]
    pub user: UserSummary,
    pub is_admin: bool,
    pub is_cook: bool,
}

impl From<UserSummary> for UserListEntry {
    fn from(user: UserSummary) -> Self {
        Self {
            is_admin: user.role == Role::Admin,
            is_cook: user.role == Role::Cook,
            user,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

fn new_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Creates an unverified account and mails the verification link.
///
/// Run it inside a transaction: when the mail cannot be sent the error is
/// returned and dropping the transaction removes both the user and the token.
/// A guest row registered under the same e-mail is turned into the account.
pub async fn register<C: ConnectionTrait>(
    db: &C,
    mailer: &dyn Mailer,
    app_url: &str,
    new: NewAccount,
) -> AppResult<user::Model> {
    let email = normalize_email(&new.email);
    let password = hash_password(&new.password)
        .map_err(|err| AppError::Internal(format!("Failed to hash password {err}")))?;

    let existing = UserEntity::find()
        .filter(user::Column::Email.eq(&*email))
        .one(db)
        .await?;

    let user = match existing {
        Some(user) if !user.is_guest() => {
            return Err(AppError::Validation("User with this email already exists".into()));
        }
        Some(guest) => {
            info!(user_id = guest.id, "Upgrading guest customer to a registered account");
            let mut guest: user::ActiveModel = guest.into();
            guest.name = Set(new.name);
            guest.password = Set(Some(password));
            guest.phone = Set(new.phone);
            guest.address = Set(new.address);
            guest.city = Set(new.city);
            guest.is_verified = Set(false);
            guest.update(db).await?
        }
        None => {
            user::ActiveModel {
                email: Set(email.clone()),
                name: Set(new.name),
                password: Set(Some(password)),
                phone: Set(new.phone),
                address: Set(new.address),
                city: Set(new.city),
                avatar: Set(None),
                role: Set(Role::Customer),
                is_verified: Set(false),
                email_verified_at: Set(None),
                rating: Set(0.0),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    let token = new_verification_token();
    verification_token::ActiveModel {
        token: Set(token.clone()),
        identifier: Set(email.clone()),
        expires: Set(Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS)),
    }
    .insert(db)
    .await?;

    mailer
        .send_verification(&email, &verification_link(app_url, &token))
        .map_err(|err| AppError::Internal(err.to_string()))?;

    Ok(user)
}

/// Consumes a verification token. Call it outside a transaction: an expired
/// token must stay deleted even though the call fails.
pub async fn verify_email<C: ConnectionTrait>(db: &C, token: &str) -> AppResult<user::Model> {
    let record = TokenEntity::find_by_id(token.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid verification token".into()))?;

    let now = Utc::now();
    if record.is_expired(now) {
        record.delete(db).await?;
        return Err(AppError::Validation(
            "Verification token has expired. Please register again.".into(),
        ));
    }

    let user = UserEntity::find()
        .filter(user::Column::Email.eq(&*record.identifier))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if user.is_verified {
        return Err(AppError::Validation("Email is already verified".into()));
    }

    let mut user: user::ActiveModel = user.into();
    user.is_verified = Set(true);
    user.email_verified_at = Set(Some(now));
    let user = user.update(db).await?;

    record.delete(db).await?;

    Ok(user)
}

/// Checks credentials and issues a session token.
pub async fn login<C: ConnectionTrait>(
    db: &C,
    secret: &str,
    email: &str,
    password: &str,
) -> AppResult<String> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let user = UserEntity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    user.check_hash(password).map_err(|_| invalid())?;

    if !user.is_verified {
        return Err(AppError::Unauthorized("Email is not verified".into()));
    }

    generate_token(secret, user.id, user.role).map_err(AppError::from)
}

/// Customer row for a guest checkout, created on first use of the e-mail.
pub async fn find_or_create_guest<C: ConnectionTrait>(
    db: &C,
    name: Option<&str>,
    email: &str,
) -> Result<user::Model, DbErr> {
    let email = normalize_email(email);

    if let Some(user) = UserEntity::find()
        .filter(user::Column::Email.eq(&*email))
        .one(db)
        .await?
    {
        return Ok(user);
    }

    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(GUEST_NAME);

    user::ActiveModel {
        email: Set(email),
        name: Set(name.to_owned()),
        password: Set(None),
        phone: Set(None),
        address: Set(None),
        city: Set(None),
        avatar: Set(None),
        role: Set(Role::Customer),
        is_verified: Set(false),
        email_verified_at: Set(None),
        rating: Set(0.0),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Makes sure the configured admin account exists and can log in.
pub async fn ensure_admin<C: ConnectionTrait>(db: &C, admin: &AdminBootstrap) -> AppResult<user::Model> {
    let email = normalize_email(&admin.email);
    let password = hash_password(&admin.password)
        .map_err(|err| AppError::Internal(format!("Failed to hash password {err}")))?;

    let existing = UserEntity::find()
        .filter(user::Column::Email.eq(&*email))
        .one(db)
        .await?;

    let admin = match existing {
        Some(user) => {
            if user.role != Role::Admin {
                warn!(user_id = user.id, "Promoting existing account to admin");
            }
            let mut user: user::ActiveModel = user.into();
            user.role = Set(Role::Admin);
            user.password = Set(Some(password));
            user.is_verified = Set(true);
            user.update(db).await?
        }
        None => {
            user::ActiveModel {
                email: Set(email),
                name: Set("Administrator".to_owned()),
                password: Set(Some(password)),
                phone: Set(None),
                address: Set(None),
                city: Set(None),
                avatar: Set(None),
                role: Set(Role::Admin),
                is_verified: Set(true),
                email_verified_at: Set(Some(Utc::now())),
                rating: Set(0.0),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    info!(user_id = admin.id, "Admin account ready");
    Ok(admin)
}

pub async fn list_users<C: ConnectionTrait>(db: &C) -> Result<Vec<UserListEntry>, DbErr> {
    let users = UserEntity::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Name)
        .column(user::Column::Email)
        .column(user::Column::Role)
        .column(user::Column::IsVerified)
        .column(user::Column::CreatedAt)
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .into_model::<UserSummary>()
        .all(db)
        .await?;

    Ok(users.into_iter().map(UserListEntry::from).collect())
}
