use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use argon2::{
    password_hash::PasswordVerifier,
    Argon2,
    PasswordHash,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    // Guest customers have no password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub email_verified_at: Option<DateTimeUtc>,
    pub rating: f64,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn check_hash(&self, password: &str) -> Result<(), String> {
        let hash = self
            .password
            .as_deref()
            .ok_or("Account has no password")?;
        let parsed_hash =
            PasswordHash::new(hash).map_err(|_| "Stored password hash is malformed")?;

        let argon2 = Argon2::default();
        argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| "Password verification failed")?;

        Ok(())
    }

    pub fn is_guest(&self) -> bool {
        self.password.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Account kind. Roles nest for route guards: an admin passes every guard,
/// a cook passes cook and customer guards.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    enum_name = "role_enum",
    db_type = "String(StringLen::N(16))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "cook")]
    Cook,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    pub fn permits(self, required: Role) -> bool {
        match required {
            Role::Customer => true,
            Role::Cook => matches!(self, Role::Cook | Role::Admin),
            Role::Admin => self == Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Role::Customer => "customer",
            Role::Cook => "cook",
            Role::Admin => "admin",
        };
        f.write_str(value)
    }
}
