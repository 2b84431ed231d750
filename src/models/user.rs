use sqlx::FromRow;

/// An account row. The password hash is a PHC string and never leaves the
/// accounts module except through this struct.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}
