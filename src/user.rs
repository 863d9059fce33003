use crate::get_db_pool;
use crate::orm::users;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString},
    Argon2, PasswordHasher,
};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};

/// A mini struct for holding only what information we need about a client.
#[derive(Clone, Debug, FromQueryResult)]
pub struct ClientUser {
    pub id: i32,
    pub name: String,
}

/// Account details for the account page.
#[derive(Clone, Debug, FromQueryResult)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
}

pub async fn get_profile_by_id(id: i32) -> Option<Profile> {
    match users::Entity::find_by_id(id)
        .into_model::<Profile>()
        .one(get_db_pool())
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            log::error!("get_profile_by_id: {}", e);
            None
        }
    }
}

pub async fn find_user_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Name.eq(name))
        .one(db)
        .await
}

/// Hashes a password into PHC string format for storage.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

/// Verifies a password against its stored PHC string.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("verify_password: stored hash would not parse: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password(&hash, "hunter2"));
        assert!(!verify_password(&hash, "hunter3"));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("not-a-phc-string", "hunter2"));
    }
}
