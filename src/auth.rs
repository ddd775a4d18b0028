use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;

use crate::err::Error;

/// Hashes a raw password into the PHC string stored in `users.password_hash`.
pub fn make_password(password: &str) -> Result<String, Error> {
    if password.is_empty() {
        return Err(Error::validation("password", "This field cannot be blank."));
    }
    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn check_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok(),
        Err(err) => {
            log::warn!("Stored password hash could not be parsed: {}", err);
            false
        }
    }
}
