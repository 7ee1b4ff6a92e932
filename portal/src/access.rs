//! Staff access control
//!
//! Write operations (material uploads, announcements, calendar events) take a
//! `StaffCapability`. The only way to obtain one is through `StaffVerifier`,
//! which checks submitted credentials against Argon2id hashes from settings.

use crate::error::{AppError, Result};
use crate::services::settings::StaffCredentials;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use serde::Serialize;
use std::fmt;

/// Staff roles allowed to write content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Teacher => f.write_str("teacher"),
        }
    }
}

/// Proof that a staff member passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffCapability {
    role: Role,
    principal: String,
}

impl StaffCapability {
    pub fn role(&self) -> Role {
        self.role
    }

    /// Name recorded as the author of written content
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Fail unless this capability carries one of `roles`
    pub fn require(&self, roles: &[Role]) -> Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "The {} role cannot perform this action",
                self.role
            )))
        }
    }
}

/// Checks staff credentials and mints capabilities
#[derive(Clone)]
pub struct StaffVerifier {
    credentials: StaffCredentials,
}

impl StaffVerifier {
    pub fn new(credentials: StaffCredentials) -> Self {
        Self { credentials }
    }

    /// Teacher portal: a single shared password
    pub fn verify_teacher(&self, password: &str) -> Result<StaffCapability> {
        let hash = self.credentials.teacher_password_hash.as_deref();

        if verify_password(password, hash) {
            tracing::info!("Teacher portal unlocked");
            Ok(StaffCapability {
                role: Role::Teacher,
                principal: Role::Teacher.to_string(),
            })
        } else {
            tracing::warn!("Rejected teacher portal password");
            Err(AppError::Unauthorized(
                "Incorrect password. Please try again.".to_string(),
            ))
        }
    }

    /// Admin portal: username and password
    pub fn verify_admin(&self, username: &str, password: &str) -> Result<StaffCapability> {
        let hash = self.credentials.admin_password_hash.as_deref();
        let username_matches = username == self.credentials.admin_username;

        // Always run the hash check so a wrong username costs the same time
        let password_matches = verify_password(password, hash);

        if username_matches && password_matches {
            tracing::info!("Admin portal unlocked for {}", username);
            Ok(StaffCapability {
                role: Role::Admin,
                principal: username.to_string(),
            })
        } else {
            tracing::warn!("Rejected admin portal login for {}", username);
            Err(AppError::Unauthorized(
                "Incorrect username or password. Please try again.".to_string(),
            ))
        }
    }
}

/// Hash a password into an Argon2id PHC string for the settings file
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(AppError::Validation("Password cannot be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Generic(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: Option<&str>) -> bool {
    let Some(hash) = hash else {
        return false;
    };

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Configured staff password hash is malformed: {}", e);
            false
        }
    }
}
