//! Arguments and handlers for the administrative subcommands.

use clap::Args;
use market_store::{MarketStore, NewUser, Role, User};
use tracing::info;

use crate::auth::{normalize_email, AuthService};
use crate::errors::AppError;

#[derive(Debug, Args)]
pub struct SeedCommand {
    /// Delete all data without importing the sample market
    #[arg(short, long)]
    pub destroy: bool,
}

#[derive(Debug, Args)]
pub struct CreateAdminCommand {
    pub name: String,
    pub email: String,
    pub password: String,
    #[arg(default_value = "Admin Company")]
    pub company: String,
}

#[derive(Debug, Args)]
pub struct SetRoleCommand {
    pub email: String,
    /// admin, vendor, market_manager or super_admin
    #[arg(default_value = "admin")]
    pub role: Role,
}

pub async fn create_admin(
    store: &dyn MarketStore,
    auth: &AuthService,
    command: CreateAdminCommand,
) -> Result<User, AppError> {
    let email = normalize_email(&command.email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Command(format!(
            "User with email {email} already exists"
        )));
    }

    let password_hash = auth.hash_password_blocking(command.password).await?;
    let user = store
        .create_user(NewUser {
            name: command.name,
            email,
            password_hash,
            role: Role::Admin,
            company: command.company,
            vendor_id: None,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, company = %user.company, "admin user created");
    Ok(user)
}

pub async fn set_role(store: &dyn MarketStore, command: SetRoleCommand) -> Result<User, AppError> {
    let email = normalize_email(&command.email);
    let mut user = store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Command(format!("User with email {email} not found")))?;

    user.role = command.role;
    let user = store.update_user(&user).await?;
    info!(user_id = %user.id, role = %user.role, "role updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use market_store::SqliteStore;

    use super::*;
    use crate::config::AuthConfig;

    fn auth() -> AuthService {
        AuthService::new(&AuthConfig {
            hash_iterations: 1_000,
            ..AuthConfig::default()
        })
        .unwrap()
    }

    fn admin_command(email: &str) -> CreateAdminCommand {
        CreateAdminCommand {
            name: "Admin User".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            company: "Admin Company".to_string(),
        }
    }

    #[tokio::test]
    async fn create_admin_rejects_existing_email() {
        let store = SqliteStore::open_in_memory().unwrap();
        let auth = auth();

        let user = create_admin(&store, &auth, admin_command("Admin@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.email, "admin@example.com");
        assert!(auth.verify_password("password123", &user.password_hash));

        let err = create_admin(&store, &auth, admin_command("admin@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User with email admin@example.com already exists");
    }

    #[tokio::test]
    async fn set_role_updates_existing_users_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        create_admin(&store, &auth(), admin_command("boss@example.com"))
            .await
            .unwrap();

        let user = set_role(
            &store,
            SetRoleCommand {
                email: "boss@example.com".to_string(),
                role: Role::SuperAdmin,
            },
        )
        .await
        .unwrap();
        assert_eq!(user.role, Role::SuperAdmin);

        let err = set_role(
            &store,
            SetRoleCommand {
                email: "nobody@example.com".to_string(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Command(_)));
    }
}
