use crate::{
    error::RepositoryError,
    models::{NewIdentity, Role},
    password::hash_password,
    repository::RepositoryState,
};

/// Demo accounts ensured on startup when `SEED_DEMO_ACCOUNTS` is enabled.
/// The email doubles as the username.
pub const DEMO_ACCOUNTS: [(&str, &str, &str, Role); 3] = [
    ("admin@plataforma.com", "Admin123!", "Administrador", Role::Admin),
    (
        "instructor@plataforma.com",
        "Instructor123!",
        "Instrutor Padrao",
        Role::Instructor,
    ),
    ("student@plataforma.com", "Student123!", "Aluno Padrao", Role::Student),
];

/// Creates each demo account whose email is not yet registered. Idempotent.
/// Returns how many accounts were created.
pub async fn seed_demo_accounts(repo: &RepositoryState) -> anyhow::Result<usize> {
    let mut created = 0;

    for (email, password, full_name, role) in DEMO_ACCOUNTS {
        if repo.email_taken(email).await? {
            continue;
        }

        let inserted = repo
            .insert_identity(NewIdentity {
                username: email.to_string(),
                email: email.to_string(),
                password_hash: hash_password(password)?,
                full_name: full_name.to_string(),
                roles: vec![role],
            })
            .await;

        match inserted {
            Ok(identity) => {
                tracing::info!(identity = %identity.id, %email, %role, "demo account seeded");
                created += 1;
            }
            // Another instance seeded it first.
            Err(RepositoryError::UniqueViolation(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::InMemoryRepository;

    #[tokio::test]
    async fn seeding_twice_creates_each_account_once() {
        let repo: RepositoryState = Arc::new(InMemoryRepository::new());

        assert_eq!(seed_demo_accounts(&repo).await.unwrap(), 3);
        assert_eq!(seed_demo_accounts(&repo).await.unwrap(), 0);

        let admin = repo
            .find_live_identity_by_username("admin@plataforma.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.roles, vec![Role::Admin]);
    }
}
