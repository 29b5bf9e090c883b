use super::password::{hash_password, verify_password};
use super::tokens::TokenService;
use super::types::*;
use crate::database::Database;
use crate::error::AppError;
use crate::mail::{self, Mailer};

const MIN_PASSWORD_LEN: usize = 6;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    db: &Database,
    tokens: &TokenService,
    mailer: &Mailer,
    input: RegisterInput,
) -> Result<AuthResponse, AppError> {
    let name = input.name.trim();
    let email = normalize_email(&input.email);

    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("A valid email is required"));
    }
    if input.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if db.find_user_by_email(&email)?.is_some() {
        return Err(AppError::conflict("An account with this email already exists"));
    }

    let password_hash = hash_password(&input.password)?;
    let user = db.create_user(name, &email, &password_hash)?;
    let tokens = tokens.issue_pair(&user.id)?;

    tracing::info!(user_id = %user.id, "user registered");
    mailer.send_best_effort(mail::welcome_mail(&user.name, &user.email)).await;

    Ok(AuthResponse { user, tokens })
}

pub fn login(db: &Database, tokens: &TokenService, input: LoginInput) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&input.email);
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let record = db.find_user_by_email(&email)?.ok_or_else(invalid)?;
    if !verify_password(&input.password, &record.password_hash) {
        return Err(invalid());
    }

    let tokens = tokens.issue_pair(&record.user.id)?;
    Ok(AuthResponse {
        user: record.user,
        tokens,
    })
}

pub fn refresh(db: &Database, tokens: &TokenService, input: RefreshInput) -> Result<AuthTokens, AppError> {
    let user_id = tokens.verify_refresh(&input.refresh_token)?;

    // account may have been removed since the token was issued
    if db.get_user(&user_id)?.is_none() {
        return Err(AppError::Unauthorized("Account no longer exists".into()));
    }

    tokens.issue_pair(&user_id)
}

pub fn me(db: &Database, user_id: &str) -> Result<User, AppError> {
    db.get_user(user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn token_service() -> TokenService {
        TokenService::new("secret", Duration::from_secs(900), Duration::from_secs(3600))
    }

    fn input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Ada".into(),
            email: email.into(),
            password: "hunter22".into(),
        }
    }

    #[tokio::test]
    async fn test_register_login_refresh() {
        let db = Database::open_in_memory().unwrap();
        let tokens = token_service();

        let registered = register(&db, &tokens, &Mailer::Log, input(" Ada@Example.com ")).await.unwrap();
        assert_eq!(registered.user.email, "ada@example.com");

        let logged_in = login(
            &db,
            &tokens,
            LoginInput { email: "ADA@example.com".into(), password: "hunter22".into() },
        )
        .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let refreshed = refresh(
            &db,
            &tokens,
            RefreshInput { refresh_token: logged_in.tokens.refresh_token },
        )
        .unwrap();
        assert_eq!(tokens.verify_access(&refreshed.access_token).unwrap(), registered.user.id);
        assert_eq!(me(&db, &registered.user.id).unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let db = Database::open_in_memory().unwrap();
        let tokens = token_service();

        register(&db, &tokens, &Mailer::Log, input("ada@example.com")).await.unwrap();
        let dup = register(&db, &tokens, &Mailer::Log, input("ADA@example.com")).await.unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));

        let mut short = input("bob@example.com");
        short.password = "123".into();
        let err = register(&db, &tokens, &Mailer::Log, short).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let db = Database::open_in_memory().unwrap();
        let tokens = token_service();
        register(&db, &tokens, &Mailer::Log, input("ada@example.com")).await.unwrap();

        let err = login(
            &db,
            &tokens,
            LoginInput { email: "ada@example.com".into(), password: "nope".into() },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
