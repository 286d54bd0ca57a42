use crate::{
    errors::ServiceError,
    models::{Registration, Role, User},
    services::commerce::CartService,
    store::{Collection, RecordStore},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// User registration and credential checks.
///
/// Each registered user owns exactly one cart, provisioned at registration.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<Collection<User>>,
    carts: Arc<CartService>,
}

impl IdentityService {
    pub async fn new(
        store: Arc<dyn RecordStore<User>>,
        carts: Arc<CartService>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            users: Arc::new(Collection::load(store, persist_timeout).await),
            carts,
        }
    }

    /// Register a new user
    ///
    /// The user's cart is created first; if the user record cannot be
    /// persisted afterwards, that cart is deleted again.
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - The stored user, including its `cart_id`
    /// * `Err(ServiceError::Validation)` - A field breaks its rule
    /// * `Err(ServiceError::Conflict)` - The username or e-mail is taken
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: Registration) -> Result<User, ServiceError> {
        input.validate()?;
        self.ensure_available(&input.username, &input.email).await?;

        let password_hash = hash_password(&input.password)?;
        let cart = self.carts.create().await?;

        let user = User {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            age: input.age,
            password_hash,
            role: Role::default(),
            cart_id: cart.id,
            created_at: Utc::now(),
        };
        let registered = user.clone();

        let inserted = self
            .users
            .mutate(move |users| {
                // Re-checked under the write lock; a concurrent registration
                // may have taken the name since `ensure_available`.
                if let Some(conflict) =
                    find_conflict(users.values(), &user.username, &user.email)
                {
                    return Err(conflict);
                }
                users.insert(user.id, user);
                Ok(())
            })
            .await;

        if let Err(err) = inserted {
            if let Err(cleanup) = self.carts.delete(cart.id).await {
                warn!(
                    cart_id = %cart.id,
                    error = %cleanup,
                    "Failed to delete cart of abandoned registration"
                );
            }
            return Err(err);
        }

        info!("User registered: {}", registered.id);
        Ok(registered)
    }

    /// Checks a username and password.
    ///
    /// Unknown users and wrong passwords fail with the same message.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let user = self
            .users
            .read(|users| users.values().find(|u| u.username == username).cloned())
            .await
            .ok_or_else(|| ServiceError::AuthError(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(ServiceError::AuthError(INVALID_CREDENTIALS.to_string()));
        }

        info!("User authenticated: {}", user.id);
        Ok(user)
    }

    /// Changes a user's role. Operator-only; no HTTP route reaches it.
    #[instrument(skip(self))]
    pub async fn set_role(&self, user_id: Uuid, role: Role) -> Result<User, ServiceError> {
        let user = self
            .users
            .mutate(move |users| {
                let user = users
                    .get_mut(&user_id)
                    .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
                user.role = role;
                Ok(user.clone())
            })
            .await?;

        info!("Set role of user {} to {}", user_id, role);
        Ok(user)
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.users
            .get(user_id)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    async fn ensure_available(&self, username: &str, email: &str) -> Result<(), ServiceError> {
        match self
            .users
            .read(|users| find_conflict(users.values(), username, email))
            .await
        {
            Some(conflict) => Err(conflict),
            None => Ok(()),
        }
    }
}

fn find_conflict<'a>(
    mut users: impl Iterator<Item = &'a User>,
    username: &str,
    email: &str,
) -> Option<ServiceError> {
    users.find_map(|u| {
        if u.username == username {
            Some(ServiceError::Conflict(format!(
                "Username {} is already registered",
                username
            )))
        } else if u.email.eq_ignore_ascii_case(email) {
            Some(ServiceError::Conflict(format!(
                "Email {} is already registered",
                email
            )))
        } else {
            None
        }
    })
}

/// Hashes a password with Argon2id and a random salt, in PHC string form.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Checks `password` against a PHC hash produced by [`hash_password`].
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
