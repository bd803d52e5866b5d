//! services/client/src/views/state.rs
//!
//! Defines the application's shared context and the signed-in session.

use std::sync::{Arc, PoisonError, RwLock};

use life_lessons_core::access::{resolve_access, Redirect, RouteRequirement, Viewer};
use life_lessons_core::domain::User;
use life_lessons_core::ports::{
    AdminService, LessonService, PaymentService, PortError, PortResult, UserService,
};
use tracing::info;

use crate::adapters::{
    HttpAdminAdapter, HttpLessonAdapter, HttpPaymentAdapter, HttpUserAdapter, RestClient,
};
use crate::cache::{keys, QueryCache, QueryOptions};
use crate::config::Config;
use crate::error::ClientError;

//=========================================================================================
// Services (One Set of Ports per Credential)
//=========================================================================================

/// The backend ports, all bound to the same credential (or to none).
#[derive(Clone)]
pub struct Services {
    pub lessons: Arc<dyn LessonService>,
    pub users: Arc<dyn UserService>,
    pub admin: Arc<dyn AdminService>,
    pub payments: Arc<dyn PaymentService>,
}

/// Builds `Services` for a credential. The HTTP implementation is the only
/// production one; tests substitute in-memory backends.
pub trait Connector: Send + Sync {
    fn connect(&self, credential: Option<&str>) -> Services;
}

pub struct HttpConnector {
    client: RestClient,
}

impl HttpConnector {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, credential: Option<&str>) -> Services {
        let client = match credential {
            Some(token) => self.client.with_credential(token),
            None => self.client.without_credential(),
        };
        Services {
            lessons: Arc::new(HttpLessonAdapter::new(client.clone())),
            users: Arc::new(HttpUserAdapter::new(client.clone())),
            admin: Arc::new(HttpAdminAdapter::new(client.clone())),
            payments: Arc::new(HttpPaymentAdapter::new(client)),
        }
    }
}

//=========================================================================================
// Session (The Signed-In User)
//=========================================================================================

struct SignedIn {
    user: User,
    services: Services,
}

/// The current identity. Constructed once per app and passed around
/// explicitly through `AppContext`.
pub struct Session {
    connector: Arc<dyn Connector>,
    cache: QueryCache,
    current: RwLock<Option<SignedIn>>,
}

impl Session {
    pub fn new(connector: Arc<dyn Connector>, cache: QueryCache) -> Self {
        Self {
            connector,
            cache,
            current: RwLock::new(None),
        }
    }

    /// Signs in with a bearer credential from the identity provider: syncs the
    /// user record on the backend, then loads the full user. Switching to a
    /// different account forgets every cached read of the previous one.
    pub async fn hydrate(&self, token: &str) -> PortResult<User> {
        let services = self.connector.connect(Some(token));
        services.users.sync_user().await?;
        let user = services.users.current_user().await?;

        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(SignedIn {
                user: user.clone(),
                services,
            });
        if let Some(previous) = previous.filter(|p| p.user.id != user.id) {
            info!(from = %previous.user.id, to = %user.id, "account switched");
            self.cache.clear();
        }
        self.cache.set_data(keys::current_user(), user.clone());
        info!(user_id = %user.id, role = ?user.role, premium = user.is_premium, "session hydrated");
        Ok(user)
    }

    /// Drops the credential and the current user, and forgets every cached read.
    pub fn logout(&self) {
        let was_signed_in = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        self.cache.clear();
        if was_signed_in {
            info!("signed out");
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.user.clone())
    }

    pub fn viewer(&self) -> Viewer {
        self.user()
            .map(|user| Viewer::from_user(&user))
            .unwrap_or_else(Viewer::anonymous)
    }

    /// The authenticated ports, or `Unauthorized` when nobody is signed in.
    pub fn services(&self) -> PortResult<Services> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.services.clone())
            .ok_or(PortError::Unauthorized)
    }

    /// Replaces the stored user after a profile or premium change.
    pub fn update_user(&self, user: User) {
        if let Some(signed_in) = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            signed_in.user = user;
        }
    }
}

//=========================================================================================
// AppContext (Shared Across All Views)
//=========================================================================================

/// Everything a view needs, created once at startup.
pub struct AppContext {
    pub config: Arc<Config>,
    pub cache: QueryCache,
    pub session: Session,
    public: Services,
}

impl AppContext {
    pub fn new(config: Arc<Config>, connector: Arc<dyn Connector>) -> Arc<Self> {
        let cache = QueryCache::new(QueryOptions::from_config(&config));
        let public = connector.connect(None);
        Arc::new(Self {
            session: Session::new(connector, cache.clone()),
            config,
            cache,
            public,
        })
    }

    /// Wires the HTTP adapters against the configured backend.
    pub fn from_config(config: Arc<Config>) -> Result<Arc<Self>, ClientError> {
        let client = RestClient::new(config.api_base_url.clone(), config.request_timeout)?;
        Ok(Self::new(config, Arc::new(HttpConnector::new(client))))
    }

    /// Unauthenticated ports for public-only reads.
    pub fn public(&self) -> &Services {
        &self.public
    }

    /// Authenticated ports when signed in, public ones otherwise.
    pub fn services(&self) -> Services {
        self.session
            .services()
            .unwrap_or_else(|_| self.public.clone())
    }

    pub fn viewer(&self) -> Viewer {
        self.session.viewer()
    }

    /// Gates a whole route. Login redirects surface as `Unauthorized`, every
    /// other redirect as `Forbidden`.
    pub fn guard(&self, requirement: RouteRequirement) -> PortResult<Viewer> {
        let viewer = self.viewer();
        match resolve_access(&viewer, requirement).redirect_to {
            None => Ok(viewer),
            Some(Redirect::Login) => Err(PortError::Unauthorized),
            Some(Redirect::NotFound) | Some(Redirect::Pricing) => Err(PortError::Forbidden),
        }
    }

    /// Re-reads the current user, e.g. after a payment flips the premium flag.
    pub async fn refresh_user(&self) -> PortResult<User> {
        let users = Arc::clone(&self.session.services()?.users);
        self.cache.invalidate(&keys::current_user()).await;
        let user = self
            .cache
            .fetch(keys::current_user(), move || {
                let users = Arc::clone(&users);
                async move { users.current_user().await }
            })
            .await?;
        let user = User::clone(&user);
        self.session.update_user(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, MemoryBackend};
    use crate::views::DashboardView;
    use life_lessons_core::domain::{
        AccessLevel, Category, EmotionalTone, LessonDraft, Role, Visibility,
    };

    #[tokio::test]
    async fn hydrate_syncs_then_loads_the_user() {
        let backend = MemoryBackend::new();
        let ctx = context(&backend);
        assert!(!ctx.session.is_signed_in());
        assert!(!ctx.viewer().authenticated);

        let user = ctx.session.hydrate("token-alice").await.expect("hydrate");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(backend.calls("sync_user"), 1);
        assert_eq!(backend.calls("current_user"), 1);
        assert_eq!(backend.last_credential().as_deref(), Some("token-alice"));
        assert!(ctx.viewer().authenticated);
    }

    #[tokio::test]
    async fn logout_clears_the_user_and_the_cache() {
        let backend = MemoryBackend::new();
        let ctx = context(&backend);
        ctx.session.hydrate("token-alice").await.expect("hydrate");
        assert!(!ctx.cache.is_empty());

        ctx.session.logout();
        assert!(ctx.session.user().is_none());
        assert!(ctx.cache.is_empty());
        assert_eq!(ctx.session.services().err(), Some(PortError::Unauthorized));
    }

    #[tokio::test]
    async fn switching_accounts_drops_the_previous_users_reads() {
        let backend = MemoryBackend::new();
        let ctx = context(&backend);
        ctx.session.hydrate("token-alice").await.expect("hydrate");
        let dashboard = DashboardView::new(Arc::clone(&ctx));
        dashboard
            .create_lesson(LessonDraft {
                title: "Alice private".to_string(),
                description: "Only I should ever see this one.".to_string(),
                category: Category::PersonalGrowth,
                emotional_tone: EmotionalTone::Gratitude,
                access_level: AccessLevel::Free,
                visibility: Visibility::Private,
                image_url: None,
            })
            .await
            .expect("create");
        assert_eq!(dashboard.my_lessons().await.expect("mine").len(), 1);

        let bob = ctx.session.hydrate("token-bob").await.expect("hydrate");
        assert_eq!(bob.email, "bob@example.com");
        assert!(dashboard.my_lessons().await.expect("mine").is_empty());
        assert_eq!(ctx.session.user().map(|u| u.id), Some(bob.id));

        // Re-hydrating the same account keeps what is cached.
        let reads = backend.calls("my_lessons");
        ctx.session.hydrate("token-bob").await.expect("hydrate");
        dashboard.my_lessons().await.expect("mine");
        assert_eq!(backend.calls("my_lessons"), reads);
    }

    #[tokio::test]
    async fn guard_checks_authentication_before_role() {
        let backend = MemoryBackend::new();
        let ctx = context(&backend);
        assert_eq!(ctx.guard(RouteRequirement::Admin).err(), Some(PortError::Unauthorized));
        assert!(ctx.guard(RouteRequirement::Public).is_ok());

        ctx.session.hydrate("token-alice").await.expect("hydrate");
        assert_eq!(ctx.guard(RouteRequirement::Admin).err(), Some(PortError::Forbidden));
        assert_eq!(ctx.guard(RouteRequirement::Premium).err(), Some(PortError::Forbidden));

        backend.set_role("alice@example.com", Role::Admin);
        ctx.refresh_user().await.expect("refresh");
        assert!(ctx.guard(RouteRequirement::Admin).is_ok());
    }
}
