use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ZentaoConfig;
use crate::error::Result;
use crate::gateway::{HttpGateway, TokenMode};
use crate::models::{Bug, BugList, Product, ProductList, UserProfile, UserResponse};
use crate::session::{SessionManager, TokenStore};

#[derive(Clone)]
pub struct ZentaoClient {
    gateway: HttpGateway,
    session: SessionManager,
}

impl ZentaoClient {
    pub fn new(config: ZentaoConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let session = SessionManager::new(config.credentials.clone(), store);
        let gateway = HttpGateway::new(config)?;
        Ok(Self { gateway, session })
    }

    pub fn from_parts(gateway: HttpGateway, session: SessionManager) -> Self {
        Self { gateway, session }
    }

    pub fn config(&self) -> &ZentaoConfig {
        self.gateway.config()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    /// Forces a fresh login, replacing any cached token.
    pub async fn login(&self) -> Result<String> {
        self.session.reauthenticate(&self.gateway).await
    }

    pub async fn ensure_token(&self) -> Result<String> {
        self.session.ensure_token(&self.gateway).await
    }

    pub async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.ensure_token().await?;
        self.gateway
            .call(&self.session, Method::GET, path, None::<&Value>, TokenMode::Inject)
            .await?
            .decode()
    }

    /// Fetches the logged-in user's profile and caches the display name.
    pub async fn fetch_user_info(&self) -> Result<UserProfile> {
        let response: UserResponse = self.get("user").await?;
        let profile = response.profile;
        if let Some(name) = profile.display_name() {
            debug!(realname = name, "Caching user display name");
            self.session.set_realname(name);
        }
        Ok(profile)
    }

    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let list: ProductList = self.get("products").await?;
        info!(count = list.products.len(), "Products fetched");
        Ok(list.products)
    }

    /// One page of up to `bug_page_limit` bugs; later pages are not requested.
    pub async fn fetch_bugs(&self, product_id: &str) -> Result<Vec<Bug>> {
        let path = format!(
            "products/{}/bugs?limit={}",
            product_id.trim(),
            self.config().bug_page_limit
        );
        let list: BugList = self.get(&path).await?;
        info!(product_id, count = list.bugs.len(), "Bugs fetched");
        Ok(list.bugs)
    }
}
