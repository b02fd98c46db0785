use std::sync::Arc;

use crate::clients::{
    CommentClient, IdeaClient, LikeClient, RoleClient, TagClient, UserClient,
};
use crate::config::AppConfig;
use crate::storage::AvatarStore;
use crate::store::Datastore;

/// Shared application state, injected into every handler. Holds the
/// persistence gateway behind its trait so the same router runs over
/// Postgres in production and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub config: Arc<AppConfig>,
    pub avatars: AvatarStore,
}

impl AppState {
    pub fn new(store: Arc<dyn Datastore>, config: AppConfig) -> Self {
        let avatars = AvatarStore::new(config.api.avatar_dir.clone());
        Self { store, config: Arc::new(config), avatars }
    }

    pub fn users(&self) -> UserClient {
        UserClient::new(
            self.store.clone(),
            self.avatars.clone(),
            self.config.security.clone(),
        )
    }

    pub fn roles(&self) -> RoleClient {
        RoleClient::new(self.store.clone())
    }

    pub fn tags(&self) -> TagClient {
        TagClient::new(self.store.clone())
    }

    pub fn ideas(&self) -> IdeaClient {
        IdeaClient::new(self.store.clone())
    }

    pub fn comments(&self) -> CommentClient {
        CommentClient::new(self.store.clone())
    }

    pub fn likes(&self) -> LikeClient {
        LikeClient::new(self.store.clone())
    }
}
