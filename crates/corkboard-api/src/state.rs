use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use corkboard_db::Database;

use crate::avatar::AvatarStore;
use crate::service::auth::AuthService;
use crate::service::contact::ContactService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub auth: AuthService,
    pub contacts: ContactService,
    pub avatars: AvatarStore,
    pub secret_key: String,
    pub upload_root: PathBuf,
}

impl AppStateInner {
    pub fn new(
        db: Database,
        upload_root: PathBuf,
        avatar_size: u32,
        allowed_extensions: Vec<String>,
        secret_key: String,
    ) -> Result<Self> {
        let db = Arc::new(db);
        let avatars = AvatarStore::new(upload_root.clone(), avatar_size, allowed_extensions)?;
        Ok(Self {
            auth: AuthService::new(db.clone()),
            contacts: ContactService::new(db),
            avatars,
            secret_key,
            upload_root,
        })
    }
}
