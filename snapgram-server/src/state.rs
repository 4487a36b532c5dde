use crate::config::Settings;
use crate::credentials::CredentialService;
use crate::db::Database;
use crate::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub credentials: CredentialService,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: Database, settings: &Settings) -> anyhow::Result<Self> {
        let credentials = CredentialService::new(db.clone(), &settings.auth)?;
        let uploads = UploadStore::new(&settings.uploads);
        Ok(Self {
            db,
            credentials,
            uploads,
        })
    }
}
