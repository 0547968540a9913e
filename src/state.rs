use crate::{config::Config, session::SessionSigner, stores::Stores};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Session token mint/verify.
    pub session: SessionSigner,
    /// In-memory data stores.
    pub stores: Stores,
}
