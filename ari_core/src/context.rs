//! Application context for the authenticated area.
//!
//! Owns the API client, the navigator and the entity stores, and hands them
//! to screens by reference. Entering the authenticated area fetches the
//! stores once per session: logging out, logging in again or having the token
//! rejected makes the next entry fetch them again.

use crate::client::ApiClient;
use crate::countdown::CountdownView;
use crate::navigation::{Navigator, Route};
use crate::store::{PrescricaoStore, UsuarioStore};
use crate::{Config, Credentials, Result};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, PoisonError};

pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub navigator: Arc<Navigator>,
    pub usuario: UsuarioStore,
    pub prescricoes: Arc<PrescricaoStore>,
    /// Token the stores were last fetched with
    bootstrapped: Mutex<OnceCell<String>>,
}

impl AppContext {
    /// Context talking HTTP to the configured backend
    pub fn from_config(config: Config) -> Result<Self> {
        let navigator = Arc::new(Navigator::default());
        let api = ApiClient::from_config(&config, navigator.clone())?;
        Ok(Self::with_client(config, api))
    }

    pub fn with_client(config: Config, api: ApiClient) -> Self {
        let navigator = api.navigator().clone();
        Self {
            config,
            api,
            navigator,
            usuario: UsuarioStore::new(),
            prescricoes: Arc::new(PrescricaoStore::new()),
            bootstrapped: Mutex::new(OnceCell::new()),
        }
    }

    /// Enter an authenticated route
    ///
    /// Without a session this redirects to login and returns false. Otherwise
    /// the stores are fetched the first time only, and the route is entered
    /// unless the backend rejected the token during that fetch.
    pub fn enter(&self, route: Route) -> bool {
        if route.requires_session() {
            if self.api.session().is_err() {
                self.reset_bootstrap();
                return false;
            }
            self.bootstrap();
            if self.api.tokens().load().is_none() {
                self.reset_bootstrap();
                return false;
            }
        }
        self.navigator.navigate(route);
        true
    }

    /// Fetch the user and prescription stores, once per stored token
    pub fn bootstrap(&self) {
        let Some(token) = self.api.tokens().load() else {
            self.reset_bootstrap();
            return;
        };

        let mut loaded = self.bootstrapped.lock().unwrap_or_else(PoisonError::into_inner);
        if loaded.get().is_some_and(|t| *t != token) {
            loaded.take();
        }
        loaded.get_or_init(|| {
            tracing::debug!("Bootstrapping session stores");
            self.usuario.fetch(&self.api);
            self.prescricoes.fetch(&self.api);
            token
        });
    }

    /// Make the next authenticated entry fetch the stores again
    fn reset_bootstrap(&self) {
        self.bootstrapped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn countdown_view(&self) -> CountdownView {
        CountdownView::new(self.prescricoes.clone(), self.config.countdown.due_message.clone())
    }

    /// Log in; the next authenticated entry loads this user's stores
    pub fn login(&self, credentials: &Credentials) -> Result<()> {
        crate::auth::login(&self.api, credentials)?;
        self.reset_bootstrap();
        Ok(())
    }

    /// Log out and drop the cached entities
    pub fn logout(&self) -> Result<()> {
        crate::auth::logout(&self.api)?;
        self.reset_bootstrap();
        self.usuario.clear();
        self.prescricoes.clear();
        Ok(())
    }
}
