//! Routes and user-facing alerts.
//!
//! The navigator stands in for a router plus `alert()`: flows record where
//! the user should go next and what they must be told, and the front end
//! drains both after each action.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Alert raised when the backend rejects the session token
pub const SESSION_EXPIRED_ALERT: &str = "Sessão expirada. Faça login novamente.";

/// Most recent navigations kept for [`Navigator::visited`]
const VISITED_CAPACITY: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Cadastro,
    Home,
    Remedio,
    Prescricao,
    Historico,
    Responsavel,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Cadastro => "/cadastro",
            Route::Home => "/home",
            Route::Remedio => "/remedio",
            Route::Prescricao => "/prescricao",
            Route::Historico => "/historico",
            Route::Responsavel => "/responsavel",
        }
    }

    /// Routes behind the authenticated layout
    pub fn requires_session(&self) -> bool {
        !matches!(self, Route::Login | Route::Cadastro)
    }
}

#[derive(Debug)]
struct NavState {
    current: Route,
    visited: VecDeque<Route>,
    alerts: Vec<String>,
}

#[derive(Debug)]
pub struct Navigator {
    state: Mutex<NavState>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        Self {
            state: Mutex::new(NavState {
                current: start,
                visited: VecDeque::with_capacity(VISITED_CAPACITY),
                alerts: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn navigate(&self, route: Route) {
        tracing::debug!("Navigating to {}", route.path());
        let mut state = self.lock();
        state.current = route;
        if state.visited.len() == VISITED_CAPACITY {
            state.visited.pop_front();
        }
        state.visited.push_back(route);
    }

    pub fn current(&self) -> Route {
        self.lock().current
    }

    /// The most recent navigations, oldest first
    pub fn visited(&self) -> Vec<Route> {
        self.lock().visited.iter().copied().collect()
    }

    pub fn alert(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Alert: {}", message);
        self.lock().alerts.push(message);
    }

    /// Drain pending alerts
    pub fn take_alerts(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().alerts)
    }

    /// Reaction to a 401/403: tell the user and send them to login
    pub fn session_expired(&self) {
        self.alert(SESSION_EXPIRED_ALERT);
        self.navigate(Route::Login);
    }
}
