#![forbid(unsafe_code)]

//! Core client library for the Ari medication reminder.
//!
//! This crate provides:
//! - Domain types (users, medicines, prescriptions, dose history, caregivers)
//! - Token storage and session handling
//! - REST client over a pluggable transport
//! - Entity stores and the dose countdown
//! - CRUD screen state machines and the history view

pub mod types;
pub mod error;
pub mod dates;
pub mod config;
pub mod logging;
pub mod session;
pub mod navigation;
pub mod transport;
pub mod client;
pub mod endpoints;
pub mod store;
pub mod countdown;
pub mod screens;
pub mod history;
pub mod auth;
pub mod context;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use session::{decode_subject, CurrentSession, TokenStore};
pub use navigation::{Navigator, Route};
pub use transport::{Method, ReqwestTransport, Transport};
pub use client::ApiClient;
pub use store::{PrescricaoStore, UsuarioStore};
pub use countdown::{countdown, next_dose_time, Countdown, CountdownLine, CountdownView, Ticker};
pub use screens::{Dashboard, PrescricaoScreen, RemedioScreen, ResponsavelScreen};
pub use history::HistoryView;
pub use context::AppContext;
