//! Core domain types for the Ari medication reminder.
//!
//! Field names follow the backend's JSON (camelCase, Portuguese):
//! - Users, medicines, prescriptions and caregivers
//! - Dose history entries
//! - Request bodies for login, signup and the CRUD forms

use crate::dates;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Records listed by the CRUD screens carry a numeric id unique within their resource
pub trait Identified {
    fn id(&self) -> i64;
}

fn active() -> bool {
    true
}

// ============================================================================
// Users and authentication
// ============================================================================

/// The logged-in user (`GET /usuario/:id`)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: i64,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "active")]
    pub status: bool,
}

/// Login form (`POST /login`)
#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub senha: String,
}

/// Login response
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Signup form (`POST /usuario`)
#[derive(Clone, Debug, Serialize)]
pub struct NovoUsuario {
    pub nome: String,
    pub email: String,
    pub senha: String,
    /// Birth date
    #[serde(with = "dates::date")]
    pub data: NaiveDate,
}

// ============================================================================
// Medicines
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Remedio {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub funcao: String,
    #[serde(default)]
    pub dosagem: String,
    #[serde(default = "active")]
    pub status: bool,
}

impl Identified for Remedio {
    fn id(&self) -> i64 {
        self.id
    }
}

/// New-medicine form; `Default` is the empty form
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct NovoRemedio {
    pub nome: String,
    pub funcao: String,
    pub dosagem: String,
}

// ============================================================================
// Prescriptions
// ============================================================================

/// Partial patient embedded in a prescription
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PacienteResumo {
    pub id: i64,
    #[serde(default)]
    pub nome: String,
}

/// A standing order: one patient, one medicine, dosing interval and validity window
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prescricao {
    pub id: i64,
    pub remedio: Remedio,
    #[serde(default, alias = "usuario", skip_serializing_if = "Option::is_none")]
    pub paciente: Option<PacienteResumo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
    /// Hours between doses
    pub frequencia: u32,
    /// Time of the last dose taken
    #[serde(with = "dates::datetime")]
    pub data_inicio: DateTime<Utc>,
    #[serde(default, with = "dates::option_date")]
    pub data_fim: Option<NaiveDate>,
    #[serde(default = "active")]
    pub status: bool,
}

impl Identified for Prescricao {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Prescricao {
    pub fn observacao_label(&self) -> &str {
        match self.observacao.as_deref() {
            Some(obs) if !obs.trim().is_empty() => obs,
            _ => "Nenhuma",
        }
    }
}

/// "a cada N horas" rendering of a dosing interval
pub fn frequencia_label(frequencia: u32) -> String {
    if frequencia == 1 {
        "a cada 1 hora".into()
    } else {
        format!("a cada {} horas", frequencia)
    }
}

/// New-prescription form
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NovaPrescricao {
    pub id_usuario: i64,
    pub id_remedio: i64,
    pub observacao: String,
    pub frequencia: u32,
    #[serde(with = "dates::option_datetime")]
    pub data_inicio: Option<DateTime<Utc>>,
    #[serde(with = "dates::option_date")]
    pub data_fim: Option<NaiveDate>,
}

impl Default for NovaPrescricao {
    fn default() -> Self {
        Self {
            id_usuario: 0,
            id_remedio: 0,
            observacao: String::new(),
            frequencia: 1,
            data_inicio: None,
            data_fim: None,
        }
    }
}

/// Partial update sent when a dose is marked as taken
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseTomada {
    #[serde(with = "dates::datetime")]
    pub data_inicio: DateTime<Utc>,
}

// ============================================================================
// Dose history
// ============================================================================

/// One recorded dose-taking event (`GET /historico/:prescricaoId`)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoricoEntry {
    pub id_remedio: i64,
    pub nome: String,
    #[serde(default)]
    pub dosagem: String,
    #[serde(default)]
    pub funcao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
    pub frequencia: u32,
    #[serde(with = "dates::datetime")]
    pub data_inicio: DateTime<Utc>,
    #[serde(with = "dates::datetime")]
    pub tomado_em: DateTime<Utc>,
}

// ============================================================================
// Caregivers
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Responsavel {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub email: String,
}

impl Identified for Responsavel {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Patient/caregiver pair body for `POST` and `DELETE /responsavel`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResponsavelLink {
    pub id_usuario: i64,
    pub id_paciente: i64,
}
