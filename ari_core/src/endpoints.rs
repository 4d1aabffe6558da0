//! Typed calls for each backend resource.

use crate::client::{list_from, object_from, ApiClient};
use crate::transport::Method;
use crate::{
    Credentials, DoseTomada, Error, HistoricoEntry, LoginResponse, NovaPrescricao, NovoRemedio,
    NovoUsuario, Prescricao, Remedio, Responsavel, ResponsavelLink, Result, Usuario,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

fn body<T: Serialize>(value: &T) -> Result<Option<Value>> {
    Ok(Some(serde_json::to_value(value)?))
}

impl ApiClient {
    // Session ---------------------------------------------------------------

    /// `POST /login`; returns the issued token without storing it
    pub fn login(&self, credentials: &Credentials) -> Result<String> {
        let value = self.call_public(Method::Post, "/login", body(credentials)?)?;
        let response: LoginResponse = serde_json::from_value(value)?;
        if response.token.trim().is_empty() {
            return Err(Error::Other("Login sem token na resposta".into()));
        }
        Ok(response.token)
    }

    /// `POST /usuario` (signup, unauthenticated)
    pub fn signup(&self, novo: &NovoUsuario) -> Result<()> {
        self.call_public(Method::Post, "/usuario", body(novo)?)?;
        Ok(())
    }

    /// `POST /logout`
    pub fn logout(&self) -> Result<()> {
        self.call(Method::Post, "/logout", None)?;
        Ok(())
    }

    pub fn usuario(&self, id: i64) -> Result<Usuario> {
        let value = self.call(Method::Get, &format!("/usuario/{}", id), None)?;
        object_from(value, "usuario")
    }

    // Medicines -------------------------------------------------------------

    pub fn remedios(&self) -> Result<Vec<Remedio>> {
        list_from(self.call(Method::Get, "/remedio", None)?, "remedios")
    }

    pub fn create_remedio(&self, novo: &NovoRemedio) -> Result<()> {
        self.call(Method::Post, "/remedio", body(novo)?)?;
        Ok(())
    }

    pub fn update_remedio(&self, remedio: &Remedio) -> Result<()> {
        self.call(Method::Put, &format!("/remedio/{}", remedio.id), body(remedio)?)?;
        Ok(())
    }

    pub fn delete_remedio(&self, id: i64) -> Result<()> {
        self.call(Method::Delete, &format!("/remedio/{}", id), None)?;
        Ok(())
    }

    // Prescriptions ---------------------------------------------------------

    /// Every prescription visible to the caller (`GET /prescricao`)
    pub fn prescricoes(&self) -> Result<Vec<Prescricao>> {
        list_from(self.call(Method::Get, "/prescricao", None)?, "prescricoes")
    }

    /// One patient's prescriptions (`GET /prescricao/:pacienteId`)
    pub fn prescricoes_do_paciente(&self, paciente_id: i64) -> Result<Vec<Prescricao>> {
        let value = self.call(Method::Get, &format!("/prescricao/{}", paciente_id), None)?;
        list_from(value, "prescricoes")
    }

    pub fn create_prescricao(&self, nova: &NovaPrescricao) -> Result<()> {
        self.call(Method::Post, "/prescricao", body(nova)?)?;
        Ok(())
    }

    pub fn update_prescricao(&self, prescricao: &Prescricao) -> Result<()> {
        let path = format!("/prescricao/{}", prescricao.id);
        self.call(Method::Put, &path, body(prescricao)?)?;
        Ok(())
    }

    pub fn delete_prescricao(&self, id: i64) -> Result<()> {
        self.call(Method::Delete, &format!("/prescricao/{}", id), None)?;
        Ok(())
    }

    /// Partial `PUT /prescricao/:id` moving `dataInicio` to the dose time
    pub fn mark_dose_taken(&self, prescricao_id: i64, at: DateTime<Utc>) -> Result<()> {
        let path = format!("/prescricao/{}", prescricao_id);
        self.call(Method::Put, &path, body(&DoseTomada { data_inicio: at })?)?;
        Ok(())
    }

    // Dose history ----------------------------------------------------------

    pub fn historico(&self, prescricao_id: i64) -> Result<Vec<HistoricoEntry>> {
        let value = self.call(Method::Get, &format!("/historico/{}", prescricao_id), None)?;
        list_from(value, "historico")
    }

    /// `POST /historico/:id`; the backend stamps the event with its own clock
    pub fn record_dose(&self, prescricao_id: i64) -> Result<()> {
        self.call(Method::Post, &format!("/historico/{}", prescricao_id), None)?;
        Ok(())
    }

    // Caregivers ------------------------------------------------------------

    pub fn responsaveis(&self, paciente_id: i64) -> Result<Vec<Responsavel>> {
        let value = self.call(Method::Get, &format!("/responsavel/{}", paciente_id), None)?;
        list_from(value, "responsavel")
    }

    pub fn add_responsavel(&self, link: &ResponsavelLink) -> Result<()> {
        self.call(Method::Post, "/responsavel", body(link)?)?;
        Ok(())
    }

    pub fn remove_responsavel(&self, link: &ResponsavelLink) -> Result<()> {
        self.call(Method::Delete, "/responsavel", body(link)?)?;
        Ok(())
    }
}
