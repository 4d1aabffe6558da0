//! Entity stores for the authenticated area.
//!
//! Each store holds a transient copy of backend state and exposes a single
//! fetch-and-replace writer. A failed fetch is logged and leaves the previous
//! value in place; nothing is surfaced to the caller.

use crate::client::ApiClient;
use crate::{Error, Prescricao, Result, Usuario};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};

/// The logged-in user
#[derive(Debug, Default)]
pub struct UsuarioStore {
    usuario: RwLock<Usuario>,
}

impl UsuarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Usuario {
        self.usuario
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True once a fetch has filled in a real user
    pub fn is_loaded(&self) -> bool {
        self.get().id != 0
    }

    /// `GET /usuario/:id` for the session's subject
    pub fn fetch(&self, api: &ApiClient) {
        let result = api.session().and_then(|s| api.usuario(s.user_id));
        match result {
            Ok(usuario) => {
                tracing::debug!("Loaded usuario {}", usuario.id);
                *self.usuario.write().unwrap_or_else(PoisonError::into_inner) = usuario;
            }
            Err(e) => tracing::error!("Erro ao buscar usuário: {}", e),
        }
    }

    pub(crate) fn clear(&self) {
        *self.usuario.write().unwrap_or_else(PoisonError::into_inner) = Usuario::default();
    }
}

/// The logged-in patient's prescriptions
#[derive(Debug, Default)]
pub struct PrescricaoStore {
    prescricoes: RwLock<Vec<Prescricao>>,
}

impl PrescricaoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Prescricao> {
        self.prescricoes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: i64) -> Option<Prescricao> {
        self.prescricoes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// `GET /prescricao/:pacienteId` for the session's subject
    pub fn fetch(&self, api: &ApiClient) {
        let result = api
            .session()
            .and_then(|s| api.prescricoes_do_paciente(s.user_id));
        match result {
            Ok(prescricoes) => {
                tracing::debug!("Loaded {} prescricoes", prescricoes.len());
                self.replace(prescricoes);
            }
            Err(e) => tracing::error!("Erro ao buscar prescricao: {}", e),
        }
    }

    pub(crate) fn replace(&self, prescricoes: Vec<Prescricao>) {
        *self
            .prescricoes
            .write()
            .unwrap_or_else(PoisonError::into_inner) = prescricoes;
    }

    /// Mark a dose as taken at `at`
    ///
    /// Only prescriptions in the loaded list can be marked; an unknown id
    /// fails with `NotFound` before anything is sent. Moves the
    /// prescription's `dataInicio` on the backend, then patches the local
    /// entry in place so the countdown restarts on the next tick. On failure
    /// the user is alerted and the local list is untouched. The dose event is
    /// then recorded in the history; a failure there is only logged.
    pub fn take_dose(&self, api: &ApiClient, id: i64, at: DateTime<Utc>) -> Result<()> {
        if self.get(id).is_none() {
            tracing::warn!("Prescricao {} not in local store; nothing sent", id);
            return Err(Error::NotFound(id));
        }

        if let Err(e) = api.mark_dose_taken(id, at) {
            tracing::error!("Erro ao marcar dose da prescricao {}: {}", id, e);
            if !e.is_auth() {
                api.navigator()
                    .alert("Erro ao registrar a dose. Tente novamente.");
            }
            return Err(e);
        }

        {
            let mut prescricoes = self
                .prescricoes
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            // A concurrent fetch may have dropped the entry; the server already has the dose
            if let Some(p) = prescricoes.iter_mut().find(|p| p.id == id) {
                p.data_inicio = at;
            }
        }

        if let Err(e) = api.record_dose(id) {
            tracing::error!("Erro ao registrar historico da prescricao {}: {}", id, e);
        }
        Ok(())
    }

    pub(crate) fn clear(&self) {
        self.replace(Vec::new());
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::prescricao_json;
    use super::*;
    use crate::client::testing::Harness;
    use crate::navigation::Route;
    use crate::transport::Method;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_usuario_fetch_replaces() {
        let h = Harness::logged_in();
        h.transport.on(
            Method::Get,
            "/usuario/7",
            200,
            json!({ "usuario": { "id": 7, "nome": "Maria", "email": "m@x.com" } }),
        );

        let store = UsuarioStore::new();
        assert!(!store.is_loaded());
        store.fetch(&h.api);

        assert_eq!(store.get().nome, "Maria");
        assert!(store.is_loaded());
    }

    #[test]
    fn test_failed_fetch_keeps_previous_value() {
        let h = Harness::logged_in();
        h.transport.on(
            Method::Get,
            "/prescricao/7",
            200,
            json!({ "prescricoes": [prescricao_json(1, "Dipirona", 8, "2024-05-01T08:00:00Z")] }),
        );
        h.transport.on(Method::Get, "/prescricao/7", 500, json!({ "message": "boom" }));

        let store = PrescricaoStore::new();
        store.fetch(&h.api);
        assert_eq!(store.all().len(), 1);

        store.fetch(&h.api);
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.all()[0].remedio.nome, "Dipirona");
    }

    #[test]
    fn test_take_dose_patches_local_entry() {
        let h = Harness::logged_in();
        h.transport.on(
            Method::Get,
            "/prescricao/7",
            200,
            json!({ "prescricoes": [prescricao_json(3, "Losartana", 12, "2024-05-01T08:00:00Z")] }),
        );
        h.transport.on(Method::Put, "/prescricao/3", 200, json!({}));
        h.transport.on(Method::Post, "/historico/3", 201, json!({}));

        let store = PrescricaoStore::new();
        store.fetch(&h.api);

        let taken_at = Utc.with_ymd_and_hms(2024, 5, 1, 19, 45, 10).unwrap();
        store.take_dose(&h.api, 3, taken_at).unwrap();

        assert_eq!(store.get(3).unwrap().data_inicio, taken_at);
        assert_eq!(
            h.transport.calls(),
            vec!["GET /prescricao/7", "PUT /prescricao/3", "POST /historico/3"]
        );
        let put = &h.transport.requests()[1];
        assert_eq!(put.body, Some(json!({ "dataInicio": "2024-05-01T19:45:10.000Z" })));
    }

    #[test]
    fn test_take_dose_failure_leaves_list_untouched() {
        let h = Harness::logged_in();
        h.transport.on(
            Method::Get,
            "/prescricao/7",
            200,
            json!([prescricao_json(3, "Losartana", 12, "2024-05-01T08:00:00Z")]),
        );
        h.transport.on(Method::Put, "/prescricao/3", 500, json!({ "message": "falhou" }));

        let store = PrescricaoStore::new();
        store.fetch(&h.api);
        let before = store.get(3).unwrap().data_inicio;

        let result = store.take_dose(&h.api, 3, Utc::now());

        assert!(result.is_err());
        assert_eq!(store.get(3).unwrap().data_inicio, before);
        assert_eq!(h.navigator.take_alerts().len(), 1);
        assert!(!h.transport.calls().contains(&"POST /historico/3".to_string()));
    }

    #[test]
    fn test_take_dose_unknown_id_sends_nothing() {
        let h = Harness::logged_in();
        h.transport.on(Method::Put, "/prescricao/3", 200, json!({}));
        h.transport.on(Method::Post, "/historico/3", 201, json!({}));

        let store = PrescricaoStore::new();
        let err = store.take_dose(&h.api, 3, Utc::now()).unwrap_err();

        assert!(matches!(err, Error::NotFound(3)));
        assert!(h.transport.requests().is_empty());
        assert!(h.navigator.take_alerts().is_empty());
    }

    #[test]
    fn test_take_dose_unauthorized_alerts_only_once() {
        let h = Harness::logged_in();
        h.transport.on(
            Method::Get,
            "/prescricao/7",
            200,
            json!([prescricao_json(3, "Losartana", 12, "2024-05-01T08:00:00Z")]),
        );
        h.transport.on(Method::Put, "/prescricao/3", 401, json!({}));

        let store = PrescricaoStore::new();
        store.fetch(&h.api);
        let err = store.take_dose(&h.api, 3, Utc::now()).unwrap_err();

        assert!(err.is_auth());
        assert_eq!(h.navigator.take_alerts().len(), 1);
        assert_eq!(h.navigator.visited(), vec![Route::Login]);
    }
}
