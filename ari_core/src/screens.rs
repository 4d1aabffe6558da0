//! CRUD screen state machines.
//!
//! A screen is either listing its records or editing exactly one of them.
//! Every successful mutation is followed by a full re-fetch of the list;
//! failures are logged, kept as the screen's inline error, and leave the
//! form and list as they were.

use crate::client::ApiClient;
use crate::countdown::{CountdownLine, CountdownView};
use crate::store::{PrescricaoStore, UsuarioStore};
use crate::types::Identified;
use crate::{
    Error, NovaPrescricao, NovoRemedio, Prescricao, Remedio, Responsavel, ResponsavelLink,
    Result, Usuario,
};
use chrono::Utc;
use std::marker::PhantomData;

/// A REST resource managed by a [`CrudScreen`]
pub trait CrudResource {
    type Item: Identified + Clone;
    type Draft: Default + Clone;

    /// Shown when the list is empty
    const EMPTY_MESSAGE: &'static str;

    fn list(api: &ApiClient) -> Result<Vec<Self::Item>>;
    fn create(api: &ApiClient, draft: &Self::Draft) -> Result<()>;
    fn update(api: &ApiClient, item: &Self::Item) -> Result<()>;
    fn delete(api: &ApiClient, id: i64) -> Result<()>;
}

/// Medicines (`/remedio`)
pub struct Remedios;

impl CrudResource for Remedios {
    type Item = Remedio;
    type Draft = NovoRemedio;

    const EMPTY_MESSAGE: &'static str = "Nenhum remédio encontrado.";

    fn list(api: &ApiClient) -> Result<Vec<Remedio>> {
        api.remedios()
    }

    fn create(api: &ApiClient, draft: &NovoRemedio) -> Result<()> {
        api.create_remedio(draft)
    }

    fn update(api: &ApiClient, item: &Remedio) -> Result<()> {
        api.update_remedio(item)
    }

    fn delete(api: &ApiClient, id: i64) -> Result<()> {
        api.delete_remedio(id)
    }
}

/// Prescriptions (`/prescricao`)
pub struct Prescricoes;

impl CrudResource for Prescricoes {
    type Item = Prescricao;
    type Draft = NovaPrescricao;

    const EMPTY_MESSAGE: &'static str = "Nenhuma prescrição encontrada.";

    fn list(api: &ApiClient) -> Result<Vec<Prescricao>> {
        api.prescricoes()
    }

    fn create(api: &ApiClient, draft: &NovaPrescricao) -> Result<()> {
        api.create_prescricao(draft)
    }

    fn update(api: &ApiClient, item: &Prescricao) -> Result<()> {
        api.update_prescricao(item)
    }

    fn delete(api: &ApiClient, id: i64) -> Result<()> {
        api.delete_prescricao(id)
    }
}

pub struct CrudScreen<R: CrudResource> {
    items: Vec<R::Item>,
    /// The new-record form
    pub draft: R::Draft,
    editing: Option<R::Item>,
    error: Option<String>,
    _resource: PhantomData<R>,
}

impl<R: CrudResource> Default for CrudScreen<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            draft: R::Draft::default(),
            editing: None,
            error: None,
            _resource: PhantomData,
        }
    }
}

impl<R: CrudResource> CrudScreen<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[R::Item] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.items.is_empty().then_some(R::EMPTY_MESSAGE)
    }

    fn fail(&mut self, action: &str, e: Error) -> Error {
        tracing::error!("Erro ao {}: {}", action, e);
        self.error = Some(e.to_string());
        e
    }

    /// Re-fetch the list
    pub fn refresh(&mut self, api: &ApiClient) -> Result<()> {
        match R::list(api) {
            Ok(items) => {
                self.items = items;
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.fail("buscar registros", e)),
        }
    }

    /// Submit the new-record form; resets it and re-fetches on success
    pub fn submit_new(&mut self, api: &ApiClient) -> Result<()> {
        if let Err(e) = R::create(api, &self.draft) {
            return Err(self.fail("adicionar registro", e));
        }
        self.draft = R::Draft::default();
        self.refresh(api)
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Enter edit mode for a listed record
    pub fn begin_edit(&mut self, id: i64) -> Result<()> {
        let item = self
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or(Error::NotFound(id))?;
        self.editing = Some(item);
        Ok(())
    }

    pub fn editing(&self) -> Option<&R::Item> {
        self.editing.as_ref()
    }

    pub fn editing_mut(&mut self) -> Option<&mut R::Item> {
        self.editing.as_mut()
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Save the record being edited; edit mode ends only on success
    pub fn save_edit(&mut self, api: &ApiClient) -> Result<()> {
        let Some(item) = self.editing.clone() else {
            return Ok(());
        };
        if let Err(e) = R::update(api, &item) {
            return Err(self.fail("editar registro", e));
        }
        self.editing = None;
        self.refresh(api)
    }

    /// Delete by id, then re-fetch; no confirmation, no undo
    pub fn delete(&mut self, api: &ApiClient, id: i64) -> Result<()> {
        if let Err(e) = R::delete(api, id) {
            return Err(self.fail("deletar registro", e));
        }
        self.refresh(api)
    }
}

pub type RemedioScreen = CrudScreen<Remedios>;
pub type PrescricaoScreen = CrudScreen<Prescricoes>;

/// Caregivers of one patient
#[derive(Debug, Default)]
pub struct ResponsavelScreen {
    items: Vec<Responsavel>,
    error: Option<String>,
}

impl ResponsavelScreen {
    pub const EMPTY_MESSAGE: &'static str = "Nenhum responsável encontrado.";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Responsavel] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.items.is_empty().then_some(Self::EMPTY_MESSAGE)
    }

    fn fail(&mut self, e: Error) -> Error {
        tracing::error!("Erro em responsáveis: {}", e);
        self.error = Some(match &e {
            Error::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        });
        e
    }

    pub fn refresh(&mut self, api: &ApiClient, paciente_id: i64) -> Result<()> {
        match api.responsaveis(paciente_id) {
            Ok(items) => {
                self.items = items;
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn add(&mut self, api: &ApiClient, paciente_id: i64, responsavel_id: i64) -> Result<()> {
        let link = ResponsavelLink {
            id_usuario: responsavel_id,
            id_paciente: paciente_id,
        };
        if let Err(e) = api.add_responsavel(&link) {
            return Err(self.fail(e));
        }
        self.refresh(api, paciente_id)
    }

    pub fn remove(&mut self, api: &ApiClient, paciente_id: i64, responsavel_id: i64) -> Result<()> {
        let link = ResponsavelLink {
            id_usuario: responsavel_id,
            id_paciente: paciente_id,
        };
        if let Err(e) = api.remove_responsavel(&link) {
            return Err(self.fail(e));
        }
        self.refresh(api, paciente_id)
    }
}

/// Home screen: who is logged in, the medicine catalog and the next doses
#[derive(Clone, Debug)]
pub struct Dashboard {
    pub usuario: Usuario,
    pub remedios: Vec<Remedio>,
    pub prescricoes: Vec<Prescricao>,
    pub doses: Vec<CountdownLine>,
}

impl Dashboard {
    /// Assemble from the stores plus one medicine fetch
    ///
    /// A failed medicine fetch renders as an empty catalog.
    pub fn load(
        api: &ApiClient,
        usuario: &UsuarioStore,
        prescricoes: &std::sync::Arc<PrescricaoStore>,
        due_message: &str,
    ) -> Self {
        let remedios = api.remedios().unwrap_or_else(|e| {
            tracing::error!("Erro ao buscar dados: {}", e);
            Vec::new()
        });
        let doses = CountdownView::new(prescricoes.clone(), due_message).snapshot(Utc::now());
        Self {
            usuario: usuario.get(),
            remedios,
            prescricoes: prescricoes.all(),
            doses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::Harness;
    use crate::store::fixtures::prescricao_json;
    use crate::transport::Method;
    use serde_json::json;

    fn dipirona() -> serde_json::Value {
        json!({ "id": 1, "nome": "Dipirona", "funcao": "dor", "dosagem": "500mg", "status": true })
    }

    fn paracetamol() -> serde_json::Value {
        json!({ "id": 2, "nome": "Paracetamol", "funcao": "febre", "dosagem": "750mg", "status": true })
    }

    #[test]
    fn test_create_medicine_resets_form_and_refetches() {
        let h = Harness::logged_in();
        h.transport.on(Method::Post, "/remedio", 201, json!({ "id": 1 }));
        h.transport.on(Method::Get, "/remedio", 200, json!({ "remedios": [dipirona()] }));

        let mut screen = RemedioScreen::new();
        screen.draft = NovoRemedio {
            nome: "Dipirona".into(),
            funcao: "dor".into(),
            dosagem: "500mg".into(),
        };
        screen.submit_new(&h.api).unwrap();

        assert_eq!(screen.draft, NovoRemedio::default());
        assert_eq!(screen.draft.nome, "");
        assert!(screen.items().iter().any(|r| r.nome == "Dipirona"));
        assert_eq!(h.transport.calls(), vec!["POST /remedio", "GET /remedio"]);
        assert_eq!(
            h.transport.requests()[0].body,
            Some(json!({ "nome": "Dipirona", "funcao": "dor", "dosagem": "500mg" }))
        );
    }

    #[test]
    fn test_failed_create_keeps_form() {
        let h = Harness::logged_in();
        h.transport.on(Method::Post, "/remedio", 500, json!({ "message": "erro interno" }));

        let mut screen = RemedioScreen::new();
        screen.draft.nome = "Dipirona".into();
        assert!(screen.submit_new(&h.api).is_err());

        assert_eq!(screen.draft.nome, "Dipirona");
        assert!(screen.error().is_some());
        assert_eq!(h.transport.calls(), vec!["POST /remedio"]);
    }

    #[test]
    fn test_non_array_payload_renders_empty() {
        let h = Harness::logged_in();
        h.transport.on(Method::Get, "/remedio", 200, json!({ "remedios": null }));

        let mut screen = RemedioScreen::new();
        screen.refresh(&h.api).unwrap();

        assert!(screen.items().is_empty());
        assert_eq!(screen.empty_message(), Some("Nenhum remédio encontrado."));
    }

    #[test]
    fn test_delete_then_refetch_drops_record() {
        let h = Harness::logged_in();
        h.transport.on(Method::Get, "/remedio", 200, json!({ "remedios": [dipirona(), paracetamol()] }));
        h.transport.on(Method::Delete, "/remedio/1", 200, json!({}));
        h.transport.on(Method::Get, "/remedio", 200, json!({ "remedios": [paracetamol()] }));

        let mut screen = RemedioScreen::new();
        screen.refresh(&h.api).unwrap();
        assert_eq!(screen.items().len(), 2);

        screen.delete(&h.api, 1).unwrap();

        assert!(screen.items().iter().all(|r| r.id != 1));
        assert_eq!(
            h.transport.calls(),
            vec!["GET /remedio", "DELETE /remedio/1", "GET /remedio"]
        );
    }

    #[test]
    fn test_edit_exits_only_on_success() {
        let h = Harness::logged_in();
        h.transport.on(Method::Get, "/remedio", 200, json!([dipirona()]));
        h.transport.on(Method::Put, "/remedio/1", 500, json!({ "message": "falhou" }));
        h.transport.on(Method::Put, "/remedio/1", 200, json!({}));
        let mut renamed = dipirona();
        renamed["dosagem"] = json!("1g");
        h.transport.on(Method::Get, "/remedio", 200, json!([renamed]));

        let mut screen = RemedioScreen::new();
        screen.refresh(&h.api).unwrap();
        screen.begin_edit(1).unwrap();
        screen.editing_mut().unwrap().dosagem = "1g".into();

        assert!(screen.save_edit(&h.api).is_err());
        assert!(screen.is_editing());
        assert_eq!(screen.editing().unwrap().dosagem, "1g");

        screen.save_edit(&h.api).unwrap();
        assert!(!screen.is_editing());
        assert_eq!(screen.items()[0].dosagem, "1g");
    }

    #[test]
    fn test_begin_edit_unknown_id() {
        let mut screen = RemedioScreen::new();
        assert!(matches!(screen.begin_edit(99), Err(Error::NotFound(99))));
        assert!(!screen.is_editing());
    }

    #[test]
    fn test_prescription_list_accepts_bare_array() {
        let h = Harness::logged_in();
        h.transport.on(
            Method::Get,
            "/prescricao",
            200,
            json!([prescricao_json(4, "Losartana", 12, "2024-05-01T08:00:00Z")]),
        );

        let mut screen = PrescricaoScreen::new();
        screen.refresh(&h.api).unwrap();

        assert_eq!(screen.items()[0].remedio.nome, "Losartana");
        assert_eq!(screen.draft.frequencia, 1);
    }

    #[test]
    fn test_unauthorized_list_keeps_previous_items() {
        let h = Harness::logged_in();
        h.transport.on(Method::Get, "/remedio", 200, json!([dipirona()]));
        h.transport.on(Method::Get, "/remedio", 401, json!({}));

        let mut screen = RemedioScreen::new();
        screen.refresh(&h.api).unwrap();
        let err = screen.refresh(&h.api).unwrap_err();

        assert!(err.is_auth());
        assert_eq!(screen.items().len(), 1);
        assert_eq!(h.navigator.take_alerts().len(), 1);
    }

    #[test]
    fn test_caregiver_add_and_remove() {
        let h = Harness::logged_in();
        let ana = json!({ "id": 12, "nome": "Ana", "email": "ana@x.com" });
        h.transport.on(Method::Post, "/responsavel", 201, json!({}));
        h.transport.on(Method::Get, "/responsavel/7", 200, json!({ "responsavel": [ana] }));
        h.transport.on(Method::Delete, "/responsavel", 200, json!({}));
        h.transport.on(Method::Get, "/responsavel/7", 200, json!({ "responsavel": [] }));

        let mut screen = ResponsavelScreen::new();
        screen.add(&h.api, 7, 12).unwrap();
        assert_eq!(screen.items()[0].nome, "Ana");

        screen.remove(&h.api, 7, 12).unwrap();
        assert_eq!(screen.empty_message(), Some(ResponsavelScreen::EMPTY_MESSAGE));
    }

    #[test]
    fn test_caregiver_backend_message_shown() {
        let h = Harness::logged_in();
        h.transport.on(Method::Post, "/responsavel", 404, json!({ "message": "Usuário não encontrado" }));

        let mut screen = ResponsavelScreen::new();
        assert!(screen.add(&h.api, 7, 99).is_err());
        assert_eq!(screen.error(), Some("Usuário não encontrado"));
    }

    #[test]
    fn test_dashboard_tolerates_failed_medicine_fetch() {
        let h = Harness::logged_in();
        h.transport.on(Method::Get, "/remedio", 500, json!({}));

        let usuario = UsuarioStore::new();
        let prescricoes = std::sync::Arc::new(PrescricaoStore::new());
        let dashboard = Dashboard::load(&h.api, &usuario, &prescricoes, "Hora!");

        assert!(dashboard.remedios.is_empty());
        assert!(dashboard.doses.is_empty());
        assert_eq!(dashboard.usuario.id, 0);
    }
}
