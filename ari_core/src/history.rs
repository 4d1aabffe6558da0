//! Dose history of a prescription.
//!
//! Entries are shown in the order the backend returns them. Recording a new
//! dose does not append locally; the next explicit fetch shows it.

use crate::client::ApiClient;
use crate::dates::format_datetime;
use crate::{HistoricoEntry, Result};
use std::path::Path;

/// A row in the CSV export
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id_remedio: i64,
    remedio: String,
    dosagem: String,
    funcao: String,
    observacao: Option<String>,
    frequencia_horas: u32,
    data_inicio: String,
    tomado_em: String,
}

impl From<&HistoricoEntry> for CsvRow {
    fn from(entry: &HistoricoEntry) -> Self {
        CsvRow {
            id_remedio: entry.id_remedio,
            remedio: entry.nome.clone(),
            dosagem: entry.dosagem.clone(),
            funcao: entry.funcao.clone(),
            observacao: entry.observacao.clone(),
            frequencia_horas: entry.frequencia,
            data_inicio: format_datetime(&entry.data_inicio),
            tomado_em: format_datetime(&entry.tomado_em),
        }
    }
}

#[derive(Debug, Default)]
pub struct HistoryView {
    prescricao_id: Option<i64>,
    entries: Vec<HistoricoEntry>,
    error: Option<String>,
}

impl HistoryView {
    pub const EMPTY_MESSAGE: &'static str = "Nenhuma dose registrada.";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn prescricao_id(&self) -> Option<i64> {
        self.prescricao_id
    }

    pub fn entries(&self) -> &[HistoricoEntry] {
        &self.entries
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch every dose-taking event of one prescription
    ///
    /// On failure the previously shown entries stay on screen.
    pub fn open(&mut self, api: &ApiClient, prescricao_id: i64) -> Result<()> {
        match api.historico(prescricao_id) {
            Ok(entries) => {
                tracing::debug!(
                    "Loaded {} history entries for prescricao {}",
                    entries.len(),
                    prescricao_id
                );
                self.prescricao_id = Some(prescricao_id);
                self.entries = entries;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Erro ao buscar histórico: {}", e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Write the loaded entries as CSV, replacing `path`
    ///
    /// Returns the number of rows written.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        for entry in &self.entries {
            writer.serialize(CsvRow::from(entry))?;
        }
        writer.flush()?;

        tracing::info!("Exported {} history entries to {:?}", self.entries.len(), path);
        Ok(self.entries.len())
    }
}
