// src/error.rs
use axum::http::StatusCode as AxumStatusCode;
use axum::response::{Html, IntoResponse};
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
    #[error("Ledger I/O error on {path}: {source}")]
    LedgerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Ledger CSV error on {path}: {source}")]
    LedgerCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Monitor file error on {path}: {source}")]
    MonitorFile {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        error!("Error occurred: {}", self);
        let (status_code, error_message) = match &self {
            AppError::Config(_) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Erro de configuração do servidor.",
            ),
            AppError::LedgerIo { .. } | AppError::LedgerCsv { .. } => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Não foi possível gravar a falta. Nada foi registrado.",
            ),
            AppError::MonitorFile { .. } => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Não foi possível ler o cadastro de monitores.",
            ),
            AppError::Session(_) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Erro interno de sessão.",
            ),
            AppError::TlsConfig(_) => (
                AxumStatusCode::INTERNAL_SERVER_ERROR,
                "Erro de configuração TLS do servidor.",
            ),
        };
        (
            status_code,
            Html(format!("<h1>Erro</h1><p>{}</p>", error_message)),
        )
            .into_response()
    }
}
