// src/pipeline.rs
use crate::error::AppError;
use crate::ledger::{AbsenceForm, Ledger, RecordedAbsence};
use crate::notifier::{Notifier, NotifyOutcome};
use crate::session::{Flash, FlashLevel, SessionIdentity};

#[derive(Debug, Clone)]
pub struct Registration {
    pub recorded: RecordedAbsence,
    pub notification: NotifyOutcome,
}

impl Registration {
    pub fn flash(&self) -> Flash {
        if self.notification.delivered() {
            Flash::new(FlashLevel::Success, "Falta registrada e email enviado")
        } else {
            Flash::new(
                FlashLevel::Warning,
                "Falta registrada, mas não foi possível enviar o email (ver logs)",
            )
        }
    }
}

/// Persists one absence, then tries to notify. Only the append can fail the call.
pub async fn register_absence(
    ledger: &Ledger,
    notifier: &Notifier,
    identity: &SessionIdentity,
    form: AbsenceForm,
) -> Result<Registration, AppError> {
    let recorded = ledger.append_record(identity, form.trimmed())?;
    let notification = notifier
        .notify(&recorded.record, &recorded.ledger_path)
        .await;
    Ok(Registration {
        recorded,
        notification,
    })
}
