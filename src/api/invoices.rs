use axum::{Json, extract::State};

use super::AppState;
use super::extract::{ValidJson, ValidPath};
use super::schemas::{InvoiceCreate, parse_amount};
use crate::auth::CurrentUser;
use crate::error::{Error, Result};
use crate::models::{Invoice, NewInvoice};

/// POST /invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(payload): ValidJson<InvoiceCreate>,
) -> Result<Json<Invoice>> {
    let amount = parse_amount(payload.amount)?;

    let mut session = state.store.session().await?;

    // Someone else's client looks exactly like a missing one
    if session.find_client(user.id, payload.client_id).await?.is_none() {
        return Err(Error::not_found("Client not found"));
    }

    let invoice = session
        .create_invoice(NewInvoice {
            client_id: payload.client_id,
            title: payload.title,
            amount,
            due_date: payload.due_date,
        })
        .await?;
    session.commit().await?;

    tracing::info!(invoice_id = invoice.id, client_id = invoice.client_id, "invoice created");

    Ok(Json(invoice))
}

/// GET /invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Invoice>>> {
    let mut session = state.store.session().await?;
    let invoices = session.find_invoices_by_owner(user.id).await?;
    session.commit().await?;

    Ok(Json(invoices))
}

/// PATCH /invoices/:id/toggle-paid
pub async fn toggle_invoice_paid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(invoice_id): ValidPath<i32>,
) -> Result<Json<Invoice>> {
    let mut session = state.store.session().await?;

    if session.find_invoice(user.id, invoice_id).await?.is_none() {
        return Err(Error::not_found("Invoice not found"));
    }

    let invoice = session.toggle_invoice_paid(invoice_id).await?;
    session.commit().await?;

    tracing::info!(invoice_id, is_paid = invoice.is_paid, "invoice paid flag toggled");

    Ok(Json(invoice))
}
