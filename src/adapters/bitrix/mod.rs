//! Bitrix24 CRM integration
//!
//! The webhook processor only needs to re-read deals and leads by id, so the
//! seam is a small trait. [`BitrixClient`] is the REST implementation.

pub mod client;
pub mod models;

use crate::domain::ids::{DealId, LeadId};
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use client::BitrixClient;

/// Read access to CRM entities by id
///
/// Both calls return the raw `result` object. A missing entity is reported as
/// [`crate::domain::CrmError::NotFound`].
#[async_trait]
pub trait CrmApi {
    /// Fetches one deal (`crm.deal.get`)
    async fn get_deal(&self, id: DealId) -> Result<Value>;

    /// Fetches one lead (`crm.lead.get`)
    async fn get_lead(&self, id: LeadId) -> Result<Value>;
}
