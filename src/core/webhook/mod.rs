//! Bitrix24 webhook handling
//!
//! - [`event`]: body parsing and allow-list classification
//! - [`stages`]: deal stage → negotiation status lookup
//! - [`processor`]: enrichment and persistence

pub mod event;
pub mod processor;
pub mod stages;

pub use event::{parse_webhook, EntityKind, EventAction, ParsedWebhook, WebhookEvent};
pub use processor::{Enriched, WebhookOutcome, WebhookProcessor, WEBHOOK_SOURCE};
