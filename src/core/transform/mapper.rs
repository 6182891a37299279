//! Source lead → destination lead mapping
//!
//! The mapping is a table: each destination column lists the source names it
//! may arrive under and how its value is coerced. The first non-null alias
//! wins. Only the primary id can make a record unmappable.

use super::coerce::{parse_bool, parse_date, parse_int, parse_money, text};
use crate::domain::ids::LeadId;
use crate::domain::lead::{Lead, RawLead};
use crate::domain::MappingError;
use serde_json::Value;

/// Setter applied to a destination lead with the chosen source value
type Apply = fn(&mut Lead, &Value);

/// One destination column
struct FieldRule {
    aliases: &'static [&'static str],
    apply: Apply,
}

/// Source names accepted for the primary id
pub const ID_ALIASES: &[&str] = &["id", "lead_id", "bitrix_id", "ID"];

const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        aliases: &["name", "nome", "title"],
        apply: |lead, v| lead.name = text(v),
    },
    FieldRule {
        aliases: &["age", "idade"],
        apply: |lead, v| lead.age = parse_int(v).and_then(|n| i32::try_from(n).ok()),
    },
    FieldRule {
        aliases: &["address", "endereco", "local_abordagem_endereco"],
        apply: |lead, v| lead.address = text(v),
    },
    FieldRule {
        aliases: &["phone", "celular", "telefone", "phone_number"],
        apply: |lead, v| lead.phone = text(v),
    },
    FieldRule {
        aliases: &["email"],
        apply: |lead, v| lead.email = text(v),
    },
    FieldRule {
        aliases: &["photo_url", "foto", "photo"],
        apply: |lead, v| lead.photo_url = text(v),
    },
    FieldRule {
        aliases: &["scouter", "scouter_name"],
        apply: |lead, v| lead.scouter = text(v),
    },
    FieldRule {
        aliases: &["commercial_project", "projeto_comercial", "projetos"],
        apply: |lead, v| lead.commercial_project = text(v),
    },
    FieldRule {
        aliases: &["project_id", "commercial_project_id"],
        apply: |lead, v| lead.project_id = text(v),
    },
    FieldRule {
        aliases: &["telemarketing_operator", "op_telemarketing", "responsible"],
        apply: |lead, v| lead.telemarketing_operator = text(v),
    },
    FieldRule {
        aliases: &["bitrix_telemarketing_id", "telemarketing_id"],
        apply: |lead, v| lead.bitrix_telemarketing_id = parse_int(v),
    },
    FieldRule {
        aliases: &["approach_location", "local_abordagem"],
        apply: |lead, v| lead.approach_location = text(v),
    },
    FieldRule {
        aliases: &["stage", "etapa", "status_id"],
        apply: |lead, v| lead.stage = text(v),
    },
    FieldRule {
        aliases: &["flow_status", "status_fluxo"],
        apply: |lead, v| lead.flow_status = text(v),
    },
    FieldRule {
        aliases: &["tabulation_status", "status_tabulacao"],
        apply: |lead, v| lead.tabulation_status = text(v),
    },
    FieldRule {
        aliases: &["ficha_value", "valor_ficha"],
        apply: |lead, v| lead.ficha_value = parse_money(v),
    },
    FieldRule {
        aliases: &["ficha_confirmed", "ficha_confirmada"],
        apply: |lead, v| lead.ficha_confirmed = parse_bool(v),
    },
    FieldRule {
        aliases: &["attendance_confirmed", "presenca_confirmada"],
        apply: |lead, v| lead.attendance_confirmed = parse_bool(v),
    },
    FieldRule {
        aliases: &["attended", "compareceu"],
        apply: |lead, v| lead.attended = parse_bool(v),
    },
    FieldRule {
        aliases: &["has_photo", "cadastro_existe_foto"],
        apply: |lead, v| lead.has_photo = parse_bool(v),
    },
    FieldRule {
        aliases: &["created_at", "criado", "date_create"],
        apply: |lead, v| lead.created_at = parse_date(v),
    },
    FieldRule {
        aliases: &["ficha_created_at", "data_criacao_ficha"],
        apply: |lead, v| lead.ficha_created_at = parse_date(v),
    },
    FieldRule {
        aliases: &["ficha_confirmed_at", "data_confirmacao_ficha"],
        apply: |lead, v| lead.ficha_confirmed_at = parse_date(v),
    },
    FieldRule {
        aliases: &["scheduled_at", "data_agendamento", "data_criacao_agendamento"],
        apply: |lead, v| lead.scheduled_at = parse_date(v),
    },
    FieldRule {
        aliases: &["schedule_time", "horario_agendamento"],
        apply: |lead, v| lead.schedule_time = text(v),
    },
    FieldRule {
        aliases: &["modified_at", "date_modify", "updated_at"],
        apply: |lead, v| lead.modified_at = parse_date(v),
    },
];

/// Maps a loose source record into a destination lead
///
/// Optional fields that are missing or cannot be coerced become `None`. The
/// whole source object is kept in `raw`.
///
/// # Errors
///
/// [`MappingError::MissingId`] when no id alias is present and
/// [`MappingError::InvalidId`] when it is not a positive integer.
///
/// # Examples
///
/// ```
/// use leadsync::core::transform::map_lead;
/// use leadsync::domain::RawLead;
/// use serde_json::json;
///
/// let raw = RawLead::from_value(json!({
///     "id": "12",
///     "nome": "Ana",
///     "valor_ficha": "R$ 1.234,56",
///     "criado": "05/03/2024 10:30:00"
/// }));
/// let lead = map_lead(&raw).unwrap();
/// assert_eq!(lead.id.value(), 12);
/// assert_eq!(lead.ficha_value, Some(1234.56));
/// ```
pub fn map_lead(raw: &RawLead) -> Result<Lead, MappingError> {
    let id = lead_id(raw)?;
    let mut lead = Lead::with_id(id);

    for rule in FIELD_RULES {
        if let Some(value) = raw.first_of(rule.aliases) {
            (rule.apply)(&mut lead, value);
        }
    }

    lead.raw = raw.clone().into_value();
    Ok(lead)
}

/// Extracts the record's primary id without mapping the rest
pub fn lead_id(raw: &RawLead) -> Result<LeadId, MappingError> {
    let value = raw.first_of(ID_ALIASES).ok_or(MappingError::MissingId)?;
    parse_int(value)
        .and_then(|n| LeadId::new(n).ok())
        .ok_or_else(|| MappingError::InvalidId(value.to_string()))
}
