//! Submission validation: raw payloads in, normalized requests or a full
//! list of field-scoped errors out. Pure functions of (payload, now).

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::domain::caller::Caller;
use crate::domain::catalog::{OfferId, OptionId, Pricing, PricingKind};
use crate::domain::quote::{Contact, QuoteStatus, Selection};

pub const DESCRIPTION_MIN_CHARS: usize = 20;
pub const DESCRIPTION_MAX_CHARS: usize = 8000;
pub const NAME_MAX_CHARS: usize = 80;
pub const REASON_MIN_CHARS: usize = 5;
pub const REASON_MAX_CHARS: usize = 200;
pub const DETAILS_MAX_CHARS: usize = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingField,
    InvalidFormat,
    OutOfRange,
    PastDate,
    UnknownReference,
    InconsistentPricingFields,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "MISSING_FIELD",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::PastDate => "PAST_DATE",
            Self::UnknownReference => "UNKNOWN_REFERENCE",
            Self::InconsistentPricingFields => "INCONSISTENT_PRICING_FIELDS",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: ErrorCode,
    pub message: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self { field: field.into(), code, message: message.into() }
    }
}

// ---------------------------------------------------------------------------
// Raw payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionPayload {
    pub option_id: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct QuotePayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub project_description: Option<String>,
    pub desired_delivery_date: Option<String>,
    pub offer_id: Option<String>,
    #[serde(default)]
    pub options: Vec<SelectionPayload>,
    pub appointment: Option<AppointmentPayload>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AppointmentPayload {
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
    pub details: Option<String>,
}

/// Flat catalog-option payload, as the admin content area and fixtures
/// submit it. The pricing field-set must match the declared type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct OptionPayload {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub pricing_type: Option<String>,
    pub price_cents: Option<i64>,
    pub price_from_cents: Option<i64>,
    pub unit_label: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub duration_days: Option<i64>,
    pub rank: Option<i64>,
}

// ---------------------------------------------------------------------------
// Normalized outputs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuote {
    pub contact: Contact,
    pub project_description: String,
    pub desired_delivery_date: Option<NaiveDate>,
    pub offer_id: Option<OfferId>,
    pub selections: Vec<Selection>,
    pub appointment: Option<NewAppointment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAppointment {
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub details: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOption {
    pub title: String,
    pub slug: String,
    pub pricing: Pricing,
    pub duration_days: u32,
    pub rank: i64,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Validate a public or admin quote submission. Every violated rule is
/// reported; the result is `Err` if any field failed.
pub fn validate_quote(
    payload: &QuotePayload,
    caller: &Caller,
    now: DateTime<Utc>,
) -> Result<NewQuote, Vec<FieldError>> {
    let mut errors = Vec::new();

    let require_full_identity = caller.identity().is_none();
    let contact = contact_from_payload(payload, caller, require_full_identity, &mut errors);

    let project_description = description_value(&payload.project_description, &mut errors);

    let desired_delivery_date =
        delivery_date_value(&payload.desired_delivery_date, now.date_naive(), &mut errors);

    let selections = selections_value(&payload.options, &mut errors);

    let appointment = match &payload.appointment {
        None => None,
        Some(raw) => match appointment_schedule(raw, now, "appointment.") {
            Ok(appointment) => Some(appointment),
            Err(mut appointment_errors) => {
                errors.append(&mut appointment_errors);
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let offer_id = trimmed(&payload.offer_id).map(|value| OfferId(value.to_string()));

    Ok(NewQuote {
        contact,
        project_description,
        desired_delivery_date,
        offer_id,
        selections,
        appointment,
    })
}

/// Validate a standalone appointment booking.
pub fn validate_appointment(
    payload: &AppointmentPayload,
    now: DateTime<Utc>,
) -> Result<NewAppointment, Vec<FieldError>> {
    appointment_schedule(payload, now, "")
}

/// Validate a catalog option payload, assembling its pricing enum. A
/// field-set that does not match the declared pricing type is reported as
/// `INCONSISTENT_PRICING_FIELDS` on the offending field.
pub fn validate_option(payload: &OptionPayload) -> Result<NewOption, Vec<FieldError>> {
    let mut errors = Vec::new();

    let title = match trimmed(&payload.title) {
        Some(value) => value.to_string(),
        None => {
            errors.push(FieldError::new("title", ErrorCode::MissingField, "title is required"));
            String::new()
        }
    };

    let slug = match trimmed(&payload.slug) {
        Some(value) if is_slug(value) => value.to_string(),
        Some(_) => {
            errors.push(FieldError::new(
                "slug",
                ErrorCode::InvalidFormat,
                "slug may only contain lowercase letters, digits and dashes",
            ));
            String::new()
        }
        None => {
            errors.push(FieldError::new("slug", ErrorCode::MissingField, "slug is required"));
            String::new()
        }
    };

    let kind = match trimmed(&payload.pricing_type) {
        None => {
            errors.push(FieldError::new(
                "pricing_type",
                ErrorCode::MissingField,
                "pricing_type is required",
            ));
            None
        }
        Some(raw) => match raw.parse::<PricingKind>() {
            Ok(kind) => Some(kind),
            Err(error) => {
                errors.push(FieldError::new(
                    "pricing_type",
                    ErrorCode::InvalidFormat,
                    error.to_string(),
                ));
                None
            }
        },
    };

    let pricing = kind.and_then(|kind| {
        match Pricing::from_parts(
            kind,
            payload.price_cents,
            payload.price_from_cents,
            trimmed(&payload.unit_label).map(str::to_string),
            payload.unit_price_cents,
        ) {
            Ok(pricing) => Some(pricing),
            Err(mismatch) => {
                errors.push(FieldError::new(
                    "pricing_type",
                    ErrorCode::InconsistentPricingFields,
                    mismatch.to_string(),
                ));
                None
            }
        }
    });

    let duration_days = match payload.duration_days {
        None => 0,
        Some(value) if (0..=3650).contains(&value) => value as u32,
        Some(value) => {
            errors.push(FieldError::new(
                "duration_days",
                ErrorCode::OutOfRange,
                format!("duration_days must be between 0 and 3650, got {value}"),
            ));
            0
        }
    };

    let Some(pricing) = pricing else { return Err(errors) };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewOption { title, slug, pricing, duration_days, rank: payload.rank.unwrap_or(0) })
}

/// Parse an admin-supplied status value against the closed set.
pub fn parse_status(raw: &str) -> Result<QuoteStatus, FieldError> {
    raw.parse::<QuoteStatus>().map_err(|error| {
        FieldError::new("status", ErrorCode::InvalidFormat, error.to_string())
    })
}

// ---------------------------------------------------------------------------
// Partial rules (shared with the wizard's per-step gating)
// ---------------------------------------------------------------------------

/// Contact-step rules. When `require_full_identity` is set (anonymous
/// submissions), first name, last name and phone become mandatory.
pub fn contact_errors(
    first_name: &Option<String>,
    last_name: &Option<String>,
    email: &Option<String>,
    phone: &Option<String>,
    require_full_identity: bool,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match trimmed(email) {
        None => errors.push(FieldError::new(
            "email",
            ErrorCode::MissingField,
            "email is required",
        )),
        Some(value) if !value.validate_email() => errors.push(FieldError::new(
            "email",
            ErrorCode::InvalidFormat,
            "email address is not well-formed",
        )),
        Some(_) => {}
    }

    for (field, value) in [("first_name", first_name), ("last_name", last_name)] {
        match trimmed(value) {
            None if require_full_identity => errors.push(FieldError::new(
                field,
                ErrorCode::MissingField,
                format!("{field} is required"),
            )),
            Some(value) if value.chars().count() > NAME_MAX_CHARS => errors.push(
                FieldError::new(
                    field,
                    ErrorCode::OutOfRange,
                    format!("{field} must not exceed {NAME_MAX_CHARS} characters"),
                ),
            ),
            _ => {}
        }
    }

    match trimmed(phone) {
        None if require_full_identity => errors.push(FieldError::new(
            "phone",
            ErrorCode::MissingField,
            "phone is required",
        )),
        Some(value) if !is_french_phone(value) => errors.push(FieldError::new(
            "phone",
            ErrorCode::InvalidFormat,
            "phone must be a valid French number (0X XX XX XX XX or +33…)",
        )),
        _ => {}
    }

    errors
}

/// Project-description rules (options step).
pub fn description_errors(description: &Option<String>) -> Vec<FieldError> {
    match trimmed(description) {
        None => vec![FieldError::new(
            "project_description",
            ErrorCode::MissingField,
            "project_description is required",
        )],
        Some(value) => {
            let chars = value.chars().count();
            if chars < DESCRIPTION_MIN_CHARS || chars > DESCRIPTION_MAX_CHARS {
                vec![FieldError::new(
                    "project_description",
                    ErrorCode::OutOfRange,
                    format!(
                        "project_description must be between {DESCRIPTION_MIN_CHARS} and \
                         {DESCRIPTION_MAX_CHARS} characters"
                    ),
                )]
            } else {
                Vec::new()
            }
        }
    }
}

/// Selection rules: option ids present, quantities positive.
pub fn selection_errors(options: &[SelectionPayload]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for (index, selection) in options.iter().enumerate() {
        if trimmed(&selection.option_id).is_none() {
            errors.push(FieldError::new(
                format!("options[{index}].option_id"),
                ErrorCode::MissingField,
                "option_id is required",
            ));
        }
        if let Some(quantity) = selection.quantity {
            if !(1..=999).contains(&quantity) {
                errors.push(FieldError::new(
                    format!("options[{index}].quantity"),
                    ErrorCode::OutOfRange,
                    format!("quantity must be between 1 and 999, got {quantity}"),
                ));
            }
        }
    }
    errors
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn contact_from_payload(
    payload: &QuotePayload,
    caller: &Caller,
    require_full_identity: bool,
    errors: &mut Vec<FieldError>,
) -> Contact {
    // Authenticated callers fall back to their account email.
    let email_raw = match (trimmed(&payload.email), caller.identity()) {
        (None, Some(identity)) => Some(identity.email.clone()),
        (raw, _) => raw.map(str::to_string),
    };

    let mut contact_field_errors = contact_errors(
        &payload.first_name,
        &payload.last_name,
        &email_raw,
        &payload.phone,
        require_full_identity,
    );
    errors.append(&mut contact_field_errors);

    Contact {
        first_name: trimmed(&payload.first_name).map(str::to_string),
        last_name: trimmed(&payload.last_name).map(str::to_string),
        email: email_raw.unwrap_or_default(),
        phone: trimmed(&payload.phone).map(str::to_string),
    }
}

fn description_value(description: &Option<String>, errors: &mut Vec<FieldError>) -> String {
    let mut description_field_errors = description_errors(description);
    let ok = description_field_errors.is_empty();
    errors.append(&mut description_field_errors);
    if ok {
        trimmed(description).unwrap_or_default().to_string()
    } else {
        String::new()
    }
}

fn delivery_date_value(
    raw: &Option<String>,
    today: NaiveDate,
    errors: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    let raw = trimmed(raw)?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Err(_) => {
            errors.push(FieldError::new(
                "desired_delivery_date",
                ErrorCode::InvalidFormat,
                "desired_delivery_date must be a YYYY-MM-DD date",
            ));
            None
        }
        Ok(date) if date < today => {
            errors.push(FieldError::new(
                "desired_delivery_date",
                ErrorCode::PastDate,
                "desired_delivery_date must not be in the past",
            ));
            None
        }
        Ok(date) => Some(date),
    }
}

fn selections_value(
    options: &[SelectionPayload],
    errors: &mut Vec<FieldError>,
) -> Vec<Selection> {
    let mut selection_field_errors = selection_errors(options);
    let ok = selection_field_errors.is_empty();
    errors.append(&mut selection_field_errors);
    if !ok {
        return Vec::new();
    }

    options
        .iter()
        .filter_map(|selection| {
            trimmed(&selection.option_id).map(|id| Selection {
                option_id: OptionId(id.to_string()),
                quantity: selection.quantity.unwrap_or(1) as u32,
            })
        })
        .collect()
}

fn appointment_schedule(
    payload: &AppointmentPayload,
    now: DateTime<Utc>,
    field_prefix: &str,
) -> Result<NewAppointment, Vec<FieldError>> {
    let mut errors = Vec::new();
    let field = |name: &str| format!("{field_prefix}{name}");

    let date = match trimmed(&payload.date) {
        None => {
            errors.push(FieldError::new(
                field("date"),
                ErrorCode::MissingField,
                "date is required",
            ));
            None
        }
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError::new(
                    field("date"),
                    ErrorCode::InvalidFormat,
                    "date must be a YYYY-MM-DD date",
                ));
                None
            }
        },
    };

    let time = match trimmed(&payload.time) {
        None => {
            errors.push(FieldError::new(
                field("time"),
                ErrorCode::MissingField,
                "time is required",
            ));
            None
        }
        Some(raw) => match NaiveTime::parse_from_str(raw, "%H:%M") {
            Ok(time) => Some(time),
            Err(_) => {
                errors.push(FieldError::new(
                    field("time"),
                    ErrorCode::InvalidFormat,
                    "time must be an HH:MM time of day",
                ));
                None
            }
        },
    };

    let scheduled_at = match (date, time) {
        (Some(date), Some(time)) => {
            let instant = Utc.from_utc_datetime(&date.and_time(time));
            if instant <= now {
                errors.push(FieldError::new(
                    field("date"),
                    ErrorCode::PastDate,
                    "the appointment must be scheduled in the future",
                ));
                None
            } else {
                Some(instant)
            }
        }
        _ => None,
    };

    let reason = match trimmed(&payload.reason) {
        None => {
            errors.push(FieldError::new(
                field("reason"),
                ErrorCode::MissingField,
                "reason is required",
            ));
            String::new()
        }
        Some(value) => {
            let chars = value.chars().count();
            if !(REASON_MIN_CHARS..=REASON_MAX_CHARS).contains(&chars) {
                errors.push(FieldError::new(
                    field("reason"),
                    ErrorCode::OutOfRange,
                    format!(
                        "reason must be between {REASON_MIN_CHARS} and {REASON_MAX_CHARS} \
                         characters"
                    ),
                ));
            }
            value.to_string()
        }
    };

    let details = trimmed(&payload.details).map(str::to_string);
    if let Some(value) = &details {
        if value.chars().count() > DETAILS_MAX_CHARS {
            errors.push(FieldError::new(
                field("details"),
                ErrorCode::OutOfRange,
                format!("details must not exceed {DETAILS_MAX_CHARS} characters"),
            ));
        }
    }

    match scheduled_at {
        Some(scheduled_at) if errors.is_empty() => {
            Ok(NewAppointment { scheduled_at, reason, details })
        }
        _ => Err(errors),
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// French national numbers: ten digits starting with a non-zero area
/// digit after the leading 0, or the +33 international form. Separators
/// (spaces, dots, dashes) are tolerated.
fn is_french_phone(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect();

    let national = match compact.strip_prefix("+33") {
        Some(rest) => format!("0{rest}"),
        None => compact,
    };

    national.len() == 10
        && national.starts_with('0')
        && !national[1..].starts_with('0')
        && national.chars().all(|c| c.is_ascii_digit())
}
