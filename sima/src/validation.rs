//! Declarative field validation.
//!
//! Each entity's constraints live in a data-driven table of [`FieldRule`]s
//! rather than imperative checks, so the services stay declarative. A
//! [`Schema`] is evaluated against a `serde_json::Value` built from the
//! (already sanitized) request and returns either success or the full list
//! of violated fields.

use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::{Error, FieldViolation};
use crate::sanitize;

/// Constraint kind for a single field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// UTF-8 text with a char-count range. `min` of 0 means no lower bound.
    Text { min: usize, max: usize },
    /// ASCII digits only, with a digit-count range (e.g. DNI)
    Digits { min: usize, max: usize },
    /// Email address
    Email,
    /// Loose international phone number
    Phone,
    /// Calendar date in `YYYY-MM-DD`
    Date,
    /// Integer value
    Integer,
    /// Boolean value
    Boolean,
    /// One of a fixed set of string values
    OneOf(&'static [&'static str]),
}

/// One field constraint.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// An evaluatable set of field constraints.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    rules: &'static [FieldRule],
}

impl Schema {
    pub const fn new(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    /// Evaluate every rule against `value` (expected to be a JSON object).
    /// Missing, null or empty-string values pass unless the field is
    /// required. Returns all violations, not just the first.
    pub fn check(&self, value: &Value) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();

        for rule in self.rules {
            let field_value = value.get(rule.name);

            let is_absent = match field_value {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                _ => false,
            };

            if is_absent {
                if rule.required {
                    violations.push(violation(rule.name, "es obligatorio".to_string()));
                }
                continue;
            }

            let v = field_value.expect("absent values handled above");
            if let Some(message) = check_kind(&rule.kind, v) {
                violations.push(violation(rule.name, message));
            }
        }

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }
}

fn violation(field: &str, detail: String) -> FieldViolation {
    FieldViolation {
        field: field.to_string(),
        message: format!("El campo {field} {detail}"),
    }
}

fn check_kind(kind: &FieldKind, value: &Value) -> Option<String> {
    match kind {
        FieldKind::Text { min, max } => {
            let Some(s) = value.as_str() else {
                return Some("debe ser texto".to_string());
            };
            let len = s.chars().count();
            if len < *min || len > *max {
                if *min == 0 {
                    Some(format!("no puede superar {max} caracteres"))
                } else {
                    Some(format!("debe tener entre {min} y {max} caracteres"))
                }
            } else {
                None
            }
        }
        FieldKind::Digits { min, max } => {
            let ok = value
                .as_str()
                .is_some_and(|s| s.chars().all(|c| c.is_ascii_digit()) && (*min..=*max).contains(&s.len()));
            if ok {
                None
            } else {
                Some(format!("debe contener solo dígitos ({min} a {max})"))
            }
        }
        FieldKind::Email => {
            let ok = value.as_str().is_some_and(|s| sanitize::clean_email(s).is_some());
            if ok { None } else { Some("no es válido".to_string()) }
        }
        FieldKind::Phone => {
            let ok = value.as_str().is_some_and(is_valid_phone);
            if ok { None } else { Some("no es válido".to_string()) }
        }
        FieldKind::Date => {
            let ok = value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
            if ok {
                None
            } else {
                Some("debe tener formato AAAA-MM-DD".to_string())
            }
        }
        FieldKind::Integer => {
            if value.is_i64() || value.is_u64() {
                None
            } else {
                Some("debe ser un número entero".to_string())
            }
        }
        FieldKind::Boolean => {
            if value.is_boolean() {
                None
            } else {
                Some("debe ser booleano".to_string())
            }
        }
        FieldKind::OneOf(options) => {
            let ok = value.as_str().is_some_and(|s| options.contains(&s));
            if ok {
                None
            } else {
                Some(format!("debe ser uno de: {}", options.join(", ")))
            }
        }
    }
}

/// `^[+\d][\d\s\-()]{6,20}$` without pulling the pattern through regex.
fn is_valid_phone(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    if first != '+' && !first.is_ascii_digit() {
        return false;
    }
    let rest: Vec<char> = chars.collect();
    if rest.len() < 6 || rest.len() > 20 {
        return false;
    }
    rest.iter()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '\t' | '-' | '(' | ')'))
}

/// Evaluate `schema` and lift violations into the service error type.
pub fn validate(schema: &Schema, value: &Value) -> Result<(), Error> {
    schema.check(value).map_err(|fields| Error::Validation {
        message: fields
            .first()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "Datos inválidos".to_string()),
        fields,
    })
}

/// Field-constraint tables for every entity and auth payload.
pub mod schemas {
    use super::{FieldKind, FieldRule, Schema};

    pub static PERSONA: Schema = Schema::new(&[
        FieldRule { name: "nombre", kind: FieldKind::Text { min: 2, max: 100 }, required: true },
        FieldRule { name: "apellido", kind: FieldKind::Text { min: 2, max: 100 }, required: true },
        FieldRule { name: "dni", kind: FieldKind::Digits { min: 7, max: 9 }, required: true },
        FieldRule { name: "fecha_nacimiento", kind: FieldKind::Date, required: false },
        FieldRule { name: "nacionalidad", kind: FieldKind::Text { min: 0, max: 100 }, required: false },
        FieldRule { name: "direccion", kind: FieldKind::Text { min: 0, max: 500 }, required: false },
        FieldRule { name: "telefono", kind: FieldKind::Phone, required: false },
        FieldRule { name: "email", kind: FieldKind::Email, required: false },
        FieldRule { name: "observaciones", kind: FieldKind::Text { min: 0, max: 2000 }, required: false },
        FieldRule { name: "comisaria", kind: FieldKind::Text { min: 0, max: 200 }, required: false },
    ]);

    pub static REGISTRO: Schema = Schema::new(&[
        FieldRule { name: "persona_id", kind: FieldKind::Integer, required: true },
        FieldRule { name: "tipo_delito", kind: FieldKind::Text { min: 2, max: 100 }, required: true },
        FieldRule { name: "lugar", kind: FieldKind::Text { min: 0, max: 200 }, required: false },
        FieldRule { name: "estado", kind: FieldKind::Text { min: 0, max: 100 }, required: false },
        FieldRule { name: "juzgado", kind: FieldKind::Text { min: 0, max: 100 }, required: false },
        FieldRule { name: "detalle", kind: FieldKind::Text { min: 0, max: 2000 }, required: false },
    ]);

    pub static USUARIO: Schema = Schema::new(&[
        FieldRule { name: "usuario", kind: FieldKind::Text { min: 3, max: 50 }, required: true },
        FieldRule { name: "nombre", kind: FieldKind::Text { min: 2, max: 100 }, required: true },
        FieldRule { name: "apellido", kind: FieldKind::Text { min: 2, max: 100 }, required: true },
        FieldRule { name: "rol", kind: FieldKind::OneOf(&["admin", "usuario"]), required: true },
        FieldRule { name: "activo", kind: FieldKind::Boolean, required: false },
    ]);

    pub static LOGIN: Schema = Schema::new(&[
        FieldRule { name: "usuario", kind: FieldKind::Text { min: 3, max: 50 }, required: true },
        FieldRule { name: "password", kind: FieldKind::Text { min: 6, max: 100 }, required: true },
    ]);

    pub static OWN_PASSWORD: Schema = Schema::new(&[
        FieldRule { name: "actual", kind: FieldKind::Text { min: 8, max: 100 }, required: true },
        FieldRule { name: "nueva", kind: FieldKind::Text { min: 8, max: 100 }, required: true },
    ]);

    pub static ADMIN_PASSWORD: Schema = Schema::new(&[
        FieldRule { name: "nueva", kind: FieldKind::Text { min: 8, max: 100 }, required: true },
    ]);
}
