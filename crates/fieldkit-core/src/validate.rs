//! The type-dispatching validation engine.
//!
//! Validation is a pure function from a (definition, candidate value)
//! pair to a pass/fail result — no I/O, no storage. Dispatch is an
//! exhaustive `match` over [`FieldKind`], so adding a kind without a
//! validation arm is a compile error.
//!
//! Rule order: the required-vs-optional short-circuit runs first for
//! every kind. An absent/empty value on an optional field passes with
//! no further checks; on a required field it fails with "required"
//! regardless of kind. Only a present, non-empty value reaches the
//! kind-specific checks.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::models::definition::{FieldDefinition, FieldKind, ValidationRules};
use crate::models::value::AttrValue;

/// A single field-level validation failure. The `Display` string is
/// the end-user message surfaced by the error map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("required")]
    Required,
    #[error("must be text")]
    ExpectedText,
    #[error("must be a number")]
    ExpectedNumber,
    #[error("must be true or false")]
    ExpectedBoolean,
    #[error("must be a list of values")]
    ExpectedArray,
    #[error("must be a single value")]
    ExpectedScalar,
    #[error("must be a scalar or an array of scalars")]
    UnsupportedShape,
    #[error("must be at least {min} characters")]
    TooShort { min: u32 },
    #[error("must be at most {max} characters")]
    TooLong { max: u32 },
    #[error("does not match the required pattern")]
    PatternMismatch,
    #[error("field has an invalid pattern rule")]
    InvalidPattern,
    #[error("must be a valid email address")]
    InvalidEmail,
    #[error("must be a valid absolute URL")]
    InvalidUrl,
    #[error("must be at least {min}")]
    BelowMinimum { min: f64 },
    #[error("must be at most {max}")]
    AboveMaximum { max: f64 },
    #[error("must be a valid date")]
    InvalidDate,
    #[error("must be on or after {min}")]
    DateTooEarly { min: NaiveDate },
    #[error("must be on or before {max}")]
    DateTooLate { max: NaiveDate },
    #[error("'{value}' is not one of the allowed options")]
    UnknownOption { value: String },
}

/// Validate a candidate value against its definition.
pub fn validate(
    definition: &FieldDefinition,
    value: Option<&AttrValue>,
) -> Result<(), ValidationError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            return if definition.is_required {
                Err(ValidationError::Required)
            } else {
                Ok(())
            };
        }
    };

    let rules = &definition.validation_rules;
    match definition.field_kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Phone => {
            check_text(rules, value).map(|_| ())
        }
        FieldKind::Email => {
            let text = check_text(rules, value)?;
            check_email(text)
        }
        FieldKind::Url => {
            let text = check_text(rules, value)?;
            check_url(text)
        }
        FieldKind::Number => check_number(rules, value),
        FieldKind::Boolean => match value {
            AttrValue::Bool(_) => Ok(()),
            _ => Err(ValidationError::ExpectedBoolean),
        },
        FieldKind::Date => {
            let date = parse_date(value)?;
            check_date_range(rules, date)
        }
        FieldKind::Datetime => {
            let date = parse_datetime(value)?;
            check_date_range(rules, date)
        }
        FieldKind::Select => {
            let text = value.as_text().ok_or(match value {
                AttrValue::Many(_) => ValidationError::ExpectedScalar,
                _ => ValidationError::ExpectedText,
            })?;
            check_option(definition, text)
        }
        FieldKind::Multiselect => {
            let AttrValue::Many(items) = value else {
                return Err(ValidationError::ExpectedArray);
            };
            for item in items {
                let text = item.as_text().ok_or(ValidationError::ExpectedText)?;
                check_option(definition, text)?;
            }
            Ok(())
        }
        // Presence/absence only; allowed_file_types is advisory
        // metadata for the external upload collaborator.
        FieldKind::File => match value {
            AttrValue::Text(_) => Ok(()),
            _ => Err(ValidationError::ExpectedText),
        },
    }
}

/// Resolve the value a consumer should see when nothing is stored:
/// the definition's default, coerced to the kind's expected shape.
pub fn effective_default(definition: &FieldDefinition) -> Option<AttrValue> {
    let raw = definition.default_value.clone()?;
    let coerced = match definition.field_kind {
        FieldKind::Number => match raw {
            AttrValue::Text(s) => coerce_number(&s).unwrap_or(AttrValue::Text(s)),
            other => other,
        },
        FieldKind::Boolean => match raw {
            AttrValue::Text(s) if s == "true" => AttrValue::Bool(true),
            AttrValue::Text(s) if s == "false" => AttrValue::Bool(false),
            other => other,
        },
        FieldKind::Multiselect => match raw {
            many @ AttrValue::Many(_) => many,
            scalar => AttrValue::Many(vec![scalar]),
        },
        _ => raw,
    };
    Some(coerced)
}

/// Registry-side consistency gate: reject rules whose bounds do not
/// apply to the definition's kind, un-compilable patterns, and
/// inverted ranges. Runs at create/update time, never at write time.
pub fn check_rules(rules: &ValidationRules, kind: FieldKind) -> Result<(), String> {
    if !kind.is_textual() {
        for (name, set) in [
            ("min_length", rules.min_length.is_some()),
            ("max_length", rules.max_length.is_some()),
            ("pattern", rules.pattern.is_some()),
        ] {
            if set {
                return Err(format!("'{name}' is not valid for kind '{kind}'"));
            }
        }
    }
    if kind != FieldKind::Number && (rules.min_value.is_some() || rules.max_value.is_some()) {
        return Err(format!("numeric bounds are not valid for kind '{kind}'"));
    }
    if !matches!(kind, FieldKind::Date | FieldKind::Datetime) && rules.date_range.is_some() {
        return Err(format!("'date_range' is not valid for kind '{kind}'"));
    }
    if kind != FieldKind::File && rules.allowed_file_types.is_some() {
        return Err(format!("'allowed_file_types' is not valid for kind '{kind}'"));
    }

    if let Some(pattern) = &rules.pattern {
        Regex::new(pattern).map_err(|e| format!("pattern does not compile: {e}"))?;
    }
    if let (Some(min), Some(max)) = (rules.min_length, rules.max_length) {
        if min > max {
            return Err(format!("min_length {min} exceeds max_length {max}"));
        }
    }
    if let (Some(min), Some(max)) = (rules.min_value, rules.max_value) {
        if min > max {
            return Err(format!("min_value {min} exceeds max_value {max}"));
        }
    }
    if let Some(range) = &rules.date_range {
        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min > max {
                return Err(format!("date_range min {min} exceeds max {max}"));
            }
        }
    }
    Ok(())
}

/// Registry-side options gate: options are required and non-empty for
/// select kinds, forbidden otherwise; values must be unique and
/// non-empty.
pub fn check_options(
    kind: FieldKind,
    options: Option<&[crate::models::definition::FieldOption]>,
) -> Result<(), String> {
    match (kind.requires_options(), options) {
        (true, None) => Err(format!("kind '{kind}' requires a non-empty options list")),
        (true, Some([])) => Err(format!("kind '{kind}' requires a non-empty options list")),
        (false, Some(_)) => Err(format!("kind '{kind}' does not take options")),
        (false, None) => Ok(()),
        (true, Some(options)) => {
            let mut seen = std::collections::BTreeSet::new();
            for option in options {
                if option.value.is_empty() {
                    return Err("option values must not be empty".into());
                }
                if !seen.insert(option.value.as_str()) {
                    return Err(format!("duplicate option value '{}'", option.value));
                }
            }
            Ok(())
        }
    }
}

fn check_text<'v>(
    rules: &ValidationRules,
    value: &'v AttrValue,
) -> Result<&'v str, ValidationError> {
    let text = value.as_text().ok_or(ValidationError::ExpectedText)?;
    let len = text.chars().count() as u32;
    if let Some(min) = rules.min_length {
        if len < min {
            return Err(ValidationError::TooShort { min });
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            return Err(ValidationError::TooLong { max });
        }
    }
    if let Some(pattern) = &rules.pattern {
        // The registry rejects un-compilable patterns at definition
        // time; a stored bad pattern still must not panic here.
        let re = Regex::new(pattern).map_err(|_| ValidationError::InvalidPattern)?;
        if !re.is_match(text) {
            return Err(ValidationError::PatternMismatch);
        }
    }
    Ok(text)
}

fn check_email(text: &str) -> Result<(), ValidationError> {
    let mut parts = text.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || text.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

fn check_url(text: &str) -> Result<(), ValidationError> {
    // `Url::parse` only accepts absolute URIs; relative references
    // fail with RelativeUrlWithoutBase.
    Url::parse(text).map(|_| ()).map_err(|_| ValidationError::InvalidUrl)
}

fn check_number(rules: &ValidationRules, value: &AttrValue) -> Result<(), ValidationError> {
    let n = match value {
        AttrValue::Number(_) | AttrValue::Text(_) => value
            .as_number_lenient()
            .ok_or(ValidationError::ExpectedNumber)?,
        _ => return Err(ValidationError::ExpectedNumber),
    };
    if let Some(min) = rules.min_value {
        if n < min {
            return Err(ValidationError::BelowMinimum { min });
        }
    }
    if let Some(max) = rules.max_value {
        if n > max {
            return Err(ValidationError::AboveMaximum { max });
        }
    }
    Ok(())
}

fn parse_date(value: &AttrValue) -> Result<NaiveDate, ValidationError> {
    let text = value.as_text().ok_or(ValidationError::InvalidDate)?;
    text.parse::<NaiveDate>()
        .map_err(|_| ValidationError::InvalidDate)
}

fn parse_datetime(value: &AttrValue) -> Result<NaiveDate, ValidationError> {
    let text = value.as_text().ok_or(ValidationError::InvalidDate)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .map(|dt| dt.date())
        .map_err(|_| ValidationError::InvalidDate)
}

fn check_date_range(rules: &ValidationRules, date: NaiveDate) -> Result<(), ValidationError> {
    let Some(range) = &rules.date_range else {
        return Ok(());
    };
    if let Some(min) = range.min {
        if date < min {
            return Err(ValidationError::DateTooEarly { min });
        }
    }
    if let Some(max) = range.max {
        if date > max {
            return Err(ValidationError::DateTooLate { max });
        }
    }
    Ok(())
}

fn check_option(definition: &FieldDefinition, candidate: &str) -> Result<(), ValidationError> {
    if definition.option_values().any(|v| v == candidate) {
        Ok(())
    } else {
        Err(ValidationError::UnknownOption {
            value: candidate.into(),
        })
    }
}

fn coerce_number(text: &str) -> Option<AttrValue> {
    if let Ok(i) = text.trim().parse::<i64>() {
        return Some(AttrValue::Number(i.into()));
    }
    let f = text.trim().parse::<f64>().ok()?;
    serde_json::Number::from_f64(f).map(AttrValue::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::definition::{DateRange, EntityType, FieldOption};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn definition(kind: FieldKind) -> FieldDefinition {
        FieldDefinition {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            entity_type: EntityType::Material,
            field_code: "test_field".into(),
            field_label: "Test Field".into(),
            description: None,
            display_order: 1,
            field_kind: kind,
            is_required: false,
            is_active: true,
            default_value: None,
            validation_rules: ValidationRules::default(),
            options: None,
            ui_config: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn select_definition(kind: FieldKind, values: &[&str]) -> FieldDefinition {
        let mut def = definition(kind);
        def.options = Some(
            values
                .iter()
                .map(|v| FieldOption {
                    value: (*v).into(),
                    label: (*v).into(),
                    disabled: false,
                })
                .collect(),
        );
        def
    }

    fn text(s: &str) -> AttrValue {
        AttrValue::Text(s.into())
    }

    fn number(n: i64) -> AttrValue {
        AttrValue::Number(n.into())
    }

    // -- required short-circuit ----------------------------------------

    #[test]
    fn optional_empty_value_passes_without_type_checks() {
        // A number field would reject "" as non-numeric; the
        // short-circuit must win for every kind.
        for kind in FieldKind::ALL {
            let def = definition(kind);
            assert_eq!(validate(&def, None), Ok(()), "kind {kind}");
            assert_eq!(validate(&def, Some(&text(""))), Ok(()), "kind {kind}");
        }
        let def = definition(FieldKind::Multiselect);
        assert_eq!(validate(&def, Some(&AttrValue::Many(vec![]))), Ok(()));
    }

    #[test]
    fn required_empty_value_fails_for_every_kind() {
        for kind in FieldKind::ALL {
            let mut def = definition(kind);
            def.is_required = true;
            assert_eq!(
                validate(&def, None),
                Err(ValidationError::Required),
                "kind {kind}"
            );
            assert_eq!(
                validate(&def, Some(&text(""))),
                Err(ValidationError::Required),
                "kind {kind}"
            );
        }
    }

    // -- text family ---------------------------------------------------

    #[test]
    fn text_length_bounds_are_inclusive() {
        let mut def = definition(FieldKind::Text);
        def.validation_rules.min_length = Some(2);
        def.validation_rules.max_length = Some(4);
        assert_eq!(validate(&def, Some(&text("ab"))), Ok(()));
        assert_eq!(validate(&def, Some(&text("abcd"))), Ok(()));
        assert_eq!(
            validate(&def, Some(&text("a"))),
            Err(ValidationError::TooShort { min: 2 })
        );
        assert_eq!(
            validate(&def, Some(&text("abcde"))),
            Err(ValidationError::TooLong { max: 4 })
        );
    }

    #[test]
    fn text_rejects_non_strings() {
        let def = definition(FieldKind::Text);
        assert_eq!(
            validate(&def, Some(&number(7))),
            Err(ValidationError::ExpectedText)
        );
    }

    #[test]
    fn pattern_uses_search_semantics() {
        let mut def = definition(FieldKind::Text);
        def.validation_rules.pattern = Some("[0-9]{3}".into());
        assert_eq!(validate(&def, Some(&text("lot-123-a"))), Ok(()));
        assert_eq!(
            validate(&def, Some(&text("lot-ab-c"))),
            Err(ValidationError::PatternMismatch)
        );
    }

    #[test]
    fn email_requires_single_at_with_both_sides() {
        let def = definition(FieldKind::Email);
        assert_eq!(validate(&def, Some(&text("ops@plant.example"))), Ok(()));
        for bad in ["no-at-sign", "two@@ats", "a@b@c", "@missing-local", "local@"] {
            assert_eq!(
                validate(&def, Some(&text(bad))),
                Err(ValidationError::InvalidEmail),
                "{bad}"
            );
        }
    }

    #[test]
    fn url_must_be_absolute() {
        let def = definition(FieldKind::Url);
        assert_eq!(
            validate(&def, Some(&text("https://example.com/datasheet.pdf"))),
            Ok(())
        );
        assert_eq!(
            validate(&def, Some(&text("/relative/path"))),
            Err(ValidationError::InvalidUrl)
        );
        assert_eq!(
            validate(&def, Some(&text("not a url"))),
            Err(ValidationError::InvalidUrl)
        );
    }

    // -- number --------------------------------------------------------

    #[test]
    fn number_bounds_are_inclusive() {
        let mut def = definition(FieldKind::Number);
        def.validation_rules.min_value = Some(0.0);
        def.validation_rules.max_value = Some(100.0);
        assert_eq!(validate(&def, Some(&number(50))), Ok(()));
        assert_eq!(validate(&def, Some(&number(0))), Ok(()));
        assert_eq!(validate(&def, Some(&number(100))), Ok(()));
        assert_eq!(
            validate(&def, Some(&number(150))),
            Err(ValidationError::AboveMaximum { max: 100.0 })
        );
        assert_eq!(
            validate(&def, Some(&number(-1))),
            Err(ValidationError::BelowMinimum { min: 0.0 })
        );
    }

    #[test]
    fn number_coerces_numeric_strings_and_rejects_the_rest() {
        let def = definition(FieldKind::Number);
        assert_eq!(validate(&def, Some(&text("12.5"))), Ok(()));
        assert_eq!(
            validate(&def, Some(&text("abc"))),
            Err(ValidationError::ExpectedNumber)
        );
        assert_eq!(
            validate(&def, Some(&AttrValue::Bool(true))),
            Err(ValidationError::ExpectedNumber)
        );
    }

    // -- boolean -------------------------------------------------------

    #[test]
    fn boolean_is_exact() {
        let def = definition(FieldKind::Boolean);
        assert_eq!(validate(&def, Some(&AttrValue::Bool(false))), Ok(()));
        assert_eq!(
            validate(&def, Some(&text("true"))),
            Err(ValidationError::ExpectedBoolean)
        );
        assert_eq!(
            validate(&def, Some(&number(1))),
            Err(ValidationError::ExpectedBoolean)
        );
    }

    // -- dates ---------------------------------------------------------

    #[test]
    fn date_parses_iso_and_respects_range() {
        let mut def = definition(FieldKind::Date);
        def.validation_rules.date_range = Some(DateRange {
            min: Some("2024-01-01".parse().unwrap()),
            max: Some("2024-12-31".parse().unwrap()),
        });
        assert_eq!(validate(&def, Some(&text("2024-06-15"))), Ok(()));
        assert_eq!(validate(&def, Some(&text("2024-01-01"))), Ok(()));
        assert!(matches!(
            validate(&def, Some(&text("2023-12-31"))),
            Err(ValidationError::DateTooEarly { .. })
        ));
        assert!(matches!(
            validate(&def, Some(&text("2025-01-01"))),
            Err(ValidationError::DateTooLate { .. })
        ));
        assert_eq!(
            validate(&def, Some(&text("not-a-date"))),
            Err(ValidationError::InvalidDate)
        );
        assert_eq!(
            validate(&def, Some(&text("2024-02-30"))),
            Err(ValidationError::InvalidDate)
        );
    }

    #[test]
    fn datetime_accepts_rfc3339_and_naive_forms() {
        let def = definition(FieldKind::Datetime);
        assert_eq!(
            validate(&def, Some(&text("2024-06-15T08:30:00Z"))),
            Ok(())
        );
        assert_eq!(
            validate(&def, Some(&text("2024-06-15T08:30:00"))),
            Ok(())
        );
        assert_eq!(
            validate(&def, Some(&text("2024-06-15"))),
            Err(ValidationError::InvalidDate)
        );
    }

    // -- select / multiselect ------------------------------------------

    #[test]
    fn select_requires_membership() {
        let def = select_definition(FieldKind::Select, &["A", "B"]);
        assert_eq!(validate(&def, Some(&text("A"))), Ok(()));
        assert_eq!(
            validate(&def, Some(&text("C"))),
            Err(ValidationError::UnknownOption { value: "C".into() })
        );
    }

    #[test]
    fn select_rejects_arrays() {
        let def = select_definition(FieldKind::Select, &["A"]);
        let many = AttrValue::Many(vec![text("A")]);
        assert_eq!(
            validate(&def, Some(&many)),
            Err(ValidationError::ExpectedScalar)
        );
    }

    #[test]
    fn multiselect_requires_array_of_members() {
        let def = select_definition(FieldKind::Multiselect, &["A", "B"]);
        let ok = AttrValue::Many(vec![text("A"), text("B")]);
        assert_eq!(validate(&def, Some(&ok)), Ok(()));

        // scalar input rejected
        assert_eq!(
            validate(&def, Some(&text("A"))),
            Err(ValidationError::ExpectedArray)
        );

        let bad = AttrValue::Many(vec![text("A"), text("Z")]);
        assert_eq!(
            validate(&def, Some(&bad)),
            Err(ValidationError::UnknownOption { value: "Z".into() })
        );
    }

    // -- file ----------------------------------------------------------

    #[test]
    fn file_checks_presence_shape_only() {
        let def = definition(FieldKind::File);
        assert_eq!(validate(&def, Some(&text("uploads/report.pdf"))), Ok(()));
        assert_eq!(
            validate(&def, Some(&number(1))),
            Err(ValidationError::ExpectedText)
        );
    }

    // -- defaults ------------------------------------------------------

    #[test]
    fn default_coerces_to_kind_shape() {
        let mut def = definition(FieldKind::Number);
        def.default_value = Some(text("30"));
        assert_eq!(effective_default(&def), Some(number(30)));

        let mut def = definition(FieldKind::Boolean);
        def.default_value = Some(text("true"));
        assert_eq!(effective_default(&def), Some(AttrValue::Bool(true)));

        let mut def = select_definition(FieldKind::Multiselect, &["A"]);
        def.default_value = Some(text("A"));
        assert_eq!(
            effective_default(&def),
            Some(AttrValue::Many(vec![text("A")]))
        );

        let def = definition(FieldKind::Text);
        assert_eq!(effective_default(&def), None);
    }

    // -- rule / option consistency -------------------------------------

    #[test]
    fn rules_must_match_kind() {
        let numeric = ValidationRules {
            min_value: Some(0.0),
            ..Default::default()
        };
        assert!(check_rules(&numeric, FieldKind::Number).is_ok());
        assert!(check_rules(&numeric, FieldKind::Text).is_err());

        let textual = ValidationRules {
            max_length: Some(10),
            ..Default::default()
        };
        assert!(check_rules(&textual, FieldKind::Text).is_ok());
        assert!(check_rules(&textual, FieldKind::Number).is_err());

        let dated = ValidationRules {
            date_range: Some(DateRange::default()),
            ..Default::default()
        };
        assert!(check_rules(&dated, FieldKind::Date).is_ok());
        assert!(check_rules(&dated, FieldKind::Boolean).is_err());
    }

    #[test]
    fn inverted_bounds_and_bad_patterns_are_rejected() {
        let inverted = ValidationRules {
            min_length: Some(10),
            max_length: Some(2),
            ..Default::default()
        };
        assert!(check_rules(&inverted, FieldKind::Text).is_err());

        let bad_pattern = ValidationRules {
            pattern: Some("[unclosed".into()),
            ..Default::default()
        };
        assert!(check_rules(&bad_pattern, FieldKind::Text).is_err());
    }

    #[test]
    fn options_required_iff_select_kind() {
        let opts = vec![FieldOption {
            value: "A".into(),
            label: "A".into(),
            disabled: false,
        }];
        assert!(check_options(FieldKind::Select, Some(&opts)).is_ok());
        assert!(check_options(FieldKind::Select, None).is_err());
        assert!(check_options(FieldKind::Select, Some(&[])).is_err());
        assert!(check_options(FieldKind::Text, Some(&opts)).is_err());
        assert!(check_options(FieldKind::Text, None).is_ok());
    }

    #[test]
    fn duplicate_option_values_are_rejected() {
        let opts = vec![
            FieldOption {
                value: "A".into(),
                label: "First".into(),
                disabled: false,
            },
            FieldOption {
                value: "A".into(),
                label: "Second".into(),
                disabled: false,
            },
        ];
        assert!(check_options(FieldKind::Select, Some(&opts)).is_err());
    }
}
