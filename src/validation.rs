//! Per-field validation and form-level aggregation.

use crate::error::ValidationError;
use crate::model::{FieldSpec, ValueType};

/// Value handed over by the presentation layer for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    Text(String),
    Choice(String),
    Path(String),
}

impl InputValue {
    pub fn as_text(&self) -> &str {
        match self {
            InputValue::Text(s) | InputValue::Choice(s) | InputValue::Path(s) => s,
        }
    }
}

/// Ordered field name → value association for one submission attempt.
#[derive(Debug, Clone, Default)]
pub struct FormValues(Vec<(String, InputValue)>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `name`, keeping first-insertion order.
    pub fn set(&mut self, name: impl Into<String>, value: InputValue) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<N: Into<String>> FromIterator<(N, InputValue)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (N, InputValue)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        for (name, value) in iter {
            values.set(name, value);
        }
        values
    }
}

/// Name → value mapping used to render a script. Keeps schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment(Vec<(String, String)>);

impl Environment {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Environment(iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub field: String,
    pub error: Option<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Inline message for the presentation layer.
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

#[derive(Debug, Clone)]
pub struct FormResult {
    pub all_valid: bool,
    /// One result per entry, in entry order.
    pub results: Vec<ValidationResult>,
    /// Empty unless `all_valid`.
    pub environment: Environment,
}

impl FormResult {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_valid())
    }
}

pub fn validate(spec: &FieldSpec, raw: &str) -> ValidationResult {
    ValidationResult {
        field: spec.name.clone(),
        error: check(spec, raw).err(),
    }
}

fn check(spec: &FieldSpec, raw: &str) -> Result<(), ValidationError> {
    if !spec.nullable && raw.is_empty() {
        return Err(ValidationError::Required);
    }

    let len = raw.chars().count();
    if let Some(min) = spec.min_length {
        if len < min {
            return Err(ValidationError::TooShort { min });
        }
    }
    if let Some(max) = spec.max_length {
        if len > max {
            return Err(ValidationError::TooLong { max });
        }
    }

    if !matches_type(raw, spec.value_type) {
        return Err(ValidationError::TypeMismatch {
            expected: spec.value_type,
        });
    }

    match &spec.allowed_chars {
        Some(pattern) if !pattern.is_full_match(raw) => Err(ValidationError::PatternMismatch),
        _ => Ok(()),
    }
}

fn matches_type(raw: &str, value_type: ValueType) -> bool {
    match value_type {
        ValueType::Int => raw.parse::<i64>().is_ok(),
        ValueType::Float => raw.parse::<f64>().map_or(false, f64::is_finite),
        ValueType::String | ValueType::Password => true,
    }
}

/// Validate every entry, then build the environment only if all passed.
pub fn validate_form(entries: &[FieldSpec], values: &FormValues) -> FormResult {
    let results: Vec<ValidationResult> = entries
        .iter()
        .map(|spec| {
            let raw = values.get(&spec.name).map_or("", InputValue::as_text);
            validate(spec, raw)
        })
        .collect();

    let all_valid = results.iter().all(ValidationResult::is_valid);

    let environment = if all_valid {
        entries
            .iter()
            .map(|spec| {
                let raw = values.get(&spec.name).map_or("", InputValue::as_text);
                (spec.name.as_str(), raw)
            })
            .collect()
    } else {
        Environment::default()
    };

    let form = FormResult {
        all_valid,
        results,
        environment,
    };
    tracing::debug!(
        fields = entries.len(),
        invalid = form.errors().count(),
        "form validated"
    );
    form
}
