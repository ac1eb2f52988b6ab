//! Form state: field values, validation rules, touched and dirty tracking.
//!
//! Validation failures are local form state. They are surfaced through
//! `error()` for the UI to render next to the field, never returned as
//! hard errors.

use regex::Regex;
use std::collections::BTreeMap;

type CustomRule = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Validation rules for a single field, checked in a fixed order:
/// required, min length, max length, pattern, custom predicate. The first
/// failing rule produces the field's error message; later rules are not
/// evaluated, so a field carries at most one message.
#[derive(Default)]
pub struct FieldRules {
  required: Option<String>,
  min_length: Option<(usize, String)>,
  max_length: Option<(usize, String)>,
  pattern: Option<(Regex, String)>,
  custom: Option<CustomRule>,
}

impl FieldRules {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn required(self) -> Self {
    self.required_with("this field is required")
  }

  pub fn required_with(mut self, message: &str) -> Self {
    self.required = Some(message.to_string());
    self
  }

  pub fn min_length(mut self, min: usize) -> Self {
    self.min_length = Some((min, format!("must be at least {} characters", min)));
    self
  }

  pub fn max_length(mut self, max: usize) -> Self {
    self.max_length = Some((max, format!("must be at most {} characters", max)));
    self
  }

  pub fn pattern(mut self, pattern: Regex, message: &str) -> Self {
    self.pattern = Some((pattern, message.to_string()));
    self
  }

  pub fn custom<F>(mut self, rule: F) -> Self
  where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
  {
    self.custom = Some(Box::new(rule));
    self
  }

  /// Evaluate the rules against a value, returning the first failure.
  /// An empty value on a non-required field passes without running the
  /// remaining rules.
  fn check(&self, value: &str) -> Option<String> {
    if let Some(message) = &self.required {
      if value.trim().is_empty() {
        return Some(message.clone());
      }
    }
    if value.is_empty() {
      return None;
    }
    if let Some((min, message)) = &self.min_length {
      if value.chars().count() < *min {
        return Some(message.clone());
      }
    }
    if let Some((max, message)) = &self.max_length {
      if value.chars().count() > *max {
        return Some(message.clone());
      }
    }
    if let Some((pattern, message)) = &self.pattern {
      if !pattern.is_match(value) {
        return Some(message.clone());
      }
    }
    if let Some(rule) = &self.custom {
      return rule(value);
    }
    None
  }
}

#[derive(Debug, Clone, Default)]
struct FieldState {
  value: String,
  initial: String,
  touched: bool,
  error: Option<String>,
}

/// State for one form: per-field values, errors, and touched/dirty flags.
#[derive(Default)]
pub struct FormState {
  fields: BTreeMap<String, FieldState>,
  rules: BTreeMap<String, FieldRules>,
}

impl FormState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare a field with its initial value and rules.
  pub fn field(mut self, name: &str, initial: &str, rules: FieldRules) -> Self {
    self.fields.insert(
      name.to_string(),
      FieldState {
        value: initial.to_string(),
        initial: initial.to_string(),
        touched: false,
        error: None,
      },
    );
    self.rules.insert(name.to_string(), rules);
    self
  }

  /// Update a field's value, mark it touched, and re-run its rules.
  /// Unknown field names are ignored.
  pub fn set_value(&mut self, name: &str, value: &str) {
    let Some(field) = self.fields.get_mut(name) else {
      return;
    };

    field.value = value.to_string();
    field.touched = true;
    field.error = self.rules.get(name).and_then(|rules| rules.check(value));
  }

  pub fn value(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(|f| f.value.as_str())
  }

  pub fn error(&self, name: &str) -> Option<&str> {
    self.fields.get(name).and_then(|f| f.error.as_deref())
  }

  pub fn touched(&self, name: &str) -> bool {
    self.fields.get(name).map(|f| f.touched).unwrap_or(false)
  }

  /// Whether a field's value differs from its initial value.
  pub fn is_field_dirty(&self, name: &str) -> bool {
    self
      .fields
      .get(name)
      .map(|f| f.value != f.initial)
      .unwrap_or(false)
  }

  /// Whether any field differs from its initial value.
  pub fn is_dirty(&self) -> bool {
    self.fields.values().any(|f| f.value != f.initial)
  }

  /// Run every declared rule against current values, updating the full
  /// error set. Returns whether all fields passed.
  pub fn validate_all(&mut self) -> bool {
    let mut all_valid = true;
    for (name, field) in self.fields.iter_mut() {
      field.error = self.rules.get(name).and_then(|rules| rules.check(&field.value));
      if field.error.is_some() {
        all_valid = false;
      }
    }
    all_valid
  }

  /// Restore initial values, clear errors and touched flags.
  pub fn reset(&mut self) {
    for field in self.fields.values_mut() {
      field.value = field.initial.clone();
      field.touched = false;
      field.error = None;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registration_form() -> FormState {
    FormState::new()
      .field("name", "", FieldRules::new().required().max_length(60))
      .field("email", "", FieldRules::new().required().pattern(
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap(),
        "invalid email address",
      ))
      .field("password", "", FieldRules::new().required().min_length(6))
      .field("phone", "", FieldRules::new().min_length(8))
  }

  #[test]
  fn test_first_failing_rule_wins() {
    let mut form = registration_form();

    // Required passes, min length fails; only one message is recorded
    form.set_value("password", "ab");
    assert_eq!(form.error("password"), Some("must be at least 6 characters"));

    form.set_value("password", "");
    assert_eq!(form.error("password"), Some("this field is required"));

    form.set_value("password", "abcdef");
    assert_eq!(form.error("password"), None);
  }

  #[test]
  fn test_pattern_rule() {
    let mut form = registration_form();

    form.set_value("email", "not-an-email");
    assert_eq!(form.error("email"), Some("invalid email address"));

    form.set_value("email", "ana@example.com");
    assert_eq!(form.error("email"), None);
  }

  #[test]
  fn test_optional_field_passes_when_empty() {
    let mut form = registration_form();

    form.set_value("phone", "");
    assert_eq!(form.error("phone"), None);

    form.set_value("phone", "123");
    assert_eq!(form.error("phone"), Some("must be at least 8 characters"));
  }

  #[test]
  fn test_custom_rule_runs_last() {
    let mut form = FormState::new().field(
      "rating",
      "",
      FieldRules::new().required().custom(|value| {
        match value.parse::<u8>() {
          Ok(1..=5) => None,
          _ => Some("rating must be between 1 and 5".to_string()),
        }
      }),
    );

    form.set_value("rating", "9");
    assert_eq!(form.error("rating"), Some("rating must be between 1 and 5"));

    form.set_value("rating", "4");
    assert_eq!(form.error("rating"), None);
  }

  #[test]
  fn test_set_value_marks_touched() {
    let mut form = registration_form();
    assert!(!form.touched("name"));
    assert!(!form.is_dirty());

    form.set_value("name", "Ana");
    assert!(form.touched("name"));
    assert!(form.is_field_dirty("name"));
    assert!(form.is_dirty());
  }

  #[test]
  fn test_validate_all_reports_every_field() {
    let mut form = registration_form();
    assert!(!form.validate_all());

    assert_eq!(form.error("name"), Some("this field is required"));
    assert_eq!(form.error("email"), Some("this field is required"));
    assert_eq!(form.error("password"), Some("this field is required"));
    // Optional field stays clean
    assert_eq!(form.error("phone"), None);

    form.set_value("name", "Ana");
    form.set_value("email", "ana@example.com");
    form.set_value("password", "secret1");
    assert!(form.validate_all());
  }

  #[test]
  fn test_reset_restores_initial_state() {
    let mut form = registration_form();
    form.set_value("name", "Ana");
    form.validate_all();

    form.reset();

    assert_eq!(form.value("name"), Some(""));
    assert!(!form.touched("name"));
    assert!(!form.is_dirty());
    assert_eq!(form.error("email"), None);
  }
}
