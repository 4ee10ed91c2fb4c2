//! Form state primitives shared by every flow.
//!
//! Each flow owns one concrete form struct and a `Field` enum naming its
//! inputs. Writes go through `FormState::set_field` / `toggle_field`, which
//! match exhaustively on the enum; raw text is parsed at this edge so a bad
//! keystroke clears a field instead of poisoning it.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Accumulated input for one flow.
pub trait FormState: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The inputs this form accepts.
    type Field: Copy + fmt::Debug + fmt::Display + FromStr<Err = FieldError> + Send + Sync;

    /// Replace the value of a scalar or text field from raw user input.
    fn set_field(&mut self, field: Self::Field, raw: &str) -> Result<(), FieldError>;

    /// Toggle `value` in a multi-select field.
    fn toggle_field(&mut self, field: Self::Field, value: &str) -> Result<(), FieldError>;

    /// Questions asked on `step` by interactive front ends.
    fn prompts(step: usize) -> Vec<Prompt<Self::Field>>;
}

/// A question a front end asks to fill one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt<F> {
    pub field: F,
    pub question: &'static str,
    pub multi: bool,
}

impl<F> Prompt<F> {
    pub fn scalar(field: F, question: &'static str) -> Self {
        Self {
            field,
            question,
            multi: false,
        }
    }

    pub fn multi(field: F, question: &'static str) -> Self {
        Self {
            field,
            question,
            multi: true,
        }
    }
}

/// Ordered, duplicate-free set of chip selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiSelect(Vec<String>);

impl MultiSelect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `value` if selected, otherwise append it. Other entries keep
    /// their order. Blank values are ignored.
    pub fn toggle(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match self.0.iter().position(|v| v == value) {
            Some(pos) => {
                self.0.remove(pos);
            }
            None => self.0.push(value.to_string()),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        let value = value.trim();
        self.0.iter().any(|v| v == value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for MultiSelect {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            if !set.contains(value.as_ref()) {
                set.toggle(value.as_ref());
            }
        }
        set
    }
}

impl fmt::Display for MultiSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Parse a numeric input. Empty input clears the target; anything that does
/// not parse clears it and reports `NotNumeric`.
pub fn parse_number<T: FromStr>(
    target: &mut Option<T>,
    field: impl fmt::Display,
    raw: &str,
) -> Result<(), FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        *target = None;
        return Ok(());
    }
    match raw.parse::<T>() {
        Ok(value) => {
            *target = Some(value);
            Ok(())
        }
        Err(_) => {
            *target = None;
            Err(FieldError::NotNumeric {
                field: field.to_string(),
                input: raw.to_string(),
            })
        }
    }
}

/// Parse a finite float. `"NaN"` and `"inf"` parse as `f64` but are not
/// usable measurements, so they are rejected like any other junk.
pub fn parse_measurement(
    target: &mut Option<f64>,
    field: impl fmt::Display,
    raw: &str,
) -> Result<(), FieldError> {
    let field = field.to_string();
    parse_number(target, &field, raw)?;
    if target.is_some_and(|v| !v.is_finite()) {
        *target = None;
        return Err(FieldError::NotNumeric {
            field,
            input: raw.trim().to_string(),
        });
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(
    target: &mut Option<NaiveDate>,
    field: impl fmt::Display,
    raw: &str,
) -> Result<(), FieldError> {
    parse_with(target, field, raw, "a date like 2025-08-05", |s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    })
}

/// Parse an `HH:MM` time.
pub fn parse_time(
    target: &mut Option<NaiveTime>,
    field: impl fmt::Display,
    raw: &str,
) -> Result<(), FieldError> {
    parse_with(target, field, raw, "a time like 09:30", |s| {
        NaiveTime::parse_from_str(s, "%H:%M").ok()
    })
}

fn parse_with<T>(
    target: &mut Option<T>,
    field: impl fmt::Display,
    raw: &str,
    expected: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<(), FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        *target = None;
        return Ok(());
    }
    *target = parse(raw);
    if target.is_none() {
        return Err(FieldError::InvalidFormat {
            field: field.to_string(),
            input: raw.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}

/// Parse an enum-like option through its `FromStr`, clearing on failure.
pub fn parse_option<T: FromStr>(
    target: &mut Option<T>,
    field: impl fmt::Display,
    raw: &str,
) -> Result<(), FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        *target = None;
        return Ok(());
    }
    *target = raw.parse::<T>().ok();
    if target.is_none() {
        return Err(FieldError::UnknownOption {
            field: field.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(())
}

/// Whether an optional number lies in `[min, max]`.
pub fn in_range<T: PartialOrd + Copy>(value: Option<T>, min: T, max: T) -> bool {
    value.is_some_and(|v| v >= min && v <= max)
}

/// Whether an optional number is absent or lies in `[min, max]`.
pub fn absent_or_in_range<T: PartialOrd + Copy>(value: Option<T>, min: T, max: T) -> bool {
    value.is_none() || in_range(value, min, max)
}

/// Whether a text input holds something other than whitespace.
pub fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_appends_then_removes() {
        let mut prefs = MultiSelect::new();
        prefs.toggle("vegetarian");
        prefs.toggle("vegan");
        prefs.toggle("vegetarian");
        assert_eq!(prefs.as_slice(), &["vegan".to_string()]);
    }

    #[test]
    fn double_toggle_restores_original() {
        let mut prefs: MultiSelect = ["keto", "paleo", "halal"].into_iter().collect();
        let before = prefs.clone();
        prefs.toggle("paleo");
        prefs.toggle("paleo");
        // Order changes only by the re-append.
        assert_eq!(prefs.as_slice(), &["keto", "halal", "paleo"]);
        assert!(prefs.contains("paleo"));

        let mut fresh = before.clone();
        fresh.toggle("gluten-free");
        fresh.toggle("gluten-free");
        assert_eq!(fresh, before);
    }

    #[test]
    fn toggle_never_duplicates_or_reorders() {
        let mut allergies = MultiSelect::new();
        for v in ["nuts", "dairy", "soy"] {
            allergies.toggle(v);
        }
        allergies.toggle("dairy");
        assert_eq!(allergies.as_slice(), &["nuts", "soy"]);
        allergies.toggle("shellfish");
        assert_eq!(allergies.as_slice(), &["nuts", "soy", "shellfish"]);
        assert_eq!(allergies.len(), 3);
    }

    #[test]
    fn toggle_ignores_blank_values() {
        let mut set = MultiSelect::new();
        set.toggle("   ");
        assert!(set.is_empty());
    }

    #[test]
    fn contains_trims_like_toggle() {
        let mut set = MultiSelect::new();
        set.toggle(" vegan ");
        assert!(set.contains(" vegan "));
        assert!(set.contains("vegan"));
        assert!(!set.contains("  "));
    }

    #[test]
    fn from_iter_dedups() {
        let set: MultiSelect = ["a", "b", "a", " b "].into_iter().collect();
        assert_eq!(set.as_slice(), &["a", "b"]);
    }

    #[test]
    fn multiselect_serializes_as_array() {
        let set: MultiSelect = ["vegan", "halal"].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["vegan","halal"]"#);
        let back: MultiSelect = serde_json::from_str(r#"["x"]"#).unwrap();
        assert!(back.contains("x"));
    }

    #[test]
    fn parse_number_rejects_junk_and_unsets() {
        let mut age: Option<u32> = Some(30);
        let err = parse_number(&mut age, "age", "thirty").unwrap_err();
        assert!(matches!(err, FieldError::NotNumeric { .. }));
        assert_eq!(age, None);

        parse_number(&mut age, "age", " 42 ").unwrap();
        assert_eq!(age, Some(42));

        parse_number(&mut age, "age", "").unwrap();
        assert_eq!(age, None);

        assert!(parse_number(&mut age, "age", "-3").is_err());
        assert_eq!(age, None);
    }

    #[test]
    fn parse_measurement_rejects_non_finite() {
        let mut weight = Some(70.0);
        assert!(parse_measurement(&mut weight, "weight", "NaN").is_err());
        assert_eq!(weight, None);
        assert!(parse_measurement(&mut weight, "weight", "inf").is_err());
        parse_measurement(&mut weight, "weight", "71.5").unwrap();
        assert_eq!(weight, Some(71.5));
    }

    #[test]
    fn parse_date_and_time() {
        let mut date = None;
        parse_date(&mut date, "date", "2025-08-05").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 8, 5));
        let err = parse_date(&mut date, "date", "05/08/2025").unwrap_err();
        assert!(matches!(err, FieldError::InvalidFormat { .. }));
        assert_eq!(date, None);

        let mut time = None;
        parse_time(&mut time, "time", "09:30").unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(9, 30, 0));
        assert!(parse_time(&mut time, "time", "25:00").is_err());
        assert_eq!(time, None);
    }

    #[test]
    fn range_helpers() {
        assert!(in_range(Some(20.0), 20.0, 500.0));
        assert!(!in_range(Some(19.9), 20.0, 500.0));
        assert!(!in_range::<f64>(None, 20.0, 500.0));
        assert!(absent_or_in_range::<f64>(None, 100.0, 250.0));
        assert!(!absent_or_in_range(Some(90.0), 100.0, 250.0));
        assert!(filled(" x "));
        assert!(!filled("   "));
    }
}
