//! Goal tracking: weight log, exercise log and water intake entries, plus
//! the daily view, meal check-offs and trend reads around them.
//!
//! Every entry flow is single-step, so the first `advance()` submits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FieldError, FlowError, GatewayError};
use crate::flow::form::{
    absent_or_in_range, filled, in_range, parse_measurement, parse_number, parse_option,
};
use crate::flow::step::Predicate;
use crate::flow::{FlowDefinition, FormState, Presentable, Prompt};
use crate::gateway::{ApiClient, RemoteAction};

pub const MAX_NOTES_CHARS: usize = 500;
pub const MAX_EXERCISE_NAME_CHARS: usize = 100;
pub const MAX_GLASSES: u32 = 20;
pub const DEFAULT_WATER_GOAL: u32 = 8;

/// Window and page size of a plain weight history read.
pub const DEFAULT_HISTORY_DAYS: u32 = 30;
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;
/// Window of the weight trend read.
pub const DEFAULT_TREND_DAYS: u32 = 90;

const SAVE_LABEL: &str = "Save Entry";

/// BMI from kilograms and centimetres, rounded to one decimal.
pub fn preview_bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let metres = height_cm / 100.0;
    let bmi = weight_kg / (metres * metres);
    Some((bmi * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementTime {
    #[default]
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl fmt::Display for MeasurementTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morning => write!(f, "morning"),
            Self::Afternoon => write!(f, "afternoon"),
            Self::Evening => write!(f, "evening"),
            Self::Night => write!(f, "night"),
        }
    }
}

impl FromStr for MeasurementTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "night" => Ok(Self::Night),
            other => Err(format!("unknown measurement time: {other}")),
        }
    }
}

// ── Weight log ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WeightLogForm {
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub body_fat_percentage: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub notes: String,
    pub measurement_time: Option<MeasurementTime>,
}

impl Default for WeightLogForm {
    fn default() -> Self {
        Self {
            weight: None,
            height: None,
            body_fat_percentage: None,
            muscle_mass: None,
            notes: String::new(),
            measurement_time: Some(MeasurementTime::Morning),
        }
    }
}

impl WeightLogForm {
    /// BMI the server will compute, when height is known.
    pub fn bmi(&self) -> Option<f64> {
        preview_bmi(self.weight?, self.height?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightLogField {
    Weight,
    Height,
    BodyFat,
    MuscleMass,
    Notes,
    MeasurementTime,
}

impl fmt::Display for WeightLogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weight => "weight",
            Self::Height => "height",
            Self::BodyFat => "body_fat_percentage",
            Self::MuscleMass => "muscle_mass",
            Self::Notes => "notes",
            Self::MeasurementTime => "measurement_time",
        };
        write!(f, "{name}")
    }
}

impl FromStr for WeightLogField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weight" => Ok(Self::Weight),
            "height" => Ok(Self::Height),
            "body_fat_percentage" | "body_fat" => Ok(Self::BodyFat),
            "muscle_mass" => Ok(Self::MuscleMass),
            "notes" => Ok(Self::Notes),
            "measurement_time" => Ok(Self::MeasurementTime),
            other => Err(FieldError::UnknownField(other.to_string())),
        }
    }
}

impl FormState for WeightLogForm {
    type Field = WeightLogField;

    fn set_field(&mut self, field: WeightLogField, raw: &str) -> Result<(), FieldError> {
        match field {
            WeightLogField::Weight => parse_measurement(&mut self.weight, field, raw),
            WeightLogField::Height => parse_measurement(&mut self.height, field, raw),
            WeightLogField::BodyFat => parse_measurement(&mut self.body_fat_percentage, field, raw),
            WeightLogField::MuscleMass => parse_measurement(&mut self.muscle_mass, field, raw),
            WeightLogField::MeasurementTime => parse_option(&mut self.measurement_time, field, raw),
            WeightLogField::Notes => {
                self.notes = raw.trim().to_string();
                Ok(())
            }
        }
    }

    fn toggle_field(&mut self, field: WeightLogField, _value: &str) -> Result<(), FieldError> {
        Err(FieldError::NotMultiSelect {
            field: field.to_string(),
        })
    }

    fn prompts(step: usize) -> Vec<Prompt<WeightLogField>> {
        if step != 0 {
            return Vec::new();
        }
        vec![
            Prompt::scalar(WeightLogField::Weight, "Weight (kg, 20-500)"),
            Prompt::scalar(WeightLogField::Height, "Height (cm, optional, for BMI)"),
            Prompt::scalar(WeightLogField::BodyFat, "Body fat % (optional)"),
            Prompt::scalar(WeightLogField::MuscleMass, "Muscle mass (kg, optional)"),
            Prompt::scalar(
                WeightLogField::MeasurementTime,
                "Measured in the (morning/afternoon/evening/night)",
            ),
            Prompt::scalar(WeightLogField::Notes, "Notes (optional)"),
        ]
    }
}

fn weight_entry_valid(form: &WeightLogForm) -> bool {
    in_range(form.weight, 20.0, 500.0)
        && absent_or_in_range(form.height, 100.0, 250.0)
        && absent_or_in_range(form.body_fat_percentage, 0.0, 100.0)
        && absent_or_in_range(form.muscle_mass, 0.0, 200.0)
        && form.notes.chars().count() <= MAX_NOTES_CHARS
        && form.measurement_time.is_some()
}

pub fn weight_log_definition() -> Result<FlowDefinition<WeightLogForm>, FlowError> {
    let steps: Vec<(&str, Predicate<WeightLogForm>)> = vec![("Weight", weight_entry_valid)];
    FlowDefinition::new("weight_log", steps)
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightLogRequest {
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_mass: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub measurement_time: MeasurementTime,
}

impl WeightLogRequest {
    pub fn from_form(form: &WeightLogForm) -> Option<Self> {
        Some(Self {
            weight: form.weight?,
            height: form.height,
            body_fat_percentage: form.body_fat_percentage,
            muscle_mass: form.muscle_mass,
            notes: filled(&form.notes).then(|| form.notes.clone()),
            measurement_time: form.measurement_time?,
        })
    }
}

/// A stored weight measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightLogEntry {
    pub id: String,
    pub user_id: u64,
    pub weight: f64,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub body_fat_percentage: Option<f64>,
    #[serde(default)]
    pub muscle_mass: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub measurement_time: MeasurementTime,
    pub logged_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl Presentable for WeightLogEntry {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "Logged {:.1} kg ({} reading, {})",
            self.weight,
            self.measurement_time,
            self.logged_at.format("%Y-%m-%d %H:%M")
        )];
        if let Some(bmi) = self.bmi {
            lines.push(format!("- BMI: {bmi:.1}"));
        }
        if let Some(fat) = self.body_fat_percentage {
            lines.push(format!("- Body fat: {fat:.1}%"));
        }
        if let Some(muscle) = self.muscle_mass {
            lines.push(format!("- Muscle mass: {muscle:.1} kg"));
        }
        if let Some(notes) = &self.notes {
            lines.push(format!("- Notes: {notes}"));
        }
        lines.join("\n")
    }
}

pub struct WeightLogGateway {
    client: ApiClient,
}

impl WeightLogGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteAction for WeightLogGateway {
    type Form = WeightLogForm;
    type Output = WeightLogEntry;

    fn action(&self) -> &str {
        "log your weight"
    }

    fn submit_label(&self) -> &str {
        SAVE_LABEL
    }

    async fn submit(&self, form: &WeightLogForm) -> Result<WeightLogEntry, GatewayError> {
        let body = WeightLogRequest::from_form(form).ok_or_else(|| GatewayError::Rejected {
            status: 422,
            detail: Some("weight and measurement time are required".to_string()),
        })?;
        tracing::info!(weight = body.weight, bmi = ?form.bmi(), "Logging weight");
        self.client
            .post_json("/goal-tracking/weight-log", &body, self.client.request_timeout())
            .await
    }
}

// ── Exercise log ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseForm {
    pub exercise_name: String,
    pub duration_minutes: Option<u32>,
    pub calories_burned: Option<u32>,
    /// cardio, strength, flexibility, sports
    pub exercise_type: String,
    /// low, moderate, high
    pub intensity: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseField {
    Name,
    Duration,
    Calories,
    Type,
    Intensity,
    Notes,
}

impl fmt::Display for ExerciseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "exercise_name",
            Self::Duration => "duration_minutes",
            Self::Calories => "calories_burned",
            Self::Type => "exercise_type",
            Self::Intensity => "intensity",
            Self::Notes => "notes",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ExerciseField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exercise_name" | "name" => Ok(Self::Name),
            "duration_minutes" | "duration" => Ok(Self::Duration),
            "calories_burned" | "calories" => Ok(Self::Calories),
            "exercise_type" | "type" => Ok(Self::Type),
            "intensity" => Ok(Self::Intensity),
            "notes" => Ok(Self::Notes),
            other => Err(FieldError::UnknownField(other.to_string())),
        }
    }
}

impl FormState for ExerciseForm {
    type Field = ExerciseField;

    fn set_field(&mut self, field: ExerciseField, raw: &str) -> Result<(), FieldError> {
        let text = raw.trim().to_string();
        match field {
            ExerciseField::Duration => return parse_number(&mut self.duration_minutes, field, raw),
            ExerciseField::Calories => return parse_number(&mut self.calories_burned, field, raw),
            ExerciseField::Name => self.exercise_name = text,
            ExerciseField::Type => self.exercise_type = text,
            ExerciseField::Intensity => self.intensity = text,
            ExerciseField::Notes => self.notes = text,
        }
        Ok(())
    }

    fn toggle_field(&mut self, field: ExerciseField, _value: &str) -> Result<(), FieldError> {
        Err(FieldError::NotMultiSelect {
            field: field.to_string(),
        })
    }

    fn prompts(step: usize) -> Vec<Prompt<ExerciseField>> {
        if step != 0 {
            return Vec::new();
        }
        vec![
            Prompt::scalar(ExerciseField::Name, "Exercise"),
            Prompt::scalar(ExerciseField::Duration, "Duration (minutes)"),
            Prompt::scalar(ExerciseField::Calories, "Calories burned"),
            Prompt::scalar(
                ExerciseField::Type,
                "Type (cardio/strength/flexibility/sports, optional)",
            ),
            Prompt::scalar(ExerciseField::Intensity, "Intensity (low/moderate/high, optional)"),
            Prompt::scalar(ExerciseField::Notes, "Notes (optional)"),
        ]
    }
}

fn exercise_entry_valid(form: &ExerciseForm) -> bool {
    let name_len = form.exercise_name.chars().count();
    (1..=MAX_EXERCISE_NAME_CHARS).contains(&name_len)
        && in_range(form.duration_minutes, 1, 600)
        && in_range(form.calories_burned, 0, 2000)
}

pub fn exercise_definition() -> Result<FlowDefinition<ExerciseForm>, FlowError> {
    let steps: Vec<(&str, Predicate<ExerciseForm>)> = vec![("Exercise", exercise_entry_valid)];
    FlowDefinition::new("exercise_log", steps)
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseRequest<'a> {
    pub exercise_name: &'a str,
    pub duration_minutes: u32,
    pub calories_burned: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

impl<'a> ExerciseRequest<'a> {
    pub fn from_form(form: &'a ExerciseForm) -> Option<Self> {
        let optional = |s: &'a String| filled(s).then_some(s.as_str());
        Some(Self {
            exercise_name: &form.exercise_name,
            duration_minutes: form.duration_minutes?,
            calories_burned: form.calories_burned?,
            exercise_type: optional(&form.exercise_type),
            intensity: optional(&form.intensity),
            notes: optional(&form.notes),
        })
    }
}

/// Acknowledgement of a saved exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLogged {
    pub message: String,
}

impl Presentable for ExerciseLogged {
    fn render(&self) -> String {
        format!("✓ {}", self.message)
    }
}

pub struct ExerciseGateway {
    client: ApiClient,
}

impl ExerciseGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteAction for ExerciseGateway {
    type Form = ExerciseForm;
    type Output = ExerciseLogged;

    fn action(&self) -> &str {
        "log your exercise"
    }

    fn submit_label(&self) -> &str {
        SAVE_LABEL
    }

    async fn submit(&self, form: &ExerciseForm) -> Result<ExerciseLogged, GatewayError> {
        let body = ExerciseRequest::from_form(form).ok_or_else(|| GatewayError::Rejected {
            status: 422,
            detail: Some("duration and calories are required".to_string()),
        })?;
        tracing::info!(
            exercise = body.exercise_name,
            minutes = body.duration_minutes,
            "Logging exercise"
        );
        self.client
            .post_json("/goal-tracking/exercise", &body, self.client.request_timeout())
            .await
    }
}

// ── Water intake ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WaterIntakeForm {
    pub glasses: Option<u32>,
    pub goal: Option<u32>,
}

impl Default for WaterIntakeForm {
    fn default() -> Self {
        Self {
            glasses: None,
            goal: Some(DEFAULT_WATER_GOAL),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterIntakeField {
    Glasses,
    Goal,
}

impl fmt::Display for WaterIntakeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glasses => write!(f, "glasses"),
            Self::Goal => write!(f, "goal"),
        }
    }
}

impl FromStr for WaterIntakeField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "glasses" => Ok(Self::Glasses),
            "goal" => Ok(Self::Goal),
            other => Err(FieldError::UnknownField(other.to_string())),
        }
    }
}

impl FormState for WaterIntakeForm {
    type Field = WaterIntakeField;

    fn set_field(&mut self, field: WaterIntakeField, raw: &str) -> Result<(), FieldError> {
        match field {
            WaterIntakeField::Glasses => parse_number(&mut self.glasses, field, raw),
            WaterIntakeField::Goal => parse_number(&mut self.goal, field, raw),
        }
    }

    fn toggle_field(&mut self, field: WaterIntakeField, _value: &str) -> Result<(), FieldError> {
        Err(FieldError::NotMultiSelect {
            field: field.to_string(),
        })
    }

    fn prompts(step: usize) -> Vec<Prompt<WaterIntakeField>> {
        if step != 0 {
            return Vec::new();
        }
        vec![
            Prompt::scalar(WaterIntakeField::Glasses, "Glasses of water today (0-20)"),
            Prompt::scalar(WaterIntakeField::Goal, "Daily goal (glasses)"),
        ]
    }
}

fn water_entry_valid(form: &WaterIntakeForm) -> bool {
    in_range(form.glasses, 0, MAX_GLASSES) && form.goal.is_some_and(|g| g > 0)
}

pub fn water_intake_definition() -> Result<FlowDefinition<WaterIntakeForm>, FlowError> {
    let steps: Vec<(&str, Predicate<WaterIntakeForm>)> = vec![("Water", water_entry_valid)];
    FlowDefinition::new("water_intake", steps)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaterIntakeRequest {
    pub glasses: u32,
    pub goal: u32,
}

impl WaterIntakeRequest {
    pub fn from_form(form: &WaterIntakeForm) -> Option<Self> {
        Some(Self {
            glasses: form.glasses?,
            goal: form.goal?,
        })
    }
}

/// The backend only acknowledges; the counts are echoed from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterIntakeSaved {
    pub message: String,
    pub glasses: u32,
    pub goal: u32,
}

impl Presentable for WaterIntakeSaved {
    fn render(&self) -> String {
        format!("✓ {} ({}/{} glasses)", self.message, self.glasses, self.goal)
    }
}

pub struct WaterIntakeGateway {
    client: ApiClient,
}

impl WaterIntakeGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteAction for WaterIntakeGateway {
    type Form = WaterIntakeForm;
    type Output = WaterIntakeSaved;

    fn action(&self) -> &str {
        "update your water intake"
    }

    fn submit_label(&self) -> &str {
        SAVE_LABEL
    }

    async fn submit(&self, form: &WaterIntakeForm) -> Result<WaterIntakeSaved, GatewayError> {
        let body = WaterIntakeRequest::from_form(form).ok_or_else(|| GatewayError::Rejected {
            status: 422,
            detail: Some("glasses and goal are required".to_string()),
        })?;
        tracing::info!(glasses = body.glasses, goal = body.goal, "Updating water intake");
        let response: MessageResponse = self
            .client
            .put_json_body("/goal-tracking/water-intake", &body)
            .await?;
        Ok(WaterIntakeSaved {
            message: response.message,
            glasses: body.glasses,
            goal: body.goal,
        })
    }
}

// ── Daily view ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Breakfast => write!(f, "breakfast"),
            Self::Lunch => write!(f, "lunch"),
            Self::Dinner => write!(f, "dinner"),
            Self::Snacks => write!(f, "snacks"),
        }
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snacks" | "snack" => Ok(Self::Snacks),
            other => Err(format!("unknown meal: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub meal_type: MealType,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub calories: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Check a meal off (or back on) for today.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealUpdate {
    pub meal_type: MealType,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MealUpdate {
    pub fn new(meal_type: MealType, completed: bool) -> Self {
        Self {
            meal_type,
            completed,
            calories: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterIntakeEntry {
    pub glasses: u32,
    pub goal: u32,
    pub logged_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub exercise_name: String,
    pub duration_minutes: u32,
    pub calories_burned: u32,
    #[serde(default)]
    pub exercise_type: Option<String>,
    #[serde(default)]
    pub intensity: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub logged_at: NaiveDateTime,
}

/// Everything tracked for the current day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTracking {
    pub date: NaiveDate,
    #[serde(default)]
    pub meals: Vec<MealEntry>,
    #[serde(default)]
    pub water_intake: Option<WaterIntakeEntry>,
    #[serde(default)]
    pub latest_weight_log: Option<WeightLogEntry>,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default)]
    pub daily_notes: Option<String>,
    #[serde(default)]
    pub total_calories_burned: u32,
    #[serde(default)]
    pub total_exercise_minutes: u32,
}

impl DailyTracking {
    pub fn meals_completed(&self) -> usize {
        self.meals.iter().filter(|m| m.completed).count()
    }
}

impl Presentable for DailyTracking {
    fn render(&self) -> String {
        let mut lines = vec![format!("## Today ({})", self.date)];

        let meals: Vec<String> = self
            .meals
            .iter()
            .map(|m| {
                if m.completed {
                    format!("{} ✓", m.meal_type)
                } else {
                    m.meal_type.to_string()
                }
            })
            .collect();
        lines.push(format!(
            "- Meals: {}/{} ({})",
            self.meals_completed(),
            self.meals.len(),
            meals.join(", ")
        ));

        match &self.water_intake {
            Some(water) => lines.push(format!("- Water: {}/{} glasses", water.glasses, water.goal)),
            None => lines.push("- Water: not logged".to_string()),
        }
        if let Some(log) = &self.latest_weight_log {
            match log.bmi {
                Some(bmi) => lines.push(format!("- Weight: {:.1} kg (BMI {bmi:.1})", log.weight)),
                None => lines.push(format!("- Weight: {:.1} kg", log.weight)),
            }
        }
        lines.push(format!(
            "- Exercise: {} sessions, {} min, {} kcal",
            self.exercises.len(),
            self.total_exercise_minutes,
            self.total_calories_burned
        ));
        for ex in &self.exercises {
            lines.push(format!("  - {} ({} min)", ex.exercise_name, ex.duration_minutes));
        }
        lines.join("\n")
    }
}

// ── Trends ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for WeightTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightPoint {
    pub date: NaiveDateTime,
    pub weight: f64,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub measurement_time: Option<MeasurementTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightExtreme {
    pub weight: f64,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub bmi: Option<f64>,
}

/// A run of consecutive losses or gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightPeriod {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub start_weight: f64,
    pub end_weight: f64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiPoint {
    pub date: NaiveDateTime,
    pub bmi: f64,
}

/// Weight trend over a window of days, oldest entry first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAnalytics {
    #[serde(default)]
    pub entries: Vec<WeightPoint>,
    pub trend: WeightTrend,
    pub total_change: f64,
    pub average_weekly_change: f64,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub highest_weight: Option<WeightExtreme>,
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub lowest_weight: Option<WeightExtreme>,
    #[serde(default)]
    pub weight_loss_periods: Vec<WeightPeriod>,
    #[serde(default)]
    pub weight_gain_periods: Vec<WeightPeriod>,
    #[serde(default)]
    pub bmi_trend: Option<Vec<BmiPoint>>,
}

impl Presentable for WeightAnalytics {
    fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No weight logs in this period.".to_string();
        }
        let mut lines = vec![
            format!("## Weight trend: {}", self.trend),
            format!("- Entries: {}", self.entries.len()),
            format!("- Total change: {:+.1} kg", self.total_change),
            format!("- Average weekly change: {:+.2} kg", self.average_weekly_change),
        ];
        if let Some(high) = &self.highest_weight {
            lines.push(format!("- Highest: {:.1} kg on {}", high.weight, high.date.date()));
        }
        if let Some(low) = &self.lowest_weight {
            lines.push(format!("- Lowest: {:.1} kg on {}", low.weight, low.date.date()));
        }
        if let Some(latest) = self.bmi_trend.as_ref().and_then(|t| t.last()) {
            lines.push(format!("- Latest BMI: {:.1}", latest.bmi));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub total_calories_burned: u32,
    pub total_minutes: u32,
    /// Minutes per exercise type.
    #[serde(default)]
    pub by_type: BTreeMap<String, u32>,
    pub active_days: u32,
}

/// Combined trends over a window of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerAnalytics {
    pub weight_trend: WeightAnalytics,
    pub exercise_summary: ExerciseSummary,
    pub water_intake_average: f64,
    pub meal_completion_rate: f64,
}

impl Presentable for TrackerAnalytics {
    fn render(&self) -> String {
        let ex = &self.exercise_summary;
        let mut lines = vec![
            self.weight_trend.render(),
            String::new(),
            "## Activity".to_string(),
            format!(
                "- Exercise: {} min over {} active days, {} kcal",
                ex.total_minutes, ex.active_days, ex.total_calories_burned
            ),
        ];
        for (kind, minutes) in &ex.by_type {
            lines.push(format!("  - {kind}: {minutes} min"));
        }
        lines.push(format!("- Water: {:.1} glasses a day", self.water_intake_average));
        lines.push(format!("- Meals completed: {:.1}%", self.meal_completion_rate));
        lines.join("\n")
    }
}

/// The backend sends `{}` instead of `null` for a missing extreme.
fn empty_object_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) if map.is_empty() => Ok(None),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// ── History ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct WindowQuery {
    days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

/// Reads and small updates around the tracker entries.
#[derive(Debug, Clone)]
pub struct TrackerService {
    client: ApiClient,
}

impl TrackerService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Weight logs from the last `days`, newest first, at most `limit`.
    pub async fn weight_logs(
        &self,
        days: u32,
        limit: u32,
    ) -> Result<Vec<WeightLogEntry>, GatewayError> {
        let query = WindowQuery {
            days,
            limit: Some(limit),
        };
        self.client
            .get_json_with_query("/goal-tracking/weight-logs", &query)
            .await
    }

    pub async fn delete_weight_log(&self, id: &str) -> Result<String, GatewayError> {
        let response: MessageResponse = self
            .client
            .delete_json(&format!("/goal-tracking/weight-log/{id}"))
            .await?;
        tracing::info!(id, "Weight log deleted");
        Ok(response.message)
    }

    /// Today's meals, water, exercises and latest weight. The backend
    /// creates the day with four open meals on first read.
    pub async fn today(&self) -> Result<DailyTracking, GatewayError> {
        self.client.get_json("/goal-tracking/today").await
    }

    pub async fn update_meal(&self, update: &MealUpdate) -> Result<String, GatewayError> {
        let response: MessageResponse = self
            .client
            .put_json_body("/goal-tracking/meal", update)
            .await?;
        tracing::info!(meal = %update.meal_type, completed = update.completed, "Meal updated");
        Ok(response.message)
    }

    pub async fn weight_analytics(&self, days: u32) -> Result<WeightAnalytics, GatewayError> {
        let query = WindowQuery { days, limit: None };
        self.client
            .get_json_with_query("/goal-tracking/weight-analytics", &query)
            .await
    }

    /// Exercise, water and meal trends for `days`. The weight part covers
    /// three times that window.
    pub async fn analytics(&self, days: u32) -> Result<TrackerAnalytics, GatewayError> {
        let query = WindowQuery { days, limit: None };
        self.client
            .get_json_with_query("/goal-tracking/analytics", &query)
            .await
    }
}
