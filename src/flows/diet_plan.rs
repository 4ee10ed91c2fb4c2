//! AI diet plan wizard: five-step questionnaire that generates a weekly plan.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FlowError, GatewayError};
use crate::flow::form::{filled, parse_measurement, parse_number};
use crate::flow::step::{Predicate, always};
use crate::flow::{FlowDefinition, FormState, MultiSelect, Presentable, Prompt};
use crate::gateway::{ApiClient, RemoteAction};

/// Questionnaire answers.
#[derive(Debug, Clone, PartialEq)]
pub struct DietPlanForm {
    // Basics
    pub age: Option<u32>,
    pub gender: String,
    /// Kilograms.
    pub weight: Option<f64>,
    /// Centimetres.
    pub height: Option<f64>,
    // Goals
    pub primary_goal: String,
    pub target_weight: Option<f64>,
    pub timeframe: String,
    // Activity
    pub activity_level: String,
    pub exercise_frequency: String,
    // Preferences
    pub dietary_preferences: MultiSelect,
    pub dislikes: MultiSelect,
    pub allergies: MultiSelect,
    pub medications: String,
    // Health
    pub health_conditions: MultiSelect,
}

impl Default for DietPlanForm {
    fn default() -> Self {
        Self {
            age: Some(28),
            gender: "female".to_string(),
            weight: Some(68.0),
            height: Some(165.0),
            primary_goal: String::new(),
            target_weight: Some(60.0),
            timeframe: "3-months".to_string(),
            activity_level: String::new(),
            exercise_frequency: String::new(),
            dietary_preferences: MultiSelect::new(),
            dislikes: MultiSelect::new(),
            allergies: MultiSelect::new(),
            medications: String::new(),
            health_conditions: MultiSelect::new(),
        }
    }
}

/// Inputs of the diet plan questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DietPlanField {
    Age,
    Gender,
    Weight,
    Height,
    PrimaryGoal,
    TargetWeight,
    Timeframe,
    ActivityLevel,
    ExerciseFrequency,
    DietaryPreferences,
    Dislikes,
    Allergies,
    Medications,
    HealthConditions,
}

impl DietPlanField {
    pub const ALL: [DietPlanField; 14] = [
        Self::Age,
        Self::Gender,
        Self::Weight,
        Self::Height,
        Self::PrimaryGoal,
        Self::TargetWeight,
        Self::Timeframe,
        Self::ActivityLevel,
        Self::ExerciseFrequency,
        Self::DietaryPreferences,
        Self::Dislikes,
        Self::Allergies,
        Self::Medications,
        Self::HealthConditions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Weight => "weight",
            Self::Height => "height",
            Self::PrimaryGoal => "primary_goal",
            Self::TargetWeight => "target_weight",
            Self::Timeframe => "timeframe",
            Self::ActivityLevel => "activity_level",
            Self::ExerciseFrequency => "exercise_frequency",
            Self::DietaryPreferences => "dietary_preferences",
            Self::Dislikes => "dislikes",
            Self::Allergies => "allergies",
            Self::Medications => "medications",
            Self::HealthConditions => "health_conditions",
        }
    }
}

impl std::fmt::Display for DietPlanField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DietPlanField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| FieldError::UnknownField(s.to_string()))
    }
}

impl FormState for DietPlanForm {
    type Field = DietPlanField;

    fn set_field(&mut self, field: DietPlanField, raw: &str) -> Result<(), FieldError> {
        use DietPlanField::*;
        let text = raw.trim().to_string();
        match field {
            Age => return parse_number(&mut self.age, field, raw),
            Weight => return parse_measurement(&mut self.weight, field, raw),
            Height => return parse_measurement(&mut self.height, field, raw),
            TargetWeight => return parse_measurement(&mut self.target_weight, field, raw),
            Gender => self.gender = text,
            PrimaryGoal => self.primary_goal = text,
            Timeframe => self.timeframe = text,
            ActivityLevel => self.activity_level = text,
            ExerciseFrequency => self.exercise_frequency = text,
            Medications => self.medications = text,
            DietaryPreferences | Dislikes | Allergies | HealthConditions => {
                return Err(FieldError::NotScalar {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    fn toggle_field(&mut self, field: DietPlanField, value: &str) -> Result<(), FieldError> {
        use DietPlanField::*;
        let set = match field {
            DietaryPreferences => &mut self.dietary_preferences,
            Dislikes => &mut self.dislikes,
            Allergies => &mut self.allergies,
            HealthConditions => &mut self.health_conditions,
            Age | Gender | Weight | Height | PrimaryGoal | TargetWeight | Timeframe
            | ActivityLevel | ExerciseFrequency | Medications => {
                return Err(FieldError::NotMultiSelect {
                    field: field.to_string(),
                });
            }
        };
        set.toggle(value);
        Ok(())
    }

    fn prompts(step: usize) -> Vec<Prompt<DietPlanField>> {
        use DietPlanField::*;
        match step {
            0 => vec![
                Prompt::scalar(Age, "Age (years)"),
                Prompt::scalar(Gender, "Gender (female/male/other)"),
                Prompt::scalar(Weight, "Current weight (kg)"),
                Prompt::scalar(Height, "Height (cm)"),
            ],
            1 => vec![
                Prompt::scalar(
                    PrimaryGoal,
                    "Primary goal (weight_loss/muscle_gain/maintenance/health)",
                ),
                Prompt::scalar(TargetWeight, "Target weight (kg)"),
                Prompt::scalar(Timeframe, "Timeframe (1-month/3-months/6-months/1-year)"),
            ],
            2 => vec![
                Prompt::scalar(
                    ActivityLevel,
                    "Activity level (sedentary/light/moderate/active/very_active)",
                ),
                Prompt::scalar(ExerciseFrequency, "Exercise frequency (e.g. 3-4 times a week)"),
            ],
            3 => vec![
                Prompt::multi(DietaryPreferences, "Dietary preferences (vegetarian, vegan, ...)"),
                Prompt::multi(Dislikes, "Foods you dislike"),
                Prompt::multi(Allergies, "Allergies"),
                Prompt::scalar(Medications, "Medications (optional)"),
            ],
            4 => vec![Prompt::multi(HealthConditions, "Health conditions (diabetes, ...)")],
            _ => Vec::new(),
        }
    }
}

fn basics_complete(form: &DietPlanForm) -> bool {
    form.age.is_some_and(|a| a > 0)
        && filled(&form.gender)
        && form.weight.is_some_and(|w| w > 0.0)
        && form.height.is_some_and(|h| h > 0.0)
}

fn goal_complete(form: &DietPlanForm) -> bool {
    filled(&form.primary_goal)
}

fn activity_complete(form: &DietPlanForm) -> bool {
    filled(&form.activity_level) && filled(&form.exercise_frequency)
}

/// Basics → Goals → Activity → Preferences → Health.
pub fn definition() -> Result<FlowDefinition<DietPlanForm>, FlowError> {
    let steps: Vec<(&str, Predicate<DietPlanForm>)> = vec![
        ("Basics", basics_complete),
        ("Goals", goal_complete),
        ("Activity", activity_complete),
        ("Preferences", always),
        ("Health", always),
    ];
    FlowDefinition::new("diet_plan", steps)
}

/// Wire body for `POST /dietplan/generate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlanRequest<'a> {
    pub age: u32,
    pub gender: &'a str,
    pub weight: f64,
    pub height: f64,
    pub activity_level: &'a str,
    pub primary_goal: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<f64>,
    pub timeframe: &'a str,
    pub exercise_frequency: &'a str,
    pub dietary_preferences: &'a MultiSelect,
    pub allergies: &'a MultiSelect,
    pub health_conditions: &'a MultiSelect,
    pub dislikes: &'a MultiSelect,
    pub medications: &'a str,
}

impl<'a> DietPlanRequest<'a> {
    pub fn from_form(form: &'a DietPlanForm) -> Self {
        Self {
            age: form.age.unwrap_or_default(),
            gender: &form.gender,
            weight: form.weight.unwrap_or_default(),
            height: form.height.unwrap_or_default(),
            activity_level: &form.activity_level,
            primary_goal: &form.primary_goal,
            target_weight: form.target_weight,
            timeframe: &form.timeframe,
            exercise_frequency: &form.exercise_frequency,
            dietary_preferences: &form.dietary_preferences,
            allergies: &form.allergies,
            health_conditions: &form.health_conditions,
            dislikes: &form.dislikes,
            medications: &form.medications,
        }
    }
}

/// Daily macro targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub daily_calories: f64,
    pub protein_grams: f64,
    pub carbs_grams: f64,
    pub fat_grams: f64,
    #[serde(default)]
    pub fiber_grams: f64,
    #[serde(default)]
    pub water_glasses: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub preparation_time: String,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayMeals {
    pub breakfast: Meal,
    pub morning_snack: Meal,
    pub lunch: Meal,
    pub afternoon_snack: Meal,
    pub dinner: Meal,
}

impl DayMeals {
    /// Meals in serving order with their display names.
    pub fn in_order(&self) -> [(&'static str, &Meal); 5] {
        [
            ("Breakfast", &self.breakfast),
            ("Morning snack", &self.morning_snack),
            ("Lunch", &self.lunch),
            ("Afternoon snack", &self.afternoon_snack),
            ("Dinner", &self.dinner),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u32,
    pub day_name: String,
    pub meals: DayMeals,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub daily_tips: String,
}

/// Shopping list grouped by aisle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShoppingList {
    pub proteins: Vec<String>,
    pub vegetables: Vec<String>,
    pub fruits: Vec<String>,
    pub grains: Vec<String>,
    pub dairy: Vec<String>,
    pub others: Vec<String>,
}

impl ShoppingList {
    pub fn categories(&self) -> [(&'static str, &[String]); 6] {
        [
            ("Proteins", &self.proteins),
            ("Vegetables", &self.vegetables),
            ("Fruits", &self.fruits),
            ("Grains", &self.grains),
            ("Dairy", &self.dairy),
            ("Others", &self.others),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanUserInfo {
    pub email: String,
    pub bmi: f64,
    pub goal: String,
    pub generated_at: String,
}

/// A generated plan, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietPlan {
    pub plan_summary: PlanSummary,
    pub weekly_plan: Vec<DayPlan>,
    #[serde(default)]
    pub shopping_list: ShoppingList,
    #[serde(default)]
    pub nutrition_tips: Vec<String>,
    #[serde(default)]
    pub meal_prep_suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<PlanUserInfo>,
}

impl DietPlan {
    /// Order days and reject plans with no schedule.
    pub fn normalize(mut self) -> Result<Self, GatewayError> {
        if self.weekly_plan.is_empty() {
            return Err(GatewayError::InvalidResponse {
                reason: "diet plan has no days".to_string(),
            });
        }
        self.weekly_plan.sort_by_key(|d| d.day);
        Ok(self)
    }

    pub fn day(&self, index: usize) -> Option<&DayPlan> {
        self.weekly_plan.get(index)
    }
}

impl Presentable for DietPlan {
    fn render(&self) -> String {
        let s = &self.plan_summary;
        let mut parts = vec![
            "# Your Diet Plan".to_string(),
            format!(
                "- **Daily calories:** {:.0} ({}-day meal plan)",
                s.daily_calories,
                self.weekly_plan.len()
            ),
            format!(
                "- **Macros:** protein {:.0}g, carbs {:.0}g, fat {:.0}g, fiber {:.0}g",
                s.protein_grams, s.carbs_grams, s.fat_grams, s.fiber_grams
            ),
            format!("- **Water:** {} glasses", s.water_glasses),
        ];

        for day in &self.weekly_plan {
            parts.push(format!("\n## {} ({:.0} kcal)", day.day_name, day.total_calories));
            for (label, meal) in day.meals.in_order() {
                parts.push(format!("- **{label}:** {} ({:.0} kcal)", meal.name, meal.calories));
            }
            if !day.daily_tips.is_empty() {
                parts.push(format!("- _Tip:_ {}", day.daily_tips));
            }
        }

        let shopping: Vec<String> = self
            .shopping_list
            .categories()
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(label, items)| format!("- **{label}:** {}", items.join(", ")))
            .collect();
        if !shopping.is_empty() {
            parts.push("\n## Shopping list".to_string());
            parts.extend(shopping);
        }

        if !self.nutrition_tips.is_empty() {
            parts.push("\n## Nutrition tips".to_string());
            parts.extend(self.nutrition_tips.iter().map(|t| format!("- {t}")));
        }
        if !self.meal_prep_suggestions.is_empty() {
            parts.push("\n## Meal prep".to_string());
            parts.extend(self.meal_prep_suggestions.iter().map(|t| format!("- {t}")));
        }

        parts.join("\n")
    }
}

/// Generates a plan from the questionnaire.
pub struct DietPlanGateway {
    client: ApiClient,
    timeout: Duration,
}

impl DietPlanGateway {
    pub fn new(client: ApiClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn shared(client: ApiClient, timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(client, timeout))
    }
}

#[async_trait]
impl RemoteAction for DietPlanGateway {
    type Form = DietPlanForm;
    type Output = DietPlan;

    fn action(&self) -> &str {
        "generate your diet plan"
    }

    fn submit_label(&self) -> &str {
        "Generate Plan"
    }

    async fn submit(&self, form: &DietPlanForm) -> Result<DietPlan, GatewayError> {
        let body = DietPlanRequest::from_form(form);
        tracing::info!(
            goal = %form.primary_goal,
            preferences = form.dietary_preferences.len(),
            "Requesting diet plan generation"
        );
        let plan: DietPlan = self
            .client
            .post_json("/dietplan/generate", &body, self.timeout)
            .await?;
        plan.normalize()
    }
}
