//! Concrete flows: each pairs a form and step list with its gateway.

pub mod consultation;
pub mod diet_plan;
pub mod tracker;

pub use consultation::{BookingForm, BookingGateway, ConsultationService, DietitianDirectory};
pub use diet_plan::{DietPlan, DietPlanForm, DietPlanGateway};
pub use tracker::{
    ExerciseForm, ExerciseGateway, TrackerService, WeightLogForm, WeightLogGateway,
};
