//! Consultation booking: pick a dietitian, a method, a slot, confirm.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FlowError, GatewayError};
use crate::flow::form::{filled, parse_date, parse_option, parse_time};
use crate::flow::step::{Predicate, always};
use crate::flow::{FlowDefinition, FormState, Presentable, Prompt};
use crate::gateway::{ApiClient, RemoteAction};

/// Length of every booked session, in minutes.
pub const SESSION_MINUTES: u32 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub date: String,
    pub time: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

/// A bookable provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dietitian {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub specialization: String,
    /// Years in practice.
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub available_slots: Vec<Slot>,
}

impl Dietitian {
    pub fn open_slots(&self) -> impl Iterator<Item = &Slot> {
        self.available_slots.iter().filter(|s| s.is_available)
    }
}

/// Dietitians fetched from the backend, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DietitianDirectory(Vec<Dietitian>);

impl DietitianDirectory {
    pub fn new(dietitians: Vec<Dietitian>) -> Self {
        Self(dietitians)
    }

    pub fn find(&self, id: &str) -> Option<&Dietitian> {
        self.0.iter().find(|d| d.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Dietitian> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dietitian> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationMethod {
    VideoCall,
    PhoneCall,
    InPerson,
}

impl ConsultationMethod {
    pub const ALL: [ConsultationMethod; 3] = [Self::VideoCall, Self::PhoneCall, Self::InPerson];

    /// Session price in rupees.
    pub fn price(&self) -> u32 {
        match self {
            Self::VideoCall => 1500,
            Self::PhoneCall => 1200,
            Self::InPerson => 2000,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VideoCall => "Video Call",
            Self::PhoneCall => "Phone Call",
            Self::InPerson => "In-Person",
        }
    }
}

impl fmt::Display for ConsultationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoCall => write!(f, "video_call"),
            Self::PhoneCall => write!(f, "phone_call"),
            Self::InPerson => write!(f, "in_person"),
        }
    }
}

impl FromStr for ConsultationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video_call" | "video" => Ok(Self::VideoCall),
            "phone_call" | "phone" => Ok(Self::PhoneCall),
            "in_person" | "in-person" => Ok(Self::InPerson),
            other => Err(format!("unknown consultation method: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingForm {
    pub dietitian_id: String,
    /// Display name of the selected dietitian, filled by `select_dietitian`.
    pub dietitian_name: String,
    pub method: Option<ConsultationMethod>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub notes: String,
    pub duration: u32,
}

impl Default for BookingForm {
    fn default() -> Self {
        Self {
            dietitian_id: String::new(),
            dietitian_name: String::new(),
            method: None,
            date: None,
            time: None,
            notes: String::new(),
            duration: SESSION_MINUTES,
        }
    }
}

impl BookingForm {
    pub fn select_dietitian(&mut self, dietitian: &Dietitian) {
        self.dietitian_id = dietitian.id.clone();
        self.dietitian_name = dietitian.name.clone();
    }

    pub fn price(&self) -> Option<u32> {
        self.method.map(|m| m.price())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingField {
    Dietitian,
    Method,
    Date,
    Time,
    Notes,
}

impl fmt::Display for BookingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dietitian => "dietitian",
            Self::Method => "method",
            Self::Date => "date",
            Self::Time => "time",
            Self::Notes => "notes",
        };
        write!(f, "{name}")
    }
}

impl FromStr for BookingField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dietitian" | "dietitian_id" => Ok(Self::Dietitian),
            "method" | "consultation_type" => Ok(Self::Method),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "notes" => Ok(Self::Notes),
            other => Err(FieldError::UnknownField(other.to_string())),
        }
    }
}

impl FormState for BookingForm {
    type Field = BookingField;

    fn set_field(&mut self, field: BookingField, raw: &str) -> Result<(), FieldError> {
        match field {
            BookingField::Dietitian => {
                self.dietitian_id = raw.trim().to_string();
                self.dietitian_name.clear();
                Ok(())
            }
            BookingField::Method => parse_option(&mut self.method, field, raw),
            BookingField::Date => parse_date(&mut self.date, field, raw),
            BookingField::Time => parse_time(&mut self.time, field, raw),
            BookingField::Notes => {
                self.notes = raw.trim().to_string();
                Ok(())
            }
        }
    }

    fn toggle_field(&mut self, field: BookingField, _value: &str) -> Result<(), FieldError> {
        Err(FieldError::NotMultiSelect {
            field: field.to_string(),
        })
    }

    fn prompts(step: usize) -> Vec<Prompt<BookingField>> {
        match step {
            0 => vec![Prompt::scalar(BookingField::Dietitian, "Dietitian id")],
            1 => vec![Prompt::scalar(
                BookingField::Method,
                "Consultation method (video_call/phone_call/in_person)",
            )],
            2 => vec![
                Prompt::scalar(BookingField::Date, "Date (YYYY-MM-DD)"),
                Prompt::scalar(BookingField::Time, "Time (HH:MM)"),
            ],
            3 => vec![Prompt::scalar(BookingField::Notes, "Notes for the dietitian (optional)")],
            _ => Vec::new(),
        }
    }
}

fn dietitian_chosen(form: &BookingForm) -> bool {
    filled(&form.dietitian_id)
}

fn method_chosen(form: &BookingForm) -> bool {
    form.method.is_some()
}

fn slot_chosen(form: &BookingForm) -> bool {
    form.date.is_some() && form.time.is_some()
}

/// Dietitian → Method → Schedule → Confirm.
pub fn definition() -> Result<FlowDefinition<BookingForm>, FlowError> {
    let steps: Vec<(&str, Predicate<BookingForm>)> = vec![
        ("Dietitian", dietitian_chosen),
        ("Method", method_chosen),
        ("Schedule", slot_chosen),
        ("Confirm", always),
    ];
    FlowDefinition::new("consultation_booking", steps)
}

/// Wire body for `POST /consultations/book`.
#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    pub dietitian_id: String,
    pub consultation_type: ConsultationMethod,
    pub appointment_date: String,
    pub appointment_time: String,
    pub duration: u32,
    pub notes: String,
}

impl BookingRequest {
    /// `None` until every scheduling field is set; the step predicates
    /// guarantee that by the time a submit ticket exists.
    pub fn from_form(form: &BookingForm) -> Option<Self> {
        Some(Self {
            dietitian_id: form.dietitian_id.clone(),
            consultation_type: form.method?,
            appointment_date: form.date?.format("%Y-%m-%d").to_string(),
            appointment_time: form.time?.format("%H:%M").to_string(),
            duration: form.duration,
            notes: form.notes.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedDietitian {
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// A confirmed (or historical) consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub booking_id: u64,
    #[serde(default)]
    pub patient_user_id: u64,
    pub dietitian: BookedDietitian,
    pub consultation_type: ConsultationMethod,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub duration: u32,
    #[serde(default)]
    pub notes: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub meeting_link: Option<String>,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub price: Option<f64>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Scheduled | BookingStatus::Rescheduled
        )
    }
}

impl Presentable for Booking {
    fn render(&self) -> String {
        let mut lines = vec![
            format!("# Booking #{} confirmed", self.booking_id),
            format!(
                "- **Dietitian:** {} ({})",
                self.dietitian.name, self.dietitian.specialization
            ),
            format!("- **Method:** {}", self.consultation_type.label()),
            format!(
                "- **When:** {} at {} ({} min)",
                self.appointment_date, self.appointment_time, self.duration
            ),
            format!("- **Status:** {}", self.status),
        ];
        let price = self
            .price
            .unwrap_or_else(|| f64::from(self.consultation_type.price()));
        lines.push(format!("- **Fee:** ₹{price:.0}"));
        if let Some(link) = &self.meeting_link {
            lines.push(format!("- **Meeting link:** {link}"));
        }
        if !self.notes.is_empty() {
            lines.push(format!("- **Notes:** {}", self.notes));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct MessageResponse {
    message: String,
}

/// Books the selected slot.
pub struct BookingGateway {
    client: ApiClient,
}

impl BookingGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteAction for BookingGateway {
    type Form = BookingForm;
    type Output = Booking;

    fn action(&self) -> &str {
        "book a consultation"
    }

    fn submit_label(&self) -> &str {
        "Confirm Booking"
    }

    async fn submit(&self, form: &BookingForm) -> Result<Booking, GatewayError> {
        let body = BookingRequest::from_form(form).ok_or_else(|| GatewayError::Rejected {
            status: 422,
            detail: Some("method, date and time are required".to_string()),
        })?;
        tracing::info!(
            dietitian_id = %body.dietitian_id,
            method = %body.consultation_type,
            date = %body.appointment_date,
            "Booking consultation"
        );
        self.client
            .post_json("/consultations/book", &body, self.client.request_timeout())
            .await
    }
}

/// Read and cancel calls around the booking flow.
#[derive(Debug, Clone)]
pub struct ConsultationService {
    client: ApiClient,
}

impl ConsultationService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn dietitians(&self) -> Result<DietitianDirectory, GatewayError> {
        let list: Vec<Dietitian> = self.client.get_json("/consultations/dietitians").await?;
        Ok(DietitianDirectory::new(list))
    }

    pub async fn my_bookings(&self) -> Result<Vec<Booking>, GatewayError> {
        self.client.get_json("/consultations/my-bookings").await
    }

    /// Cancel a booking; returns the server's confirmation message.
    pub async fn cancel(&self, booking_id: &str) -> Result<String, GatewayError> {
        let response: MessageResponse = self
            .client
            .put_json(&format!("/consultations/cancel/{booking_id}"))
            .await?;
        tracing::info!(booking_id, "Booking cancelled");
        Ok(response.message)
    }
}
