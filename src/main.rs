use std::sync::Arc;

use anyhow::{Context, bail};
use nutri_flow::cli::{self, Outcome, Terminal};
use nutri_flow::config::ClientConfig;
use nutri_flow::flow::{FlowDriver, FlowSession, Presentable};
use nutri_flow::flows::consultation::{
    self, Booking, BookingForm, BookingGateway, ConsultationService,
};
use nutri_flow::flows::diet_plan::{self, DietPlan, DietPlanForm, DietPlanGateway};
use nutri_flow::flows::tracker::{
    self, DEFAULT_HISTORY_DAYS, DEFAULT_HISTORY_LIMIT, DEFAULT_TREND_DAYS, ExerciseForm,
    ExerciseGateway, ExerciseLogged, MealType, MealUpdate, TrackerService, WaterIntakeForm,
    WaterIntakeGateway, WaterIntakeSaved, WeightLogEntry, WeightLogForm, WeightLogGateway,
};
use nutri_flow::gateway::ApiClient;

const USAGE: &str = "\
Usage: nutri-flow <command>

Flows:
  diet-plan              Generate a diet plan
  book                   Book a dietitian consultation
  log-weight             Log a weight measurement
  log-exercise           Log an exercise session
  log-water              Update today's water intake

History:
  bookings               List your consultations
  cancel <booking-id>    Cancel a consultation
  weights [days]         List your weight logs
  delete-weight <id>     Delete a weight log
  today                  Show today's meals, water and exercise
  meal <meal> [undo]     Mark breakfast/lunch/dinner/snacks as eaten
  trends [days]          Show weight and activity trends";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let config = ClientConfig::from_env().context("loading configuration")?;
    let client = ApiClient::new(&config)?;
    tracing::info!(base_url = client.base_url(), command = %command, "Starting");

    if config.access_token.is_none() {
        eprintln!("⚠ NUTRI_ACCESS_TOKEN is not set; most calls require a login.");
    }

    let mut term = Terminal::stdio();

    match command.as_str() {
        "diet-plan" => {
            let driver: FlowDriver<DietPlanForm, DietPlan> = FlowDriver::new(
                Arc::new(diet_plan::definition()?),
                DietPlanGateway::shared(client, config.generation_timeout),
            );
            cli::run_flow(&driver, &mut term).await?;
        }
        "book" => {
            let service = ConsultationService::new(client.clone());
            let directory = service
                .dietitians()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("load dietitians")))?;
            let Some(dietitian) = cli::choose_dietitian(&mut term, &directory).await? else {
                return Ok(());
            };

            let mut form = BookingForm::default();
            form.select_dietitian(dietitian);
            let session = FlowSession::with_form(Arc::new(consultation::definition()?), form);
            let driver: FlowDriver<BookingForm, Booking> =
                FlowDriver::from_session(session, Arc::new(BookingGateway::new(client)));

            if let Outcome::Completed(_) = cli::run_flow(&driver, &mut term).await? {
                print_bookings(&mut term, &service).await?;
            }
        }
        "log-weight" => {
            let service = TrackerService::new(client.clone());
            let driver: FlowDriver<WeightLogForm, WeightLogEntry> = FlowDriver::new(
                Arc::new(tracker::weight_log_definition()?),
                Arc::new(WeightLogGateway::new(client)),
            );
            if let Outcome::Completed(_) = cli::run_flow(&driver, &mut term).await? {
                print_weight_logs(&mut term, &service, DEFAULT_HISTORY_DAYS).await?;
            }
        }
        "log-exercise" => {
            let service = TrackerService::new(client.clone());
            let driver: FlowDriver<ExerciseForm, ExerciseLogged> = FlowDriver::new(
                Arc::new(tracker::exercise_definition()?),
                Arc::new(ExerciseGateway::new(client)),
            );
            if let Outcome::Completed(_) = cli::run_flow(&driver, &mut term).await? {
                print_today(&mut term, &service).await?;
            }
        }
        "log-water" => {
            let service = TrackerService::new(client.clone());
            let driver: FlowDriver<WaterIntakeForm, WaterIntakeSaved> = FlowDriver::new(
                Arc::new(tracker::water_intake_definition()?),
                Arc::new(WaterIntakeGateway::new(client)),
            );
            if let Outcome::Completed(_) = cli::run_flow(&driver, &mut term).await? {
                print_today(&mut term, &service).await?;
            }
        }
        "bookings" => {
            print_bookings(&mut term, &ConsultationService::new(client)).await?;
        }
        "cancel" => {
            let id = args.get(1).context("cancel needs a booking id")?;
            let message = ConsultationService::new(client)
                .cancel(id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("cancel the booking")))?;
            term.say(&format!("✓ {message}")).await?;
        }
        "weights" => {
            let days = days_arg(&args, DEFAULT_HISTORY_DAYS)?;
            print_weight_logs(&mut term, &TrackerService::new(client), days).await?;
        }
        "delete-weight" => {
            let id = args.get(1).context("delete-weight needs a log id")?;
            let message = TrackerService::new(client)
                .delete_weight_log(id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("delete the weight log")))?;
            term.say(&format!("✓ {message}")).await?;
        }
        "today" => {
            print_today(&mut term, &TrackerService::new(client)).await?;
        }
        "meal" => {
            let meal: MealType = args
                .get(1)
                .context("meal needs breakfast, lunch, dinner or snacks")?
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let completed = args.get(2).is_none_or(|flag| flag != "undo");
            let service = TrackerService::new(client);
            let message = service
                .update_meal(&MealUpdate::new(meal, completed))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("update the meal")))?;
            term.say(&format!("✓ {message}")).await?;
            print_today(&mut term, &service).await?;
        }
        "trends" => {
            let days = days_arg(&args, DEFAULT_TREND_DAYS)?;
            let analytics = TrackerService::new(client)
                .analytics(days)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("load your trends")))?;
            term.say(&analytics.render()).await?;
        }
        other => {
            eprintln!("{USAGE}");
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

async fn print_bookings<R, W>(
    term: &mut Terminal<R, W>,
    service: &ConsultationService,
) -> anyhow::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let bookings = service
        .my_bookings()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("load your bookings")))?;
    term.say("\n# Your consultations").await?;
    if bookings.is_empty() {
        term.say("None booked.").await?;
    }
    for b in &bookings {
        term.say(&format!(
            "- #{} {} with {} on {} at {} ({})",
            b.booking_id,
            b.consultation_type.label(),
            b.dietitian.name,
            b.appointment_date,
            b.appointment_time,
            b.status
        ))
        .await?;
    }
    Ok(())
}

fn days_arg(args: &[String], default: u32) -> anyhow::Result<u32> {
    match args.get(1) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("days must be a whole number, got {raw:?}")),
        None => Ok(default),
    }
}

async fn print_weight_logs<R, W>(
    term: &mut Terminal<R, W>,
    service: &TrackerService,
    days: u32,
) -> anyhow::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let logs = service
        .weight_logs(days, DEFAULT_HISTORY_LIMIT)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("load your weight logs")))?;
    term.say(&format!("\n# Weight logs (last {days} days)")).await?;
    if logs.is_empty() {
        term.say("No weight logs yet.").await?;
    }
    for entry in &logs {
        term.say(&format!("[{}] {}", entry.id, entry.render())).await?;
    }
    Ok(())
}

async fn print_today<R, W>(
    term: &mut Terminal<R, W>,
    service: &TrackerService,
) -> anyhow::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let today = service
        .today()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("load today's tracking")))?;
    term.say(&format!("\n{}", today.render())).await?;
    Ok(())
}
