//! Terminal front end: walks a flow over line-based input.
//!
//! Each step asks the form's prompts in order. A blank answer keeps the
//! current value, `back` returns to the previous step, `quit` abandons the
//! flow. Multi-select answers are comma-separated and each distinct value
//! toggles. After a success the user may start the flow over.

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};

use crate::error::{Error, FlowError};
use crate::flow::{Driven, FlowDriver, FormState, Presentable, Prompt, StatusKind, View};
use crate::flows::consultation::{Dietitian, DietitianDirectory};

/// How a terminal run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<O> {
    Completed(O),
    /// The user quit or input ended before the flow succeeded.
    Abandoned,
}

enum StepInput {
    Done,
    Back,
    Quit,
}

/// Line reader plus writer.
pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
}

impl Terminal<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub async fn say(&mut self, text: &str) -> Result<(), Error> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    /// Print `question` and read one trimmed line. `None` at end of input.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>, Error> {
        self.out.write_all(format!("{question}: ").as_bytes()).await?;
        self.out.flush().await?;
        let line = self.lines.next_line().await?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

/// Drive `driver` to completion from terminal input.
pub async fn run_flow<F, O, R, W>(
    driver: &FlowDriver<F, O>,
    term: &mut Terminal<R, W>,
) -> Result<Outcome<O>, Error>
where
    F: FormState,
    O: Clone + Presentable + Send + Sync + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let step = driver.current_step().await;
        term.say(&driver.view().await.render()).await?;

        match fill_step(driver, term, step).await? {
            StepInput::Done => {}
            StepInput::Back => {
                driver.retreat().await;
                continue;
            }
            StepInput::Quit => {
                driver.dispose().await;
                return Ok(Outcome::Abandoned);
            }
        }

        if driver.with_session(|s| s.is_last_step()).await && driver.can_advance().await {
            term.say("⏳ Working on it...").await?;
        }

        match driver.advance().await {
            Ok(Driven::Moved(_)) => {}
            Ok(Driven::Submitted(StatusKind::Succeeded)) => {
                let view = driver.view().await;
                term.say(&view.render()).await?;
                let View::Success(output) = view else {
                    continue;
                };
                if wants_restart(term).await? {
                    driver.restart().await;
                    continue;
                }
                return Ok(Outcome::Completed(output));
            }
            // A failure is shown by the next render, with the form intact.
            Ok(Driven::Submitted(_)) => {}
            Ok(Driven::Discarded) => return Ok(Outcome::Abandoned),
            Err(FlowError::ValidationBlocked { label, .. }) => {
                term.say(&format!("⚠ \"{label}\" is incomplete or out of range."))
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn fill_step<F, O, R, W>(
    driver: &FlowDriver<F, O>,
    term: &mut Terminal<R, W>,
    step: usize,
) -> Result<StepInput, Error>
where
    F: FormState,
    O: Clone + Send + Sync + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for prompt in F::prompts(step) {
        loop {
            let Some(answer) = term.ask(&question(&prompt)).await? else {
                return Ok(StepInput::Quit);
            };
            match answer.as_str() {
                "" => break,
                "back" => return Ok(StepInput::Back),
                "quit" | "exit" => return Ok(StepInput::Quit),
                _ => {}
            }
            match apply(driver, &prompt, &answer).await {
                Ok(()) => break,
                Err(FlowError::Field(e)) => term.say(&format!("⚠ {e}")).await?,
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(StepInput::Done)
}

/// Blank or end of input means no.
async fn wants_restart<R, W>(term: &mut Terminal<R, W>) -> Result<bool, Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let answer = term.ask("Start over? [y/N]").await?;
    Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes")))
}

fn question<F>(prompt: &Prompt<F>) -> String {
    if prompt.multi {
        format!("{} [comma-separated, answer again to deselect]", prompt.question)
    } else {
        prompt.question.to_string()
    }
}

async fn apply<F, O>(
    driver: &FlowDriver<F, O>,
    prompt: &Prompt<F::Field>,
    answer: &str,
) -> Result<(), FlowError>
where
    F: FormState,
    O: Clone + Send + Sync + 'static,
{
    if !prompt.multi {
        return driver.set_field(prompt.field, answer).await;
    }
    let mut seen: Vec<&str> = Vec::new();
    for value in answer.split(',').map(str::trim) {
        if value.is_empty() || seen.contains(&value) {
            continue;
        }
        seen.push(value);
        driver.toggle_field(prompt.field, value).await?;
    }
    Ok(())
}

/// List the directory and read a 1-based choice.
pub async fn choose_dietitian<'a, R, W>(
    term: &mut Terminal<R, W>,
    directory: &'a DietitianDirectory,
) -> Result<Option<&'a Dietitian>, Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if directory.is_empty() {
        term.say("No dietitians are available right now.").await?;
        return Ok(None);
    }
    for (i, d) in directory.iter().enumerate() {
        term.say(&format!(
            "{}. {} ({}, {} yrs, ★ {:.1})",
            i + 1,
            d.name,
            d.specialization,
            d.experience,
            d.rating
        ))
        .await?;
    }
    loop {
        let Some(answer) = term.ask("Choose a dietitian").await? else {
            return Ok(None);
        };
        if answer == "quit" {
            return Ok(None);
        }
        let picked = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| directory.get(i));
        match picked {
            Some(d) => return Ok(Some(d)),
            None => {
                term.say(&format!("⚠ Enter a number from 1 to {}", directory.len()))
                    .await?
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::error::GatewayError;
    use crate::flows::diet_plan::{self, DayMeals, DayPlan, DietPlan, DietPlanForm};
    use crate::flows::tracker::{self, ExerciseForm, ExerciseLogged};
    use crate::gateway::RemoteAction;

    /// Fails the first `failures` submits with a server error.
    struct FakeExercise {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl RemoteAction for FakeExercise {
        type Form = ExerciseForm;
        type Output = ExerciseLogged;

        fn action(&self) -> &str {
            "log your exercise"
        }

        async fn submit(&self, form: &ExerciseForm) -> Result<ExerciseLogged, GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(GatewayError::ServiceUnavailable {
                    status: 500,
                    detail: None,
                });
            }
            Ok(ExerciseLogged {
                message: format!("Saved {}", form.exercise_name),
            })
        }
    }

    fn exercise_driver(
        failures: usize,
    ) -> (FlowDriver<ExerciseForm, ExerciseLogged>, Arc<FakeExercise>) {
        let fake = Arc::new(FakeExercise {
            calls: AtomicUsize::new(0),
            failures,
        });
        let driver = FlowDriver::new(
            Arc::new(tracker::exercise_definition().unwrap()),
            fake.clone(),
        );
        (driver, fake)
    }

    fn terminal(input: &str) -> Terminal<&[u8], Vec<u8>> {
        Terminal::new(input.as_bytes(), Vec::new())
    }

    fn output(term: Terminal<&[u8], Vec<u8>>) -> String {
        String::from_utf8(term.into_output()).unwrap()
    }

    #[tokio::test]
    async fn completes_single_step_flow() {
        let (driver, fake) = exercise_driver(0);
        let mut term = terminal("Running\n30\n250\n\n\n\n");
        let outcome = run_flow(&driver, &mut term).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Completed(ExerciseLogged {
                message: "Saved Running".into()
            })
        );
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        let text = output(term);
        assert!(text.contains("Step 1 of 1: Exercise"));
        assert!(text.contains("✓ Saved Running"));
    }

    #[tokio::test]
    async fn bad_number_is_asked_again() {
        let (driver, _fake) = exercise_driver(0);
        let mut term = terminal("Yoga\nhalf an hour\n45\n120\n\n\n\n");
        let outcome = run_flow(&driver, &mut term).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(driver.form().await.duration_minutes, Some(45));
        assert!(output(term).contains("⚠"));
    }

    #[tokio::test]
    async fn failure_keeps_answers_for_retry() {
        let (driver, fake) = exercise_driver(1);
        // First pass fills the form; second pass keeps everything and resubmits.
        let mut term = terminal("Swim\n40\n300\n\n\n\n\n\n\n\n\n\n");
        let outcome = run_flow(&driver, &mut term).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
        assert!(output(term).contains("Service temporarily unavailable"));
    }

    #[tokio::test]
    async fn end_of_input_abandons() {
        let (driver, fake) = exercise_driver(0);
        let mut term = terminal("Walk\n");
        let outcome = run_flow(&driver, &mut term).await.unwrap();
        assert_eq!(outcome, Outcome::Abandoned);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
        assert!(driver.with_session(|s| s.is_disposed()).await);
    }

    #[tokio::test]
    async fn blocked_step_is_reported() {
        let (driver, fake) = exercise_driver(0);
        // Blank name blocks; the second pass fills it in.
        let mut term = terminal("\n30\n100\n\n\n\nHike\n\n\n\n\n\n");
        let outcome = run_flow(&driver, &mut term).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert!(output(term).contains("\"Exercise\" is incomplete"));
    }

    struct RecordingPlan {
        seen: Mutex<Option<DietPlanForm>>,
    }

    #[async_trait]
    impl RemoteAction for RecordingPlan {
        type Form = DietPlanForm;
        type Output = DietPlan;

        fn action(&self) -> &str {
            "generate your diet plan"
        }

        async fn submit(&self, form: &DietPlanForm) -> Result<DietPlan, GatewayError> {
            *self.seen.lock().await = Some(form.clone());
            Ok(DietPlan {
                plan_summary: Default::default(),
                weekly_plan: vec![DayPlan {
                    day: 1,
                    day_name: "Monday".into(),
                    meals: DayMeals::default(),
                    total_calories: 0.0,
                    daily_tips: String::new(),
                }],
                shopping_list: Default::default(),
                nutrition_tips: Vec::new(),
                meal_prep_suggestions: Vec::new(),
                user_info: None,
            })
        }
    }

    #[tokio::test]
    async fn multi_select_answers_toggle_and_back_retreats() {
        let fake = Arc::new(RecordingPlan {
            seen: Mutex::new(None),
        });
        let driver: FlowDriver<DietPlanForm, DietPlan> =
            FlowDriver::new(Arc::new(diet_plan::definition().unwrap()), fake.clone());
        let input = [
            // Basics: keep defaults
            "", "", "", "",
            // Goals
            "weight_loss", "", "",
            // Activity: go back to Goals, then answer both steps
            "back",
            "", "", "",
            "moderate", "3-4 times a week",
            // Preferences: a repeated value within one answer counts once
            "vegetarian, vegan, vegetarian", "", "nuts", "",
            // Health: go back and deselect vegetarian
            "back",
            "vegetarian", "", "", "",
            "",
        ]
        .join("\n")
            + "\n";
        let mut term = terminal(&input);
        let outcome = run_flow(&driver, &mut term).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));

        let seen = fake.seen.lock().await.clone().unwrap();
        assert_eq!(seen.primary_goal, "weight_loss");
        assert_eq!(seen.activity_level, "moderate");
        assert_eq!(seen.dietary_preferences.as_slice(), &["vegan".to_string()]);
        assert!(seen.allergies.contains("nuts"));
        assert!(output(term).contains("## Monday"));
    }

    #[tokio::test]
    async fn duplicate_values_in_one_answer_toggle_once() {
        let fake = Arc::new(RecordingPlan {
            seen: Mutex::new(None),
        });
        let driver: FlowDriver<DietPlanForm, DietPlan> =
            FlowDriver::new(Arc::new(diet_plan::definition().unwrap()), fake.clone());
        let prompt = DietPlanForm::prompts(3).remove(0);
        apply(&driver, &prompt, "vegan, vegan ,  ,vegan").await.unwrap();
        assert_eq!(
            driver.form().await.dietary_preferences.as_slice(),
            &["vegan".to_string()]
        );
    }

    #[tokio::test]
    async fn success_can_start_over() {
        let (driver, fake) = exercise_driver(0);
        let mut term = terminal("Run\n30\n250\n\n\n\ny\nSwim\n20\n100\n\n\n\nn\n");
        let outcome = run_flow(&driver, &mut term).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Completed(ExerciseLogged {
                message: "Saved Swim".into()
            })
        );
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
        assert_eq!(driver.form().await.exercise_name, "Swim");
        let text = output(term);
        assert!(text.contains("✓ Saved Run"));
        assert_eq!(text.matches("Start over? [y/N]").count(), 2);
    }

    #[tokio::test]
    async fn choose_dietitian_by_number() {
        let directory = DietitianDirectory::new(vec![
            serde_json::from_value(serde_json::json!({
                "_id": "a", "name": "Dr. A", "specialization": "Sports",
                "experience": 5, "rating": 4.5
            }))
            .unwrap(),
            serde_json::from_value(serde_json::json!({
                "_id": "b", "name": "Dr. B", "specialization": "Clinical",
                "experience": 9, "rating": 4.9
            }))
            .unwrap(),
        ]);
        let mut term = terminal("7\nzero\n2\n");
        let picked = choose_dietitian(&mut term, &directory).await.unwrap();
        assert_eq!(picked.map(|d| d.id.as_str()), Some("b"));
        let text = output(term);
        assert!(text.contains("1. Dr. A"));
        assert!(text.contains("Enter a number from 1 to 2"));
    }
}
