//! Trip planning pipeline
//!
//! A trip plan is produced by a fixed sequence of prompts sent to one
//! [`TextGenerator`]: five research stages followed by an itinerary stage
//! that sees their results. Budget parsing and allocation run locally and
//! never depend on the generator.

use tokio::time::{self, Instant};
use tracing::{info, instrument, warn};

use crate::budget::{self, Allocation, BudgetBreakdown, CurrencyHint, ParsedBudget};
use crate::config::PlannerConfig;
use crate::itinerary;
use crate::llm::{GenerationError, Prompt, TextGenerator};
use crate::models::{ChatMessage, ChatbotRequest, ChatbotResponse, TravelRequest, TravelResponse};
use crate::validation::{self, ValidatedTrip, ValidationError};

/// Warning code: budget descriptor not recognized, default total used
pub const BUDGET_DEFAULTED: &str = "budget_defaulted";
/// Warning code: supplied duration replaced by the date span
pub const DURATION_RECONCILED: &str = "duration_reconciled";

const CHATBOT_INSTRUCTIONS: &str = "You are a friendly travel assistant focused on travel in India. \
Answer the traveller's question conversationally and accurately, with concrete suggestions \
where useful. Keep answers concise and use Markdown bullets for lists.";

/// One prompt in the planning sequence
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub role: &'static str,
    pub task: &'static str,
    /// Whether the stage gets the detailed per-category budget
    pub uses_budget: bool,
}

/// Research stages, run in order before the itinerary stage
pub const RESEARCH_STAGES: &[Stage] = &[
    Stage {
        name: "destination_research",
        role: "destination researcher",
        task: "Summarise the destination for this traveller: attractions matching their \
               interests, neighbourhoods, seasonal conditions for the travel dates, \
               local etiquette and safety notes.",
        uses_budget: true,
    },
    Stage {
        name: "accommodation",
        role: "accommodation advisor",
        task: "Recommend places to stay that fit the accommodation budget and the \
               travel style, with area, price range and why each suits the traveller.",
        uses_budget: true,
    },
    Stage {
        name: "transportation",
        role: "transport planner",
        task: "Plan how to get from the origin to the destination and how to move \
               around locally, comparing cost, time and convenience.",
        uses_budget: true,
    },
    Stage {
        name: "activities",
        role: "activities curator",
        task: "Suggest activities and attractions grouped by type, with timings, \
               prices and a rainy-day alternative, prioritising the stated interests.",
        uses_budget: true,
    },
    Stage {
        name: "dining",
        role: "food guide",
        task: "Recommend local dishes and places to eat across price points, noting \
               dietary options and which meals pair with which activities.",
        uses_budget: true,
    },
];

/// Final stage that turns the research into a day-by-day plan
pub const ITINERARY_STAGE: Stage = Stage {
    name: "itinerary",
    role: "itinerary planner",
    task: "Write a day-by-day itinerary for the whole trip using the research below. \
           For each day give timings, transport between stops, meals and an estimated \
           cost, and keep the total within the budget. Use Markdown headings per day \
           and bullet points.",
    uses_budget: false,
};

impl Stage {
    fn instructions(&self) -> String {
        format!(
            "You are the {} of a travel planning team specialising in India.\n{}",
            self.role, self.task
        )
    }
}

/// Budget resolved for a validated trip
#[derive(Debug, Clone, PartialEq)]
pub struct TripBudget {
    pub parsed: ParsedBudget,
    pub allocation: Allocation,
}

impl TripBudget {
    #[must_use]
    pub fn breakdown(&self) -> BudgetBreakdown {
        self.allocation.breakdown
    }
}

/// Parse the trip's budget descriptor and split the total over categories
#[must_use]
pub fn resolve_budget(trip: &ValidatedTrip, settings: &PlannerConfig) -> TripBudget {
    let parsed =
        budget::parse_budget_with_default(&trip.budget, &settings.currency(), settings.default_budget);
    let total = i64::try_from(parsed.total).unwrap_or(i64::MAX);
    let allocation = budget::allocate(total, Some(i64::from(trip.duration_days)));
    TripBudget { parsed, allocation }
}

/// Request details shared by every stage prompt
#[must_use]
pub fn trip_context(trip: &ValidatedTrip, budget: &BudgetBreakdown, currency: &CurrencyHint) -> String {
    let interests = trip.interests.join(", ");
    format!(
        "Travel Request Details:\n\
         Origin: {origin}\n\
         Destination: {destination}\n\
         Dates: {start} to {end}\n\
         Duration: {days} days\n\
         Budget Level: {level}\n\
         Total Budget: {total}\n\
         Daily Budget: {daily}\n\
         Travel Style: {style}\n\
         Preferences/Interests: {interests}\n\
         Special Requirements: {requirements}\n",
        origin = trip.origin,
        destination = trip.destination,
        start = trip.start_date.format("%Y-%m-%d"),
        end = trip.end_date.format("%Y-%m-%d"),
        days = trip.duration_days,
        level = display_or(&trip.budget, "not specified"),
        total = currency.format_amount(budget.total_budget),
        daily = currency.format_amount(budget.daily_budget),
        style = display_or(&trip.travel_style, "not specified"),
        interests = display_or(&interests, "none given"),
        requirements = trip.special_requirements.as_deref().unwrap_or("none"),
    )
}

/// Per-category amounts for stages that plan spending
#[must_use]
pub fn budget_details(budget: &BudgetBreakdown, currency: &CurrencyHint) -> String {
    [
        ("Accommodation", budget.accommodation),
        ("Food", budget.food),
        ("Transport", budget.transport),
        ("Activities", budget.activities),
        ("Shopping", budget.shopping),
    ]
    .into_iter()
    .fold(String::from("Budget Details:\n"), |mut details, (label, amount)| {
        details.push_str(&format!("{label} Budget: {}\n", currency.format_amount(amount)));
        details
    })
}

/// Itinerary stage input: shared context followed by each research result
fn itinerary_message(context: &str, research: &[(&Stage, Result<String, GenerationError>)]) -> String {
    research
        .iter()
        .fold(context.to_string(), |mut message, (stage, outcome)| {
            let body = match outcome {
                Ok(text) => text.trim(),
                Err(_) => "(unavailable)",
            };
            message.push_str(&format!("\n### {}\n{body}\n", stage.name.replace('_', " ")));
            message
        })
}

fn stage_message(stage: &Stage, context: &str, details: &str) -> String {
    let mut message = context.to_string();
    if stage.uses_budget {
        message.push('\n');
        message.push_str(details);
    }
    message
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

/// Plans trips and answers chatbot questions with one text generator
pub struct TravelPlanner<'a> {
    generator: &'a dyn TextGenerator,
    settings: &'a PlannerConfig,
}

impl<'a> TravelPlanner<'a> {
    pub fn new(generator: &'a dyn TextGenerator, settings: &'a PlannerConfig) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Validate, budget and generate a complete trip plan.
    ///
    /// Only validation can fail; generation problems end up as a fallback
    /// itinerary inside an otherwise complete response. All stages share one
    /// deadline of `plan_timeout_seconds`; stages that would start after it
    /// fail with a timeout without calling the generator.
    #[instrument(skip(self, request), fields(destination = %request.destination))]
    pub async fn plan(&self, request: &TravelRequest) -> Result<TravelResponse, ValidationError> {
        let trip = validation::validate_request(request, self.settings.max_trip_days)?;
        let budget = resolve_budget(&trip, self.settings);
        let breakdown = budget.breakdown();
        let currency = self.settings.currency();

        let context = trip_context(&trip, &breakdown, &currency);
        let details = budget_details(&breakdown, &currency);

        let deadline = self.deadline();
        let mut research = Vec::with_capacity(RESEARCH_STAGES.len());
        for stage in RESEARCH_STAGES {
            let message = stage_message(stage, &context, &details);
            let outcome = self.run_stage(stage, message, deadline).await;
            research.push((stage, outcome));
        }

        let message = itinerary_message(
            &stage_message(&ITINERARY_STAGE, &context, &details),
            &research,
        );
        let itinerary = self.run_stage(&ITINERARY_STAGE, message, deadline).await;

        let mut response = itinerary::normalize(itinerary, breakdown, &trip.origin, &trip.destination);

        let mut warnings: Vec<String> = budget
            .allocation
            .warnings
            .iter()
            .map(|w| w.code().to_string())
            .collect();
        if budget.parsed.is_default() {
            warnings.push(BUDGET_DEFAULTED.to_string());
        }
        if trip.duration_reconciled {
            warnings.push(DURATION_RECONCILED.to_string());
        }
        warnings.append(&mut response.warnings);
        response.warnings = warnings;

        info!(
            total_budget = breakdown.total_budget,
            duration = trip.duration_days,
            warnings = response.warnings.len(),
            "trip plan ready"
        );
        Ok(response)
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.settings.plan_timeout()
    }

    /// Generate, giving up with [`GenerationError::Timeout`] at `deadline`
    async fn generate_before(
        &self,
        prompt: &Prompt,
        deadline: Instant,
    ) -> Result<String, GenerationError> {
        if Instant::now() >= deadline {
            return Err(GenerationError::Timeout);
        }
        time::timeout_at(deadline, self.generator.generate(prompt))
            .await
            .unwrap_or(Err(GenerationError::Timeout))
    }

    async fn run_stage(
        &self,
        stage: &Stage,
        message: String,
        deadline: Instant,
    ) -> Result<String, GenerationError> {
        let prompt = Prompt::new(stage.instructions(), message);
        let outcome = self.generate_before(&prompt, deadline).await;
        match &outcome {
            Ok(_) => info!(stage = stage.name, "stage completed"),
            Err(err) => warn!(stage = stage.name, error = %err, "stage failed"),
        }
        outcome
    }

    /// Answer a free-form travel question.
    ///
    /// The caller owns the conversation; the reply is appended to the history
    /// it sent. A failed generation answers with an apology instead of an error.
    #[instrument(skip_all, fields(history = request.history.len()))]
    pub async fn ask(&self, request: ChatbotRequest) -> ChatbotResponse {
        let message = request.message.trim().to_string();
        let prompt = Prompt::new(CHATBOT_INSTRUCTIONS, message.clone())
            .with_history(request.history.clone());

        let reply = match self.generate_before(&prompt, self.deadline()).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => GenerationError::EmptyResponse.user_message().to_string(),
            Err(err) => {
                warn!(error = %err, "chatbot generation failed");
                err.user_message().to_string()
            }
        };

        let mut history = request.history;
        history.push(ChatMessage::user(message));
        history.push(ChatMessage::assistant(reply.clone()));

        ChatbotResponse {
            response: reply,
            history,
        }
    }
}
