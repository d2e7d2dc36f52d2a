//! Counter Machine
//!
//! This example drives a counter with a scripted generation service.
//!
//! Key concepts:
//! - Declaring transition arguments with `transition_args!`
//! - Offering a per-state menu of typed transitions
//! - Running a session until the machine is finished
//! - Navigating history and branching from an earlier entry
//!
//! Run with: RUST_LOG=statecall=debug cargo run --example counter

use serde_json::json;
use statecall::config::GeneratorConfig;
use statecall::core::{History, Machine, Menu, Message, Prompt, Transition};
use statecall::generator::{LoggingService, TransitionGenerator};
use statecall::protocol::GenerationResponse;
use statecall::schema::Typed;
use statecall::session::Session;
use statecall::testing::ScriptedService;
use statecall::transition_args;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

transition_args! {
    /// Add to the count.
    pub struct Increment {
        pub by: i64,
    }
}

transition_args! {
    /// Start over from zero.
    pub struct Reset {}
}

#[derive(Clone, Debug)]
enum Action {
    Increment(Increment),
    Reset(Reset),
}

struct Counter {
    target: i64,
}

impl Machine for Counter {
    type State = i64;
    type Action = Action;
    type View = String;

    fn name(&self) -> &str {
        "counter"
    }

    fn initial_state(&self) -> i64 {
        0
    }

    fn is_finished(&self, state: &i64) -> bool {
        *state >= self.target
    }

    fn menu(&self, state: &i64) -> Menu<Action> {
        let menu = Menu::new().offer(
            "increment",
            "Add a small positive amount to the count.",
            Increment::schema(Typed::integer().describe("Amount to add, between 1 and 3.")),
            Action::Increment,
        );
        if *state > 0 {
            menu.offer("reset", "Set the count back to zero.", Reset::schema(), Action::Reset)
        } else {
            menu
        }
    }

    fn build_prompt(&self, history: &History<i64, Action>, state: &i64) -> Prompt {
        Prompt::new(format!(
            "You are counting towards {}. Choose the next transition.",
            self.target
        ))
        .with_message(Message::user(format!(
            "Step {}. The count is {state}.",
            history.len()
        )))
    }

    fn reduce(&self, state: &i64, transitions: &[Transition<Action>]) -> i64 {
        transitions.iter().fold(*state, |count, t| match t {
            Transition::Declared {
                action: Action::Increment(inc),
                ..
            } => count + inc.by,
            Transition::Declared {
                action: Action::Reset(_),
                ..
            } => 0,
            Transition::Unknown { .. } => count,
        })
    }

    fn render(&self, state: &i64, transitions: &[Transition<Action>]) -> String {
        let names: Vec<&str> = transitions.iter().map(|t| t.name()).collect();
        format!("count = {state:>2}  via [{}]", names.join(", "))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "statecall=info".into()))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    println!("=== Counter Machine ===\n");

    let config = GeneratorConfig::from_env()?.with_model("scripted");

    let service = ScriptedService::new()
        .respond(GenerationResponse::from_invocations([
            ("increment", json!({ "by": 2 })),
            ("celebrate", json!({})),
        ]))
        .respond(GenerationResponse::from_invocations([(
            "increment",
            json!({ "by": 1.0 }),
        )]))
        .respond(GenerationResponse::from_invocations([
            ("reset", json!({})),
            ("increment", json!({ "by": 3 })),
        ]))
        .repeat(GenerationResponse::from_invocations([(
            "increment",
            json!({ "by": 2 }),
        )]));

    let generator = TransitionGenerator::new(
        Arc::new(LoggingService::new(Arc::new(service))),
        config,
    )?;
    let session = Session::new(Counter { target: 6 }, generator);

    // Autonomous run until the target is reached
    if let Some(handle) = session.start() {
        let outcome = handle.await??;
        println!("Run ended: {outcome:?}\n");
    }

    println!("History:");
    for index in 0..session.len() {
        session.view(index);
        println!("  [{index}] {}", session.render());
    }

    // Branch from an earlier point
    session.view(1);
    println!("\nViewing [1]: {}", session.render());
    let entry = session.update().await?;
    println!(
        "Branched to [{}]: count = {}",
        session.viewing_index(),
        entry.state()
    );

    let history = session.history();
    println!("\nFinal history length: {}", history.len());
    println!(
        "Replay consistent: {}",
        history.replay(session.machine()).is_none()
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
