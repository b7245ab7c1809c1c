use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    challenge::ChallengePhase,
    gateway::{AgentGateway, HttpAgentGateway, MissingAgentGateway},
    minigame::GameClick,
    progression::ProgressEvent,
    AgentIds, LearningSession, Screen, SessionEvent, SessionView,
};
use shared::{
    catalog::Catalog,
    domain::{AgentId, ChatRole},
};
use storage::{SaveSlot, Storage};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{Command, CODE_TERMINATOR, HELP};
use config::{load_settings, prepare_database_url};

#[derive(Parser, Debug)]
#[command(about = "Assembly Quest in the terminal")]
struct Args {
    /// Settings file; defaults to ./quest.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    gateway_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }
    if let Some(url) = args.gateway_url {
        settings.gateway_url = Some(url);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(%database_url, error = %error, "failed to open save database");
        error
    })?;
    storage
        .health_check()
        .await
        .context("save database is not answering")?;
    let store = Arc::new(SaveSlot::new(storage, settings.save_slot.clone()));

    let gateway: Arc<dyn AgentGateway> = match settings.gateway_url.as_deref() {
        Some(url) => Arc::new(
            HttpAgentGateway::new(url, Duration::from_secs(settings.request_timeout_secs))
                .context("failed to configure agent gateway")?,
        ),
        None => {
            warn!("no gateway_url configured; tutor and evaluator are offline");
            Arc::new(MissingAgentGateway)
        }
    };

    let agents = AgentIds {
        tutor: AgentId::new(settings.tutor_agent_id.clone()),
        evaluator: AgentId::new(settings.evaluator_agent_id.clone()),
    };
    let session = LearningSession::start(
        Arc::new(Catalog::assembly_quest()),
        store,
        gateway,
        agents,
    )
    .await;
    info!(%database_url, slot = %settings.save_slot, "assembly quest ready");

    spawn_event_printer(&session);
    print_view(&session.snapshot().await);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    println!("{message}");
                }
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if command == Command::Code {
            let mut code = Vec::new();
            while let Some(line) = lines.next_line().await? {
                if line.trim() == CODE_TERMINATOR {
                    break;
                }
                code.push(line);
            }
            session.set_draft(code.join("\n")).await;
            println!("draft saved ({} lines)", code.len());
            continue;
        }
        run(&session, command).await;
    }

    Ok(())
}

async fn run(session: &LearningSession, command: Command) {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Dashboard => session.show_dashboard().await,
        Command::Achievements => session.show_achievements().await,
        Command::Continue => report(session.continue_learning().await.map(|_| ())),
        Command::Open(module) => report(session.open_module(module).await),
        Command::NextConcept => {
            session.next_concept().await;
        }
        Command::PreviousConcept => {
            session.previous_concept().await;
        }
        Command::Challenge { module, index } => {
            report(session.open_challenge(module, index).await)
        }
        Command::Submit => {
            println!("evaluating...");
            report(session.submit_code().await.map(|_| ()));
        }
        Command::Hint => {
            if !session.reveal_hint().await {
                println!("no more hints");
            }
        }
        Command::Retry => {
            if !session.retry().await {
                println!("nothing to retry");
            }
        }
        Command::Advance => report(session.advance_after_pass().await.map(|_| ())),
        Command::Ask(text) => report(session.send_tutor_message(&text).await.map(|_| ())),
        Command::FollowUp { message, question } => {
            report(session.ask_follow_up(message, question).await.map(|_| ()))
        }
        Command::TutorOpen => session.open_tutor().await,
        Command::TutorClose => session.close_tutor().await,
        Command::GameRole(role) => {
            session.game_click(GameClick::Role(role)).await;
        }
        Command::GameRegister(register) => {
            session.game_click(GameClick::Register(register)).await;
        }
        Command::GameReset => session.game_reset().await,
        Command::Code | Command::Quit => {}
    }
    print_view(&session.snapshot().await);
}

fn report<E: std::fmt::Display>(result: std::result::Result<(), E>) {
    if let Err(err) = result {
        println!("! {err}");
    }
}

fn spawn_event_printer(session: &LearningSession) {
    let mut events = session.subscribe_events();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event {
                SessionEvent::Progress(ProgressEvent::XpGained { amount, total }) => {
                    println!("+{amount} XP ({total} total)")
                }
                SessionEvent::Progress(ProgressEvent::LevelUp { level }) => {
                    println!("LEVEL UP! now level {level}")
                }
                SessionEvent::Progress(ProgressEvent::ModuleCompleted { module_id }) => {
                    println!("module {module_id} complete")
                }
                SessionEvent::Progress(ProgressEvent::ChallengeCompleted { .. }) => {}
                SessionEvent::EvaluationResolved { displayed: false, challenge_id, .. } => {
                    println!("(result for {challenge_id} arrived after you moved on)")
                }
                SessionEvent::EvaluationResolved { .. }
                | SessionEvent::TutorReplied(_)
                | SessionEvent::Rejected(_) => {}
            }
        }
    });
}

fn print_view(view: &SessionView) {
    let stats = &view.stats;
    println!(
        "\n[lvl {} | {} XP | {} to next | {}/{} modules | streak {}]",
        stats.level,
        stats.xp,
        stats.xp_to_next_level,
        stats.modules_completed,
        stats.modules_total,
        stats.streak
    );

    match view.screen {
        Screen::Dashboard => {
            for module in &view.modules {
                let mark = match (module.completed, module.unlocked) {
                    (true, _) => "x",
                    (false, true) => " ",
                    (false, false) => "#",
                };
                println!("  [{mark}] {:>2}. {}", module.id.0, module.title);
            }
        }
        Screen::Module => {
            if let Some(concept) = &view.concept {
                println!("== {} ==\n{}\n\n{}", concept.title, concept.content, concept.visual);
            }
            if view.current_module.0 == 1 {
                let placed: Vec<String> = view
                    .game
                    .placed()
                    .iter()
                    .map(|(register, role)| format!("{register}={role}"))
                    .collect();
                println!(
                    "warm-up: {}{}",
                    placed.join(", "),
                    if view.game_done { " (done!)" } else { "" }
                );
            }
        }
        Screen::Challenge => {
            if let Some(challenge) = &view.challenge {
                println!(
                    "== challenge {}/{} [{}] {} XP ==\n{}",
                    challenge.index + 1,
                    challenge.total,
                    challenge.challenge.difficulty,
                    challenge.challenge.xp_reward,
                    challenge.challenge.prompt
                );
                match &challenge.phase {
                    ChallengePhase::Idle => {}
                    ChallengePhase::Evaluating => println!("evaluating..."),
                    ChallengePhase::Resolved(result) => {
                        let verdict = if result.passed() { "PASS" } else { "FAIL" };
                        println!("{verdict} ({:.0}/100) {}", result.score, result.feedback);
                        for err in &result.errors {
                            println!("  - {err}");
                        }
                        for (i, hint) in challenge.visible_hints.iter().enumerate() {
                            println!("  hint {}: {hint}", i + 1);
                        }
                    }
                }
            }
        }
        Screen::Achievements => {
            for id in &view.earned_achievements {
                println!("  * {id}");
            }
        }
    }

    if view.tutor_open {
        for (i, message) in view.transcript.iter().enumerate() {
            let who = match message.role {
                ChatRole::User => "you",
                ChatRole::Tutor => "tutor",
            };
            println!("  #{i} {who}: {}", message.text);
            if !message.code.is_empty() {
                println!("{}", message.code);
            }
            for (q, follow_up) in message.follow_ups.iter().enumerate() {
                println!("     ({q}) {follow_up}");
            }
        }
    }
}
