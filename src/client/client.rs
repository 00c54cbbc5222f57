//! Duel client runtime.
//!
//! One task owns the [`DuelSession`] and reacts to user intents, transport
//! events, timer ticks and judge completions, one at a time.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{DuelError, TransportError};

use super::commands::{Command, HELP, parse_command};
use super::runner::{CodeRunner, SubmissionResult};
use super::session::{DuelSession, SessionEvent, SubmissionDelivery, SubmissionTicket};
use super::state::{ConnectionState, Session};
use super::timer::TimerState;
use super::transport::{self, Transport, TransportEvent};

const TICK: Duration = Duration::from_secs(1);

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Connect(String),
    JoinQueue,
    /// Run `code` against the active problem.
    Submit { code: String, language: String },
    Finish,
    Status,
    Disconnect,
}

/// Something to show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Session(SessionEvent),
    Rejected(DuelError),
    SubmissionStarted { slug: String },
    Submission(SubmissionDelivery),
    Status {
        session: Option<Session>,
        problem: Option<String>,
        timer: TimerState,
    },
}

/// One-second interval kept in step with the duel timer.
///
/// The interval is only polled while the timer runs, and is restarted
/// whenever the timer's epoch moves so the first tick of a new duel comes a
/// full period after it started.
struct Ticker {
    interval: Interval,
    epoch: u64,
}

impl Ticker {
    fn new(period: Duration, epoch: u64) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, epoch }
    }

    /// Restart the interval if the timer was restarted. Returns whether it did.
    fn sync(&mut self, epoch: u64) -> bool {
        if epoch == self.epoch {
            return false;
        }
        self.epoch = epoch;
        self.interval.reset();
        true
    }

    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

type ConnectResult = (u64, Result<(mpsc::UnboundedSender<String>, Transport), TransportError>);

/// Run the interactive client on stdin/stdout.
pub async fn run(config: ClientConfig, username: Option<String>) -> anyhow::Result<()> {
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let driver = tokio::spawn(run_loop(config, intent_rx, event_tx));
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let Some(line) = describe(&event) {
                println!("{}", line);
            }
        }
    });

    println!("{}", HELP);
    if let Some(name) = username {
        let _ = intent_tx.send(Intent::Connect(name));
    }
    read_commands(&intent_tx).await?;
    drop(intent_tx);

    driver.await??;
    printer.await?;
    Ok(())
}

/// Read prompt commands until `quit` or end of input.
async fn read_commands(intents: &mpsc::UnboundedSender<Intent>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let intent = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Help)) => {
                println!("{}", HELP);
                continue;
            }
            Ok(Some(Command::Connect(name))) => Intent::Connect(name),
            Ok(Some(Command::Join)) => Intent::JoinQueue,
            Ok(Some(Command::Finish)) => Intent::Finish,
            Ok(Some(Command::Status)) => Intent::Status,
            Ok(Some(Command::Disconnect)) => Intent::Disconnect,
            Ok(Some(Command::Submit { language, path })) => match tokio::fs::read_to_string(&path).await {
                Ok(code) => Intent::Submit { code, language },
                Err(e) => {
                    println!("Error: cannot read {}: {}", path.display(), e);
                    continue;
                }
            },
            Err(msg) => {
                println!("Error: {}", msg);
                continue;
            }
        };

        if intents.send(intent).is_err() {
            break;
        }
    }

    Ok(())
}

/// Drive one session until the intent channel closes.
pub async fn run_loop(
    config: ClientConfig,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    events: mpsc::UnboundedSender<ClientEvent>,
) -> anyhow::Result<()> {
    let runner = CodeRunner::new(config.judge_url.clone(), config.request_timeout)?;
    let mut session = DuelSession::new(config.server_url.clone());
    let mut transport: Option<Transport> = None;

    let (connect_tx, mut connect_rx) = mpsc::unbounded_channel::<ConnectResult>();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(SubmissionTicket, SubmissionResult)>();
    let mut attempt = 0u64;

    let mut ticker = Ticker::new(TICK, session.timer_epoch());

    loop {
        let timer_running = session.timer().running;

        let produced = tokio::select! {
            intent = intents.recv() => {
                let Some(intent) = intent else { break };
                match intent {
                    Intent::Connect(name) => match session.connect(&name) {
                        Ok(url) => {
                            transport = None;
                            attempt += 1;
                            let id = attempt;
                            let connect_tx = connect_tx.clone();
                            tokio::spawn(async move {
                                let _ = connect_tx.send((id, transport::open(&url).await));
                            });
                            Vec::new()
                        }
                        Err(e) => reject(&events, e),
                    },
                    Intent::JoinQueue => match session.join_queue() {
                        Ok(()) => vec![SessionEvent::Status("Joined the queue".to_string())],
                        Err(e) => reject(&events, e),
                    },
                    Intent::Finish => session.finish().unwrap_or_else(|e| reject(&events, e)),
                    Intent::Disconnect => {
                        transport = None;
                        session.disconnect()
                    }
                    Intent::Status => {
                        let _ = events.send(ClientEvent::Status {
                            session: session.session(),
                            problem: session.problem().map(|p| p.title.clone()),
                            timer: session.timer(),
                        });
                        Vec::new()
                    }
                    Intent::Submit { code, language } => {
                        let slug = session.problem().map(|p| p.slug.clone());
                        let ticket = match slug {
                            Some(slug) => session.submit(&code, &language, &slug),
                            None => Err(DuelError::InvalidState {
                                action: "submit code",
                                state: session.duel_state(),
                            }),
                        };
                        match ticket {
                            Ok(ticket) => {
                                let _ = events.send(ClientEvent::SubmissionStarted {
                                    slug: ticket.request.slug.clone(),
                                });
                                let runner = runner.clone();
                                let done_tx = done_tx.clone();
                                tokio::spawn(async move {
                                    let result = runner.run(&ticket.request).await;
                                    let _ = done_tx.send((ticket, result));
                                });
                                Vec::new()
                            }
                            Err(e) => reject(&events, e),
                        }
                    }
                }
            }
            Some((id, result)) = connect_rx.recv() => {
                if id != attempt {
                    debug!(id, "dropping superseded connection attempt");
                    Vec::new()
                } else {
                    match result {
                        Ok((outgoing, opened)) => {
                            let produced = session.on_transport_open(outgoing);
                            if !produced.is_empty() {
                                transport = Some(opened);
                            }
                            produced
                        }
                        Err(e) => session.on_transport_closed(&e.to_string()),
                    }
                }
            }
            event = next_transport_event(&mut transport) => match event {
                Some(TransportEvent::Frame(frame)) => session.handle_frame(&frame),
                Some(TransportEvent::Closed { reason }) => {
                    transport = None;
                    session.on_transport_closed(&reason)
                }
                None => {
                    transport = None;
                    session.on_transport_closed("connection ended")
                }
            },
            _ = ticker.tick(), if timer_running => session.on_tick(),
            Some((ticket, result)) = done_rx.recv() => {
                let delivery = session.complete_submission(ticket, result);
                let _ = events.send(ClientEvent::Submission(delivery));
                Vec::new()
            }
        };

        for event in produced {
            if let SessionEvent::TimeoutAcknowledgement { username, opponent } = &event {
                let runner = runner.clone();
                let (username, opponent) = (username.clone(), opponent.clone());
                tokio::spawn(async move {
                    if let Err(e) = runner.acknowledge_timeout(&username, &opponent).await {
                        warn!(error = %e, "timeout acknowledgement failed");
                    }
                });
            }
            if events.send(ClientEvent::Session(event)).is_err() {
                debug!("event receiver dropped");
            }
        }

        if ticker.sync(session.timer_epoch()) {
            debug!("duel timer restarted");
        }
        // A failed send tears the session down without a transport event.
        if transport.is_some() && session.connection_state() != ConnectionState::Connected {
            transport = None;
        }
    }

    session.disconnect();
    info!("client stopped");
    Ok(())
}

async fn next_transport_event(transport: &mut Option<Transport>) -> Option<TransportEvent> {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

fn reject(events: &mpsc::UnboundedSender<ClientEvent>, error: DuelError) -> Vec<SessionEvent> {
    debug!(error = %error, "intent rejected");
    let _ = events.send(ClientEvent::Rejected(error));
    Vec::new()
}

/// Render an event as a prompt line. Most ticks are not worth a line.
fn describe(event: &ClientEvent) -> Option<String> {
    let line = match event {
        ClientEvent::Session(event) => match event {
            SessionEvent::Connected { username } => {
                format!("Connected as {}. Type 'join' to find an opponent.", username)
            }
            SessionEvent::Status(message) | SessionEvent::Echo(message) => message.clone(),
            SessionEvent::Matched(problem) => format!(
                "Match found against {}!\n  {} [{}]\n  Tags: {}\n  {}",
                problem.opponent.as_deref().unwrap_or("an unknown opponent"),
                problem.title,
                problem.difficulty,
                problem.tags.join(", "),
                problem.link
            ),
            SessionEvent::Tick { remaining } if *remaining % 60 == 0 || *remaining <= 10 => {
                format!("{}:{:02} left", remaining / 60, remaining % 60)
            }
            SessionEvent::Tick { .. } => return None,
            SessionEvent::Expired => "Time is up!".to_string(),
            SessionEvent::FinishSent { opponent, .. } => {
                format!("Finished. Waiting for {}...", opponent)
            }
            SessionEvent::TimeoutAcknowledgement { .. } => return None,
            SessionEvent::Outcome(outcome) => format!("Duel over: {}", outcome.message),
            SessionEvent::Disconnected { reason } => format!("Disconnected ({})", reason),
        },
        ClientEvent::Rejected(error) => format!("Error: {}", error),
        ClientEvent::SubmissionStarted { slug } => format!("Running your code against {}...", slug),
        ClientEvent::Submission(SubmissionDelivery::Current(result)) => describe_result(result),
        ClientEvent::Submission(SubmissionDelivery::Stale { slug, result }) => {
            format!("(result for previous problem {}) {}", slug, describe_result(result))
        }
        ClientEvent::Status {
            session: None, ..
        } => "Not connected.".to_string(),
        ClientEvent::Status {
            session: Some(session),
            problem,
            timer,
        } => {
            let mut line = format!("{} is {}", session.username, session.duel);
            if let Some(title) = problem {
                line.push_str(&format!(", problem: {}", title));
            }
            if let Some(opponent) = &session.opponent {
                line.push_str(&format!(", opponent: {}", opponent));
            }
            if timer.running {
                line.push_str(&format!(
                    ", {}:{:02} left",
                    timer.remaining_seconds / 60,
                    timer.remaining_seconds % 60
                ));
            }
            line
        }
    };
    Some(line)
}

fn describe_result(result: &SubmissionResult) -> String {
    match result {
        SubmissionResult::AllPassed => "All test cases passed!".to_string(),
        SubmissionResult::ExecutionError(message) => format!("Execution error: {}", message),
        SubmissionResult::PartialResults(cases) => {
            let passed = cases.iter().filter(|c| c.passed).count();
            let mut out = format!("{}/{} test cases passed", passed, cases.len());
            for (i, case) in cases.iter().enumerate().filter(|(_, c)| !c.passed) {
                out.push_str(&format!(
                    "\n  #{}: input {} expected {} got {}",
                    i + 1,
                    case.input,
                    case.expected,
                    case.output
                ));
                if let Some(error) = &case.error {
                    out.push_str(&format!(" ({})", error));
                }
            }
            out
        }
    }
}
