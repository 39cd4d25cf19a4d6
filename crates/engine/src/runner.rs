//! The loop state machine.
//!
//! A run moves `idle → running → (completed | stopped | errored)`. While
//! running, each step picks the next node/agent, builds the prompt, streams
//! the response, parses the trailing JSON, appends the message, and
//! advances. Exactly one LLM call is in flight at any moment; messages
//! append strictly in completion order because every step fully awaits the
//! previous stream.

use crate::event::{LoopEvent, LoopStatus};
use crate::output::extract_trailing_json;
use crate::prompt;
use crate::transcript::TranscriptStore;
use chrono::Utc;
use metaloop_config::AppConfig;
use metaloop_core::graph::{AGENT_A_NODE, AGENT_B_NODE, REFLECTOR_NODE};
use metaloop_core::{
    Agent, CancelToken, ChatMessage, GraphError, MemoryDelta, Message, ProcessGraph,
    ProviderError, ProviderKind, Transcript,
};
use metaloop_memory::ReflectorSession;
use metaloop_providers::{ChatRequest, ProviderRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Provider/model bindings for the agents of one run.
#[derive(Debug, Clone)]
pub struct AgentRoster {
    pub provider_a: ProviderKind,
    pub model_a: String,
    pub provider_b: ProviderKind,
    pub model_b: String,
    pub reflector_provider: ProviderKind,
    pub reflector_model: String,
}

impl AgentRoster {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            provider_a: config.agents.provider_a,
            model_a: config.agents.model_a.clone(),
            provider_b: config.agents.provider_b,
            model_b: config.agents.model_b.clone(),
            reflector_provider: config.reflector.provider,
            reflector_model: config.reflector.model.clone(),
        }
    }

    /// The primary binding for `step` — parity alone decides A vs. B.
    fn primary(&self, step: u32) -> (ProviderKind, &str) {
        if Agent::is_agent_a(step) {
            (self.provider_a, &self.model_a)
        } else {
            (self.provider_b, &self.model_b)
        }
    }
}

/// Execution limits for one run.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_steps: u32,
    pub endless: bool,
    pub temperature: f32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_steps: 8,
            endless: false,
            temperature: 0.7,
        }
    }
}

impl LoopSettings {
    fn step_limit(&self) -> u32 {
        if self.endless { u32::MAX } else { self.max_steps }
    }
}

/// The result of a finished run.
#[derive(Debug)]
pub struct LoopOutcome {
    pub status: LoopStatus,
    pub steps: u32,
    pub messages: Vec<Message>,
}

/// Drives loop execution over a validated process graph.
pub struct LoopRunner {
    graph: ProcessGraph,
    roster: AgentRoster,
    settings: LoopSettings,
    providers: Arc<ProviderRegistry>,
    transcripts: Arc<dyn TranscriptStore>,
    events: mpsc::Sender<LoopEvent>,
    cancel: CancelToken,
}

impl LoopRunner {
    pub fn new(
        graph: ProcessGraph,
        roster: AgentRoster,
        providers: Arc<ProviderRegistry>,
        transcripts: Arc<dyn TranscriptStore>,
        events: mpsc::Sender<LoopEvent>,
    ) -> metaloop_core::Result<Self> {
        graph.validate()?;
        Ok(Self {
            graph,
            roster,
            settings: LoopSettings::default(),
            providers,
            transcripts,
            events,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The token an external caller uses to stop this run. Cancellation is
    /// cooperative: observed between awaits and inside the stream read.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Standard mode: walk the graph from its entry node, alternating the
    /// primary agent identity by step parity while the edges determine
    /// prompt flow.
    pub async fn run_standard(&self, seed_prompt: &str) -> LoopOutcome {
        info!(
            max_steps = self.settings.max_steps,
            endless = self.settings.endless,
            "Starting standard loop"
        );

        let step_limit = self.settings.step_limit();
        let mut current_node_id = Some(self.graph.entry.clone());
        let mut context = seed_prompt.to_string();
        let mut display: Vec<Message> = Vec::new();
        let mut llm_history: Vec<ChatMessage> = Vec::new();
        let mut step: u32 = 0;
        let mut status = LoopStatus::Completed;

        while step < step_limit {
            if self.cancel.is_cancelled() {
                status = LoopStatus::Stopped;
                break;
            }

            let Some(node_id) = current_node_id.clone() else {
                debug!(step, "No outgoing edge, loop complete");
                break;
            };
            let Some(node) = self.graph.node(&node_id) else {
                status = self
                    .fail(
                        &mut display,
                        None,
                        GraphError::MissingNode(node_id.clone()).to_string(),
                    )
                    .await;
                break;
            };

            let (provider, model) = self.roster.primary(step);
            let agent = Agent::new(
                Agent::name_for_step(step),
                provider,
                model,
                prompt::agent_system_prompt(&node.data.label),
            );
            self.emit(LoopEvent::StepStarted {
                step,
                agent: agent.name.clone(),
                model: agent.model.clone(),
            })
            .await;

            let prior = if llm_history.is_empty() {
                prompt::NO_PRIOR_CONTEXT.to_string()
            } else {
                prompt::format_prior_context(&display)
            };
            let user_prompt = prompt::compose_step_prompt(node, &prior, seed_prompt, &context);

            match self.stream_turn(&agent, &user_prompt).await {
                Ok(text) => {
                    if self.cancel.is_cancelled() {
                        status = LoopStatus::Stopped;
                        break;
                    }

                    let structured = extract_trailing_json(&text);
                    let message = Message::new(&agent.name, &agent.model, &text, structured);
                    display.push(message.clone());
                    self.emit(LoopEvent::Turn { message }).await;

                    llm_history.push(ChatMessage::user(&user_prompt));
                    llm_history.push(ChatMessage::assistant(&text));

                    current_node_id = self.graph.next_node(&node_id).cloned();
                    context = text;
                    step += 1;
                }
                Err(err) if err.is_cancelled() => {
                    info!(step, "Loop stopped");
                    status = LoopStatus::Stopped;
                    break;
                }
                Err(err) => {
                    status = self
                        .fail(&mut display, Some(&agent.name), err.to_string())
                        .await;
                    break;
                }
            }
        }

        self.finish(status, step, seed_prompt, display).await
    }

    /// Self-evolving reflector mode: a fixed A→R→B→R pattern that bypasses
    /// edge walking. One step is one primary-then-reflector pair.
    pub async fn run_reflector(
        &self,
        seed_prompt: &str,
        session: &mut ReflectorSession,
    ) -> LoopOutcome {
        info!(
            max_steps = self.settings.max_steps,
            endless = self.settings.endless,
            "Starting self-evolving reflector loop"
        );

        let step_limit = self.settings.step_limit();
        let mut display: Vec<Message> = Vec::new();
        let mut last_response = seed_prompt.to_string();
        let mut step: u32 = 0;
        let mut status = LoopStatus::Completed;

        while step < step_limit {
            if self.cancel.is_cancelled() {
                status = LoopStatus::Stopped;
                break;
            }

            // -- Primary turn: A and B alternate per pair --
            let node_id = if Agent::is_agent_a(step) {
                AGENT_A_NODE
            } else {
                AGENT_B_NODE
            };
            let Some(node) = self.graph.node(node_id) else {
                status = self
                    .fail(
                        &mut display,
                        None,
                        GraphError::MissingNode(node_id.to_string()).to_string(),
                    )
                    .await;
                break;
            };

            let (provider, model) = self.roster.primary(step);
            let agent = Agent::new(
                Agent::name_for_step(step),
                provider,
                model,
                prompt::agent_system_prompt(&node.data.label),
            );
            self.emit(LoopEvent::StepStarted {
                step,
                agent: agent.name.clone(),
                model: agent.model.clone(),
            })
            .await;

            let prior = if display.is_empty() {
                prompt::NO_PRIOR_CONTEXT.to_string()
            } else {
                prompt::format_prior_context(&display)
            };
            let user_prompt = prompt::compose_step_prompt(node, &prior, seed_prompt, &last_response);

            let text = match self.stream_turn(&agent, &user_prompt).await {
                Ok(text) => text,
                Err(err) if err.is_cancelled() => {
                    info!(step, "Loop stopped");
                    status = LoopStatus::Stopped;
                    break;
                }
                Err(err) => {
                    status = self
                        .fail(&mut display, Some(&agent.name), err.to_string())
                        .await;
                    break;
                }
            };

            let structured = extract_trailing_json(&text);
            let message = Message::new(&agent.name, &agent.model, &text, structured);
            display.push(message.clone());
            self.emit(LoopEvent::Turn { message }).await;

            if self.cancel.is_cancelled() {
                status = LoopStatus::Stopped;
                break;
            }

            // -- Reflector turn: always processes immediately after --
            let Some(reflector_node) = self.graph.node(REFLECTOR_NODE) else {
                status = self
                    .fail(
                        &mut display,
                        None,
                        GraphError::MissingNode(REFLECTOR_NODE.to_string()).to_string(),
                    )
                    .await;
                break;
            };

            let memory_context = session.memory().prompt_context();
            let reflector = Agent::new(
                prompt::REFLECTOR_AGENT_NAME,
                self.roster.reflector_provider,
                &self.roster.reflector_model,
                prompt::reflector_system_prompt(&memory_context),
            );
            self.emit(LoopEvent::StepStarted {
                step,
                agent: reflector.name.clone(),
                model: reflector.model.clone(),
            })
            .await;

            let prior = prompt::format_prior_context(&display);
            let reflector_prompt =
                prompt::compose_step_prompt(reflector_node, &prior, seed_prompt, &text);

            let reflection = match self.stream_turn(&reflector, &reflector_prompt).await {
                Ok(text) => text,
                Err(err) if err.is_cancelled() => {
                    info!(step, "Loop stopped");
                    status = LoopStatus::Stopped;
                    break;
                }
                Err(err) => {
                    status = self
                        .fail(&mut display, Some(&reflector.name), err.to_string())
                        .await;
                    break;
                }
            };

            let structured = extract_trailing_json(&reflection);
            if let Some(value) = &structured {
                let delta = MemoryDelta::from_structured(value);
                if !delta.is_empty() {
                    debug!(
                        cycle = delta.cycle.is_some(),
                        heuristics = delta.heuristics.len(),
                        "Applying reflector memory update"
                    );
                    session.apply(delta);
                }
            }

            let message = Message::new(&reflector.name, &reflector.model, &reflection, structured);
            display.push(message.clone());
            self.emit(LoopEvent::Turn { message }).await;

            // The reflector's raw text feeds the next primary agent.
            last_response = reflection;
            step += 1;
        }

        self.finish(status, step, seed_prompt, display).await
    }

    /// One streaming LLM call. Snapshots are forwarded as events; the final
    /// accumulated text is returned.
    async fn stream_turn(&self, agent: &Agent, input: &str) -> Result<String, ProviderError> {
        let provider = self.providers.get(agent.provider)?;
        let request = ChatRequest {
            model: agent.model.clone(),
            system_prompt: agent.system_prompt.clone(),
            history: Vec::new(),
            input: input.to_string(),
            temperature: self.settings.temperature,
        };

        let mut stream = provider.stream(request, self.cancel.clone()).await?;

        // Seed the streaming buffer so the turn shows up before the first
        // token lands.
        self.emit(LoopEvent::StreamSnapshot {
            agent: agent.name.clone(),
            model: agent.model.clone(),
            text: String::new(),
        })
        .await;

        let mut text = String::new();
        while let Some(update) = stream.next().await {
            let update = update?;
            text = update.text;
            self.emit(LoopEvent::StreamSnapshot {
                agent: agent.name.clone(),
                model: agent.model.clone(),
                text: text.clone(),
            })
            .await;
        }

        Ok(text)
    }

    /// Record a step failure: a visible System row plus the UI error slot.
    /// The slot names the failing agent; the row carries the bare error.
    /// There are no retries; the run is over.
    async fn fail(
        &self,
        display: &mut Vec<Message>,
        agent: Option<&str>,
        error: String,
    ) -> LoopStatus {
        let slot = match agent {
            Some(name) => format!("Error in {name}: {error}"),
            None => error.clone(),
        };
        warn!(message = %slot, "Loop step failed");
        let row = Message::system_error(format!("Error: {error}"));
        display.push(row.clone());
        self.emit(LoopEvent::Turn { message: row }).await;
        self.emit(LoopEvent::Error { message: slot }).await;
        LoopStatus::Errored
    }

    async fn finish(
        &self,
        status: LoopStatus,
        steps: u32,
        seed_prompt: &str,
        messages: Vec<Message>,
    ) -> LoopOutcome {
        info!(?status, steps, "Loop finished");
        self.emit(LoopEvent::Finished { status, steps }).await;

        if !messages.is_empty() {
            self.persist_transcript(seed_prompt, &messages).await;
        }

        LoopOutcome {
            status,
            steps,
            messages,
        }
    }

    /// Best-effort save of the finished conversation. Failures are logged
    /// and do not affect the run's perceived success.
    async fn persist_transcript(&self, seed_prompt: &str, messages: &[Message]) {
        let transcript = Transcript {
            seed_prompt: seed_prompt.to_string(),
            model_a: self.roster.model_a.clone(),
            provider_a: self.roster.provider_a,
            model_b: self.roster.model_b.clone(),
            provider_b: self.roster.provider_b,
            messages: messages.to_vec(),
            timestamp: Utc::now(),
        };

        if let Err(err) = self.transcripts.save(&transcript).await {
            warn!(error = %err, "Failed to save loop conversation");
        }
    }

    async fn emit(&self, event: LoopEvent) {
        // A dropped receiver must never halt the loop.
        let _ = self.events.send(event).await;
    }
}
