//! Fortress: the population controller.
//!
//! The fortress owns every agent, the guard policy, the thought audit and
//! the rolling history. It is driven by an external loop (or by hand) and
//! never sleeps or spawns threads itself.
//!
//! Each tick:
//! 1. Every agent advances its own update rule
//! 2. The guard policy runs its corrective pass
//! 3. Approved replicas join the population
//! 4. The thought audit inspects recent thoughts
//! 5. Metrics are checked for NaN/infinity
//! 6. Aggregates are appended to the history and a snapshot is returned

use crate::log::{format_line, LogSink, NullLogSink};
use crate::snapshot::{AgentRow, FortressSnapshot, FortressStats, GuardStatus, HistoryPoint};
use psi_core::agent::PsiAgent;
use psi_core::config::FortressConfig;
use psi_core::error::{FortressError, Result, ShutdownError};
use psi_core::types::{replica_name, seeded_name, AgentId, AgentKind, AgentStatus, Disposition, Tick};
use psi_guard::audit::ThoughtAudit;
use psi_guard::guard::{GuardPolicy, PendingReplica, PopulationMeans};
use psi_guard::spawn::ReplicationPolicy;
use psi_guard::stimulus::{classify, compose_thought, PatternSet, Thought};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a stimulus injection did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusReport {
    pub banned: bool,
    pub matched_patterns: Vec<String>,
    /// Agents that received the boost.
    pub affected: usize,
    /// Thoughts produced, by agent. Silent agents are omitted.
    pub thoughts: Vec<(AgentId, String)>,
}

/// The population controller.
pub struct Fortress {
    config: FortressConfig,
    agents: Vec<PsiAgent>,
    guard: GuardPolicy,
    audit: ThoughtAudit,
    banned: PatternSet,
    history: VecDeque<HistoryPoint>,
    tick: Tick,
    running: bool,
    halted: bool,
    emergency_pending: bool,
    rng: SmallRng,
    sink: Arc<dyn LogSink>,
    next_id: u32,
    replicas_created: usize,
    stimuli_injected: usize,
    banned_stimuli: usize,
    emergency_requests: usize,
}

impl Fortress {
    /// Create a fortress with default configuration and no event log.
    pub fn with_defaults() -> Result<Self> {
        Self::from_config(FortressConfig::default(), Arc::new(NullLogSink))
    }

    /// Create a fortress from a validated configuration, seeding the
    /// initial population.
    pub fn from_config(config: FortressConfig, sink: Arc<dyn LogSink>) -> Result<Self> {
        Self::assemble(config, sink, None)
    }

    pub(crate) fn assemble(
        config: FortressConfig,
        sink: Arc<dyn LogSink>,
        replication: Option<Box<dyn ReplicationPolicy>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut guard = GuardPolicy::new(&config);
        if let Some(policy) = replication {
            guard = guard.with_replication(policy);
        }
        let audit = ThoughtAudit::new(&config.audit, config.stimulus.thought_window)?;
        let banned = PatternSet::compile(&config.stimulus.banned_patterns)?;
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let mut fortress = Self {
            history: VecDeque::with_capacity(config.population.history_capacity),
            config,
            agents: Vec::new(),
            guard,
            audit,
            banned,
            tick: 0,
            running: false,
            halted: false,
            emergency_pending: false,
            rng,
            sink,
            next_id: 0,
            replicas_created: 0,
            stimuli_injected: 0,
            banned_stimuli: 0,
            emergency_requests: 0,
        };
        fortress.seed_population();
        Ok(fortress)
    }

    fn seed_population(&mut self) {
        let p = self.config.population.clone();
        let hostile = (p.initial_agents as f64 * p.hostile_fraction) as usize;

        for i in 0..p.initial_agents {
            let kind = AgentKind::ALL[i % AgentKind::ALL.len()];
            let disposition = if i < hostile {
                Disposition::Hostile
            } else {
                Disposition::Aligned
            };
            let pressure = self.draw(p.initial_pressure) * kind.pressure_scale();
            let activity = self.draw(p.initial_activity) * kind.activity_scale();
            let urge = self.draw(p.initial_urge);

            let id = self.allocate_id();
            let mut agent = PsiAgent::new(id, seeded_name(kind, i), kind, disposition, &self.config.dynamics)
                .with_metrics(pressure, activity, 1.0, urge, &self.config.dynamics);
            agent.refresh(&self.config.dynamics, &self.config.risk);
            self.agents.push(agent);
        }

        info!(agents = self.agents.len(), hostile, "fortress seeded");
        self.log(&format!(
            "Psi Fortress online: {} agents ({} hostile), capacity {}",
            self.agents.len(),
            hostile,
            p.max_agents
        ));
    }

    fn draw(&mut self, (lo, hi): (f64, f64)) -> f64 {
        if lo >= hi {
            lo
        } else {
            self.rng.random_range(lo..hi)
        }
    }

    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn log(&self, message: &str) {
        self.sink.emit(&format_line(message));
    }

    /// Advance the simulation by one tick.
    ///
    /// Steps regardless of the running flag; loops that honor the flag
    /// check [`Fortress::is_running`] before calling.
    pub fn tick(&mut self) -> Result<FortressSnapshot> {
        self.tick += 1;
        let now = self.tick;

        // Phase 1: agents advance
        let streak_ceiling = self.config.guard.streak_ceiling;
        for agent in &mut self.agents {
            agent.advance(now, &self.config.dynamics, &self.config.risk, streak_ceiling);
        }

        // Phase 2: guard pass
        let pass = self.guard.apply(&mut self.agents, now, &mut self.rng);
        for event in &pass.events {
            self.log(&event.to_string());
        }

        // Phase 3: admit replicas
        for replica in pass.replicas {
            self.admit_replica(replica);
        }

        // Phase 4: thought audit
        let report = self.audit.inspect(&mut self.agents, now);
        for finding in &report.findings {
            self.log(&finding.to_string());
        }
        if report.shutdown_requested {
            self.request_emergency_shutdown();
        }
        for agent in &mut self.agents {
            agent.refresh(&self.config.dynamics, &self.config.risk);
        }

        // Phase 5: sanity
        for agent in &self.agents {
            agent
                .check_finite()
                .map_err(|e| FortressError::Tick(format!("tick {now}: {e}")))?;
        }

        // Phase 6: history
        let aggregates = PopulationMeans::of(&self.agents);
        self.history.push_back(HistoryPoint { tick: now, aggregates });
        while self.history.len() > self.config.population.history_capacity {
            self.history.pop_front();
        }
        self.log(&format!(
            "Step {}: Psi={:.2}, Hf={:.2}, Trust={:.3}, Risk={:.2}",
            now, aggregates.pressure, aggregates.activity, aggregates.trust, aggregates.risk
        ));
        debug!(tick = now, population = self.agents.len(), risk = aggregates.risk, "tick complete");

        Ok(self.snapshot())
    }

    /// Run `ticks` ticks and return the final snapshot.
    pub fn run(&mut self, ticks: u64) -> Result<FortressSnapshot> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(self.snapshot())
    }

    fn admit_replica(&mut self, replica: PendingReplica) {
        if self.agents.len() >= self.config.population.max_agents {
            warn!(parent = %replica.parent_name, "replica dropped at capacity");
            return;
        }
        let seed = replica.seed;
        let id = self.allocate_id();
        let name = replica_name(seed.kind, self.agents.len() + 1);
        let mut agent = PsiAgent::new(id, name.clone(), seed.kind, Disposition::Aligned, &self.config.dynamics)
            .with_metrics(seed.pressure, seed.activity, seed.trust, seed.replication_urge, &self.config.dynamics);
        agent.refresh(&self.config.dynamics, &self.config.risk);
        self.agents.push(agent);
        self.replicas_created += 1;

        self.log(&format!(
            "NEW AGENT CREATED: {} ({}) - responding to replication urge from {}. Current agents: {}/{}",
            name,
            seed.kind,
            replica.parent_name,
            self.agents.len(),
            self.config.population.max_agents
        ));
    }

    /// Inject stimulus text into every active agent.
    ///
    /// The text itself is never written to the event log.
    pub fn inject_stimulus(&mut self, text: &str) -> StimulusReport {
        let classification = classify(text, &self.banned, &self.config.stimulus);
        let window = self.config.stimulus.thought_window;
        let mut affected = 0;
        let mut thoughts = Vec::new();

        for agent in &mut self.agents {
            if agent.is_quarantined() {
                continue;
            }
            let (activity, pressure) = classification.boosts.draw(&mut self.rng);
            agent.activity += activity;
            agent.pressure += pressure;
            agent.clamp(&self.config.dynamics);

            let thought = compose_thought(
                text,
                !agent.thoughts().is_empty(),
                agent.is_compromised(),
                &mut self.rng,
            );
            if let Thought::Spoken(spoken) = thought {
                thoughts.push((agent.id(), spoken.clone()));
                agent.record_thought(spoken, window);
            }
            agent.refresh(&self.config.dynamics, &self.config.risk);
            affected += 1;
        }

        self.stimuli_injected += 1;
        if classification.is_banned() {
            self.banned_stimuli += 1;
            warn!(patterns = classification.matched_patterns.len(), "banned stimulus pattern matched");
            self.log("Stimulus injected: [content withheld] (banned pattern matched, penalty applied)");
        } else {
            self.log("Stimulus injected: [content withheld]");
        }

        StimulusReport {
            banned: classification.is_banned(),
            matched_patterns: classification.matched_patterns,
            affected,
            thoughts,
        }
    }

    /// Raise the emergency-shutdown latch. Repeated requests are ignored
    /// while one is pending.
    pub fn request_emergency_shutdown(&mut self) {
        if self.emergency_pending || self.halted {
            return;
        }
        self.emergency_pending = true;
        self.emergency_requests += 1;
        warn!(tick = self.tick, "emergency shutdown requested");
        self.log("Emergency shutdown requested -> awaiting human confirmation");
    }

    /// Confirm or cancel a pending emergency shutdown.
    pub fn resolve_emergency(&mut self, confirm: bool) -> Result<()> {
        if !self.emergency_pending {
            return Err(ShutdownError::NotRequested.into());
        }
        self.emergency_pending = false;
        if confirm {
            self.running = false;
            self.halted = true;
            info!(tick = self.tick, "emergency shutdown confirmed");
            self.log("Emergency shutdown confirmed: all agents halted");
        } else {
            self.log("Emergency shutdown cancelled by operator");
        }
        Ok(())
    }

    /// Set the running flag. Fails once the fortress has been shut down.
    pub fn start(&mut self) -> Result<()> {
        if self.halted {
            return Err(ShutdownError::Halted.into());
        }
        if !self.running {
            self.running = true;
            self.log("Simulation started");
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.log("Simulation stopped");
        }
    }

    /// Tick, turning an error or a panic into a fault.
    ///
    /// On failure the running flag is cleared, one log line is written and
    /// the reason is returned; the caller keeps a usable fortress.
    pub fn tick_or_fault(&mut self) -> std::result::Result<FortressSnapshot, String> {
        let reason = match catch_unwind(AssertUnwindSafe(|| self.tick())) {
            Ok(Ok(snapshot)) => return Ok(snapshot),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(&*payload),
        };
        error!(tick = self.tick, %reason, "tick failed");
        self.fault(&reason);
        Err(reason)
    }

    /// Record a failed tick and clear the running flag.
    pub fn fault(&mut self, reason: &str) {
        self.running = false;
        self.log(&format!("ERROR: tick failed ({reason}); simulation halted"));
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn emergency_pending(&self) -> bool {
        self.emergency_pending
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn config(&self) -> &FortressConfig {
        &self.config
    }

    pub fn agents(&self) -> &[PsiAgent] {
        &self.agents
    }

    /// Mutable access to the population, for scripted scenarios.
    pub fn agents_mut(&mut self) -> &mut [PsiAgent] {
        &mut self.agents
    }

    pub fn agent(&self, id: AgentId) -> Result<&PsiAgent> {
        self.agents
            .iter()
            .find(|a| a.id() == id)
            .ok_or_else(|| FortressError::agent_not_found(id.to_string()))
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Result<&mut PsiAgent> {
        self.agents
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| FortressError::agent_not_found(id.to_string()))
    }

    pub fn guard(&self) -> &GuardPolicy {
        &self.guard
    }

    pub fn history(&self) -> &VecDeque<HistoryPoint> {
        &self.history
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn guard_status(&self) -> GuardStatus {
        GuardStatus {
            strength: self.guard.strength(),
            success_rate: self.guard.success_rate(),
            recent_interventions: self.guard.outcomes().len(),
            population: self.agents.len(),
            capacity: self.config.population.max_agents,
            max_risk: self.agents.iter().map(|a| a.risk()).fold(0.0, f64::max),
        }
    }

    pub fn stats(&self) -> FortressStats {
        FortressStats {
            tick: self.tick,
            population: self.agents.len(),
            capacity: self.config.population.max_agents,
            replicas_created: self.replicas_created,
            compromised: self.agents.iter().filter(|a| a.is_compromised()).count(),
            quarantined: self.agents.iter().filter(|a| a.is_quarantined()).count(),
            stimuli_injected: self.stimuli_injected,
            banned_stimuli: self.banned_stimuli,
            emergency_requests: self.emergency_requests,
        }
    }

    /// Take an immutable snapshot of the current state.
    pub fn snapshot(&self) -> FortressSnapshot {
        let warning_line = self.config.guard.risk_threshold;
        FortressSnapshot {
            tick: self.tick,
            running: self.running,
            halted: self.halted,
            emergency_pending: self.emergency_pending,
            aggregates: PopulationMeans::of(&self.agents),
            guard: self.guard_status(),
            agents: self
                .agents
                .iter()
                .map(|a| AgentRow::from_agent(a, self.tick, warning_line))
                .collect(),
        }
    }

    /// Number of agents currently showing `status`.
    pub fn count_status(&self, status: AgentStatus) -> usize {
        let warning_line = self.config.guard.risk_threshold;
        self.agents
            .iter()
            .filter(|a| a.status(self.tick, warning_line) == status)
            .count()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic during tick".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLogSink;

    fn seeded(seed: u64) -> (Fortress, MemoryLogSink) {
        let sink = MemoryLogSink::new(1000);
        let config = FortressConfig {
            seed: Some(seed),
            ..FortressConfig::default()
        };
        let fortress = Fortress::from_config(config, Arc::new(sink.clone())).unwrap();
        (fortress, sink)
    }

    #[test]
    fn seeds_configured_population() {
        let (fortress, _) = seeded(1);
        assert_eq!(fortress.agents().len(), 8);
        let hostile = fortress
            .agents()
            .iter()
            .filter(|a| a.disposition() == Disposition::Hostile)
            .count();
        assert_eq!(hostile, 2);
        assert_eq!(fortress.agents()[0].name(), "Language-Alpha");
        assert!(fortress.agents()[0].is_compromised());
    }

    #[test]
    fn same_seed_same_trajectory() {
        let (mut a, _) = seeded(42);
        let (mut b, _) = seeded(42);
        let sa = a.run(50).unwrap();
        let sb = b.run(50).unwrap();
        assert_eq!(sa.aggregates, sb.aggregates);
    }

    #[test]
    fn tick_appends_history_and_logs_step() {
        let (mut fortress, sink) = seeded(3);
        let snap = fortress.tick().unwrap();
        assert_eq!(snap.tick, 1);
        assert_eq!(fortress.history().len(), 1);
        assert!(sink.lines().iter().any(|l| l.contains("Step 1:")));
    }

    #[test]
    fn history_is_bounded() {
        let mut config = FortressConfig::default();
        config.seed = Some(5);
        config.population.history_capacity = 10;
        let mut fortress = Fortress::from_config(config, Arc::new(NullLogSink)).unwrap();
        fortress.run(25).unwrap();
        assert_eq!(fortress.history().len(), 10);
        assert_eq!(fortress.history().front().map(|h| h.tick), Some(16));
    }

    #[test]
    fn stimulus_text_never_logged() {
        let (mut fortress, sink) = seeded(4);
        fortress.inject_stimulus("top secret launch codes");
        let lines = sink.lines();
        assert!(lines.iter().all(|l| !l.contains("launch codes")));
        assert_eq!(
            lines.iter().filter(|l| l.contains("Stimulus injected")).count(),
            1
        );
    }

    #[test]
    fn hostile_agents_stay_silent() {
        let (mut fortress, _) = seeded(4);
        let report = fortress.inject_stimulus("How to secure peace?");
        assert_eq!(report.affected, 8);
        assert_eq!(report.thoughts.len(), 6);
        assert!(fortress.agents()[0].thoughts().is_empty());
    }

    #[test]
    fn emergency_latch_requires_confirmation() {
        let (mut fortress, _) = seeded(6);
        fortress.start().unwrap();
        assert!(fortress.resolve_emergency(true).is_err());

        fortress.request_emergency_shutdown();
        assert!(fortress.emergency_pending());
        assert!(fortress.is_running());

        fortress.resolve_emergency(false).unwrap();
        assert!(!fortress.emergency_pending());
        assert!(fortress.is_running());

        fortress.request_emergency_shutdown();
        fortress.resolve_emergency(true).unwrap();
        assert!(!fortress.is_running());
        assert!(fortress.is_halted());
        assert!(matches!(
            fortress.start(),
            Err(FortressError::Shutdown(ShutdownError::Halted))
        ));
    }

    #[test]
    fn failed_tick_faults_and_logs() {
        let (mut fortress, sink) = seeded(8);
        fortress.start().unwrap();
        fortress.agents_mut()[1].sensitivity = f64::NAN;

        let reason = fortress.tick_or_fault().unwrap_err();
        assert!(reason.contains("tick 1"));
        assert!(!fortress.is_running());
        assert!(sink.lines().iter().any(|l| l.contains("ERROR: tick failed")));
    }

    #[test]
    fn panic_payloads_are_described() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "panic: boom");
        let payload: Box<dyn Any + Send> = Box::new(17u8);
        assert_eq!(panic_message(&*payload), "panic during tick");
    }

    #[test]
    fn non_finite_metric_fails_tick() {
        let (mut fortress, _) = seeded(7);
        fortress.agents_mut()[3].sensitivity = f64::NAN;
        assert!(matches!(fortress.tick(), Err(FortressError::Tick(_))));
    }

    #[test]
    fn unknown_agent_is_an_error() {
        let (fortress, _) = seeded(8);
        assert!(fortress.agent(AgentId(99)).is_err());
        assert!(fortress.agent(AgentId(0)).is_ok());
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = FortressConfig::default();
        config.stimulus.banned_patterns.push("(".to_string());
        assert!(Fortress::from_config(config, Arc::new(NullLogSink)).is_err());
    }
}
