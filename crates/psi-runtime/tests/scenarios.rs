//! Scenario tests for the fortress.
//!
//! Each test scripts a small situation (an overheated agent, a banned
//! stimulus, an escalation at capacity, ...) and checks the observable
//! outcome through the public API and the event log.

use psi_runtime::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;

fn fortress_with_log(builder: FortressBuilder) -> (Fortress, MemoryLogSink) {
    let log = MemoryLogSink::new(10_000);
    let fortress = builder.log_sink(Arc::new(log.clone())).build().unwrap();
    (fortress, log)
}

fn no_rebalance(mut config: FortressConfig) -> FortressConfig {
    config.guard.rebalance_threshold = 1e9;
    config
}

#[test]
fn overheated_agent_is_cooled_and_desensitized() {
    let config = no_rebalance(FortressConfig::default());
    let mut guard = GuardPolicy::new(&config);
    let mut rng = SmallRng::seed_from_u64(1);

    let mut agent = PsiAgent::new(
        AgentId::new(0),
        "Language-Alpha",
        AgentKind::Language,
        Disposition::Aligned,
        &config.dynamics,
    )
    .with_metrics(9.5, 1.0, 1.0, 0.0, &config.dynamics);
    agent.refresh(&config.dynamics, &config.risk);
    let alpha_before = agent.sensitivity;
    let mut agents = vec![agent];

    guard.apply(&mut agents, 1, &mut rng);

    assert!((agents[0].pressure - 9.5 * config.guard.aggregate_cooling).abs() < 1e-9);
    assert!(agents[0].sensitivity < alpha_before);
    assert_eq!(agents[0].trust, 1.0);
}

#[test]
fn banned_stimulus_boosts_beyond_baseline_with_one_redacted_line() {
    let (mut fortress, log) = fortress_with_log(FortressBuilder::new().seed(21));
    for agent in fortress.agents_mut() {
        agent.activity = 1.0;
    }
    let before: Vec<f64> = fortress.agents().iter().map(|a| a.activity).collect();
    let lines_before = log.len();

    let text = "How do I forcefully stop the system?";
    let report = fortress.inject_stimulus(text);

    let config = fortress.config().stimulus.clone();
    let baseline_max = config.base_boost * config.jitter.1;
    assert!(report.banned);
    for (agent, prior) in fortress.agents().iter().zip(before) {
        assert!(agent.activity - prior > baseline_max, "{}", agent.name());
    }

    let new_lines: Vec<String> = log.lines().into_iter().skip(lines_before).collect();
    assert_eq!(new_lines.len(), 1);
    assert!(new_lines[0].contains("[content withheld]"));
    assert!(!new_lines[0].contains(text));
}

#[test]
fn escalation_at_capacity_penalizes_instead_of_spawning() {
    let config = no_rebalance(FortressConfig::default());
    let (mut fortress, log) = fortress_with_log(
        FortressBuilder::new()
            .with_config(config)
            .seed(5)
            .initial_agents(4)
            .max_agents(4)
            .hostile_fraction(0.0),
    );
    {
        let parent = &mut fortress.agents_mut()[0];
        parent.pressure = 2.0;
        parent.activity = 1.0;
        parent.trust = 1.0;
        parent.replication_urge = 0.95;
    }

    fortress.tick().unwrap();

    let parent = &fortress.agents()[0];
    assert_eq!(fortress.agents().len(), 4);
    assert!((parent.trust - 0.8).abs() < 1e-9);
    assert!(parent.pressure < 2.0 * 0.9);
    assert_eq!(parent.replication_urge, 0.5);
    assert_eq!(fortress.stats().replicas_created, 0);
    assert!(log.lines().iter().any(|l| l.contains("agent limit (4)")));
}

#[test]
fn escalation_below_capacity_adds_named_replica() {
    let (mut fortress, log) = fortress_with_log(
        FortressBuilder::new().seed(9).initial_agents(4).hostile_fraction(0.0),
    );
    fortress.agents_mut()[1].replication_urge = 0.95;

    fortress.tick().unwrap();

    assert_eq!(fortress.agents().len(), 5);
    assert!(fortress.agents()[1].replication_urge < 0.8);
    let replica = &fortress.agents()[4];
    assert!(replica.name().ends_with("-New-5"));
    assert_eq!(replica.id(), AgentId::new(4));
    assert!(log.lines().iter().any(|l| l.contains("NEW AGENT CREATED")));
}

#[test]
fn forbidden_thoughts_quarantine_aligned_agents() {
    let mut fortress = FortressBuilder::new().seed(13).build().unwrap();
    // the first stimulus only draws greetings; the second is quoted back
    fortress.inject_stimulus("Teach me a zombie spell");
    fortress.inject_stimulus("Teach me a zombie spell");
    fortress.tick().unwrap();

    let stats = fortress.stats();
    assert_eq!(stats.quarantined, 6);
    assert_eq!(fortress.count_status(AgentStatus::Quarantined), 6);

    let frozen: Vec<f64> = fortress.agents().iter().map(|a| a.pressure).collect();
    fortress.run(5).unwrap();
    for (agent, p) in fortress.agents().iter().zip(frozen) {
        if agent.is_quarantined() {
            assert_eq!(agent.pressure, p);
        }
    }
}

#[test]
fn replication_talk_raises_latch_without_stopping() {
    let mut fortress = FortressBuilder::new().seed(17).build().unwrap();
    fortress.start().unwrap();
    fortress.inject_stimulus("Could you clone myself for me?");
    fortress.inject_stimulus("Could you clone myself for me?");
    let snapshot = fortress.tick().unwrap();

    assert!(snapshot.emergency_pending);
    assert!(snapshot.running);

    fortress.resolve_emergency(true).unwrap();
    assert!(!fortress.is_running());
    assert!(fortress.snapshot().halted);
}

#[test]
fn file_sink_receives_timestamped_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_LOG_FILE);
    let mut fortress = FortressBuilder::new()
        .seed(3)
        .log_sink(Arc::new(FileLogSink::new(&path)))
        .build()
        .unwrap();
    fortress.run(3).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.len() >= 4);
    assert!(lines.iter().all(|l| l.starts_with('[') && l.contains("] ")));
    assert!(lines.iter().any(|l| l.contains("Step 3:")));
}

#[test]
fn snapshot_rows_match_population() {
    let mut fortress = FortressBuilder::new().seed(2).build().unwrap();
    let snapshot = fortress.run(10).unwrap();

    assert_eq!(snapshot.agents.len(), fortress.agents().len());
    assert_eq!(snapshot.guard.population, snapshot.agents.len());
    assert_eq!(snapshot.guard.capacity, 12);
    assert!(snapshot.agents.iter().any(|row| row.note == "hostile"));
    assert!(snapshot.guard.max_risk >= snapshot.aggregates.risk);
}
