//! End-to-end runs over a small corpus on disk.

use std::path::Path;

use tempfile::TempDir;

use rostrum::adapters::FileTagProvider;
use rostrum::config::{builtin_debates, ResolvedConfig, SourceTemplates};
use rostrum::core::{AggregationSettings, Orchestrator, RunLog};
use rostrum::domain::{DebateStatus, Document, EventType, RunState};

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn test_config(root: &Path) -> ResolvedConfig {
    ResolvedConfig {
        home: root.join("home"),
        data: root.join("corpus"),
        output: root.join("out"),
        config_file: None,
        sources: SourceTemplates::default(),
        moderators: AggregationSettings::default().moderators,
        sentence_delimiter: ". ".to_string(),
        debates: builtin_debates(),
    }
}

/// A complete debate for 2019-04-22 and an incomplete one for 2019-04-23
fn write_corpus(config: &ResolvedConfig) {
    let paths = config.source_paths("2019-04-22");

    write(
        &paths.segments,
        concat!(
            r#"{"inicio":"00:00:00.000000","fin":"00:00:29.000000","nombre":"MODERADOR","partido_nombre":null,"texto":"Buenas noches. Empezamos el debate","TTR":0.7}"#,
            "\n",
            r#"{"inicio":"00:00:30.000000","nombre":"Ana","partido_nombre":"Partido A","texto":"Necesitamos una reforma. Ya","TTR":0.5,"STOP_RATIO":0.4}"#,
            "\n",
            r#"{"inicio":"00:02:10.000000","nombre":"Luis","partido_nombre":"Partido B","texto":"No estoy de acuerdo","TTR":0.6}"#,
            "\n",
            r#"{"inicio":"00:02:40.000000","nombre":"Ana","partido_nombre":"Partido A","texto":"Necesitamos una reforma","TTR":0.7}"#,
            "\n",
        ),
    );
    write(
        &paths.speakers,
        concat!(
            r#"{"speaker_name":"MODERADOR"}"#,
            "\n",
            r#"{"speaker_name":"Ana","TTR":0.6}"#,
            "\n",
            r#"{"speaker_name":"Luis","TTR":0.6}"#,
            "\n",
        ),
    );
    write(
        &paths.blocks,
        "<BLOQUE titulo=\"Economía\" tiempo=\"00:00.000\">\n<BLOQUE titulo=\"Sanidad\" tiempo=\"02:00.000\">\n",
    );
    write(
        &paths.topics,
        "<TEMA titulo=\"Paro\" tiempo=\"00:00.000\">\n<TEMA titulo=\"Hospitales\" tiempo=\"02:05.000\">\n",
    );
    write(
        &paths.mentions,
        "00:30.000\n<MENCION tipo=\"PER\" texto=\"Luis\">\n<MENCION tipo=\"PER\" texto=\"Luis\">\n<MENCION tipo=\"ORG\" texto=\"UE\">\n",
    );
    write(&paths.proposals, "02:40.000\n<PROPUESTA resumen=\"Bajar el IVA\">\n");
    write(
        &paths.claims,
        "00:30.000\n<REVISABLE afirmacion=\"We need reform\">\n02:40.000\n<REVISABLE afirmacion=\"We need reform\">\n00:00.000\n<REVISABLE afirmacion=\"Moderator claim\">\n",
    );
    write(
        &paths.emotions,
        "```xml\n<emotion int_id=\"i001\" sent_id=\"s0\" tags=\"ira, miedo\"/>\n<emotion int_id=\"i001\" sent_id=\"s1\" tags=\"ira\"/>\n```\n",
    );
    write(
        &paths.fallacies,
        "<fallacy int_id=\"i002\" category=\"ad hominem\">Usted miente</fallacy>\n",
    );

    let incomplete = config.source_paths("2019-04-23");
    write(&incomplete.segments, r#"{"inicio":"00:00.000","nombre":"Ana","texto":"Hola"}"#);
    write(&incomplete.speakers, r#"{"speaker_name":"Ana"}"#);
    write(&incomplete.blocks, "<BLOQUE titulo=\"Intro\" tiempo=\"00:00.000\">\n");
}

#[tokio::test]
async fn test_run_assembles_merges_and_aggregates() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    write_corpus(&config);

    let orchestrator = Orchestrator::new(config.clone());
    let dates = vec!["2019-04-23".to_string(), "2019-04-22".to_string()];
    let outcome = orchestrator.run(&dates).await.unwrap();

    // Missing sources skip the debate without failing the run
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].0, "2019-04-23");
    assert!(outcome.skipped[0].1.contains("topics"));
    assert_eq!(outcome.documents, vec![config.document_path("2019-04-22")]);

    let metrics = &outcome.metrics;
    assert_eq!(metrics.totals.debates, 1);
    assert_eq!(metrics.totals.blocks, 2);
    assert_eq!(metrics.totals.interventions, 4);
    assert_eq!(metrics.totals.words, 16);
    assert_eq!(metrics.totals.claims, 3);
    assert_eq!(metrics.totals.fallacies, 1);

    // A repeated claim keeps the latest origin and both counts
    let ana = &metrics.speakers["Ana"];
    assert_eq!(ana.interventions, 2);
    assert_eq!(ana.claims, 2);
    assert_eq!(ana.claims_texts.len(), 1);
    assert_eq!(ana.claims_texts["Ana: We need reform"].intervention_id, "i003");
    assert!(ana.proposals_texts.contains_key("Ana: Bajar el IVA"));
    assert_eq!(ana.emotions["ira"], 2);
    assert_eq!(ana.emotions["miedo"], 1);
    assert_eq!(ana.intervention_emotions["2019-04-22"]["i001"]["ira"], 2);

    let moderator = &metrics.speakers["MODERADOR"];
    assert_eq!(moderator.claims, 1);
    assert!(moderator.claims_texts.is_empty());
    assert!(metrics.parties["No party"].participants.contains("MODERADOR"));

    let luis = &metrics.speakers["Luis"];
    assert!(luis.fallacies_texts.contains_key("Luis (ad hominem): Usted miente"));

    let debate = &metrics.debates["2019-04-22"];
    let mentions = &debate.intervention_mentions["2019-04-22"]["i001"];
    let kinds: Vec<&str> = mentions.iter().map(|m| m.kind.as_str()).collect();
    assert_eq!(kinds, vec!["ORG", "PER"]);
    assert_eq!(debate.topics["Hospitales"].speakers, vec!["Luis", "Ana"]);

    let info = &metrics.debate_info["2019-04-22"];
    assert_eq!(info.media, "RTVE");
    assert_eq!(info.blocks_info[1].intervention_count, 2);

    // Cross-scope totals agree
    for (party_key, party) in &metrics.parties {
        let from_speakers: usize = party
            .participants
            .iter()
            .map(|speaker| metrics.speakers[speaker].interventions)
            .sum();
        assert_eq!(from_speakers, party.interventions, "party {}", party_key);
    }
    let from_debates: usize = metrics.debates.values().map(|d| d.interventions).sum();
    assert_eq!(from_debates, metrics.totals.interventions);

    // The stored document carries the merged annotations
    let stored = Document::load(&config.document_path("2019-04-22")).await.unwrap();
    let first_turn = stored.interventions().nth(1).unwrap();
    assert_eq!(first_turn.sentences[0].emotions.as_deref(), Some("ira, miedo"));
    assert_eq!(stored.interventions().nth(2).unwrap().fallacies.len(), 1);

    for name in ["debates.json", "speakers.json", "parties.json", "totals.json"] {
        assert!(config.metrics_dir().join(name).exists(), "{} missing", name);
    }

    // The run log replays to the same outcome
    let runs = RunLog::list_runs_in(&config.runs_dir()).await.unwrap();
    assert_eq!(runs, vec![outcome.run_id]);
    let summary = RunLog::open_in(&config.runs_dir(), outcome.run_id)
        .await
        .unwrap()
        .summary()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.debates["2019-04-22"], DebateStatus::Aggregated);
    assert_eq!(summary.debates["2019-04-23"], DebateStatus::Skipped);
}

#[tokio::test]
async fn test_aggregate_stored_matches_run() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    write_corpus(&config);

    let orchestrator = Orchestrator::new(config.clone());
    let outcome = orchestrator.run(&["2019-04-22".to_string()]).await.unwrap();

    let stored = orchestrator.aggregate_stored(&config.documents_dir()).await.unwrap();
    assert_eq!(stored.totals, outcome.metrics.totals);
    assert_eq!(
        stored.speakers.keys().collect::<Vec<_>>(),
        outcome.metrics.speakers.keys().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_rerun_is_stable() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    write_corpus(&config);

    let orchestrator = Orchestrator::new(config.clone());
    let dates = vec!["2019-04-22".to_string()];

    orchestrator.run(&dates).await.unwrap();
    let first = Document::load(&config.document_path("2019-04-22")).await.unwrap();
    orchestrator.run(&dates).await.unwrap();
    let second = Document::load(&config.document_path("2019-04-22")).await.unwrap();

    assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    assert_eq!(RunLog::list_runs_in(&config.runs_dir()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_classifier_response_costs_only_the_merge() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    write_corpus(&config);
    let responses = temp.path().join("responses");
    std::fs::create_dir_all(&responses).unwrap();

    let orchestrator = Orchestrator::new(config.clone())
        .with_provider(Box::new(FileTagProvider::new(responses)));
    let outcome = orchestrator.run(&["2019-04-22".to_string()]).await.unwrap();

    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.metrics.totals.debates, 1);
    assert_eq!(outcome.metrics.totals.interventions, 4);
    // Fallacies still merge from their own file
    assert_eq!(outcome.metrics.totals.fallacies, 1);
    assert!(outcome.metrics.totals.emotions.is_empty());
    assert!(config.metrics_dir().join("totals.json").exists());

    let log = RunLog::open_in(&config.runs_dir(), outcome.run_id).await.unwrap();
    let summary = log.summary().await.unwrap().unwrap();
    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.debates["2019-04-22"], DebateStatus::Aggregated);

    let events = log.replay().await.unwrap();
    let failed_merge = events
        .iter()
        .find(|e| e.event_type == EventType::EmotionsMerged)
        .unwrap();
    assert!(failed_merge.error.as_deref().unwrap().contains("2019-04-22.txt"));
}

#[tokio::test]
async fn test_aggregate_stored_skips_unreadable_documents() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    write_corpus(&config);

    let orchestrator = Orchestrator::new(config.clone());
    orchestrator.run(&["2019-04-22".to_string()]).await.unwrap();
    std::fs::write(config.documents_dir().join("debate-2019-11-01.json"), "{ not json").unwrap();

    let metrics = orchestrator.aggregate_stored(&config.documents_dir()).await.unwrap();
    assert_eq!(metrics.totals.debates, 1);
    assert_eq!(metrics.totals.interventions, 4);
    assert!(metrics.debates.contains_key("2019-04-22"));
    assert!(!metrics.debates.contains_key("2019-11-01"));
}
