//! Orchestrator behavior over in-memory collaborators.
//!
//! Tests run with paused tokio time: pacing holds and cooldowns complete
//! instantly while `Instant` still advances, so timing can be asserted exactly.

mod common;

use std::sync::Arc;
use std::time::Duration;

use applybot::testing::{MockAutomator, MockAutomatorCall, MockFetcher, MockGenerator};
use applybot::{
    ApplicationOrchestrator, ApplicationStatus, ApplicationStore, AutomationError,
    CoverLetterConfig, JitterRange, MemoryStore, RunError, SessionLimits, StopReason,
    SubmitOutcome, UserProfile,
};
use common::{config, limits, posting, postings, RecordingStore};
use tokio_util::sync::CancellationToken;

fn profile() -> UserProfile {
    UserProfile {
        full_name: "Ada Lovelace".into(),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_recruiter_scenario_records_two_jobs() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let fetcher = MockFetcher::new().with_postings(vec![
        posting("A", "ML Engineer"),
        posting("B", "Senior Recruiter"),
        posting("A", "ML Engineer"),
    ]);

    let orchestrator = ApplicationOrchestrator::new(
        store.clone(),
        automator.clone(),
        config().with_exclusions(["Recruiter"]),
    );
    let summary = orchestrator
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let records = store.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].job_id, "A");
    assert_eq!(records[0].status, ApplicationStatus::Applied);
    assert_eq!(records[1].job_id, "B");
    assert_eq!(records[1].status, ApplicationStatus::Skipped);
    assert!(records[1].notes.as_deref().unwrap().contains("Recruiter"));

    assert_eq!(automator.submitted(), vec!["A"]);
    assert_eq!(summary.applied(), 1);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_over_same_postings_is_noop() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3"]));

    let first = MockAutomator::new();
    ApplicationOrchestrator::new(store.clone(), first.clone(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let second = MockAutomator::new();
    let summary = ApplicationOrchestrator::new(store.clone(), second.clone(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(first.submitted().len(), 3);
    assert!(second.calls().is_empty(), "no session for an all-duplicate run");
    assert_eq!(summary.duplicates, 3);
    assert_eq!(summary.counts.total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_records_follow_input_order() {
    let store = Arc::new(MemoryStore::new());
    let ids = ["z", "a", "m", "b", "q"];
    let fetcher = MockFetcher::new().with_postings(postings(&ids));

    ApplicationOrchestrator::new(store.clone(), MockAutomator::new(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let records = store.list(None).await.unwrap();
    let stored: Vec<&str> = records.iter().map(|r| r.job_id.as_str()).collect();
    assert_eq!(stored, ids);
    assert!(records
        .windows(2)
        .all(|pair| pair[0].applied_at <= pair[1].applied_at));
}

#[tokio::test(start_paused = true)]
async fn test_session_restarts_once_every_k_jobs() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4", "5", "6"]));

    let summary = ApplicationOrchestrator::new(
        store,
        automator.clone(),
        config().with_limits(SessionLimits {
            max_jobs_per_session: 2,
            ..limits()
        }),
    )
    .run(fetcher.stream(), &CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(automator.restarts(), 2);
    assert_eq!(summary.session_restarts, 2);

    let sessions: Vec<u64> = automator
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            MockAutomatorCall::Submit { session, .. } => Some(session),
            _ => None,
        })
        .collect();
    assert_eq!(sessions, vec![1, 1, 2, 2, 3, 3]);
    assert_eq!(automator.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_are_never_recorded_closer_than_the_floor() {
    let store = Arc::new(RecordingStore::new());
    // Job 2 overruns the floor; job 3 starts right after it and takes 10s.
    let automator = MockAutomator::new()
        .with_delay("2", Duration::from_secs(45))
        .with_delay("3", Duration::from_secs(10));
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4"]));

    ApplicationOrchestrator::new(store.clone(), automator, config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let times = store.insert_times();
    assert_eq!(times.len(), 4);
    for pair in times.windows(2) {
        let gap = pair[1].1.duration_since(pair[0].1);
        assert!(
            gap >= Duration::from_secs(30),
            "{} -> {} recorded {:?} apart",
            pair[0].0,
            pair[1].0,
            gap
        );
    }
    // Job 3's submission waited out the floor, then ran its own 10s.
    assert_eq!(times[2].1.duration_since(times[1].1), Duration::from_secs(40));
}

#[tokio::test]
async fn test_stored_timestamps_respect_the_floor_after_a_slow_job() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new().with_delay("2", Duration::from_millis(1500));
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3"]));
    let limits = SessionLimits {
        min_seconds_per_job: 1,
        ..limits()
    };

    ApplicationOrchestrator::new(store.clone(), automator, config().with_limits(limits))
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let records = store.list(None).await.unwrap();
    assert_eq!(records.len(), 3);
    for pair in records.windows(2) {
        let gap = pair[1].applied_at - pair[0].applied_at;
        // Small allowance for wall clock vs monotonic clock drift.
        assert!(
            gap >= chrono::Duration::milliseconds(990),
            "{} -> {} stored {} ms apart",
            pair[0].job_id,
            pair[1].job_id,
            gap.num_milliseconds()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_job_jitter_lengthens_the_hold_within_range() {
    let store = Arc::new(RecordingStore::new());
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4", "5", "6"]));
    let limits = SessionLimits {
        job_jitter_ms: JitterRange::new(1_000, 3_000),
        ..limits()
    };

    ApplicationOrchestrator::new(store.clone(), MockAutomator::new(), config().with_limits(limits))
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let times = store.insert_times();
    assert_eq!(times.len(), 6);
    for pair in times.windows(2) {
        let gap = pair[1].1.duration_since(pair[0].1);
        assert!(
            gap >= Duration::from_secs(31) && gap <= Duration::from_secs(33),
            "{:?}",
            gap
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_restart_cooldown_carries_jitter() {
    let store = Arc::new(RecordingStore::new());
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4"]));
    let limits = SessionLimits {
        max_jobs_per_session: 1,
        restart_jitter_ms: JitterRange::new(0, 2_000),
        ..limits()
    };

    ApplicationOrchestrator::new(store.clone(), MockAutomator::new(), config().with_limits(limits))
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    // 30s floor, then a 5s cooldown plus up to 2s of jitter.
    let times = store.insert_times();
    for pair in times.windows(2) {
        let gap = pair[1].1.duration_since(pair[0].1);
        assert!(
            gap >= Duration::from_secs(35) && gap <= Duration::from_secs(37),
            "{:?}",
            gap
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_excluded_titles_never_reach_automator() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let fetcher = MockFetcher::new().with_postings(vec![
        posting("1", "Junior Data Scientist"),
        posting("2", "ML INTERNSHIP"),
        posting("3", "Jr. Engineer"),
    ]);

    let summary = ApplicationOrchestrator::new(store.clone(), automator.clone(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(automator.calls().is_empty());
    assert_eq!(summary.skipped(), 3);
    assert_eq!(summary.submissions, 0);

    let notes: Vec<String> = store
        .records()
        .into_iter()
        .map(|r| r.notes.unwrap_or_default())
        .collect();
    assert!(notes[0].contains("'junior'"));
    assert!(notes[1].contains("'intern'"));
    assert!(notes[2].contains("'jr.'"));
}

#[tokio::test(start_paused = true)]
async fn test_platform_flags_and_missing_urls_skip_automation() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let mut no_url = posting("2", "ML Engineer");
    no_url.url = String::new();
    let fetcher = MockFetcher::new().with_postings(vec![
        posting("1", "ML Engineer").marked_applied(),
        no_url,
    ]);

    ApplicationOrchestrator::new(store.clone(), automator.clone(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let records = store.records();
    assert_eq!(records[0].status, ApplicationStatus::Applied);
    assert_eq!(records[0].notes.as_deref(), Some("already applied on platform"));
    assert_eq!(records[1].status, ApplicationStatus::Skipped);
    assert_eq!(records[1].notes.as_deref(), Some("missing posting url"));
    assert!(automator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_still_submits_without_letter() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let generator = MockGenerator::quota_exceeded();
    let fetcher = MockFetcher::new().with_postings(postings(&["1"]));

    ApplicationOrchestrator::new(store.clone(), automator.clone(), config())
        .with_generator(Arc::new(generator.clone()), profile())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(generator.calls(), vec!["1"]);
    assert_eq!(
        automator.calls()[1],
        MockAutomatorCall::Submit {
            session: 1,
            job_id: "1".into(),
            cover_letter: None,
        }
    );

    let record = store.get("1").await.unwrap().unwrap();
    assert_eq!(record.status, ApplicationStatus::Applied);
    assert_eq!(record.cover_letter, None);
    assert!(record.notes.unwrap().contains("cover letter unavailable"));
}

#[tokio::test(start_paused = true)]
async fn test_generation_timeout_is_one_attempt() {
    let store = Arc::new(MemoryStore::new());
    let generator = MockGenerator::hanging();
    let fetcher = MockFetcher::new().with_postings(postings(&["1"]));
    let settings = CoverLetterConfig {
        timeout_secs: 5,
        ..Default::default()
    };

    ApplicationOrchestrator::new(
        store.clone(),
        MockAutomator::new(),
        config().with_cover_letter(settings),
    )
    .with_generator(Arc::new(generator.clone()), profile())
    .run(fetcher.stream(), &CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(generator.calls().len(), 1);
    let record = store.get("1").await.unwrap().unwrap();
    assert_eq!(record.status, ApplicationStatus::Applied);
    assert!(record.notes.unwrap().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_cover_letter_is_forwarded_and_stored() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let generator = MockGenerator::letter("Dear Hiring Manager,");
    let mut billing = posting("2", "Backend Engineer");
    billing.description = Some("Maintain the billing system".into());
    let fetcher = MockFetcher::new().with_postings(vec![posting("1", "NLP Engineer"), billing]);

    ApplicationOrchestrator::new(
        store.clone(),
        automator.clone(),
        config().with_cover_letter(CoverLetterConfig::default().with_triggers(["rag"])),
    )
    .with_generator(Arc::new(generator.clone()), profile())
    .run(fetcher.stream(), &CancellationToken::new())
    .await
    .unwrap();

    // Only the description mentioning a trigger gets a letter.
    assert_eq!(generator.calls(), vec!["1"]);

    let letter = store.get("1").await.unwrap().unwrap().cover_letter.unwrap();
    assert!(letter.starts_with("Dear Hiring Manager,"));
    assert!(letter.ends_with("Ada Lovelace"));
    assert_eq!(store.get("2").await.unwrap().unwrap().cover_letter, None);

    let forwarded: Vec<Option<String>> = automator
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            MockAutomatorCall::Submit { cover_letter, .. } => Some(cover_letter),
            _ => None,
        })
        .collect();
    assert_eq!(forwarded, vec![Some(letter), None]);
}

#[tokio::test(start_paused = true)]
async fn test_generator_unused_when_disabled() {
    let generator = MockGenerator::letter("Dear Hiring Manager,");
    let fetcher = MockFetcher::new().with_postings(postings(&["1"]));

    ApplicationOrchestrator::new(
        Arc::new(MemoryStore::new()),
        MockAutomator::new(),
        config().with_cover_letter(CoverLetterConfig::disabled()),
    )
    .with_generator(Arc::new(generator.clone()), profile())
    .run(fetcher.stream(), &CancellationToken::new())
    .await
    .unwrap();

    assert!(generator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_automator_results_map_to_statuses() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new()
        .with_result(
            "2",
            Ok(SubmitOutcome::RequiresManualFields {
                detail: Some("years of visa sponsorship".into()),
            }),
        )
        .with_result(
            "3",
            Err(AutomationError::ElementNotFound("Easy Apply button".into())),
        )
        .with_result("4", Err(AutomationError::Navigation("page crashed".into())));
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4", "5"]));

    let summary = ApplicationOrchestrator::new(store.clone(), automator, config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let statuses: Vec<ApplicationStatus> = store.records().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ApplicationStatus::Applied,
            ApplicationStatus::ManualReview,
            ApplicationStatus::Error,
            ApplicationStatus::Error,
            ApplicationStatus::Applied,
        ]
    );

    let manual = store.get("2").await.unwrap().unwrap();
    assert_eq!(manual.notes.as_deref(), Some("years of visa sponsorship"));
    let failed = store.get("3").await.unwrap().unwrap();
    assert!(failed.notes.unwrap().contains("Easy Apply button"));

    assert_eq!(summary.applied(), 2);
    assert_eq!(summary.manual_review(), 1);
    assert_eq!(summary.errors(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stops_at_max_jobs() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4"]));

    let summary = ApplicationOrchestrator::new(
        store.clone(),
        automator.clone(),
        config().with_limits(SessionLimits {
            max_jobs_total: 2,
            ..limits()
        }),
    )
    .run(fetcher.stream(), &CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(summary.stop_reason, StopReason::MaxJobsReached);
    assert_eq!(automator.submitted(), vec!["1", "2"]);
    assert_eq!(store.len(), 2);
    assert_eq!(automator.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stops_when_run_duration_elapses() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4"]));

    let summary = ApplicationOrchestrator::new(
        store.clone(),
        MockAutomator::new(),
        config().with_limits(SessionLimits {
            max_session_duration_secs: 60,
            ..limits()
        }),
    )
    .run(fetcher.stream(), &CancellationToken::new())
    .await
    .unwrap();

    // Each job holds for 30s, so the third check lands at 60s.
    assert_eq!(summary.stop_reason, StopReason::RunDurationExceeded);
    assert_eq!(summary.submissions, 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_hold_keeps_recorded_outcomes() {
    let store = Arc::new(MemoryStore::new());
    let automator = MockAutomator::new();
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3", "4"]));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(45)).await;
        trigger.cancel();
    });

    let summary = ApplicationOrchestrator::new(store.clone(), automator.clone(), config())
        .run(fetcher.stream(), &cancel)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(store.len(), 2);
    assert_eq!(automator.submitted(), vec!["1", "2"]);
    assert_eq!(automator.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_aborts_run() {
    let store = Arc::new(RecordingStore::failing_after(1));
    let automator = MockAutomator::new();
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3"]));

    let err = ApplicationOrchestrator::new(store.clone(), automator.clone(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Store(_)));
    assert_eq!(store.inner().len(), 1);
    assert_eq!(automator.submitted(), vec!["1", "2"]);
    assert_eq!(automator.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_key_on_insert_is_benign() {
    let store = Arc::new(RecordingStore::blind());
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "1", "2"]));

    let summary = ApplicationOrchestrator::new(store.clone(), MockAutomator::new(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(store.inner().len(), 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.applied(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_mid_stream_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = MockFetcher::new()
        .with_postings(postings(&["1", "2", "3"]))
        .fail_after(1);

    let err = ApplicationOrchestrator::new(store.clone(), MockAutomator::new(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Fetch(_)));
    assert_eq!(store.len(), 1, "earlier outcome stays recorded");
}

#[tokio::test(start_paused = true)]
async fn test_session_start_failure_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = MockFetcher::new().with_postings(postings(&["1"]));

    let err = ApplicationOrchestrator::new(store.clone(), MockAutomator::new().failing_start(), config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Session(_)));
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_throttles_force_restart() {
    let store = Arc::new(MemoryStore::new());
    let throttled = || Err(AutomationError::RateLimited("HTTP 429".into()));
    let automator = MockAutomator::new()
        .with_result("1", throttled())
        .with_result("2", throttled());
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3"]));

    let summary = ApplicationOrchestrator::new(
        store.clone(),
        automator.clone(),
        config().with_limits(SessionLimits {
            throttle_restart_after: 2,
            ..limits()
        }),
    )
    .run(fetcher.stream(), &CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(summary.errors(), 2);
    assert_eq!(summary.applied(), 1);
    assert_eq!(automator.restarts(), 1);
    assert_eq!(summary.session_restarts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_extends_the_hold() {
    let store = Arc::new(RecordingStore::new());
    let automator =
        MockAutomator::new().with_result("1", Err(AutomationError::RateLimited("HTTP 429".into())));
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2"]));

    ApplicationOrchestrator::new(store.clone(), automator, config())
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let times = store.insert_times();
    // 30s floor plus 10s backoff for the first throttle.
    assert_eq!(times[1].1.duration_since(times[0].1), Duration::from_secs(40));
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_throttles_pause_before_restarting() {
    let store = Arc::new(RecordingStore::new());
    let throttled = || Err(AutomationError::RateLimited("HTTP 429".into()));
    let automator = MockAutomator::new()
        .with_result("1", throttled())
        .with_result("2", throttled());
    let fetcher = MockFetcher::new().with_postings(postings(&["1", "2", "3"]));
    let limits = SessionLimits {
        throttle_restart_after: 2,
        throttle_cooldown_secs: 600,
        ..limits()
    };

    ApplicationOrchestrator::new(store.clone(), automator.clone(), config().with_limits(limits))
        .run(fetcher.stream(), &CancellationToken::new())
        .await
        .unwrap();

    let times = store.insert_times();
    // 30s floor plus the 600s cooldown, then the 5s restart cooldown.
    assert_eq!(times[2].1.duration_since(times[1].1), Duration::from_secs(635));
    assert_eq!(automator.restarts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_search_uses_configured_criteria() {
    let fetcher = MockFetcher::new().with_postings(postings(&["1"]));
    let run_config = config();

    let summary = ApplicationOrchestrator::new(
        Arc::new(MemoryStore::new()),
        MockAutomator::new(),
        run_config.clone(),
    )
    .run_search(&fetcher, &CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(fetcher.searches(), vec![run_config.search]);
    assert_eq!(summary.applied(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_search_failure_is_fatal() {
    let fetcher = MockFetcher::new().fail_search("401 unauthorized");

    let err = ApplicationOrchestrator::new(
        Arc::new(MemoryStore::new()),
        MockAutomator::new(),
        config(),
    )
    .run_search(&fetcher, &CancellationToken::new())
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::Fetch(_)));
}
