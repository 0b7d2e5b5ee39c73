use super::*;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lt_core::{LogQuery, QueryPage};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::clock::ManualClock;
use crate::limiter::PermitTicker;
use crate::tracing_init::DomainFormat;

// -- helpers ------------------------------------------------------------

/// Route engine logs to the test harness; visible with `--nocapture`.
/// Safe to call multiple times.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .event_format(DomainFormat::new())
                .with_test_writer()
                .with_filter(EnvFilter::try_new("debug").unwrap()),
        )
        .try_init();
}

const NOW: i64 = 1_000_000;

type Generator = Box<dyn Fn(&LogQuery) -> Result<QueryPage, QueryError> + Send + Sync>;

/// QueryClient that replays a script, then falls back to a generator (or
/// empty final pages). Every query is recorded.
struct ScriptedClient {
    script: Mutex<VecDeque<Result<QueryPage, QueryError>>>,
    fallback: Option<Generator>,
    queries: Mutex<Vec<LogQuery>>,
}

impl ScriptedClient {
    fn new(script: Vec<Result<QueryPage, QueryError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn generated(
        script: Vec<Result<QueryPage, QueryError>>,
        f: impl Fn(&LogQuery) -> Result<QueryPage, QueryError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: Some(Box::new(f)),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    async fn query(&self, query: &LogQuery) -> Result<QueryPage, QueryError> {
        self.queries.lock().unwrap().push(query.clone());
        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(f)) => f(query),
            (None, None) => Ok(QueryPage::default()),
        }
    }
}

fn rec(id: &str, ts: i64, body: &str) -> RawRecord {
    RawRecord::new(id, ts, body)
}

fn ids(records: &[RawRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

fn settings() -> EngineSettings {
    EngineSettings {
        poll_interval: Duration::from_millis(250),
        overlap: Duration::from_secs(60),
        max_retries: 3,
        output_capacity: 16,
    }
}

fn engine(
    request: TailRequest,
    client: &Arc<ScriptedClient>,
    clock: &ManualClock,
    settings: EngineSettings,
) -> TailEngine<Arc<ScriptedClient>, PermitTicker> {
    let ticker = PermitTicker::spawn(settings.poll_interval, CancellationToken::new());
    TailEngine::new(
        request,
        Arc::clone(client),
        ticker,
        Arc::new(clock.clone()),
        settings,
    )
    .unwrap()
}

/// Run to completion and collect everything emitted.
async fn collect(
    engine: TailEngine<Arc<ScriptedClient>, PermitTicker>,
) -> (Vec<RawRecord>, TailResult<SessionSummary>) {
    let (tx, mut rx) = mpsc::channel(4);
    let handle = tokio::spawn(engine.run(tx, CancellationToken::new()));
    let mut out = Vec::new();
    while let Some(r) = rx.recv().await {
        out.push(r);
    }
    (out, handle.await.unwrap())
}

/// Read `n` records, cancel, and return them with the summary.
async fn take_then_cancel(
    engine: TailEngine<Arc<ScriptedClient>, PermitTicker>,
    n: usize,
    capacity: usize,
) -> (Vec<RawRecord>, SessionSummary) {
    let (tx, mut rx) = mpsc::channel(capacity);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(engine.run(tx, cancel.clone()));
    let mut out = Vec::new();
    while out.len() < n {
        out.push(rx.recv().await.unwrap());
    }
    cancel.cancel();
    let summary = handle.await.unwrap().unwrap();
    // Records the engine had already queued before cancellation.
    while let Some(r) = rx.recv().await {
        out.push(r);
    }
    (out, summary)
}

// -- single window ------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn single_page_then_done() {
    init_tracing();
    let client = ScriptedClient::new(vec![Ok(QueryPage::last(vec![
        rec("a", 1_000, "A"),
        rec("b", 2_000, "B"),
        rec("c", 3_000, "C"),
    ]))]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10_000);

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert_eq!(ids(&out), ["a", "b", "c"]);
    let summary = result.unwrap();
    assert_eq!(summary.end, SessionEnd::Exhausted);
    assert_eq!(summary.stats.queries, 1);
    assert_eq!(summary.stats.emitted, 3);
    let q = &client.queries()[0];
    assert_eq!((q.range_start, q.range_end), (0, 10_000));
    assert_eq!(q.next_token, None);
}

#[tokio::test(start_paused = true)]
async fn empty_pages_terminate_without_follow() {
    let client = ScriptedClient::new(vec![
        Ok(QueryPage::more(vec![], "t1")),
        Ok(QueryPage::last(vec![])),
    ]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10_000);

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert!(out.is_empty());
    assert_eq!(result.unwrap().end, SessionEnd::Exhausted);
    let queries = client.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].next_token.as_deref(), Some("t1"));
}

#[tokio::test(start_paused = true)]
async fn unbounded_end_keeps_advancing_without_follow() {
    let clock = ManualClock::new(NOW);
    let step = clock.clone();
    let seq = AtomicU64::new(0);
    let client = ScriptedClient::generated(vec![], move |q| {
        let n = seq.fetch_add(1, Ordering::SeqCst);
        step.advance(1_000);
        Ok(QueryPage::last(vec![rec(&format!("r{n}"), q.range_end - 1, "tick")]))
    });
    let req = TailRequest::new("grp", NOW - 5_000);

    let (out, summary) = take_then_cancel(engine(req, &client, &clock, settings()), 3, 1).await;

    assert_eq!(&ids(&out)[..3], &["r0", "r1", "r2"]);
    assert_eq!(summary.end, SessionEnd::Cancelled);
    assert!(summary.stats.windows >= 2);
    let queries = client.queries();
    // The first window ends at "now" as of construction, later ones track the clock.
    assert_eq!((queries[0].range_start, queries[0].range_end), (NOW - 5_000, NOW));
    assert_eq!(queries[1].range_end, NOW + 1_000);
    assert_eq!(queries[2].range_end, NOW + 2_000);
}

#[tokio::test(start_paused = true)]
async fn pages_are_emitted_in_continuation_order() {
    let client = ScriptedClient::new(vec![
        Ok(QueryPage::more(vec![rec("a", 5, "A"), rec("b", 1, "B")], "t1")),
        Ok(QueryPage::more(vec![rec("c", 9, "C")], "t2")),
        Ok(QueryPage::last(vec![rec("d", 2, "D")])),
    ]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10);

    let (out, _) = collect(engine(req, &client, &clock, settings())).await;

    // Arrival order, not timestamp order.
    assert_eq!(ids(&out), ["a", "b", "c", "d"]);
    let tokens: Vec<_> = client
        .queries()
        .into_iter()
        .map(|q| q.next_token)
        .collect();
    assert_eq!(tokens, [None, Some("t1".to_string()), Some("t2".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn duplicates_within_a_window_are_suppressed() {
    let client = ScriptedClient::new(vec![
        Ok(QueryPage::more(vec![rec("a", 1, "A"), rec("b", 2, "B")], "t1")),
        Ok(QueryPage::last(vec![rec("b", 2, "B"), rec("c", 3, "C")])),
    ]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10);

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert_eq!(ids(&out), ["a", "b", "c"]);
    assert_eq!(result.unwrap().stats.duplicates, 1);
}

// -- filtering ----------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn include_filter_keeps_only_matching_bodies() {
    let client = ScriptedClient::new(vec![Ok(QueryPage::last(vec![
        rec("1", 1, r#"{"query_name":"a.example.","rcode":"NOERROR"}"#),
        rec("2", 2, r#"{"query_name":"nope.example.","rcode":"NXDOMAIN"}"#),
        rec("3", 3, r#"{"query_name":"b.example.","rcode":"NOERROR"}"#),
        rec("4", 4, r#"{"query_name":"gone.example.","rcode":"NXDOMAIN"}"#),
    ]))]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0)
        .with_end(10)
        .with_include("NXDOMAIN");

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert_eq!(ids(&out), ["2", "4"]);
    assert!(out.iter().all(|r| r.body.contains("NXDOMAIN")));
    assert_eq!(result.unwrap().stats.filtered, 2);
    // A literal include is offered to the store as a substring filter.
    assert_eq!(client.queries()[0].filter.as_deref(), Some("NXDOMAIN"));
}

#[tokio::test(start_paused = true)]
async fn exclude_filter_applies_without_pushdown() {
    let client = ScriptedClient::new(vec![Ok(QueryPage::last(vec![
        rec("1", 1, "rcode=NOERROR"),
        rec("2", 2, "rcode=NXDOMAIN"),
    ]))]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0)
        .with_end(10)
        .with_exclude("NXDOMAIN");

    let (out, _) = collect(engine(req, &client, &clock, settings())).await;

    assert_eq!(ids(&out), ["1"]);
    assert_eq!(client.queries()[0].filter, None);
}

// -- validation ---------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn invalid_pattern_is_rejected_before_any_query() {
    let client = ScriptedClient::new(vec![]);
    let clock = ManualClock::new(NOW);
    let ticker = PermitTicker::spawn(Duration::from_millis(250), CancellationToken::new());
    let req = TailRequest::new("grp", 0).with_include("(unclosed");

    let err = TailEngine::new(
        req,
        Arc::clone(&client),
        ticker,
        Arc::new(clock),
        settings(),
    )
    .err()
    .unwrap();

    assert_eq!(err.reason(), &TailReason::Validation);
    assert!(client.queries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn inverted_window_is_rejected() {
    let client = ScriptedClient::new(vec![]);
    let ticker = PermitTicker::spawn(Duration::from_millis(250), CancellationToken::new());
    let req = TailRequest::new("grp", 10_000).with_end(5_000);

    let err = TailEngine::new(
        req,
        Arc::clone(&client),
        ticker,
        Arc::new(ManualClock::new(NOW)),
        settings(),
    )
    .err()
    .unwrap();

    assert_eq!(err.reason(), &TailReason::Validation);
    assert!(client.queries().is_empty());
}

// -- errors and retries -------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transient_failure_is_invisible_to_the_consumer() {
    let page = || Ok(QueryPage::last(vec![rec("a", 1, "A"), rec("b", 2, "B")]));
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10);

    let clean = ScriptedClient::new(vec![page()]);
    let (clean_out, clean_result) = collect(engine(req.clone(), &clean, &clock, settings())).await;

    let flaky = ScriptedClient::new(vec![Err(QueryError::Retryable("throttled".into())), page()]);
    let (flaky_out, flaky_result) = collect(engine(req, &flaky, &clock, settings())).await;

    assert_eq!(clean_out, flaky_out);
    assert_eq!(clean_result.unwrap().end, SessionEnd::Exhausted);
    let summary = flaky_result.unwrap();
    assert_eq!(summary.end, SessionEnd::Exhausted);
    assert_eq!(summary.stats.retries, 1);
    let queries = flaky.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0], queries[1]);
}

#[tokio::test(start_paused = true)]
async fn retry_resumes_from_the_same_token() {
    let client = ScriptedClient::new(vec![
        Ok(QueryPage::more(vec![rec("a", 1, "A")], "t1")),
        Err(QueryError::Retryable("throttled".into())),
        Err(QueryError::Retryable("throttled".into())),
        Ok(QueryPage::last(vec![rec("b", 2, "B")])),
    ]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10);

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert_eq!(ids(&out), ["a", "b"]);
    assert!(result.is_ok());
    let queries = client.queries();
    assert_eq!(queries.len(), 4);
    for q in &queries[1..] {
        assert_eq!(q.next_token.as_deref(), Some("t1"));
    }
}

#[tokio::test(start_paused = true)]
async fn retries_past_the_ceiling_fail_the_session() {
    let transient = || Err(QueryError::Retryable("throttled".into()));
    let client = ScriptedClient::new(vec![transient(), transient(), transient(), transient()]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10);

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert!(out.is_empty());
    let err = result.unwrap_err();
    assert_eq!(err.reason(), &TailReason::RetriesExhausted);
    // max_retries = 3: one initial attempt plus three retries.
    assert_eq!(client.queries().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn success_resets_the_retry_budget() {
    let transient = || Err(QueryError::Retryable("throttled".into()));
    let client = ScriptedClient::new(vec![
        transient(),
        transient(),
        transient(),
        Ok(QueryPage::more(vec![rec("a", 1, "A")], "t1")),
        transient(),
        transient(),
        transient(),
        Ok(QueryPage::last(vec![rec("b", 2, "B")])),
    ]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10);

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert_eq!(ids(&out), ["a", "b"]);
    assert_eq!(result.unwrap().stats.retries, 6);
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_ends_with_an_error_after_earlier_records() {
    let client = ScriptedClient::new(vec![
        Ok(QueryPage::more(vec![rec("a", 1, "A")], "t1")),
        Err(QueryError::Fatal("access denied".into())),
    ]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).with_end(10);

    let (out, result) = collect(engine(req, &client, &clock, settings())).await;

    assert_eq!(ids(&out), ["a"]);
    let err = result.unwrap_err();
    assert_eq!(err.reason(), &TailReason::FatalQuery);
    assert!(format!("{err:?}").contains("access denied"));
    assert_eq!(client.queries().len(), 2);
}

// -- follow mode --------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn overlapping_record_is_emitted_once() {
    let clock = ManualClock::new(10_000);
    let client = ScriptedClient::new(vec![
        Ok(QueryPage::last(vec![rec("a", 8_000, "A"), rec("x", 9_000, "X")])),
        Ok(QueryPage::last(vec![rec("x", 9_000, "X"), rec("y", 12_000, "Y")])),
    ]);
    let req = TailRequest::new("grp", 0).follow(true);

    let engine = engine(req, &client, &clock, settings());
    clock.set(20_000);
    let (out, summary) = take_then_cancel(engine, 3, 16).await;

    assert_eq!(ids(&out), ["a", "x", "y"]);
    assert_eq!(summary.end, SessionEnd::Cancelled);
    assert_eq!(summary.stats.duplicates, 1);

    let queries = client.queries();
    assert_eq!((queries[0].range_start, queries[0].range_end), (0, 10_000));
    // The second window starts at the latest observed timestamp.
    assert_eq!((queries[1].range_start, queries[1].range_end), (9_000, 20_000));
    assert_eq!(queries[1].next_token, None);
}

#[tokio::test(start_paused = true)]
async fn windows_advance_monotonically() {
    let clock = ManualClock::new(100_000);
    let step = clock.clone();
    let seq = AtomicU64::new(0);
    let client = ScriptedClient::generated(vec![], move |q| {
        // Time moves on between polls; one fresh record per window.
        step.advance(1_000);
        let n = seq.fetch_add(1, Ordering::SeqCst);
        Ok(QueryPage::last(vec![rec(
            &format!("r{n}"),
            q.range_end - 1,
            "tick",
        )]))
    });
    let req = TailRequest::new("grp", 50_000).follow(true);

    let (out, _) = take_then_cancel(engine(req, &client, &clock, settings()), 10, 1).await;

    assert!(out.len() >= 10);
    let queries = client.queries();
    for pair in queries.windows(2) {
        assert!(pair[1].range_start >= pair[0].range_start);
        assert!(pair[1].range_end >= pair[0].range_end);
        assert!(pair[1].range_start <= pair[1].range_end);
    }
}

#[tokio::test(start_paused = true)]
async fn bounded_end_only_bounds_the_first_window() {
    let clock = ManualClock::new(NOW);
    let client = ScriptedClient::generated(
        vec![Ok(QueryPage::last(vec![rec("a", 5_000, "A")]))],
        |_| Ok(QueryPage::last(vec![rec("b", NOW - 1, "B")])),
    );
    let req = TailRequest::new("grp", 0).with_end(10_000).follow(true);

    let (out, _) = take_then_cancel(engine(req, &client, &clock, settings()), 2, 16).await;

    assert_eq!(&ids(&out)[..2], &["a", "b"]);
    let queries = client.queries();
    assert_eq!(queries[0].range_end, 10_000);
    assert_eq!(queries[1].range_end, NOW);
}

#[tokio::test(start_paused = true)]
async fn dedup_memory_stays_bounded_across_windows() {
    const PER_WINDOW: i64 = 10;
    const WINDOWS: usize = 30;

    let clock = ManualClock::new(100_000);
    let step = clock.clone();
    let client = ScriptedClient::generated(vec![], move |q| {
        step.advance(100_000);
        let records = (0..PER_WINDOW)
            .map(|i| {
                let ts = q.range_end - 1 - i;
                rec(&format!("{}-{i}", q.range_end), ts, "evt")
            })
            .collect();
        Ok(QueryPage::last(records))
    });
    let mut s = settings();
    s.overlap = Duration::from_secs(1);
    let req = TailRequest::new("grp", 0).follow(true);

    let (out, summary) = take_then_cancel(
        engine(req, &client, &clock, s),
        WINDOWS * PER_WINDOW as usize,
        4,
    )
    .await;

    let st = summary.stats;
    let tracked = st.received - st.duplicates - st.evicted;
    assert!(out.len() >= WINDOWS * PER_WINDOW as usize);
    assert!(
        tracked <= 2 * PER_WINDOW as u64,
        "tracked {tracked} identities after {} windows",
        st.windows
    );
    assert!(st.evicted >= (WINDOWS as u64 - 2) * PER_WINDOW as u64);
}

// -- termination --------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancel_before_start_issues_no_query() {
    let client = ScriptedClient::new(vec![Ok(QueryPage::last(vec![rec("a", 1, "A")]))]);
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).follow(true);
    let engine = engine(req, &client, &clock, settings());

    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = engine.run(tx, cancel).await.unwrap();

    assert_eq!(summary.end, SessionEnd::Cancelled);
    assert!(rx.recv().await.is_none());
    assert!(client.queries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_while_waiting_for_a_permit() {
    let client = ScriptedClient::new(vec![]);
    let (_permits, limiter) = mpsc::channel::<()>(1);
    let engine = TailEngine::new(
        TailRequest::new("grp", 0).follow(true),
        Arc::clone(&client),
        limiter,
        Arc::new(ManualClock::new(NOW)),
        settings(),
    )
    .unwrap();

    let (tx, _rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(engine.run(tx, cancel.clone()));
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(!handle.is_finished());

    cancel.cancel();
    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.end, SessionEnd::Cancelled);
    assert!(client.queries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn closed_permit_source_ends_the_session() {
    let client = ScriptedClient::new(vec![]);
    let (permits, limiter) = mpsc::channel::<()>(1);
    drop(permits);
    let engine = TailEngine::new(
        TailRequest::new("grp", 0).follow(true),
        Arc::clone(&client),
        limiter,
        Arc::new(ManualClock::new(NOW)),
        settings(),
    )
    .unwrap();

    let (tx, _rx) = mpsc::channel(4);
    let summary = engine.run(tx, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.end, SessionEnd::LimiterClosed);
}

#[tokio::test(start_paused = true)]
async fn every_query_consumes_one_permit() {
    let client = ScriptedClient::new(vec![
        Ok(QueryPage::more(vec![rec("a", 1, "A")], "t1")),
        Err(QueryError::Retryable("throttled".into())),
        Ok(QueryPage::last(vec![rec("b", 2, "B")])),
    ]);
    let (permits, limiter) = mpsc::channel::<()>(8);
    let engine = TailEngine::new(
        TailRequest::new("grp", 0).follow(true),
        Arc::clone(&client),
        limiter,
        Arc::new(ManualClock::new(NOW)),
        settings(),
    )
    .unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(engine.run(tx, cancel.clone()));

    // Continuation page, failed retry, successful retry, then two follow windows.
    for _ in 0..5 {
        permits.send(()).await.unwrap();
    }
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(client.queries().len(), 5);
    assert!(!handle.is_finished());

    for _ in 0..2 {
        permits.send(()).await.unwrap();
    }
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(client.queries().len(), 7);

    cancel.cancel();
    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.end, SessionEnd::Cancelled);
    assert_eq!(summary.stats.queries, 7);
    assert_eq!(summary.stats.retries, 1);
    assert_eq!(rx.recv().await.map(|r| r.id), Some("a".to_string()));
    assert_eq!(rx.recv().await.map(|r| r.id), Some("b".to_string()));
}

#[tokio::test(start_paused = true)]
async fn consumer_drop_ends_the_session_cleanly() {
    let seq = AtomicU64::new(0);
    let client = ScriptedClient::generated(vec![], move |q| {
        let n = seq.fetch_add(1, Ordering::SeqCst);
        Ok(QueryPage::last(vec![rec(&format!("r{n}"), q.range_start, "evt")]))
    });
    let clock = ManualClock::new(NOW);
    let req = TailRequest::new("grp", 0).follow(true);
    let engine = engine(req, &client, &clock, settings());

    let (tx, mut rx) = mpsc::channel(1);
    let handle = tokio::spawn(engine.run(tx, CancellationToken::new()));
    assert!(rx.recv().await.is_some());
    drop(rx);

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.end, SessionEnd::ConsumerDisconnected);
}
