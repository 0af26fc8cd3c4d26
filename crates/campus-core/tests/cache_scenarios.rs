#![allow(clippy::unwrap_used)]
// Scenario tests for the query and mutation coordinators over an
// in-memory scripted backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use strum::IntoEnumIterator;

use campus_core::{
    CacheConfig, CoreError, Filters, MutationOp, MutationOptions, MutationStatus,
    OptimisticUpdate, Page, Payload, Query, QueryClient, QueryOptions, QueryStatus, ResourceKind,
    ResourceSource, item_id,
};

// ── Scripted backend ────────────────────────────────────────────────

#[derive(Default)]
struct Backend {
    tables: Mutex<HashMap<ResourceKind, Vec<Value>>>,
    list_calls: Mutex<HashMap<ResourceKind, usize>>,
    list_failures: Mutex<VecDeque<CoreError>>,
    list_delays: Mutex<VecDeque<Duration>>,
    write_failure: Mutex<Option<CoreError>>,
    next_id: AtomicU64,
}

#[derive(Clone, Default)]
struct FakeBackend(Arc<Backend>);

impl FakeBackend {
    fn with(self, kind: ResourceKind, items: Vec<Value>) -> Self {
        self.0.tables.lock().unwrap().insert(kind, items);
        self
    }

    fn list_calls(&self, kind: ResourceKind) -> usize {
        self.0
            .list_calls
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    fn fail_next_list(&self, err: CoreError) {
        self.0.list_failures.lock().unwrap().push_back(err);
    }

    fn delay_next_list(&self, delay: Duration) {
        self.0.list_delays.lock().unwrap().push_back(delay);
    }

    fn fail_next_write(&self, err: CoreError) {
        *self.0.write_failure.lock().unwrap() = Some(err);
    }

    fn replace(&self, kind: ResourceKind, items: Vec<Value>) {
        self.0.tables.lock().unwrap().insert(kind, items);
    }

    fn take_write_failure(&self) -> Result<(), CoreError> {
        self.0.write_failure.lock().unwrap().take().map_or(Ok(()), Err)
    }
}

struct FakeSource {
    backend: FakeBackend,
    kind: ResourceKind,
}

impl FakeSource {
    fn table(&self) -> Vec<Value> {
        let tables = self.backend.0.tables.lock().unwrap();
        tables.get(&self.kind).cloned().unwrap_or_default()
    }
}

impl ResourceSource for FakeSource {
    fn list<'a>(&'a self, filters: &'a Filters) -> BoxFuture<'a, Result<Page, CoreError>> {
        async move {
            let b = &self.backend.0;
            *b.list_calls.lock().unwrap().entry(self.kind).or_default() += 1;
            // Snapshot at request time; the delay models a slow response.
            let items: Vec<Value> = self
                .table()
                .into_iter()
                .filter(|item| filters.iter().all(|(k, v)| item.get(k) == Some(v)))
                .collect();
            let failure = b.list_failures.lock().unwrap().pop_front();
            let delay = b.list_delays.lock().unwrap().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(err) => Err(err),
                None => Ok(Page::new(items)),
            }
        }
        .boxed()
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Value, CoreError>> {
        async move {
            self.table()
                .into_iter()
                .find(|item| item_id(item).as_deref() == Some(id))
                .ok_or_else(|| CoreError::Client {
                    status: 404,
                    message: format!("{id} not found"),
                })
        }
        .boxed()
    }

    fn create<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, Result<Value, CoreError>> {
        async move {
            self.backend.take_write_failure()?;
            let n = self.backend.0.next_id.fetch_add(1, Ordering::SeqCst);
            let mut item = payload.clone();
            item["id"] = json!(format!("new-{n}"));
            let mut tables = self.backend.0.tables.lock().unwrap();
            tables.entry(self.kind).or_default().push(item.clone());
            Ok(item)
        }
        .boxed()
    }

    fn update<'a>(
        &'a self,
        id: &'a str,
        payload: &'a Value,
    ) -> BoxFuture<'a, Result<Value, CoreError>> {
        async move {
            self.backend.take_write_failure()?;
            let mut tables = self.backend.0.tables.lock().unwrap();
            let item = tables
                .entry(self.kind)
                .or_default()
                .iter_mut()
                .find(|item| item_id(item).as_deref() == Some(id))
                .ok_or_else(|| CoreError::Client {
                    status: 404,
                    message: format!("{id} not found"),
                })?;
            for (k, v) in payload.as_object().into_iter().flatten() {
                item[k] = v.clone();
            }
            Ok(item.clone())
        }
        .boxed()
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), CoreError>> {
        async move {
            self.backend.take_write_failure()?;
            let mut tables = self.backend.0.tables.lock().unwrap();
            let table = tables.entry(self.kind).or_default();
            let before = table.len();
            table.retain(|item| item_id(item).as_deref() != Some(id));
            if table.len() == before {
                return Err(CoreError::Client {
                    status: 404,
                    message: format!("{id} not found"),
                });
            }
            Ok(())
        }
        .boxed()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn client_with(backend: &FakeBackend, config: CacheConfig) -> QueryClient {
    let mut builder = QueryClient::builder().cache_config(config);
    for kind in ResourceKind::iter() {
        builder = builder.source(
            kind,
            FakeSource {
                backend: backend.clone(),
                kind,
            },
        );
    }
    builder.build()
}

fn client(backend: &FakeBackend) -> QueryClient {
    client_with(backend, CacheConfig::default())
}

fn list(kind: ResourceKind) -> Query {
    Query::list(kind, Filters::new())
}

fn ids(payload: &Payload) -> Vec<String> {
    payload
        .as_list()
        .unwrap()
        .items
        .iter()
        .filter_map(item_id)
        .collect()
}

fn payments() -> FakeBackend {
    FakeBackend::default().with(
        ResourceKind::FeePayments,
        vec![
            json!({ "id": "p1", "studentId": "s1", "amount": 1200 }),
            json!({ "id": "p2", "studentId": "s2", "amount": 800 }),
        ],
    )
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_read_goes_loading_then_success() {
    let backend = FakeBackend::default()
        .with(ResourceKind::Students, vec![json!({ "id": "s1", "firstName": "Asha" })]);
    let client = client(&backend);

    let mut handle = client.watch(list(ResourceKind::Students), QueryOptions::default());
    let state = handle.state();
    assert_eq!(state.status, QueryStatus::Loading);
    assert!(state.is_loading);
    assert!(state.data.is_none());

    let state = handle.settled().await.unwrap();
    assert_eq!(state.status, QueryStatus::Success);
    assert!(!state.is_loading);
    assert_eq!(ids(state.data.as_deref().unwrap()), vec!["s1"]);
    assert_eq!(backend.list_calls(ResourceKind::Students), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_reads_of_one_key_share_a_fetch() {
    let backend = FakeBackend::default().with(
        ResourceKind::Attendance,
        vec![json!({ "id": "a1", "date": "2024-01-01", "present": true })],
    );
    let client = client(&backend);
    let query = Query::list(
        ResourceKind::Attendance,
        Filters::new().with("date", "2024-01-01"),
    );
    backend.delay_next_list(Duration::from_millis(300));

    let mut first = client.watch(query.clone(), QueryOptions::default());
    let mut second = client.watch(query.clone(), QueryOptions::default());
    let (a, b, c) = tokio::join!(
        first.settled(),
        second.settled(),
        client.fetch(&query, QueryOptions::default())
    );

    assert_eq!(a.unwrap().data, b.unwrap().data);
    assert_eq!(ids(&c.unwrap()), vec!["a1"]);
    assert_eq!(backend.list_calls(ResourceKind::Attendance), 1);
    assert_eq!(client.store().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn fresh_reads_make_no_call() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);

    client.fetch(&query, QueryOptions::default()).await.unwrap();
    client.fetch(&query, QueryOptions::default()).await.unwrap();
    let handle = client.watch(query, QueryOptions::default());

    assert!(!handle.state().is_fetching);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_read_serves_cache_and_revalidates() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);
    let options = QueryOptions::default().stale_time(Duration::from_secs(10));

    client.fetch(&query, options).await.unwrap();
    backend.replace(
        ResourceKind::FeePayments,
        vec![json!({ "id": "p3", "studentId": "s3", "amount": 50 })],
    );
    tokio::time::advance(Duration::from_secs(11)).await;

    let served = client.fetch(&query, options).await.unwrap();
    assert_eq!(ids(&served), vec!["p1", "p2"]);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 2);
    let refreshed = client.get_query_data(&query).unwrap();
    assert_eq!(ids(&refreshed), vec!["p3"]);
}

#[tokio::test(start_paused = true)]
async fn refetch_keeps_status_and_sets_fetching() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);
    client.fetch(&query, QueryOptions::default()).await.unwrap();

    backend.delay_next_list(Duration::from_secs(1));
    let mut handle = client.watch(query.clone(), QueryOptions::default());
    client.invalidate_resource(ResourceKind::FeePayments);

    let state = handle.state();
    assert_eq!(state.status, QueryStatus::Success);
    assert!(state.is_fetching);
    assert!(!state.is_loading);
    assert!(state.data.is_some());

    let state = handle.settled().await.unwrap();
    assert!(!state.is_fetching);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 2);
}

// ── Failures and retries ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried_once() {
    let backend = payments();
    let client = client(&backend);
    backend.fail_next_list(CoreError::Server {
        status: 503,
        message: "fees service restarting".into(),
    });

    let data = client
        .fetch(&list(ResourceKind::FeePayments), QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(ids(&data), vec!["p1", "p2"]);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_after_the_configured_attempts() {
    let backend = payments();
    let client = client(&backend);
    for _ in 0..2 {
        backend.fail_next_list(CoreError::Network {
            message: "connection refused".into(),
        });
    }

    let query = list(ResourceKind::FeePayments);
    let err = client
        .fetch(&query, QueryOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Network { .. }));
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 2);
    let entry = client.store().get(&query.cache_key()).unwrap();
    assert_eq!(entry.status, QueryStatus::Error);
    assert!(!entry.is_fetching);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    let backend = payments();
    let client = client(&backend);
    backend.fail_next_list(CoreError::Client {
        status: 400,
        message: "invalid date".into(),
    });

    let err = client
        .fetch(&list(ResourceKind::FeePayments), QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "invalid date");
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_refetch_keeps_previous_data() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);
    let mut handle = client.watch(query.clone(), QueryOptions::default().retry(0));
    handle.settled().await.unwrap();

    backend.fail_next_list(CoreError::Server {
        status: 500,
        message: "boom".into(),
    });
    let err = handle.refetch().await.unwrap_err();

    let state = handle.state();
    assert_eq!(err.status(), Some(500));
    assert_eq!(state.status, QueryStatus::Error);
    assert_eq!(ids(state.data.as_deref().unwrap()), vec!["p1", "p2"]);
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out() {
    let backend = payments();
    let config = CacheConfig {
        request_timeout: Duration::from_secs(5),
        retry: 0,
        ..CacheConfig::default()
    };
    let client = client_with(&backend, config);
    backend.delay_next_list(Duration::from_secs(60));

    let err = client
        .fetch(&list(ResourceKind::FeePayments), QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err, CoreError::Timeout { timeout_secs: 5 });
}

#[tokio::test(start_paused = true)]
async fn sub_second_timeouts_report_a_whole_second() {
    let backend = payments();
    let config = CacheConfig {
        request_timeout: Duration::from_millis(500),
        retry: 0,
        ..CacheConfig::default()
    };
    let client = client_with(&backend, config);
    backend.delay_next_list(Duration::from_secs(2));

    let err = client
        .fetch(&list(ResourceKind::FeePayments), QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err, CoreError::Timeout { timeout_secs: 1 });
    assert_eq!(err.to_string(), "Request timed out after 1s");
}

#[tokio::test]
async fn unregistered_kind_reports_missing_source() {
    let client = QueryClient::builder().build();
    let err = client
        .fetch(&list(ResourceKind::LibraryBooks), QueryOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::NoSource {
            resource: ResourceKind::LibraryBooks
        }
    );
}

// ── Ordering ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn older_response_never_overwrites_newer() {
    let backend = FakeBackend::default()
        .with(ResourceKind::Exams, vec![json!({ "id": "e1", "title": "Midterm" })]);
    let client = client(&backend);

    // First fetch snapshots the old table, then stalls.
    backend.delay_next_list(Duration::from_secs(5));
    let mut handle = client.watch(list(ResourceKind::Exams), QueryOptions::default());
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Second fetch starts later but answers first.
    backend.replace(
        ResourceKind::Exams,
        vec![
            json!({ "id": "e1", "title": "Midterm" }),
            json!({ "id": "e2", "title": "Final" }),
        ],
    );
    backend.delay_next_list(Duration::from_secs(1));
    client.invalidate_resource(ResourceKind::Exams);

    let state = handle.settled().await.unwrap();
    assert_eq!(ids(state.data.as_deref().unwrap()), vec!["e1", "e2"]);
    let seq = client
        .store()
        .get(&list(ResourceKind::Exams).cache_key())
        .unwrap()
        .seq;

    tokio::time::sleep(Duration::from_secs(10)).await;
    let entry = client
        .store()
        .get(&list(ResourceKind::Exams).cache_key())
        .unwrap();
    assert_eq!(ids(entry.data.as_deref().unwrap()), vec!["e1", "e2"]);
    assert_eq!(entry.seq, seq);
    assert_eq!(backend.list_calls(ResourceKind::Exams), 2);
}

#[tokio::test(start_paused = true)]
async fn dropped_handle_does_not_cancel_fetch() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);

    backend.delay_next_list(Duration::from_secs(2));
    drop(client.watch(query.clone(), QueryOptions::default()));
    tokio::time::sleep(Duration::from_secs(3)).await;

    let entry = client.store().get(&query.cache_key()).unwrap();
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(entry.subscriber_count, 0);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 1);
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn create_refetches_students_and_their_stats() {
    let backend = FakeBackend::default()
        .with(ResourceKind::Students, vec![json!({ "id": "s1", "firstName": "Asha" })])
        .with(ResourceKind::StudentStats, vec![json!({ "id": "all", "count": 1 })]);
    let client = client(&backend);

    let mut students = client.watch(list(ResourceKind::Students), QueryOptions::default());
    let mut stats = client.watch(list(ResourceKind::StudentStats), QueryOptions::default());
    students.settled().await.unwrap();
    stats.settled().await.unwrap();

    let created = client
        .resource(ResourceKind::Students)
        .create(json!({ "firstName": "Ravi" }))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created["firstName"], "Ravi");

    // Refetches are already under way when the mutation resolves.
    assert!(students.state().is_fetching);
    assert!(stats.state().is_fetching);

    let state = students.settled().await.unwrap();
    stats.settled().await.unwrap();
    assert_eq!(state.data.as_deref().map(|d| ids(d).len()), Some(2));
    assert_eq!(backend.list_calls(ResourceKind::Students), 2);
    assert_eq!(backend.list_calls(ResourceKind::StudentStats), 2);
}

#[tokio::test(start_paused = true)]
async fn unrelated_entries_survive_a_mutation() {
    let backend = payments().with(ResourceKind::LibraryBooks, vec![json!({ "id": "b1" })]);
    let client = client(&backend);
    let books = list(ResourceKind::LibraryBooks);
    client.fetch(&books, QueryOptions::default()).await.unwrap();

    client
        .resource(ResourceKind::FeePayments)
        .delete("p1")
        .await
        .unwrap();

    let entry = client.store().get(&books.cache_key()).unwrap();
    assert!(!entry.is_invalidated);
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_entries_are_marked_stale_not_refetched() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);
    client.fetch(&query, QueryOptions::default()).await.unwrap();

    client
        .resource(ResourceKind::FeePayments)
        .update("p2", json!({ "amount": 900 }))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let entry = client.store().get(&query.cache_key()).unwrap();
    assert!(entry.is_invalidated);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 1);
}

#[tokio::test(start_paused = true)]
async fn optimistic_delete_does_not_reappear() {
    let backend = payments();
    let client = client(&backend);
    let mut handle = client.watch(list(ResourceKind::FeePayments), QueryOptions::default());
    handle.settled().await.unwrap();

    let mutation = client.mutation(
        ResourceKind::FeePayments,
        MutationOptions::default().optimistic(OptimisticUpdate::remove_item()),
    );
    mutation.mutate(MutationOp::delete("p1"));

    // Applied before the server answers.
    assert_eq!(mutation.status(), MutationStatus::Pending);
    assert_eq!(ids(handle.state().data.as_deref().unwrap()), vec!["p2"]);

    let mut updates = mutation.subscribe();
    while mutation.is_pending() {
        updates.changed().await.unwrap();
    }
    assert_eq!(mutation.status(), MutationStatus::Success);

    let state = handle.settled().await.unwrap();
    assert_eq!(ids(state.data.as_deref().unwrap()), vec!["p2"]);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_optimistic_mutation_restores_exact_data() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);
    client.fetch(&query, QueryOptions::default()).await.unwrap();
    let before = client.get_query_data(&query).unwrap();

    backend.fail_next_write(CoreError::Server {
        status: 500,
        message: "ledger locked".into(),
    });
    let mutation = client.mutation(
        ResourceKind::FeePayments,
        MutationOptions::default().optimistic(OptimisticUpdate::remove_item()),
    );
    let err = mutation
        .mutate_async(MutationOp::delete("p1"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(mutation.status(), MutationStatus::Error);
    assert_eq!(mutation.error(), Some(err));
    let after = client.get_query_data(&query).unwrap();
    assert_eq!(after, before);
    assert!(!client.store().get(&query.cache_key()).unwrap().is_invalidated);
}

#[tokio::test(start_paused = true)]
async fn rollback_refetches_a_read_whose_refetch_it_superseded() {
    let backend = payments();
    let client = client(&backend);
    let mut handle = client.watch(list(ResourceKind::FeePayments), QueryOptions::default());
    handle.settled().await.unwrap();

    backend.replace(
        ResourceKind::FeePayments,
        vec![
            json!({ "id": "p1", "studentId": "s1", "amount": 1200 }),
            json!({ "id": "p2", "studentId": "s2", "amount": 800 }),
            json!({ "id": "p3", "studentId": "s3", "amount": 450 }),
        ],
    );
    backend.delay_next_list(Duration::from_secs(1));
    client.invalidate_resource(ResourceKind::FeePayments);
    assert!(handle.state().is_fetching);

    backend.fail_next_write(CoreError::Server {
        status: 503,
        message: "ledger offline".into(),
    });
    let mutation = client.mutation(
        ResourceKind::FeePayments,
        MutationOptions::default().optimistic(OptimisticUpdate::remove_item()),
    );
    mutation
        .mutate_async(MutationOp::delete("p1"))
        .await
        .unwrap_err();

    // The rolled-back entry is still invalidated, so a new fetch is under way.
    assert!(handle.state().is_fetching);
    let state = handle.settled().await.unwrap();
    assert_eq!(ids(state.data.as_deref().unwrap()), vec!["p1", "p2", "p3"]);

    // The superseded response lands later and changes nothing.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let entry = client
        .store()
        .get(&list(ResourceKind::FeePayments).cache_key())
        .unwrap();
    assert!(!entry.is_invalidated);
    assert!(!entry.is_fetching);
    assert_eq!(ids(entry.data.as_deref().unwrap()), vec!["p1", "p2", "p3"]);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 3);
}

#[tokio::test(start_paused = true)]
async fn rollback_refetches_when_the_write_started_mid_fetch() {
    let backend = payments();
    let client = client(&backend);
    let mut handle = client.watch(list(ResourceKind::FeePayments), QueryOptions::default());
    handle.settled().await.unwrap();

    backend.delay_next_list(Duration::from_secs(1));
    let refetching = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .refetch(&list(ResourceKind::FeePayments), QueryOptions::default())
                .await
        })
    };
    tokio::task::yield_now().await;
    assert!(handle.state().is_fetching);

    backend.fail_next_write(CoreError::Client {
        status: 409,
        message: "payment already reconciled".into(),
    });
    client
        .mutation(
            ResourceKind::FeePayments,
            MutationOptions::default().optimistic(OptimisticUpdate::remove_item()),
        )
        .mutate_async(MutationOp::delete("p2"))
        .await
        .unwrap_err();

    let state = handle.settled().await.unwrap();
    assert_eq!(state.status, QueryStatus::Success);
    assert_eq!(ids(state.data.as_deref().unwrap()), vec!["p1", "p2"]);

    // The explicit refetch follows the replacement fetch instead of its own.
    let data = refetching.await.unwrap().unwrap();
    assert_eq!(ids(&data), vec!["p1", "p2"]);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 3);
}

#[tokio::test(start_paused = true)]
async fn also_invalidate_extends_the_table() {
    let backend = payments().with(ResourceKind::Notifications, vec![]);
    let client = client(&backend);
    let notifications = list(ResourceKind::Notifications);
    client.fetch(&notifications, QueryOptions::default()).await.unwrap();

    client
        .mutation(
            ResourceKind::FeePayments,
            MutationOptions::default().also_invalidate([ResourceKind::Notifications]),
        )
        .mutate_async(MutationOp::update("p1", json!({ "amount": 1300 })))
        .await
        .unwrap();

    assert!(
        client
            .store()
            .get(&notifications.cache_key())
            .unwrap()
            .is_invalidated
    );
}

#[tokio::test(start_paused = true)]
async fn seeded_data_is_served_without_a_call() {
    let backend = payments();
    let client = client(&backend);
    let query = list(ResourceKind::FeePayments);
    client.set_query_data(
        &query,
        Payload::List(Page::new(vec![json!({ "id": "seed" })])),
    );

    let data = client.fetch(&query, QueryOptions::default()).await.unwrap();
    assert_eq!(ids(&data), vec!["seed"]);
    assert_eq!(backend.list_calls(ResourceKind::FeePayments), 0);
}
