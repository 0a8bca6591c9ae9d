//! End-to-end scenario: insert, query, update with events, query again.

use memdex_codec::{doc, Document};
use memdex_core::{Config, Direction, EventKind, StoreEvent};
use memdex_testkit::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Log = Arc<Mutex<Vec<StoreEvent>>>;

fn record(store: &memdex_core::DocumentStore, kinds: &[EventKind]) -> Log {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    store.on(kinds.iter().copied(), move |event: &StoreEvent| {
        sink.lock().push(event.clone());
    });
    log
}

fn prices(docs: &[Document]) -> Vec<i64> {
    docs.iter().filter_map(|d| d.get("price").as_integer()).collect()
}

#[test]
fn category_price_scenario() {
    init_tracing();
    let store = scenario_store(Config::default().change_debounce(Duration::from_millis(200)));
    let updates = record(&store, &[EventKind::Updated]);
    let changes = record(&store, &[EventKind::Changed]);

    let inserted = store.insert_many(scenario_documents());
    assert_eq!(inserted.len(), 5);

    let category_a = store
        .select_all()
        .eq("category", "A")
        .unwrap()
        .order_by([("price", Direction::Desc)])
        .data()
        .unwrap();
    assert_eq!(ids(&category_a), vec![2, 5, 1]);
    assert_eq!(prices(&category_a), vec![20, 20, 10]);

    let updated = store
        .where_()
        .eq("category", "B")
        .unwrap()
        .update(doc! { "price" => 99 })
        .unwrap();
    assert_eq!(ids(&updated), vec![3, 4]);
    assert_eq!(prices(&updated), vec![99, 99]);

    let price_10 = store.select_all().eq("price", 10).unwrap().data().unwrap();
    assert_eq!(ids(&price_10), vec![1]);
    assert_consistent(&store);

    store.flush_events();
    let events = updates.lock().clone();
    let pairs: Vec<(i64, i64)> = events
        .iter()
        .filter_map(|event| match event {
            StoreEvent::Updated { new, old } => Some((
                old.get("price").as_integer()?,
                new.get("price").as_integer()?,
            )),
            _ => None,
        })
        .collect();
    assert_eq!(pairs, vec![(10, 99), (30, 99)]);

    thread::sleep(Duration::from_millis(1000));
    store.flush_events();
    assert!(!changes.lock().is_empty());
}

#[test]
fn mutation_burst_settles_into_one_change() {
    let store = scenario_store(Config::default().change_debounce(Duration::from_millis(500)));
    let changes = record(&store, &[EventKind::Changed]);

    for document in scenario_documents() {
        store.insert(document).unwrap();
    }
    store.where_().eq("id", 1).unwrap().delete().unwrap();

    thread::sleep(Duration::from_millis(2000));
    store.flush_events();
    assert_eq!(*changes.lock(), vec![StoreEvent::Changed]);
}

#[test]
fn load_emits_single_loaded_event() {
    let store = scenario_store(Config::default());
    let log = record(&store, &[EventKind::Loaded, EventKind::Inserted]);

    assert_eq!(store.load(scenario_documents(), false), 5);
    store.flush_events();

    assert_eq!(*log.lock(), vec![StoreEvent::Loaded]);
}

#[test]
fn delete_events_carry_removed_documents() {
    let store = scenario_store(Config::default());
    store.load(scenario_documents(), false);
    let log = record(&store, &[EventKind::Deleted]);

    let removed = store.where_().gte("price", 20).unwrap().delete().unwrap();
    store.flush_events();

    let deleted: Vec<Document> = log
        .lock()
        .iter()
        .filter_map(|event| match event {
            StoreEvent::Deleted(doc) => Some(doc.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(deleted, removed);
    assert_eq!(ids(&store.data()), vec![1, 3]);
}

#[test]
fn close_is_idempotent_and_silences_listeners() {
    let store = scenario_store(Config::default());
    store.load(scenario_documents(), false);
    let log = record(
        &store,
        &[EventKind::Inserted, EventKind::Deleted, EventKind::Closed],
    );

    store.close();
    store.close();
    assert!(store.data().is_empty());
    assert!(store.select_all().data().unwrap().is_empty());
    assert_consistent(&store);

    store.insert(doc! { "id" => 9, "price" => 1 }).unwrap();
    store.where_().eq("id", 9).unwrap().delete().unwrap();
    store.flush_events();

    assert_eq!(*log.lock(), vec![StoreEvent::Closed]);
}

#[test]
fn snapshot_round_trip_keeps_queries_working() {
    let store = scenario_store(quiet_config());
    store.load(scenario_documents(), false);

    let restored = memdex_core::DocumentStore::from_json(&store.to_json().unwrap(), quiet_config())
        .unwrap();
    assert_eq!(restored.data(), store.data());
    let rows = restored.select_all().between("price", [15, 30]).unwrap().data().unwrap();
    assert_eq!(ids(&rows), vec![2, 5, 4]);
}
