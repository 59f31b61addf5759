//! End-to-end tests against a live PostgreSQL
//!
//! These tests create tables, COPY rows in, and scan them back over a real
//! connection. They are ignored by default; set DATABASE_URL and run
//! `cargo test -- --ignored` to exercise them.

use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rowhaus::prelude::*;
use serde_json::json;
use sqlx::PgPool;

#[model]
pub struct InventoryItem {
    #[primary_key]
    pub id: i64,

    #[index]
    pub sku: String,

    pub qty: i32,

    pub price: f64,

    pub attrs: serde_json::Value,

    pub locations: Vec<String>,

    pub gateway: IpAddr,

    pub received_at: NaiveDateTime,

    pub blob: Vec<u8>,
}

#[model]
pub struct LedgerEntry {
    #[primary_key]
    pub id: i64,

    pub account: String,

    pub amount: u64,

    pub posted_at: DateTime<Utc>,
}

#[model]
pub struct ScratchNote {
    #[primary_key]
    pub id: i64,

    pub body: String,
}

#[model]
pub struct MetricSample {
    #[primary_key]
    pub id: i64,

    pub name: String,

    pub value: i32,
}

async fn connect() -> RowHaus {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for live tests");
    let pool = PgPool::connect(&url)
        .await
        .expect("failed to connect to database");
    RowHaus::from_pool(pool)
}

async fn drop_table(haus: &RowHaus, table: &str) {
    let _ = sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
        .execute(haus.pool())
        .await;
}

fn noon(day: u32, micros: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_micro_opt(12, 0, 0, micros)
        .unwrap()
}

#[tokio::test]
#[ignore] // needs a running PostgreSQL with DATABASE_URL set
async fn create_insert_fetch_round_trip() {
    let mut haus = connect().await;
    drop_table(&haus, "inventory_item").await;

    haus.register_model::<InventoryItem>().unwrap();
    haus.ensure_table::<InventoryItem>().await.unwrap();
    // IF NOT EXISTS makes a second pass a no-op.
    haus.ensure_table::<InventoryItem>().await.unwrap();

    let empty: Vec<InventoryItem> = haus.fetch_all().await.unwrap();
    assert!(empty.is_empty());

    let items = vec![
        InventoryItem {
            id: 1,
            sku: "CBL-0042".to_string(),
            qty: 12,
            price: 2.5,
            attrs: json!({"color": "red", "dims": [1, 2]}),
            locations: vec!["aisle 3".to_string(), "bin 7".to_string()],
            gateway: "10.0.0.1".parse().unwrap(),
            received_at: noon(2, 250_000),
            blob: vec![0x01, 0x02, b'h', b'i'],
        },
        InventoryItem {
            id: 2,
            sku: "CBL-0043".to_string(),
            qty: 3,
            price: 7.25,
            attrs: json!({"color": "blue"}),
            locations: vec![],
            gateway: "192.168.1.1".parse().unwrap(),
            received_at: noon(3, 0),
            blob: vec![],
        },
    ];

    let written = haus.insert(&items).await.unwrap();
    assert_eq!(written, 2);

    let mut back: Vec<InventoryItem> = haus.fetch_all().await.unwrap();
    back.sort_by_key(|item| item.id);
    assert_eq!(back, items);

    drop_table(&haus, "inventory_item").await;
}

#[tokio::test]
#[ignore] // needs a running PostgreSQL with DATABASE_URL set
async fn numeric_and_timestamptz_fields_survive_the_trip() {
    let mut haus = connect().await;
    drop_table(&haus, "ledger_entry").await;

    haus.register_model::<LedgerEntry>().unwrap();

    // DDL and COPY both run inside the transaction.
    let mut tx = haus.begin().await.unwrap();
    tx.ensure_table::<LedgerEntry>().await.unwrap();
    let entries = vec![
        LedgerEntry {
            id: 1,
            account: "ops".to_string(),
            amount: u64::MAX,
            posted_at: "2024-01-15T08:00:00Z".parse().unwrap(),
        },
        LedgerEntry {
            id: 2,
            account: "eng".to_string(),
            amount: 0,
            posted_at: "2024-01-16T23:59:59Z".parse().unwrap(),
        },
    ];
    let written = tx.insert(&entries).await.unwrap();
    assert_eq!(written, 2);
    tx.commit().await.unwrap();

    let mut back: Vec<LedgerEntry> = haus.fetch_all().await.unwrap();
    back.sort_by_key(|entry| entry.id);
    assert_eq!(back, entries);

    drop_table(&haus, "ledger_entry").await;
}

#[tokio::test]
#[ignore] // needs a running PostgreSQL with DATABASE_URL set
async fn rollback_discards_inserted_rows() {
    let mut haus = connect().await;
    drop_table(&haus, "scratch_note").await;

    haus.register_model::<ScratchNote>().unwrap();
    haus.ensure_table::<ScratchNote>().await.unwrap();

    let mut tx = haus.begin().await.unwrap();
    tx.insert_one(&ScratchNote {
        id: 1,
        body: "draft".to_string(),
    })
    .await
    .unwrap();

    let inside: Vec<ScratchNote> = tx.fetch_all().await.unwrap();
    assert_eq!(inside.len(), 1);
    tx.rollback().await.unwrap();

    let after: Vec<ScratchNote> = haus.fetch_all().await.unwrap();
    assert!(after.is_empty());

    drop_table(&haus, "scratch_note").await;
}

#[tokio::test]
#[ignore] // needs a running PostgreSQL with DATABASE_URL set
async fn arbitrary_sql_round_trips_through_fetch_and_execute() {
    let mut haus = connect().await;
    drop_table(&haus, "metric_sample").await;

    haus.register_model::<MetricSample>().unwrap();
    haus.ensure_table::<MetricSample>().await.unwrap();

    let samples: Vec<MetricSample> = (1..=6)
        .map(|i| MetricSample {
            id: i,
            name: format!("sample_{i}"),
            value: (i * 10) as i32,
        })
        .collect();
    haus.insert(&samples).await.unwrap();

    let filtered: Vec<MetricSample> = haus
        .fetch_with("SELECT * FROM metric_sample WHERE value >= 40 ORDER BY id")
        .await
        .unwrap();
    assert_eq!(filtered.len(), 3);
    assert_eq!(filtered[0].id, 4);
    assert_eq!(filtered[2].value, 60);

    let one: Option<MetricSample> = haus
        .fetch_one("SELECT * FROM metric_sample WHERE id = 2")
        .await
        .unwrap();
    assert_eq!(one.unwrap().name, "sample_2");
    let none: Option<MetricSample> = haus
        .fetch_one("SELECT * FROM metric_sample WHERE id = 99")
        .await
        .unwrap();
    assert!(none.is_none());

    let deleted = haus
        .execute("DELETE FROM metric_sample WHERE value < 30")
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    let left: Vec<MetricSample> = haus.fetch_all().await.unwrap();
    assert_eq!(left.len(), 4);

    drop_table(&haus, "metric_sample").await;
}

#[tokio::test]
#[ignore] // needs a running PostgreSQL with DATABASE_URL set
async fn health_check_round_trips() {
    let haus = connect().await;
    haus.health_check().await.unwrap();
}
