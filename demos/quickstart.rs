use rowhaus::prelude::*;
use serde_json::json;

#[model]
pub struct Member {
    #[primary_key]
    pub id: i64,

    #[index]
    pub name: String,

    #[unique]
    pub email: String,

    pub profile: serde_json::Value,

    pub logins: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 RowHaus Quickstart\n");

    // Database setup: DATABASE_URL / rowhaus.toml win if present
    let config = AppConfig::load().unwrap_or_else(|_| AppConfig {
        database: DatabaseConfig::new(
            "localhost".to_string(), // host
            5432,                    // port
            "rowhaus".to_string(),   // database
            "postgres".to_string(),  // username
            "password".to_string(),  // password
            1,                       // min_connections
            5,                       // max_connections
            30,                      // connection_timeout_seconds
            600,                     // idle_timeout_seconds
            3600,                    // max_lifetime_seconds
        ),
    });

    let mut haus = RowHaus::connect(&config.database).await?;
    haus.health_check().await?;
    println!("✅ Database connected");

    // Register the model and create its table and indexes
    let schema = haus.register_model::<Member>()?;
    println!("📄 DDL:\n{}", schema.create_table_sql());
    for statement in schema.create_index_sql() {
        println!("{statement}");
    }
    haus.ensure_table::<Member>().await?;
    println!("✅ Table ready");

    // Bulk insert through COPY
    let users = vec![
        Member {
            id: 1,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            profile: json!({"theme": "dark"}),
            logins: 4,
        },
        Member {
            id: 2,
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            profile: json!({"theme": "light"}),
            logins: 9,
        },
    ];
    let written = haus.insert(&users).await?;
    println!("✅ Inserted {written} users");

    // Scan rows back into structs
    let everyone: Vec<Member> = haus.fetch_all().await?;
    println!("✅ Loaded {} users", everyone.len());

    let frequent: Vec<Member> = haus
        .fetch_with("SELECT * FROM member WHERE logins >= 5")
        .await?;
    for user in &frequent {
        println!("   frequent visitor: {} <{}>", user.name, user.email);
    }

    // Transactions share the registry and roll back on drop
    let mut tx = haus.begin().await?;
    tx.insert(&[Member {
        id: 3,
        name: "Edsger".to_string(),
        email: "edsger@example.com".to_string(),
        profile: json!({}),
        logins: 0,
    }])
    .await?;
    tx.rollback().await?;
    println!("✅ Rolled back the third user");

    Ok(())
}
