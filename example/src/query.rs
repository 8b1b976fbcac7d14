use rocket_pg::{Connection, Result, postgres::TransactionStatus};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    // Execute

    conn.query("CREATE TEMP TABLE rocket(id serial, name text)").await?;

    let res = conn.query("INSERT INTO rocket(name) VALUES('Deez')").await?;
    assert_eq!(res.rows_affected, 1);

    conn.query("INSERT INTO rocket(name) VALUES('Foo'), (NULL)").await?;

    // Queries

    let res = conn.query("SELECT id, name FROM rocket ORDER BY id").await?;

    assert_eq!(res.rows.len(), 3);
    assert_eq!(res.command_tag, "SELECT 3");
    assert_eq!(res.get(0, "name").unwrap(), "Deez");
    assert!(res.rows[2][1].is_null());

    println!("{}", serde_json::to_string_pretty(&res).unwrap());

    // Transaction

    conn.query("BEGIN").await?;
    assert_eq!(conn.transaction_status(), TransactionStatus::Transaction);
    conn.query("DELETE FROM rocket WHERE name IS NULL").await?;
    conn.query("COMMIT").await?;
    assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

    conn.end().await?;

    Ok(())
}
