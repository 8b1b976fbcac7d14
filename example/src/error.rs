use rocket_pg::{Connection, ConnectionState, ErrorKind, Result};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    let err = conn.query("").await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::EmptyQuery(_)));

    let err = conn.query("SELECT foo").await.unwrap_err();
    let ErrorKind::Database(db) = err.kind() else {
        panic!("{err}");
    };
    println!("{db}");

    // failed query does not kill the connection
    assert_eq!(conn.state(), ConnectionState::Ready);
    let res = conn.query("SELECT 'recovered'").await?;
    assert_eq!(res.rows[0][0], "recovered");

    conn.query("BEGIN").await?;
    let err = conn.query("SELECT 1/0").await.unwrap_err();
    assert!(!err.is_fatal());
    conn.query("ROLLBACK").await?;

    conn.end().await?;

    Ok(())
}
