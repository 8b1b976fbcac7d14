use std::env::var;
use rocket_pg::{Config, Connection, ConnectionState, Event, Result};


pub async fn main() -> Result<()> {

    let config: Config = var("DATABASE_URL").unwrap().parse()?;
    let mut conn = Connection::new(config.param("application_name", "rocket-pg-example"));
    conn.connect().await?;
    assert_eq!(conn.state(), ConnectionState::Ready);
    conn.query("SELECT 1").await?;
    conn.end().await?;

    let mut conn = Connection::connect_env().await?;
    println!("server_version: {:?}", conn.parameter("server_version"));
    println!("backend key: {:?}", conn.backend_key_data());
    conn.disconnect().await?;

    // second disconnect is a usage error
    conn.disconnect().await.unwrap_err();

    while let Some(event) = conn.poll_event() {
        assert!(matches!(event, Event::Connect | Event::Disconnect));
    }

    Ok(())
}
