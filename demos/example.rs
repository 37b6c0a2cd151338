use dragon_cfg::{Config, Format};
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    host: String,
    port: u16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // dev.json is optional, copy dev.json.dist to override the defaults
    let mut config = Config::load(["demos/default.yaml", "?demos/dev.json"])?;

    println!("Loaded: {:?}", config.files());
    println!("App: {}", config.get_or("app.name", "unnamed").as_str().unwrap_or_default());

    let database: Option<DatabaseSection> = config.get_as("database")?;
    if let Some(database) = database {
        println!("Database: {}:{}", database.host, database.port);
    }

    config.set("app.debug", true);
    println!("{}", config.write_string(Format::Toml.codec(), true)?);

    Ok(())
}
