use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 5000, worker_threads: None, log_format: default_log_format() }
    }
}

/// Which storage backend the process runs against.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Mongo,
    Mock,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
}

/// Connection settings for the document store.
///
/// `username` and `password` are stored base64-encoded, as in the deployed
/// config files; use [`MongoConfig::decoded_credentials`] to read them.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    pub collection: String,
    #[serde(default = "default_reload_collection")]
    pub reload_collection: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 27017,
            username: String::new(),
            password: String::new(),
            database: "albums".into(),
            collection: "albums".into(),
            reload_collection: default_reload_collection(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Record schema and routing, enforced by the HTTP layer only.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub route: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub optional_fields: Vec<String>,
    #[serde(default)]
    pub integer_fields: Vec<String>,
    #[serde(default)]
    pub date_fields: Vec<String>,
    pub sort_by: String,
    pub demo_data_file: String,
    #[serde(default = "default_startup_jitter")]
    pub startup_jitter_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            route: "albums".into(),
            required_fields: vec!["title".into(), "artist".into()],
            optional_fields: vec!["year".into(), "label".into(), "released".into()],
            integer_fields: vec!["year".into()],
            date_fields: vec!["released".into()],
            sort_by: "title".into(),
            demo_data_file: "data/albums.json".into(),
            startup_jitter_ms: default_startup_jitter(),
        }
    }
}

fn default_log_format() -> String { "compact".into() }
fn default_reload_collection() -> String { "apistatus".into() }
fn default_connect_timeout() -> u64 { 10 }
fn default_startup_jitter() -> u64 { 3000 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("cannot read config file {path}"))?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.mongo.apply_env_overrides(|key| std::env::var(key).ok())?;
        if self.storage.backend == BackendKind::Mongo {
            self.mongo.validate()?;
        }
        self.api.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        // unset (or 0) leaves the choice to TOKIO_WORKER_THREADS / tokio's default
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        Ok(())
    }
}

impl MongoConfig {
    /// `MONGO_HOST` / `MONGO_PORT` take precedence over the file, which makes
    /// the same config usable inside a container.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MONGO_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("MONGO_PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("MONGO_PORT is not a valid port: {port}"))?;
        }
        Ok(())
    }

    /// Decode the base64 username/password pair. `None` when no username is configured.
    pub fn decoded_credentials(&self) -> Result<Option<(String, String)>> {
        if self.username.trim().is_empty() {
            return Ok(None);
        }
        let user = decode_secret("mongo.username", &self.username)?;
        let pwd = decode_secret("mongo.password", &self.password)?;
        Ok(Some((user, pwd)))
    }

    /// `host:port`, as shown on the landing page and in connection errors.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("mongo.host is empty; set it in config.toml or MONGO_HOST"));
        }
        if self.port == 0 {
            return Err(anyhow!("mongo.port must be in 1..=65535"));
        }
        if self.database.trim().is_empty() || self.collection.trim().is_empty() {
            return Err(anyhow!("mongo.database and mongo.collection are required"));
        }
        if self.reload_collection == self.collection {
            return Err(anyhow!("mongo.reload_collection must differ from mongo.collection"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(anyhow!("mongo.connect_timeout_secs must be a positive number of seconds"));
        }
        self.decoded_credentials()?;
        Ok(())
    }
}

fn decode_secret(name: &str, encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .with_context(|| format!("{name} is not valid base64"))?;
    let text = String::from_utf8(bytes).with_context(|| format!("{name} is not valid UTF-8"))?;
    Ok(text.trim().to_string())
}

impl ApiConfig {
    /// Fields accepted in a record body: required first, then optional.
    pub fn allowed_fields(&self) -> Vec<String> {
        self.required_fields
            .iter()
            .chain(self.optional_fields.iter())
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let route = self.route.trim_matches('/');
        if route.is_empty() || route.contains('/') {
            return Err(anyhow!("api.route must be a single non-empty path segment"));
        }
        if self.sort_by.trim().is_empty() {
            return Err(anyhow!("api.sort_by is required"));
        }
        let allowed = self.allowed_fields();
        for f in self.integer_fields.iter().chain(self.date_fields.iter()) {
            if !allowed.contains(f) {
                return Err(anyhow!("typed field {f} is not listed in required_fields or optional_fields"));
            }
        }
        if let Some(f) = self.integer_fields.iter().find(|f| self.date_fields.contains(f)) {
            return Err(anyhow!("field {f} cannot be both integer and date"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 5000

        [storage]
        backend = "mock"

        [mongo]
        host = "db.internal"
        port = 27017
        username = "YWRtaW4K"
        password = "czNjcjN0"
        database = "music"
        collection = "albums"

        [api]
        route = "albums"
        required_fields = ["title", "artist"]
        optional_fields = ["year", "label", "released"]
        integer_fields = ["year"]
        date_fields = ["released"]
        sort_by = "title"
        demo_data_file = "data/albums.json"
    "#;

    #[test]
    fn parses_sample_config() -> Result<()> {
        let cfg = load_from_str(SAMPLE)?;
        assert_eq!(cfg.storage.backend, BackendKind::Mock);
        assert_eq!(cfg.mongo.reload_collection, "apistatus");
        assert_eq!(cfg.mongo.connect_timeout_secs, 10);
        assert_eq!(cfg.api.startup_jitter_ms, 3000);
        assert_eq!(cfg.api.allowed_fields(), vec!["title", "artist", "year", "label", "released"]);
        Ok(())
    }

    #[test]
    fn credentials_are_base64_decoded_and_trimmed() -> Result<()> {
        let cfg = load_from_str(SAMPLE)?;
        let (user, pwd) = cfg.mongo.decoded_credentials()?.expect("credentials");
        // "admin\n" decodes with a trailing newline that must be stripped
        assert_eq!(user, "admin");
        assert_eq!(pwd, "s3cr3t");
        Ok(())
    }

    #[test]
    fn empty_username_means_no_credentials() -> Result<()> {
        let cfg = MongoConfig::default();
        assert!(cfg.decoded_credentials()?.is_none());
        Ok(())
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let cfg = MongoConfig { username: "***".into(), ..MongoConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let mut cfg = load_from_str(SAMPLE)?.mongo;
        cfg.apply_env_overrides(|key| match key {
            "MONGO_HOST" => Some("mongo".to_string()),
            "MONGO_PORT" => Some("27018".to_string()),
            _ => None,
        })?;
        assert_eq!(cfg.target(), "mongo:27018");
        Ok(())
    }

    #[test]
    fn bad_env_port_is_an_error() {
        let mut cfg = MongoConfig::default();
        let res = cfg.apply_env_overrides(|key| (key == "MONGO_PORT").then(|| "abc".to_string()));
        assert!(res.is_err());
    }

    #[test]
    fn typed_fields_must_be_allowed() {
        let api = ApiConfig { integer_fields: vec!["tracks".into()], ..ApiConfig::default() };
        assert!(api.validate().is_err());
    }

    #[test]
    fn defaults_validate() -> Result<()> {
        let mut cfg = AppConfig::default();
        cfg.server.normalize()?;
        cfg.mongo.validate()?;
        cfg.api.validate()?;
        Ok(())
    }

    #[test]
    fn unset_worker_threads_stay_unset() -> Result<()> {
        let mut cfg = load_from_str(SAMPLE)?;
        cfg.server.normalize()?;
        assert_eq!(cfg.server.worker_threads, None);

        cfg.server.worker_threads = Some(0);
        cfg.server.normalize()?;
        assert_eq!(cfg.server.worker_threads, None);

        cfg.server.worker_threads = Some(8);
        cfg.server.normalize()?;
        assert_eq!(cfg.server.worker_threads, Some(8));
        Ok(())
    }
}
