// Configuration loading for the Prometheus adapter
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct PromConfig {
    pub prometheus: PromSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub fn load_prom_config() -> anyhow::Result<PromConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/prometheus"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
