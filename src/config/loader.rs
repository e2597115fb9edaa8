use super::Config;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound for every retry budget.
pub const MAX_RETRY_BUDGET: u32 = 10;

const DB_FILE_NAME: &str = "tagwright.db";

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_in(&home.join(".tagwright"))
    }

    /// Load `config.toml` from `dir`, writing defaults when it is missing.
    pub fn load_or_init_in(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.toml");
        if !dir.exists() {
            fs::create_dir_all(dir).context("Failed to create .tagwright directory")?;
        }

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path.clone_from(&config_path);
            config
        } else {
            let config = Self {
                config_path: config_path.clone(),
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Env override logic over an arbitrary lookup, so tests need not touch
    /// the process environment.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("TAGWRIGHT_MODEL")
            && !model.is_empty()
        {
            self.routing.default_model = model;
        }

        if let Some(model) = lookup("TAGWRIGHT_ROUTER_MODEL")
            && !model.is_empty()
        {
            self.routing.router_model = model;
        }

        if let Some(path) = lookup("TAGWRIGHT_DB")
            && !path.is_empty()
        {
            self.store.path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let guardrail = &self.guardrail;
        for (name, value) in [
            ("max_correction_attempts", guardrail.max_correction_attempts),
            ("max_continuation_attempts", guardrail.max_continuation_attempts),
            ("max_auto_fix_rounds", guardrail.max_auto_fix_rounds),
        ] {
            if value > MAX_RETRY_BUDGET {
                return Err(ConfigError::Validation(format!(
                    "guardrail.{name} = {value} exceeds the maximum of {MAX_RETRY_BUDGET}"
                )));
            }
        }
        if guardrail.snapshot_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "guardrail.snapshot_interval_ms must be greater than zero".into(),
            ));
        }
        if self.routing.default_model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "routing.default_model must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Database file, defaulting next to `config.toml`.
    pub fn database_path(&self) -> PathBuf {
        match &self.store.path {
            Some(path) => path.clone(),
            None => self
                .config_path
                .parent()
                .map_or_else(|| PathBuf::from(DB_FILE_NAME), |dir| dir.join(DB_FILE_NAME)),
        }
    }
}
