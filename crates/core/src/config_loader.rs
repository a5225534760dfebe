use crate::config::EtlConfig;
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the ETL configuration by merging the TOML file with `ETL_`
    /// environment variables (`ETL_STORAGE__BASE_PATH=/data`).
    ///
    /// A missing file is not an error; defaults fill every absent value.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value has the wrong type.
    pub fn load(path: impl AsRef<Path>) -> Result<EtlConfig, ConfigError> {
        let config: EtlConfig = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ETL_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads the configuration with a profile overlay (`Config.{profile}.toml`
    /// next to the base file).
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value has the wrong type.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<EtlConfig, ConfigError> {
        let path = path.as_ref();
        let overlay = path.with_file_name(format!("Config.{profile}.toml"));
        let config: EtlConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Toml::file(overlay))
            .merge(Env::prefixed("ETL_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use figment::Jail;
    use secrecy::ExposeSecret;

    #[test]
    fn test_load_from_toml_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [run]
                start_date = "2025-06-01"
                end_date = "2025-06-03"

                [storage]
                base_path = "/tmp/funding"

                [concurrency]
                fetch_concurrency = 8
                "#,
            )?;
            jail.set_env("ETL_TARDIS__API_KEY", "secret-key");
            jail.set_env("ETL_CONCURRENCY__CONVERT_WORKERS", "3");

            let config = ConfigLoader::load("Config.toml").expect("config loads");
            assert_eq!(
                config.run.start_date,
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
            );
            assert_eq!(config.storage.base_path.to_str(), Some("/tmp/funding"));
            assert_eq!(config.concurrency.fetch_concurrency, 8);
            assert_eq!(config.concurrency.convert_workers, 3);
            assert_eq!(
                config.tardis.api_key.as_ref().map(|k| k.expose_secret().to_string()),
                Some("secret-key".to_string())
            );
            // untouched sections keep defaults
            assert_eq!(config.tardis.exchange, "binance-futures");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load("does-not-exist.toml").expect("defaults");
            assert_eq!(config.batch.max_retries, 3);
            Ok(())
        });
    }

    #[test]
    fn test_profile_overlay() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", "[run]\ntest_mode = false\n")?;
            jail.create_file("Config.smoke.toml", "[run]\ntest_mode = true\n")?;
            let config = ConfigLoader::load_with_profile("Config.toml", "smoke").expect("loads");
            assert!(config.run.test_mode);
            Ok(())
        });
    }

    #[test]
    fn test_bad_type_is_error() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", "[concurrency]\nfetch_concurrency = \"many\"\n")?;
            assert!(matches!(
                ConfigLoader::load("Config.toml"),
                Err(ConfigError::Load(_))
            ));
            Ok(())
        });
    }
}
