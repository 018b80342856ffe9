use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_i32,
    parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, MonitoringSettings,
    RiskSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMWATCH_HOST", "0.0.0.0");
        let port = env_or_default("EXAMWATCH_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAMWATCH_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("EXAMWATCH_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "ExamWatch API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "examwatch");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "examwatch_db");
        let database_url = env_optional("DATABASE_URL");

        let flag_threshold =
            parse_i32("RISK_FLAG_THRESHOLD", env_or_default("RISK_FLAG_THRESHOLD", "70"))?;
        let weight_low = parse_u32("RISK_WEIGHT_LOW", env_or_default("RISK_WEIGHT_LOW", "1"))?;
        let weight_medium =
            parse_u32("RISK_WEIGHT_MEDIUM", env_or_default("RISK_WEIGHT_MEDIUM", "3"))?;
        let weight_high = parse_u32("RISK_WEIGHT_HIGH", env_or_default("RISK_WEIGHT_HIGH", "7"))?;
        let points_scale =
            parse_u32("RISK_POINTS_SCALE", env_or_default("RISK_POINTS_SCALE", "5"))?;

        let violation_edits_enabled = env_optional("MONITORING_VIOLATION_EDITS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let first_superuser_email =
            env_or_default("FIRST_SUPERUSER_EMAIL", "admin@examwatch.local");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("EXAMWATCH_LOG_LEVEL", "info");
        let json = env_optional("EXAMWATCH_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            risk: RiskSettings {
                flag_threshold,
                weight_low,
                weight_medium,
                weight_high,
                points_scale,
            },
            monitoring: MonitoringSettings { violation_edits_enabled },
            admin: AdminSettings { first_superuser_email, first_superuser_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn risk(&self) -> &RiskSettings {
        &self.risk
    }

    pub(crate) fn monitoring(&self) -> &MonitoringSettings {
        &self.monitoring
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.risk.flag_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "RISK_FLAG_THRESHOLD",
                value: self.risk.flag_threshold.to_string(),
            });
        }

        if self.risk.points_scale == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RISK_POINTS_SCALE",
                value: "0".to_string(),
            });
        }

        if self.risk.weight_low == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RISK_WEIGHT_LOW",
                value: "0".to_string(),
            });
        }

        // Severity weighting must be monotonic or the assessment is meaningless.
        if self.risk.weight_medium < self.risk.weight_low
            || self.risk.weight_high < self.risk.weight_medium
        {
            return Err(ConfigError::InvalidValue {
                field: "RISK_WEIGHT_LOW/MEDIUM/HIGH",
                value: format!(
                    "{}/{}/{}",
                    self.risk.weight_low, self.risk.weight_medium, self.risk.weight_high
                ),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn load_uses_defaults() {
        let _guard = test_support::env_lock().await;
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::remove_var("RISK_FLAG_THRESHOLD");
        std::env::remove_var("RISK_WEIGHT_LOW");
        std::env::remove_var("RISK_WEIGHT_MEDIUM");
        std::env::remove_var("RISK_WEIGHT_HIGH");
        std::env::remove_var("EXAMWATCH_ENV");
        std::env::remove_var("EXAMWATCH_STRICT_CONFIG");
        std::env::remove_var("MONITORING_VIOLATION_EDITS_ENABLED");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.risk().flag_threshold, 70);
        assert_eq!(settings.risk().weight_low, 1);
        assert_eq!(settings.risk().weight_medium, 3);
        assert_eq!(settings.risk().weight_high, 7);
        assert!(!settings.monitoring().violation_edits_enabled);
    }

    #[tokio::test]
    async fn rejects_non_monotonic_weights() {
        let _guard = test_support::env_lock().await;
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::set_var("RISK_WEIGHT_LOW", "5");
        std::env::set_var("RISK_WEIGHT_MEDIUM", "3");
        std::env::set_var("RISK_WEIGHT_HIGH", "7");

        let result = Settings::load();

        std::env::remove_var("RISK_WEIGHT_LOW");
        std::env::remove_var("RISK_WEIGHT_MEDIUM");
        std::env::remove_var("RISK_WEIGHT_HIGH");

        assert!(result.is_err());
    }
}
