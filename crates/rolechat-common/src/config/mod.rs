//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, CorsConfig, DatabaseConfig, Environment, JwtConfig,
    MessageConfig, RateLimitConfig, RealtimeConfig, RedisConfig, ServerConfig, SnowflakeConfig,
};
