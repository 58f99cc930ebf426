use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_SPECIALIST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SPECIALIST_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_SUPERVISOR_MAX_ITERATIONS: usize = 5;
pub const DEFAULT_JOB_PRIORITY: i32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub pool_size: usize,
    pub specialist_timeout_secs: u64,
    pub specialist_max_iterations: usize,
    pub supervisor_max_iterations: usize,
    pub default_job_priority: i32,
    pub supervisor_model: String,
    pub specialist_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            specialist_timeout_secs: DEFAULT_SPECIALIST_TIMEOUT_SECS,
            specialist_max_iterations: DEFAULT_SPECIALIST_MAX_ITERATIONS,
            supervisor_max_iterations: DEFAULT_SUPERVISOR_MAX_ITERATIONS,
            default_job_priority: DEFAULT_JOB_PRIORITY,
            supervisor_model: "supervisor-default".to_string(),
            specialist_model: "specialist-default".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            pool_size: parse_var("MONTAGE_POOL_SIZE", defaults.pool_size).max(1),
            specialist_timeout_secs: parse_var(
                "MONTAGE_SPECIALIST_TIMEOUT_SECS",
                defaults.specialist_timeout_secs,
            ),
            specialist_max_iterations: parse_var(
                "MONTAGE_SPECIALIST_MAX_ITERATIONS",
                defaults.specialist_max_iterations,
            ),
            supervisor_max_iterations: parse_var(
                "MONTAGE_SUPERVISOR_MAX_ITERATIONS",
                defaults.supervisor_max_iterations,
            ),
            default_job_priority: parse_var(
                "MONTAGE_DEFAULT_JOB_PRIORITY",
                defaults.default_job_priority,
            ),
            supervisor_model: env::var("MONTAGE_SUPERVISOR_MODEL")
                .unwrap_or(defaults.supervisor_model),
            specialist_model: env::var("MONTAGE_SPECIALIST_MODEL")
                .unwrap_or(defaults.specialist_model),
        }
    }

    pub fn specialist_timeout(&self) -> Duration {
        Duration::from_secs(self.specialist_timeout_secs)
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("{} must be a valid number (got '{}'), using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_fallbacks() {
        // Unset variable
        assert_eq!(parse_var("MONTAGE_TEST_UNSET_VAR", 7usize), 7);

        // SAFETY: only this test touches this variable name
        unsafe { env::set_var("MONTAGE_TEST_BAD_NUMBER", "four") };
        assert_eq!(parse_var("MONTAGE_TEST_BAD_NUMBER", 4usize), 4);

        unsafe { env::set_var("MONTAGE_TEST_GOOD_NUMBER", " 12 ") };
        assert_eq!(parse_var("MONTAGE_TEST_GOOD_NUMBER", 4usize), 12);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.specialist_timeout(), Duration::from_secs(120));
    }
}
