use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_AGENT_URL: &str = "http://localhost:3000/api/agent";
pub const DEFAULT_AGENT_ID: &str = "69999ae02a0c0e9d62090644";
pub const DEFAULT_AGENT_NAME: &str = "WorkLoad Agent";
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Keys this short are masked entirely
const MASK_REVEAL_MIN: usize = 8;

/// Runtime settings, resolved from the environment and CLI flags
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub agent_url: Url,
    pub agent_id: String,
    pub agent_name: String,
    pub api_key: Option<String>,
    pub log_dir: PathBuf,
    pub log_filter: String,
}

/// Values given on the command line win over the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub agent_url: Option<String>,
    pub agent_id: Option<String>,
}

impl AppConfig {
    pub fn from_env(overrides: &Overrides) -> Result<Self> {
        Self::resolve(|key| env::var(key).ok(), overrides)
    }

    /// Resolve settings through `lookup` so tests don't touch the process environment.
    pub fn resolve<F>(lookup: F, overrides: &Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_url = overrides
            .agent_url
            .clone()
            .or_else(|| var("WORKLOAD_AGENT_URL"))
            .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string());
        let agent_url = parse_agent_url(&raw_url)?;

        let agent_id = overrides
            .agent_id
            .clone()
            .or_else(|| var("WORKLOAD_AGENT_ID"))
            .unwrap_or_else(|| DEFAULT_AGENT_ID.to_string());

        let log_dir = var("WORKLOAD_LOG_DIR").map(PathBuf::from).unwrap_or_else(|| {
            let home = var("HOME").unwrap_or_else(|| ".".to_string());
            PathBuf::from(home).join(".workload")
        });

        Ok(Self {
            agent_url,
            agent_id,
            agent_name: var("WORKLOAD_AGENT_NAME").unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()),
            api_key: var("WORKLOAD_API_KEY"),
            log_dir,
            log_filter: var("WORKLOAD_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        match &self.api_key {
            None => "(not set)".to_string(),
            Some(key) => {
                let chars: Vec<char> = key.chars().collect();
                if chars.len() <= MASK_REVEAL_MIN {
                    return "*".repeat(MASK_REVEAL_MIN);
                }
                let visible = chars.len() - 4;
                let tail: String = chars[visible..].iter().collect();
                format!("{}{}", "*".repeat(visible), tail)
            }
        }
    }
}

fn parse_agent_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid agent URL: {}", raw))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("Agent URL must use http or https, got {}", url.scheme());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let config = AppConfig::resolve(lookup(&[("HOME", "/home/me")]), &Overrides::default())?;

        assert_eq!(config.agent_url.as_str(), DEFAULT_AGENT_URL);
        assert_eq!(config.agent_id, DEFAULT_AGENT_ID);
        assert_eq!(config.agent_name, DEFAULT_AGENT_NAME);
        assert_eq!(config.api_key, None);
        assert_eq!(config.log_dir, PathBuf::from("/home/me/.workload"));
        assert_eq!(config.log_filter, "warn");
        Ok(())
    }

    #[test]
    fn test_environment_values() -> anyhow::Result<()> {
        let env = lookup(&[
            ("WORKLOAD_AGENT_URL", "https://agents.example.com/v1/chat"),
            ("WORKLOAD_AGENT_ID", "agent-xyz"),
            ("WORKLOAD_API_KEY", "sk-123456"),
            ("WORKLOAD_LOG_DIR", "/tmp/wl"),
            ("WORKLOAD_LOG", "workload=debug"),
        ]);
        let config = AppConfig::resolve(env, &Overrides::default())?;

        assert_eq!(config.agent_url.host_str(), Some("agents.example.com"));
        assert_eq!(config.agent_id, "agent-xyz");
        assert_eq!(config.api_key.as_deref(), Some("sk-123456"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/wl"));
        assert_eq!(config.log_filter, "workload=debug");
        Ok(())
    }

    #[test]
    fn test_overrides_win() -> anyhow::Result<()> {
        let env = lookup(&[
            ("WORKLOAD_AGENT_URL", "https://env.example.com"),
            ("WORKLOAD_AGENT_ID", "from-env"),
        ]);
        let overrides = Overrides {
            agent_url: Some("http://127.0.0.1:8080/agent".into()),
            agent_id: Some("from-flag".into()),
        };
        let config = AppConfig::resolve(env, &overrides)?;

        assert_eq!(config.agent_url.as_str(), "http://127.0.0.1:8080/agent");
        assert_eq!(config.agent_id, "from-flag");
        Ok(())
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() -> anyhow::Result<()> {
        let env = lookup(&[("WORKLOAD_AGENT_ID", "   "), ("WORKLOAD_API_KEY", "")]);
        let config = AppConfig::resolve(env, &Overrides::default())?;

        assert_eq!(config.agent_id, DEFAULT_AGENT_ID);
        assert_eq!(config.api_key, None);
        Ok(())
    }

    #[test]
    fn test_invalid_urls_are_rejected() {
        let bad = lookup(&[("WORKLOAD_AGENT_URL", "not a url")]);
        assert!(AppConfig::resolve(bad, &Overrides::default()).is_err());

        let ftp = lookup(&[("WORKLOAD_AGENT_URL", "ftp://files.example.com")]);
        assert!(AppConfig::resolve(ftp, &Overrides::default()).is_err());
    }

    #[test]
    fn test_masked_api_key() -> anyhow::Result<()> {
        let mut config = AppConfig::resolve(lookup(&[]), &Overrides::default())?;
        assert_eq!(config.masked_api_key(), "(not set)");

        config.api_key = Some("sk-abcdef1234".into());
        assert_eq!(config.masked_api_key(), "*********1234");

        config.api_key = Some("ab".into());
        assert_eq!(config.masked_api_key(), "********");

        for short in ["k3y9", "k3y9z", "12345678"] {
            config.api_key = Some(short.into());
            let masked = config.masked_api_key();
            assert_eq!(masked, "********");
            assert!(!masked.contains(&short[short.len() - 1..]));
        }

        config.api_key = Some("123456789".into());
        assert_eq!(config.masked_api_key(), "*****6789");
        Ok(())
    }
}
