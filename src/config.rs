use std::env;

/// Call configuration: where to reach the signaling server and which STUN
/// servers the media engine should gather candidates against.
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Signaling server URL (ws:// or wss://)
    pub signaling_url: String,
    /// STUN server URLs handed to the media engine
    pub stun_servers: Vec<String>,
}

impl CallConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let signaling_url = env::var("TIDECALL_SIGNALING_URL")
            .unwrap_or_else(|_| "ws://127.0.0.1:8080".to_string());
        Self {
            signaling_url,
            ..Default::default()
        }
    }

    /// Configuration for same-host testing: no STUN servers, so the engine
    /// only gathers host candidates.
    pub fn localhost() -> Self {
        Self {
            stun_servers: Vec::new(),
            ..Default::default()
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:8080".to_string(),
            stun_servers: vec![
                "stun:stun.l.google.com:19302".to_string(),
                "stun:stun1.l.google.com:19302".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    // Environment variable tests must not run in parallel
    static ENV_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    #[test]
    fn default_config_has_stun_servers() {
        let config = CallConfig::default();
        assert!(!config.stun_servers.is_empty());
        assert_eq!(config.signaling_url, "ws://127.0.0.1:8080");
    }

    #[test]
    fn localhost_config_disables_stun() {
        assert!(CallConfig::localhost().stun_servers.is_empty());
    }

    #[test]
    fn from_env_respects_override() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("TIDECALL_SIGNALING_URL", "wss://calls.example.com/ws");
        }
        let config = CallConfig::from_env();
        unsafe {
            env::remove_var("TIDECALL_SIGNALING_URL");
        }
        assert_eq!(config.signaling_url, "wss://calls.example.com/ws");
    }
}
