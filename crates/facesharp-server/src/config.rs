/// Server configuration, loaded from environment variables.
pub struct Config {
    /// Listen address (default: 0.0.0.0:8000).
    pub bind_addr: String,
    /// Path to the face-mesh ONNX model file.
    pub model_path: String,
    /// Depth of the engine request queue.
    pub engine_queue: usize,
}

impl Config {
    /// Load configuration from `FACESHARP_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("FACESHARP_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            model_path: std::env::var("FACESHARP_MODEL_PATH")
                .unwrap_or_else(|_| facesharp_detect::default_model_path()),
            engine_queue: env_usize("FACESHARP_ENGINE_QUEUE", 4),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_usize_parses_and_falls_back() {
        assert_eq!(env_usize("FACESHARP_TEST_UNSET_QUEUE", 4), 4);
        std::env::set_var("FACESHARP_TEST_QUEUE", "16");
        assert_eq!(env_usize("FACESHARP_TEST_QUEUE", 4), 16);
        std::env::set_var("FACESHARP_TEST_QUEUE", "not-a-number");
        assert_eq!(env_usize("FACESHARP_TEST_QUEUE", 4), 4);
        std::env::remove_var("FACESHARP_TEST_QUEUE");
    }
}
