//! Unit tests for configuration module
//!
//! These tests validate configuration parsing, defaults, environment overlay and validation.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use crate::config::*;
    use crate::errors::ErrorKind;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn complete_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
            ("PINECONE_INDEX", "nvidia-financial-reports"),
        ]));
        config
    }

    // ====== Default Value Tests ======

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.embedding_model(), "text-embedding-3-small");
        assert_eq!(config.embedding_dimension(), 1536);
        assert_eq!(config.llm_model(), "gpt-4o-mini");
        assert!(config.llm.temperature > 0.0 && config.llm.temperature < 0.5);
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.retrieval.max_context_chars, 12_000);
        assert_eq!(config.http.max_retries, 1);
        assert_eq!(config.http_timeout().as_secs(), 30);
        assert!(config.pinecone_api_key().is_none());
    }

    // ====== TOML Parsing Tests ======

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[pinecone]
index_name = "reports"
namespace = "mistral_recursive"

[retrieval]
default_top_k = 8
"#,
        )
        .unwrap();

        assert_eq!(config.pinecone_index_name(), Some("reports"));
        assert_eq!(config.pinecone_namespace(), Some("mistral_recursive"));
        assert_eq!(config.retrieval.default_top_k, 8);
        assert_eq!(config.retrieval.max_context_chars, 12_000);
        assert_eq!(config.embedding_endpoint(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = AppConfig::from_toml_str("[retrieval]\ndefault_top_k = \"five\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nllm_model = \"gpt-4o\"\ntemperature = 0.2\n\n[http]\nmax_retries = 0"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.llm_model(), "gpt-4o");
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.http.max_retries, 0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AppConfig::from_file("/definitely/not/here/config.toml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    // ====== Environment Overlay Tests ======

    #[test]
    fn test_openai_key_fills_both_providers() {
        let config = complete_config();
        assert_eq!(config.embedding_api_key(), Some("sk-test"));
        assert_eq!(config.llm_key(), Some("sk-test"));
        assert_eq!(config.pinecone_api_key(), Some("pc-test"));
        assert_eq!(config.pinecone_index_name(), Some("nvidia-financial-reports"));
    }

    #[test]
    fn test_openai_key_does_not_override_file_keys() {
        let mut config =
            AppConfig::from_toml_str("[llm]\nllm_key = \"sk-from-file\"").unwrap();
        config.apply_env_with(env(&[("OPENAI_API_KEY", "sk-env")]));

        assert_eq!(config.llm_key(), Some("sk-from-file"));
        assert_eq!(config.embedding_api_key(), Some("sk-env"));
    }

    #[test]
    fn test_pinecone_env_overrides_file() {
        let mut config =
            AppConfig::from_toml_str("[pinecone]\nindex_name = \"old\"").unwrap();
        config.apply_env_with(env(&[
            ("PINECONE_INDEX", "new"),
            ("PINECONE_INDEX_HOST", "new-abc.svc.pinecone.io"),
            ("PINECONE_NAMESPACE", "ns"),
            ("REPORTRAG_LOG_LEVEL", "debug"),
        ]));

        assert_eq!(config.pinecone_index_name(), Some("new"));
        assert_eq!(config.pinecone_index_host(), Some("new-abc.svc.pinecone.io"));
        assert_eq!(config.pinecone_namespace(), Some("ns"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[("PINECONE_API_KEY", "   ")]));
        assert!(config.pinecone_api_key().is_none());
    }

    // ====== Validation Tests ======

    #[test]
    fn test_validate_complete_config() {
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_validate_names_every_missing_item() {
        let err = AppConfig::default().validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let message = err.to_string();
        assert!(message.contains("OPENAI_API_KEY"));
        assert!(message.contains("PINECONE_API_KEY"));
        assert!(message.contains("PINECONE_INDEX"));
    }

    #[test]
    fn test_validate_names_only_the_missing_index() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
        ]));

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("pinecone.index_name"));
        assert!(!message.contains("PINECONE_API_KEY"));
        assert!(!message.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = complete_config();
        config.retrieval.default_top_k = 0;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("default_top_k"));
    }

    #[test]
    fn test_validate_rejects_zero_context_budget() {
        let mut config = complete_config();
        config.retrieval.max_context_chars = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("max_context_chars"));
    }

    #[test]
    fn test_validate_caps_retries() {
        let mut config = complete_config();
        config.http.max_retries = 0;
        assert!(config.validate().is_ok());
        config.http.max_retries = MAX_RETRIES;
        assert!(config.validate().is_ok());
        config.http.max_retries = 5;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("http.max_retries"));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = complete_config();
        config.llm.llm_endpoint = "not a url".to_string();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("llm.llm_endpoint"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut config = complete_config();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("idx-abc.svc.pinecone.io"),
            "https://idx-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }
}
