use docqa_core::config::Settings;
use docqa_core::error::Error;
use docqa_core::traits::EmbeddingProvider;
use docqa_embed::{provider_from_settings, HashingProvider};

#[tokio::test]
async fn hashing_provider_is_deterministic() {
    let provider = HashingProvider::new(256);
    let texts = vec!["survival water filtration".to_string(), "solar power".to_string()];
    let a = provider.embed(&texts).await.expect("embed");
    let b = provider.embed(&texts).await.expect("embed");
    assert_eq!(a, b);
}

#[tokio::test]
async fn hashing_provider_shape_and_norm() {
    let provider = HashingProvider::new(64);
    assert_eq!(provider.dim(), 64);
    assert_eq!(provider.provider_id(), "hash:d64");

    let texts = vec!["one two three".to_string()];
    let vectors = provider.embed(&texts).await.expect("embed");
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0].len(), 64);
    let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4, "vectors are L2-normalized, norm={norm}");
}

#[tokio::test]
async fn different_texts_embed_differently() {
    let provider = HashingProvider::new(128);
    let texts = vec!["alpha bravo".to_string(), "charlie delta".to_string()];
    let vectors = provider.embed(&texts).await.expect("embed");
    assert_ne!(vectors[0], vectors[1]);
}

#[test]
fn unknown_provider_is_config_error() {
    let mut settings = Settings::default();
    settings.embedding.provider = "quantum".to_string();
    let err = provider_from_settings(&settings).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn hash_provider_selected_from_settings() {
    let mut settings = Settings::default();
    settings.embedding.provider = "hash".to_string();
    settings.embedding.hash_dim = 32;
    let provider = provider_from_settings(&settings).expect("provider");
    assert_eq!(provider.dim(), 32);
}
