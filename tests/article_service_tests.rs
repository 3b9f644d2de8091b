mod common;

use boutique_api::{
    ApiError, InMemoryRepository,
    article_service::ArticleService,
    models::ArticlePayload,
    repository::{Repository, RepositoryState},
    response::messages,
};
use common::seed_article;
use serde_json::json;
use std::sync::Arc;

fn service() -> (Arc<InMemoryRepository>, ArticleService) {
    let repo = Arc::new(InMemoryRepository::new());
    let service = ArticleService::new(repo.clone() as RepositoryState);
    (repo, service)
}

fn stock_delta(delta: i32) -> ArticlePayload {
    ArticlePayload {
        stock: Some(delta),
        ..Default::default()
    }
}

// --- Single-item operations ---

#[tokio::test]
async fn test_create_with_empty_payload_is_rejected_and_persists_nothing() {
    let (repo, service) = service();

    let err = service.create(ArticlePayload::default()).await.unwrap_err();

    match err {
        ApiError::Validation { message, errors } => {
            assert_eq!(message, messages::ARTICLE_REQUIRED);
            assert!(errors.is_none());
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(repo.list_articles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_reports_field_errors() {
    let (repo, service) = service();

    let err = service
        .create(ArticlePayload {
            name: Some("   ".to_string()),
            price: Some(-1.0),
            stock: None,
        })
        .await
        .unwrap_err();

    match err {
        ApiError::Validation {
            errors: Some(errors),
            ..
        } => {
            assert!(errors.contains_key("name"));
            assert!(errors.contains_key("price"));
        }
        other => panic!("expected field errors, got {other:?}"),
    }
    assert!(repo.list_articles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_defaults_stock_to_zero() {
    let (_repo, service) = service();

    let article = service
        .create(ArticlePayload {
            name: Some("Riz 5kg".to_string()),
            price: Some(4500.0),
            stock: None,
        })
        .await
        .unwrap();

    assert_eq!(article.name, "Riz 5kg");
    assert_eq!(article.stock, 0);
    assert!(!article.is_trashed());
}

#[tokio::test]
async fn test_single_update_applies_delta_without_negativity_guard() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Huile", 1200.0, 3).await;

    let updated = service.update(article.id, stock_delta(-5)).await.unwrap();

    assert_eq!(updated.stock, -2);
    let stored = repo.find_article(article.id).await.unwrap().unwrap();
    assert_eq!(stored.stock, -2);
}

#[tokio::test]
async fn test_update_replaces_other_fields() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Sucre", 800.0, 10).await;

    let updated = service
        .update(
            article.id,
            ArticlePayload {
                name: Some("Sucre en morceaux".to_string()),
                price: Some(950.0),
                stock: Some(2),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Sucre en morceaux");
    assert_eq!(updated.price, 950.0);
    assert_eq!(updated.stock, 12);
}

#[tokio::test]
async fn test_update_with_empty_payload_is_rejected() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Lait", 500.0, 4).await;

    let err = service
        .update(article.id, ArticlePayload::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), messages::ARTICLE_FIELD_REQUIRED);
    assert_eq!(repo.find_article(article.id).await.unwrap().unwrap().stock, 4);
}

#[tokio::test]
async fn test_update_unknown_article_is_not_found() {
    let (_repo, service) = service();

    let err = service.update(42, stock_delta(1)).await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_soft_deleted_article_leaves_default_scope() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Savon", 300.0, 7).await;

    service.delete(article.id).await.unwrap();

    assert!(service.list().await.unwrap().is_empty());
    assert!(matches!(
        service.get(article.id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
    assert!(matches!(
        service.delete(article.id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));

    let trashed = service.list_trashed().await.unwrap();
    assert_eq!(trashed.len(), 1);
    assert!(trashed[0].is_trashed());
}

// --- Trash management ---

#[tokio::test]
async fn test_restore_active_article_is_invalid_state() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Thé", 250.0, 9).await;

    let err = service.restore(article.id).await.unwrap_err();

    match err {
        ApiError::InvalidState(message) => assert_eq!(message, messages::NOT_IN_TRASH),
        other => panic!("expected InvalidState, got {other:?}"),
    }
    let stored = repo.find_article(article.id).await.unwrap().unwrap();
    assert_eq!(stored, article);
}

#[tokio::test]
async fn test_restore_brings_article_back() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Café", 2000.0, 1).await;
    service.delete(article.id).await.unwrap();

    let restored = service.restore(article.id).await.unwrap();

    assert!(!restored.is_trashed());
    assert_eq!(service.get(article.id).await.unwrap().id, article.id);
    assert!(service.list_trashed().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_force_delete_requires_trash() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Farine", 700.0, 5).await;

    let err = service.force_delete(article.id).await.unwrap_err();

    match err {
        ApiError::InvalidState(message) => {
            assert_eq!(message, messages::FORCE_DELETE_NOT_IN_TRASH)
        }
        other => panic!("expected InvalidState, got {other:?}"),
    }
    assert!(repo.find_article(article.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_force_delete_removes_trashed_article_for_good() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Sel", 100.0, 5).await;
    service.delete(article.id).await.unwrap();

    service.force_delete(article.id).await.unwrap();

    assert!(
        repo.find_article_with_trashed(article.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        service.restore(article.id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
}

// --- Batch update ---

#[tokio::test]
async fn test_batch_rejects_empty_list() {
    let (_repo, service) = service();

    let err = service.update_multiple(vec![]).await.unwrap_err();

    assert_eq!(err.to_string(), messages::BATCH_REQUIRED);
    assert!(matches!(err, ApiError::Validation { .. }));
}

#[tokio::test]
async fn test_batch_documented_example() {
    let (repo, service) = service();
    let article = seed_article(&repo, "Biscuits", 150.0, 3).await;
    assert_eq!(article.id, 1);

    let report = service
        .update_multiple(vec![json!({"id": 1, "stock": -5}), json!({"id": 999, "stock": 1})])
        .await
        .unwrap();

    assert!(report.updated_articles.is_empty());
    assert_eq!(report.failed_updates.len(), 2);
    assert_eq!(
        report.failed_updates[0].error_message,
        messages::BATCH_NEGATIVE_STOCK
    );
    assert_eq!(report.failed_updates[0].article_data, json!({"id": 1, "stock": -5}));
    assert_eq!(
        report.failed_updates[1].error_message,
        "Article avec l'ID 999 introuvable"
    );
    assert_eq!(repo.find_article(1).await.unwrap().unwrap().stock, 3);
}

#[tokio::test]
async fn test_batch_commits_valid_items_despite_sibling_failures() {
    let (repo, service) = service();
    let a = seed_article(&repo, "A", 10.0, 10).await;
    let b = seed_article(&repo, "B", 20.0, 1).await;
    let c = seed_article(&repo, "C", 30.0, 0).await;

    let report = service
        .update_multiple(vec![
            json!({"id": a.id, "stock": -4}),
            json!({"id": b.id, "stock": -2}),
            json!({"stock": 3}),
            json!({"id": c.id, "price": 35.5}),
            json!({"id": c.id}),
        ])
        .await
        .unwrap();

    // N = 5, K = 3
    assert_eq!(report.updated_articles.len(), 2);
    assert_eq!(report.failed_updates.len(), 3);
    assert!(report.has_failures());

    let messages_seen: Vec<&str> = report
        .failed_updates
        .iter()
        .map(|f| f.error_message.as_str())
        .collect();
    assert_eq!(
        messages_seen,
        vec![
            messages::BATCH_NEGATIVE_STOCK,
            messages::BATCH_ID_MISSING,
            messages::ARTICLE_FIELD_REQUIRED,
        ]
    );
    assert!(report.updated_articles.iter().all(|u| u.id != b.id));

    assert_eq!(repo.find_article(a.id).await.unwrap().unwrap().stock, 6);
    assert_eq!(repo.find_article(b.id).await.unwrap().unwrap().stock, 1);
    assert_eq!(repo.find_article(c.id).await.unwrap().unwrap().price, 35.5);
}

#[tokio::test]
async fn test_batch_all_valid_has_no_failures() {
    let (repo, service) = service();
    let a = seed_article(&repo, "A", 10.0, 2).await;
    let b = seed_article(&repo, "B", 20.0, 2).await;

    let report = service
        .update_multiple(vec![
            json!({"id": a.id, "stock": 5}),
            json!({"id": b.id, "stock": -2, "name": "B bis"}),
        ])
        .await
        .unwrap();

    assert!(!report.has_failures());
    assert_eq!(report.updated_articles.len(), 2);
    let stored_b = repo.find_article(b.id).await.unwrap().unwrap();
    assert_eq!(stored_b.stock, 0);
    assert_eq!(stored_b.name, "B bis");
}

#[tokio::test]
async fn test_batch_duplicate_ids_accumulate() {
    let (repo, service) = service();
    let a = seed_article(&repo, "A", 10.0, 3).await;

    let report = service
        .update_multiple(vec![
            json!({"id": a.id, "stock": -2}),
            json!({"id": a.id, "stock": -2}),
        ])
        .await
        .unwrap();

    assert_eq!(report.updated_articles.len(), 1);
    assert_eq!(report.updated_articles[0].stock, 1);
    assert_eq!(
        report.failed_updates[0].error_message,
        messages::BATCH_NEGATIVE_STOCK
    );
    assert_eq!(repo.find_article(a.id).await.unwrap().unwrap().stock, 1);
}

#[tokio::test]
async fn test_batch_reaches_trashed_articles() {
    let (repo, service) = service();
    let a = seed_article(&repo, "A", 10.0, 3).await;
    service.delete(a.id).await.unwrap();

    let report = service
        .update_multiple(vec![json!({"id": a.id, "stock": 4})])
        .await
        .unwrap();

    assert!(!report.has_failures());
    let stored = repo.find_article_with_trashed(a.id).await.unwrap().unwrap();
    assert_eq!(stored.stock, 7);
    assert!(stored.is_trashed());
}

#[tokio::test]
async fn test_batch_reports_invalid_field_types_per_item() {
    let (repo, service) = service();
    let a = seed_article(&repo, "A", 10.0, 3).await;

    let report = service
        .update_multiple(vec![
            json!({"id": a.id, "stock": "beaucoup"}),
            json!({"id": a.id, "price": -3.0}),
            json!({"id": "abc", "stock": 1}),
        ])
        .await
        .unwrap();

    assert_eq!(report.failed_updates.len(), 3);
    assert!(
        report.failed_updates[0]
            .error_message
            .starts_with(messages::INVALID_DATA)
    );
    assert!(report.failed_updates[1].error_message.contains("price"));
    assert_eq!(
        report.failed_updates[2].error_message,
        "Article avec l'ID abc introuvable"
    );
    assert_eq!(repo.find_article(a.id).await.unwrap().unwrap().stock, 3);
}

#[tokio::test]
async fn test_batch_accepts_numeric_string_and_integral_float_ids() {
    let (repo, service) = service();
    let a = seed_article(&repo, "A", 10.0, 3).await;
    let b = seed_article(&repo, "B", 10.0, 5).await;

    let report = service
        .update_multiple(vec![
            json!({"id": a.id.to_string(), "stock": 2}),
            json!({"id": b.id as f64, "stock": -1}),
            json!({"id": "1.5", "stock": 1}),
            json!({"id": 2.5, "stock": 1}),
        ])
        .await
        .unwrap();

    assert_eq!(report.updated_articles.len(), 2);
    assert_eq!(repo.find_article(a.id).await.unwrap().unwrap().stock, 5);
    assert_eq!(repo.find_article(b.id).await.unwrap().unwrap().stock, 4);
    assert_eq!(
        report.failed_updates[0].error_message,
        "Article avec l'ID 1.5 introuvable"
    );
    assert_eq!(
        report.failed_updates[1].error_message,
        "Article avec l'ID 2.5 introuvable"
    );
}

#[tokio::test]
async fn test_batch_store_failure_rolls_back_everything() {
    let (repo, service) = service();
    let a = seed_article(&repo, "A", 10.0, 3).await;
    let b = seed_article(&repo, "B", 10.0, 3).await;
    repo.set_fail_writes(true);

    let err = service
        .update_multiple(vec![
            json!({"id": a.id, "stock": 1}),
            json!({"id": b.id, "stock": 1}),
        ])
        .await
        .unwrap_err();

    match err {
        ApiError::Internal(message) => {
            assert!(message.starts_with(messages::BATCH_ERROR_PREFIX))
        }
        other => panic!("expected Internal, got {other:?}"),
    }
    repo.set_fail_writes(false);
    assert_eq!(repo.find_article(a.id).await.unwrap().unwrap().stock, 3);
    assert_eq!(repo.find_article(b.id).await.unwrap().unwrap().stock, 3);
}
