//! Integration tests for the headline summary cards.

mod common;

use common::{row, FixedBackend};
use insight::config::KpiConfig;
use insight::KpiBoard;
use serde_json::json;

#[tokio::test]
async fn test_cards_show_headline_figures() {
    let backend = FixedBackend::new(vec![row(json!({
        "faturamento_total": 648903.12,
        "total_pedidos": 1811,
        "ticket_medio": "358.32"
    }))]);
    let board = KpiBoard::new(backend.clone());

    let cards = board.cards().await;
    let titles: Vec<_> = cards.iter().map(|c| c.title).collect();
    assert_eq!(titles, vec!["Faturamento Total", "Total de Pedidos", "Ticket Médio"]);
    assert_eq!(cards[0].display_value(), "R$ 648.903,12");
    assert_eq!(cards[1].display_value(), "1.811");
    assert_eq!(cards[2].display_value(), "R$ 358,32");
    assert!(cards.iter().all(|c| !c.loading));
}

#[tokio::test]
async fn test_figures_are_cached_within_ttl() {
    let backend = FixedBackend::new(vec![row(json!({"total_pedidos": 3}))]);
    let board = KpiBoard::new(backend.clone());

    board.cards().await;
    let cards = board.cards().await;
    assert_eq!(backend.submissions(), 1);
    assert_eq!(cards[0].value, 0.0);
    assert_eq!(cards[1].value, 3.0);
}

#[tokio::test]
async fn test_stale_figures_are_refetched() {
    let backend = FixedBackend::new(Vec::new());
    let board = KpiBoard::with_config(backend.clone(), &KpiConfig { ttl_secs: 0 });

    board.cards().await;
    board.cards().await;
    assert_eq!(backend.submissions(), 2);
}

#[tokio::test]
async fn test_failed_fetch_keeps_cards_loading() {
    let backend = FixedBackend::failing();
    let board = KpiBoard::new(backend.clone());

    let cards = board.cards().await;
    assert_eq!(cards.len(), 3);
    assert!(cards.iter().all(|c| c.loading && c.value == 0.0));

    // Failures are not cached.
    board.cards().await;
    assert_eq!(backend.submissions(), 2);
}
