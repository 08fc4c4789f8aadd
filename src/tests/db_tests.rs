//! tests/db_tests.rs - Persistence of accounts, signatures and classifications

#[cfg(test)]
mod tests {
    use crate::db::{account, swap, transaction};
    use crate::error::IndexerError;
    use crate::models::{Classified, SwapRecord, TxAction};
    use crate::tests::support::{setup_pool, setup_wallet, status};
    use solana_sdk::pubkey::Pubkey;

    fn sol_swap(tx_id: i64) -> SwapRecord {
        SwapRecord {
            tx_id,
            client_timestamp: None,
            compute_unit_limit: Some(200_000),
            compute_unit_price: Some(5_000),
            symbol_base: "SOL".to_string(),
            symbol_quote: "USDC".to_string(),
            amount_native_base: -1_000_000_000,
            amount_native_quote: 100_000_000,
        }
    }

    #[tokio::test]
    async fn test_resolve_wallet_requires_single_account() {
        let pool = setup_pool().await;
        let address = Pubkey::new_unique().to_string();

        let missing = account::resolve_wallet(&pool, &address).await;
        assert!(
            matches!(missing, Err(IndexerError::WalletLookup { count: 0, .. })),
            "Unknown wallet must not resolve"
        );

        account::add_account(&pool, &address, Some("main")).await.unwrap();
        account::add_account(&pool, &address, Some("renamed")).await.unwrap();

        let wallet = account::resolve_wallet(&pool, &address).await.unwrap();
        assert_eq!(wallet.address, address);
        assert_eq!(wallet.label.as_deref(), Some("main"), "Existing label should be kept");
    }

    #[tokio::test]
    async fn test_signature_insert_is_idempotent() {
        let pool = setup_pool().await;
        let wallet = setup_wallet(&pool, &Pubkey::new_unique()).await;
        let batch = vec![status("sig1", 10), status("sig2", 11), status("sig3", 11)];

        let inserted = transaction::add_signatures(&pool, wallet.id, &batch).await.unwrap();
        assert_eq!(inserted, 3);

        let inserted = transaction::add_signatures(&pool, wallet.id, &batch).await.unwrap();
        assert_eq!(inserted, 0, "Duplicate signatures should be ignored");

        let count = transaction::count_transactions(&pool, wallet.id).await.unwrap();
        assert_eq!(count, 3, "Should have exactly 3 transactions");
    }

    #[tokio::test]
    async fn test_failed_transaction_error_is_stored() {
        let pool = setup_pool().await;
        let wallet = setup_wallet(&pool, &Pubkey::new_unique()).await;

        let mut failed = status("failed", 42);
        failed.error = Some(r#"{"InstructionError":[2,{"Custom":6001}]}"#.to_string());
        failed.memo = Some("memo".to_string());

        transaction::add_signatures(&pool, wallet.id, &[failed.clone()]).await.unwrap();

        let stored = transaction::get_transactions(&pool, wallet.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].slot, 42);
        assert_eq!(stored[0].error, failed.error);
        assert_eq!(stored[0].memo.as_deref(), Some("memo"));
        assert_eq!(stored[0].action, None, "New rows start unclassified");
    }

    #[tokio::test]
    async fn test_cursor_queries() {
        let pool = setup_pool().await;
        let wallet = setup_wallet(&pool, &Pubkey::new_unique()).await;

        assert_eq!(transaction::latest_slot(&pool, wallet.id).await.unwrap(), None);

        let batch = vec![status("a", 5), status("b", 7), status("c", 7), status("d", 9)];
        transaction::add_signatures(&pool, wallet.id, &batch).await.unwrap();

        assert_eq!(transaction::latest_slot(&pool, wallet.id).await.unwrap(), Some(9));
        assert_eq!(
            transaction::last_signature_before_slot(&pool, wallet.id, 9).await.unwrap(),
            Some("c".to_string()),
            "Latest signature of the previous slot"
        );
        assert_eq!(
            transaction::last_signature_before_slot(&pool, wallet.id, 5).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_unclassified_selection_is_oldest_first_and_limited() {
        let pool = setup_pool().await;
        let wallet = setup_wallet(&pool, &Pubkey::new_unique()).await;
        let batch: Vec<_> = (0..5).map(|i| status(&format!("sig{}", i), 100 + i)).collect();
        transaction::add_signatures(&pool, wallet.id, &batch).await.unwrap();

        let pending = transaction::get_unclassified(&pool, wallet.id, 3).await.unwrap();
        let signatures: Vec<_> = pending.iter().map(|p| p.signature.as_str()).collect();
        assert_eq!(signatures, vec!["sig0", "sig1", "sig2"]);
    }

    #[tokio::test]
    async fn test_commit_classifications_is_replay_safe() {
        let pool = setup_pool().await;
        let wallet = setup_wallet(&pool, &Pubkey::new_unique()).await;
        transaction::add_signatures(&pool, wallet.id, &[status("swap", 1), status("other", 2)])
            .await
            .unwrap();

        let pending = transaction::get_unclassified(&pool, wallet.id, 10).await.unwrap();
        let batch = vec![
            Classified {
                tx_id: pending[0].id,
                action: TxAction::Swap,
                swap: Some(sol_swap(pending[0].id)),
            },
            Classified::undefined(pending[1].id),
        ];

        let updated = transaction::commit_classifications(&pool, &batch).await.unwrap();
        assert_eq!(updated, 2);

        let updated = transaction::commit_classifications(&pool, &batch).await.unwrap();
        assert_eq!(updated, 0, "Classified rows must not be reclassified");

        let swaps = swap::get_swaps(&pool).await.unwrap();
        assert_eq!(swaps, vec![sol_swap(pending[0].id)], "Swap should be stored once");

        let actions: Vec<_> = transaction::get_transactions(&pool, wallet.id)
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.action)
            .collect();
        assert_eq!(actions, vec![Some(TxAction::Swap), Some(TxAction::Undefined)]);

        let pending = transaction::get_unclassified(&pool, wallet.id, 10).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_pairs_uses_latest_swap() {
        let pool = setup_pool().await;
        let wallet = setup_wallet(&pool, &Pubkey::new_unique()).await;
        transaction::add_signatures(&pool, wallet.id, &[status("first", 1), status("second", 2)])
            .await
            .unwrap();
        let pending = transaction::get_unclassified(&pool, wallet.id, 10).await.unwrap();

        let mut first = sol_swap(pending[0].id);
        first.amount_native_base = -2_000_000;
        first.amount_native_quote = 300;
        let mut second = sol_swap(pending[1].id);
        second.amount_native_base = 1_000_000;
        second.amount_native_quote = -200;

        let batch = vec![
            Classified { tx_id: first.tx_id, action: TxAction::Swap, swap: Some(first) },
            Classified { tx_id: second.tx_id, action: TxAction::Swap, swap: Some(second) },
        ];
        transaction::commit_classifications(&pool, &batch).await.unwrap();

        let pairs = swap::summarize_pairs(&pool).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].amount_native_base, -1_000_000);
        assert_eq!(pairs[0].amount_native_quote, 100);
        assert_eq!(pairs[0].last_amount_native_base, 1_000_000);
        assert_eq!(pairs[0].last_amount_native_quote, -200);
    }
}
