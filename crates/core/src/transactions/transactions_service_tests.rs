//! Tests for TransactionService.

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::errors::Error;
    use crate::recurring::{NewRecurringJob, RecurringFrequency, RecurringJobServiceTrait};
    use crate::shared_wallets::{NewSharedWallet, NewWalletMember, SharedWalletServiceTrait};
    use crate::test_support::{at, date, new_expense, TestHarness};
    use crate::transactions::{
        NewTransaction, TransactionFilter, TransactionServiceTrait, TransactionType,
        TransactionUpdate,
    };

    async fn wallet_with_members(h: &TestHarness) -> String {
        let details = h
            .wallet_service
            .create_wallet(NewSharedWallet {
                id: None,
                name: "Flat".to_string(),
                owner_id: "a".to_string(),
                owner_share_ratio: Some(dec!(0.5)),
            })
            .await
            .unwrap();
        h.wallet_service
            .add_member(NewWalletMember {
                wallet_id: details.wallet.id.clone(),
                member_id: "b".to_string(),
                share_ratio: dec!(0.5),
                is_admin: false,
            })
            .await
            .unwrap();
        details.wallet.id
    }

    fn shared_expense(user: &str, wallet_id: &str, amount: Decimal) -> NewTransaction {
        NewTransaction {
            shared_wallet_id: Some(wallet_id.to_string()),
            ..new_expense(user, "Groceries", amount, date(2024, 3, 1))
        }
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let h = TestHarness::new();
        let created = h
            .transaction_service
            .create_transaction(new_expense("u1", "Food", dec!(12.345), date(2024, 3, 1)))
            .await
            .unwrap();
        assert_eq!(created.amount, dec!(12.35));
        assert_eq!(created.currency, "USD");
        assert_eq!(created.signed_amount(), dec!(-12.35));

        let fetched = h.transaction_service.get_transaction(&created.id).unwrap();
        assert_eq!(fetched, created);

        let listed = h
            .transaction_service
            .list_transactions("u1", &TransactionFilter::default())
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(h
            .transaction_service
            .list_transactions("u2", &TransactionFilter::default())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_storage() {
        let h = TestHarness::new();
        let err = h
            .transaction_service
            .create_transaction(new_expense("u1", "Food", dec!(-1), date(2024, 3, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(h.transactions.all().is_empty());
    }

    #[tokio::test]
    async fn test_summary() {
        let h = TestHarness::new();
        h.transaction_service
            .create_transaction(new_expense("u1", "Food", dec!(40), date(2024, 3, 1)))
            .await
            .unwrap();
        let mut salary = new_expense("u1", "Salary", dec!(100), date(2024, 3, 2));
        salary.transaction_type = TransactionType::Income;
        h.transaction_service.create_transaction(salary).await.unwrap();

        let summary = h
            .transaction_service
            .get_summary("u1", &TransactionFilter::default())
            .unwrap();
        assert_eq!(summary.total_income, dec!(100));
        assert_eq!(summary.total_expense, dec!(40));
        assert_eq!(summary.net_balance, dec!(60));
    }

    #[tokio::test]
    async fn test_empty_update_is_a_no_op() {
        let h = TestHarness::new();
        let created = h
            .transaction_service
            .create_transaction(new_expense("u1", "Food", dec!(5), date(2024, 3, 1)))
            .await
            .unwrap();
        let unchanged = h
            .transaction_service
            .update_transaction(&created.id, TransactionUpdate::default())
            .await
            .unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn test_update_missing_transaction_is_not_found() {
        let h = TestHarness::new();
        let err = h
            .transaction_service
            .update_transaction(
                "missing",
                TransactionUpdate {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_wallet_transaction_requires_membership() {
        let h = TestHarness::new();
        let wallet_id = wallet_with_members(&h).await;

        let err = h
            .transaction_service
            .create_transaction(shared_expense("stranger", &wallet_id, dec!(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = h
            .transaction_service
            .create_transaction(shared_expense("a", "no-such-wallet", dec!(10)))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_wallet_balances_follow_transaction_lifecycle() {
        let h = TestHarness::new();
        let wallet_id = wallet_with_members(&h).await;

        let tx = h
            .transaction_service
            .create_transaction(shared_expense("a", &wallet_id, dec!(80)))
            .await
            .unwrap();
        let balance = |member: &str| {
            h.wallet_service
                .get_wallet_details(&wallet_id)
                .unwrap()
                .members
                .into_iter()
                .find(|m| m.member_id == member)
                .unwrap()
                .running_balance
        };
        assert_eq!(balance("a"), dec!(40));
        assert_eq!(balance("b"), dec!(-40));

        h.transaction_service
            .update_transaction(
                &tx.id,
                TransactionUpdate {
                    amount: Some(dec!(100)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(balance("a"), dec!(50));

        // Detaching from the wallet settles the wallet it left.
        h.transaction_service
            .update_transaction(
                &tx.id,
                TransactionUpdate {
                    shared_wallet_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(balance("a"), Decimal::ZERO);
        assert_eq!(balance("b"), Decimal::ZERO);

        h.transaction_service
            .update_transaction(
                &tx.id,
                TransactionUpdate {
                    shared_wallet_id: Some(Some(wallet_id.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(balance("b"), dec!(-50));

        h.transaction_service.delete_transaction(&tx.id).await.unwrap();
        assert_eq!(balance("a"), Decimal::ZERO);
        assert_eq!(balance("b"), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_deleting_a_template_deactivates_its_job() {
        let h = TestHarness::new();
        let template = h
            .transaction_service
            .create_transaction(new_expense("u1", "Rent", dec!(900), date(2024, 1, 1)))
            .await
            .unwrap();
        let job = h
            .job_service
            .create_job(NewRecurringJob {
                id: None,
                user_id: "u1".to_string(),
                template_transaction_id: template.id.clone(),
                frequency: RecurringFrequency::Monthly,
                first_execution_at: Some(at(2024, 2, 1, 9)),
            })
            .await
            .unwrap();

        let deleted = h
            .transaction_service
            .delete_transaction(&template.id)
            .await
            .unwrap();
        assert_eq!(deleted.id, template.id);

        let job = h.job_service.get_job(&job.id).unwrap();
        assert!(!job.is_active);
        assert!(h
            .transaction_service
            .get_transaction(&template.id)
            .unwrap_err()
            .is_not_found());
    }
}
