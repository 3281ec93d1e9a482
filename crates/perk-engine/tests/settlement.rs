//! End-to-end settlement tests against an in-memory database.
//!
//! These exercise the full pipeline: validation → reward resolution →
//! atomic commit → campaign evaluation → response.

use perk_core::{
    CampaignKind, CouponSource, CouponStatus, ManualDiscount, Money, MovementKind, PaymentMethod,
    RewardKind, TransactionStatus,
};
use perk_db::{Database, DbConfig};
use perk_engine::{
    CampaignEngine, CouponService, EngineConfig, EngineError, ErrorCode, IngestService,
    RewardWorker, SettlementRequest, SettlementService,
};

async fn memory_db() -> Database {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A customer with a linked card, as the console sees them after a scan.
struct Member {
    customer_id: String,
    card_id: String,
}

async fn seed_member(db: &Database, name: &str, uid: &str) -> Member {
    let customer = db.customers().create(name).await.unwrap();
    let card = db
        .customers()
        .create_card(uid, Some(&customer.id), None)
        .await
        .unwrap();
    Member {
        customer_id: customer.id,
        card_id: card.id,
    }
}

fn charge(member: &Member, cents: i64, method: PaymentMethod) -> SettlementRequest {
    SettlementRequest {
        customer_id: member.customer_id.clone(),
        card_id: member.card_id.clone(),
        amount_cents: cents,
        payment_method: method,
        is_topup: false,
        discount_id: None,
        coupon_id: None,
        campaign_id: None,
        manual_discount: None,
        admin_id: None,
    }
}

fn topup(member: &Member, cents: i64) -> SettlementRequest {
    SettlementRequest {
        is_topup: true,
        ..charge(member, cents, PaymentMethod::Cash)
    }
}

// =============================================================================
// Wallet payment
// =============================================================================

#[tokio::test]
async fn wallet_charge_debits_exact_amount() {
    // Scenario: 50.00 in the wallet, 30.00 charge.
    let db = memory_db().await;
    let member = seed_member(&db, "Amira Khan", "04A1").await;
    let service = SettlementService::new(db.clone());

    service.settle(topup(&member, 5_000)).await.unwrap();

    let response = service
        .settle(charge(&member, 3_000, PaymentMethod::Wallet))
        .await
        .unwrap();

    assert_eq!(response.status, TransactionStatus::Completed);
    assert_eq!(response.amount_after, Money::from_cents(3_000));
    assert_eq!(response.customer.balance_cents, 2_000);

    // Exactly one withdrawal, correlated to the transaction.
    let entries = db.wallet().entries(&member.customer_id).await.unwrap();
    let withdrawals: Vec<_> = entries
        .iter()
        .filter(|e| e.kind == MovementKind::Withdrawal)
        .collect();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].amount_cents, -3_000);
    assert_eq!(
        withdrawals[0].transaction_id,
        response.transaction_id.clone()
    );

    let transaction = db
        .transactions()
        .get_by_id(response.transaction_id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Completed);
    assert_eq!(transaction.amount_after_cents, 3_000);
    assert_eq!(transaction.card_id, member.card_id);
}

#[tokio::test]
async fn insufficient_funds_leaves_no_trace() {
    // Scenario: 10.00 in the wallet, 30.00 charge.
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "04B2").await;
    let service = SettlementService::new(db.clone());

    service.settle(topup(&member, 1_000)).await.unwrap();

    let err = service
        .settle(charge(&member, 3_000, PaymentMethod::Wallet))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));

    // No transaction row, balance untouched.
    assert!(db
        .transactions()
        .list_for_customer(&member.customer_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        db.wallet()
            .balance(&member.customer_id)
            .await
            .unwrap()
            .cents(),
        1_000
    );
}

#[tokio::test]
async fn topup_increases_balance_and_skips_rewards() {
    let db = memory_db().await;

    // An auto-spend campaign that would fire on any charge of 1.00+.
    db.campaigns()
        .create(
            "Eager",
            CampaignKind::AutoSpend,
            Some(100),
            None,
            RewardKind::Percentage,
            5,
            30,
            0,
            1,
        )
        .await
        .unwrap();

    let member = seed_member(&db, "Test", "04C3").await;
    let service = SettlementService::new(db.clone());

    let response = service.settle(topup(&member, 2_500)).await.unwrap();
    assert!(response.transaction_id.is_none());
    assert!(response.new_rewards.is_empty());
    assert_eq!(response.customer.balance_cents, 2_500);

    // Top-ups never trigger campaigns.
    assert!(db
        .coupons()
        .list_active(&member.customer_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn negative_topup_is_rejected() {
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "04D4").await;
    let service = SettlementService::new(db);

    let err = service.settle(topup(&member, -500)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

// =============================================================================
// Request contract
// =============================================================================

#[tokio::test]
async fn blank_customer_id_is_rejected() {
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "04E0").await;
    let service = SettlementService::new(db);

    let mut request = charge(&member, 1_000, PaymentMethod::Cash);
    request.customer_id = "   ".to_string();

    let err = service.settle(request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

#[tokio::test]
async fn card_of_another_customer_cannot_settle() {
    let db = memory_db().await;
    let member = seed_member(&db, "Owner", "04E1").await;
    let other = seed_member(&db, "Other", "04E2").await;
    let service = SettlementService::new(db.clone());

    let mut request = charge(&member, 1_000, PaymentMethod::Cash);
    request.card_id = other.card_id.clone();

    let err = service.settle(request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    // Refused before any write.
    assert!(db
        .transactions()
        .list_for_customer(&member.customer_id)
        .await
        .unwrap()
        .is_empty());
    assert!(db
        .transactions()
        .list_for_customer(&other.customer_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "04E3").await;
    let service = SettlementService::new(db);

    let mut request = charge(&member, 1_000, PaymentMethod::Cash);
    request.customer_id = "ghost".to_string();

    let err = service.settle(request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn expired_card_cannot_settle() {
    let db = memory_db().await;
    let customer = db.customers().create("Test").await.unwrap();
    let card = db
        .customers()
        .create_card(
            "04E4",
            Some(&customer.id),
            Some(chrono::Utc::now() - chrono::Duration::days(1)),
        )
        .await
        .unwrap();
    let member = Member {
        customer_id: customer.id,
        card_id: card.id,
    };
    let service = SettlementService::new(db);

    let err = service
        .settle(charge(&member, 1_000, PaymentMethod::Cash))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Expired);
}

// =============================================================================
// Reward stacking
// =============================================================================

#[tokio::test]
async fn coupon_and_manual_discount_stack() {
    // Scenario: 100.00 charge, coupon {percentage, 20}, manual 10%.
    // 100.00 → 80.00 → 72.00.
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "04E5").await;

    let campaign = db
        .campaigns()
        .create(
            "Birthday",
            CampaignKind::Manual,
            None,
            None,
            RewardKind::Percentage,
            20,
            30,
            0,
            1,
        )
        .await
        .unwrap();
    let coupon = db
        .coupons()
        .issue(&campaign, &member.customer_id, CouponSource::Manual, None)
        .await
        .unwrap();

    let service = SettlementService::new(db.clone());
    let mut request = charge(&member, 10_000, PaymentMethod::Cash);
    request.coupon_id = Some(coupon.id.clone());
    request.manual_discount = Some(ManualDiscount {
        kind: RewardKind::Percentage,
        value: 10,
    });

    let response = service.settle(request).await.unwrap();
    assert_eq!(response.amount_after, Money::from_cents(7_200));

    let stored = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CouponStatus::Used);
    assert!(stored.used_at.is_some());
}

#[tokio::test]
async fn used_coupon_cannot_settle_again() {
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "04F6").await;

    let campaign = db
        .campaigns()
        .create(
            "Promo",
            CampaignKind::Manual,
            None,
            None,
            RewardKind::Fixed,
            500,
            30,
            0,
            1,
        )
        .await
        .unwrap();
    let coupon = db
        .coupons()
        .issue(&campaign, &member.customer_id, CouponSource::Manual, None)
        .await
        .unwrap();

    let service = SettlementService::new(db.clone());
    let mut request = charge(&member, 2_000, PaymentMethod::Cash);
    request.coupon_id = Some(coupon.id.clone());
    service.settle(request.clone()).await.unwrap();

    let err = service.settle(request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[tokio::test]
async fn fixed_discount_clamps_to_zero() {
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "0507").await;

    let discount = db
        .discounts()
        .create("Comp", RewardKind::Fixed, 9_000)
        .await
        .unwrap();

    // Wallet payment with a zero balance: a fully comped charge must not
    // touch the wallet at all.
    let service = SettlementService::new(db.clone());
    let mut request = charge(&member, 5_000, PaymentMethod::Wallet);
    request.discount_id = Some(discount.id);

    let response = service.settle(request).await.unwrap();
    assert_eq!(response.amount_after, Money::zero());
    assert!(response.transaction_id.is_some());

    assert!(db
        .wallet()
        .entries(&member.customer_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        db.wallet().balance(&member.customer_id).await.unwrap(),
        Money::zero()
    );
}

// =============================================================================
// Campaign evaluation
// =============================================================================

#[tokio::test]
async fn auto_spend_fires_at_threshold() {
    let db = memory_db().await;
    db.campaigns()
        .create(
            "Spend 50",
            CampaignKind::AutoSpend,
            Some(5_000),
            None,
            RewardKind::Percentage,
            10,
            30,
            0,
            1,
        )
        .await
        .unwrap();

    let at_threshold = seed_member(&db, "At", "0601").await;
    let below = seed_member(&db, "Below", "0602").await;
    let service = SettlementService::new(db.clone());

    let response = service
        .settle(charge(&at_threshold, 5_000, PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(response.new_rewards.len(), 1);
    assert_eq!(response.new_rewards[0].name, "Spend 50");

    let coupons = db
        .coupons()
        .list_active(&at_threshold.customer_id)
        .await
        .unwrap();
    assert_eq!(coupons.len(), 1);

    // One cent under the threshold grants nothing.
    let response = service
        .settle(charge(&below, 4_999, PaymentMethod::Cash))
        .await
        .unwrap();
    assert!(response.new_rewards.is_empty());
    assert!(db
        .coupons()
        .list_active(&below.customer_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn price_matched_bundle_grants_usage_limit_coupons() {
    let db = memory_db().await;
    db.campaigns()
        .create(
            "Coffee pack",
            CampaignKind::Bundle,
            None,
            None,
            RewardKind::Percentage,
            100,
            60,
            2_500,
            3,
        )
        .await
        .unwrap();

    let member = seed_member(&db, "Test", "0701").await;
    let service = SettlementService::new(db.clone());

    let response = service
        .settle(charge(&member, 2_500, PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(response.new_rewards.len(), 3);

    let granted = db
        .coupons()
        .list_for_transaction(response.transaction_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(granted.len(), 3);
    assert!(granted
        .iter()
        .all(|c| c.source == CouponSource::PaidPackage && c.customer_id == member.customer_id));
}

#[tokio::test]
async fn explicit_bundle_purchase_grants_one_coupon() {
    let db = memory_db().await;
    let bundle = db
        .campaigns()
        .create(
            "Coffee pack",
            CampaignKind::Bundle,
            None,
            None,
            RewardKind::Percentage,
            100,
            60,
            2_500,
            3,
        )
        .await
        .unwrap();

    let member = seed_member(&db, "Test", "0801").await;
    let service = SettlementService::new(db.clone());

    // Explicit selection bypasses the price-match fallback even though the
    // amount matches the bundle price.
    let mut request = charge(&member, 2_500, PaymentMethod::Cash);
    request.campaign_id = Some(bundle.id);

    let response = service.settle(request).await.unwrap();
    assert_eq!(response.new_rewards.len(), 1);

    let granted = db
        .coupons()
        .list_for_transaction(response.transaction_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].source, CouponSource::PaidPackage);
}

#[tokio::test]
async fn explicit_non_bundle_campaign_fails_before_any_write() {
    let db = memory_db().await;
    let manual = db
        .campaigns()
        .create(
            "Not a bundle",
            CampaignKind::Manual,
            None,
            None,
            RewardKind::Fixed,
            500,
            30,
            0,
            1,
        )
        .await
        .unwrap();

    let member = seed_member(&db, "Test", "0901").await;
    let service = SettlementService::new(db.clone());

    let mut request = charge(&member, 1_000, PaymentMethod::Cash);
    request.campaign_id = Some(manual.id);

    let err = service.settle(request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
    assert!(db
        .transactions()
        .list_for_customer(&member.customer_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn stamp_card_rewards_at_target_and_resets() {
    let db = memory_db().await;
    let stamp = db
        .campaigns()
        .create(
            "Coffee card",
            CampaignKind::Bundle,
            None,
            Some(3),
            RewardKind::Percentage,
            100,
            30,
            0,
            1,
        )
        .await
        .unwrap();

    let member = seed_member(&db, "Test", "0A01").await;
    let service = SettlementService::new(db.clone());

    for _ in 0..2 {
        let response = service
            .settle(charge(&member, 700, PaymentMethod::Cash))
            .await
            .unwrap();
        assert!(response.new_rewards.is_empty());
    }

    let progress = db
        .progress()
        .get(&member.customer_id, &stamp.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.current_count, 2);

    // Third stamp completes the card: exactly one reward, counter reset.
    let response = service
        .settle(charge(&member, 700, PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(response.new_rewards.len(), 1);

    let progress = db
        .progress()
        .get(&member.customer_id, &stamp.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.current_count, 0);

    let coupons = db
        .coupons()
        .list_active(&member.customer_id)
        .await
        .unwrap();
    assert_eq!(coupons.len(), 1);
}

#[tokio::test]
async fn re_evaluation_grants_nothing() {
    let db = memory_db().await;
    db.campaigns()
        .create(
            "Coffee pack",
            CampaignKind::Bundle,
            None,
            None,
            RewardKind::Percentage,
            100,
            60,
            2_500,
            3,
        )
        .await
        .unwrap();

    let member = seed_member(&db, "Test", "0B01").await;
    let service = SettlementService::new(db.clone());

    let response = service
        .settle(charge(&member, 2_500, PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(response.new_rewards.len(), 3);

    // Running evaluation again for the same transaction is a no-op.
    let transaction_id = response.transaction_id.unwrap();
    let transaction = db
        .transactions()
        .get_by_id(&transaction_id)
        .await
        .unwrap()
        .unwrap();

    let engine = CampaignEngine::new(db.clone());
    let again = engine.evaluate(&transaction, None).await.unwrap();
    assert!(again.is_empty());

    let coupons = db
        .coupons()
        .list_active(&member.customer_id)
        .await
        .unwrap();
    assert_eq!(coupons.len(), 3);
}

// =============================================================================
// Reward worker
// =============================================================================

#[tokio::test]
async fn worker_completes_deferred_evaluation() {
    use perk_core::Transaction;
    use perk_db::repository::outbox::enqueue_in;
    use perk_db::repository::transaction::insert_in;

    let db = memory_db().await;
    db.campaigns()
        .create(
            "Spend 10",
            CampaignKind::AutoSpend,
            Some(1_000),
            None,
            RewardKind::Fixed,
            200,
            30,
            0,
            1,
        )
        .await
        .unwrap();

    let customer = db.customers().create("Test").await.unwrap();
    let card = db
        .customers()
        .create_card("0C01", Some(&customer.id), None)
        .await
        .unwrap();

    // A settlement whose inline evaluation never ran: the committed charge
    // sits in the outbox as pending.
    let transaction = Transaction {
        id: "tx-deferred".to_string(),
        customer_id: customer.id.clone(),
        card_id: card.id,
        discount_id: None,
        coupon_id: None,
        amount_before_cents: 2_000,
        amount_after_cents: 2_000,
        payment_method: PaymentMethod::Cash,
        status: TransactionStatus::Completed,
        created_at: chrono::Utc::now(),
    };
    let mut tx = db.pool().begin().await.unwrap();
    insert_in(&mut tx, &transaction).await.unwrap();
    enqueue_in(&mut tx, &transaction.id, None).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(db.reward_outbox().count_pending().await.unwrap(), 1);

    let (worker, _handle) = RewardWorker::new(db.clone(), &EngineConfig::default());
    worker.process_pending().await.unwrap();

    assert_eq!(db.reward_outbox().count_pending().await.unwrap(), 0);
    let coupons = db.coupons().list_active(&customer.id).await.unwrap();
    assert_eq!(coupons.len(), 1);
}

#[tokio::test]
async fn settled_charge_leaves_no_pending_outbox() {
    let db = memory_db().await;
    let member = seed_member(&db, "Test", "0D01").await;
    let service = SettlementService::new(db.clone());

    service
        .settle(charge(&member, 1_500, PaymentMethod::Cash))
        .await
        .unwrap();

    assert_eq!(db.reward_outbox().count_pending().await.unwrap(), 0);
}

// =============================================================================
// Ingestion and admin surface
// =============================================================================

#[tokio::test]
async fn terminal_scan_is_authenticated_and_broadcast() {
    let db = memory_db().await;
    let hash = perk_engine::hash_secret("front-desk").unwrap();
    let terminal = db
        .terminals()
        .create("branch-1", "Front desk", &hash)
        .await
        .unwrap();

    let ingest = IngestService::new(db, 8);
    let mut events = ingest.subscribe();

    let event = ingest
        .ingest_scan(&terminal.id, "front-desk", "04A1B2C3")
        .await
        .unwrap();
    assert_eq!(event.branch_id, "branch-1");

    let received = events.recv().await.unwrap();
    assert_eq!(received.uid, "04A1B2C3");
    assert_eq!(received.terminal_id, terminal.id);

    let err = ingest
        .ingest_scan(&terminal.id, "wrong-secret", "04A1B2C3")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    let err = ingest
        .ingest_scan("ghost-terminal", "front-desk", "04A1B2C3")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn manual_grant_and_listing() {
    let db = memory_db().await;
    let customer = db.customers().create("Test").await.unwrap();
    let campaign = db
        .campaigns()
        .create(
            "Goodwill",
            CampaignKind::Manual,
            None,
            None,
            RewardKind::Percentage,
            15,
            30,
            0,
            1,
        )
        .await
        .unwrap();

    let coupons = CouponService::new(db.clone());
    let coupon = coupons
        .grant_manual(&customer.id, &campaign.id, "complaint follow-up")
        .await
        .unwrap();
    assert_eq!(coupon.source, CouponSource::Manual);

    let listed = coupons.active_coupons(&customer.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].campaign_name, "Goodwill");

    // Deactivated campaigns cannot be granted from.
    db.campaigns().deactivate(&campaign.id).await.unwrap();
    let err = coupons
        .grant_manual(&customer.id, &campaign.id, "again")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}
