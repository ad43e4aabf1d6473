//! # Purchase Service
//!
//! Runs every engine operation against the purchase store.
//!
//! ## Mutation Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write_lock.lock()                      (one mutation at a time)        │
//! │     │                                                                   │
//! │     ├── 1. READ     store.list() / store.get(id)                        │
//! │     │                                                                   │
//! │     ├── 2. COMPUTE  goldbook-core                                       │
//! │     │       purchase change ─► recalculate_month (old + new month)      │
//! │     │       payment change  ─► ledger + recalculate_after_payment_change│
//! │     │                                                                   │
//! │     └── 3. WRITE    store.put_many(changed purchases only)              │
//! │                                                                         │
//! │  Two clients adding purchases to the same month at once each see the   │
//! │  other's grams, so the month total never loses an update.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "Today" is an argument of every operation that derives a status.

use std::collections::HashMap;

use chrono::NaiveDate;
use goldbook_core::ledger::{apply_payment_request, reverse_payment};
use goldbook_core::purchase::{build_purchase, edit_purchase};
use goldbook_core::recalc::{affected_months, recalculate_after_payment_change, recalculate_month};
use goldbook_core::summary::summarize_month;
use goldbook_core::validation::{validate_payment, ValidationReport};
use goldbook_core::{
    CoreError, DiscountTier, Karat, MonthRecalculation, MonthSummary, Payment, PaymentRequest,
    PricingPolicy, Purchase, PurchaseDues, PurchaseRequest, Supplier, SupplierDirectory,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::GoldbookConfig;
use crate::error::ServiceResult;
use crate::store::PurchaseStore;

/// Pricing and settlement operations over a [`PurchaseStore`].
pub struct PurchaseService<S> {
    store: S,
    policy: PricingPolicy,
    directory: RwLock<SupplierDirectory>,
    /// Held across the whole read → compute → write cycle of a mutation.
    write_lock: Mutex<()>,
}

impl<S: PurchaseStore> PurchaseService<S> {
    pub fn new(store: S, directory: SupplierDirectory, policy: PricingPolicy) -> Self {
        PurchaseService {
            store,
            policy,
            directory: RwLock::new(directory),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(store: S, config: &GoldbookConfig) -> ServiceResult<Self> {
        Ok(Self::new(store, config.directory()?, config.policy()))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Creates a purchase and re-prices its month.
    pub async fn create_purchase(
        &self,
        request: PurchaseRequest,
        today: NaiveDate,
    ) -> ServiceResult<Purchase> {
        let _guard = self.write_lock.lock().await;
        let directory = self.directory.read().await;

        let purchase = build_purchase(&request, &directory, &self.policy, today)?;
        let before = self.store.list().await?;
        let mut after = before.clone();
        after.push(purchase.clone());

        let months = affected_months(&[purchase.date]);
        let after = self.recalculate_months(after, &months, &directory, today);
        self.write_changes(&before, &after).await?;

        info!(purchase_id = %purchase.id, store_id = %purchase.store_id, "Purchase created");
        Self::find(after, &purchase.id)
    }

    /// Replaces the date, store or receipt lines of a purchase.
    ///
    /// Payments are kept. Both the old and the new month are re-priced.
    pub async fn edit_purchase(
        &self,
        purchase_id: &str,
        request: PurchaseRequest,
        today: NaiveDate,
    ) -> ServiceResult<Purchase> {
        let _guard = self.write_lock.lock().await;
        let directory = self.directory.read().await;

        let before = self.store.list().await?;
        let existing = before
            .iter()
            .find(|p| p.id == purchase_id)
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?;
        let edited = edit_purchase(existing, &request, &directory, &self.policy, today)?;

        let months = affected_months(&[existing.date, edited.date]);
        let after: Vec<Purchase> = before
            .iter()
            .map(|p| if p.id == purchase_id { edited.clone() } else { p.clone() })
            .collect();
        let after = self.recalculate_months(after, &months, &directory, today);
        self.write_changes(&before, &after).await?;

        info!(purchase_id, months = ?months, "Purchase edited");
        Self::find(after, purchase_id)
    }

    /// Deletes a purchase and re-prices the month it leaves.
    pub async fn delete_purchase(&self, purchase_id: &str, today: NaiveDate) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        let directory = self.directory.read().await;

        let before = self.store.list().await?;
        let removed = before
            .iter()
            .find(|p| p.id == purchase_id)
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?;
        let months = affected_months(&[removed.date]);

        let remaining: Vec<Purchase> = before.iter().filter(|p| p.id != purchase_id).cloned().collect();
        let after = self.recalculate_months(remaining, &months, &directory, today);

        // Siblings first: a failed write leaves the purchase in place.
        self.write_changes(&before, &after).await?;
        self.store.delete(purchase_id).await?;

        info!(purchase_id, months = ?months, "Purchase deleted");
        Ok(())
    }

    pub async fn get_purchase(&self, purchase_id: &str) -> ServiceResult<Purchase> {
        Ok(self
            .store
            .get(purchase_id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?)
    }

    pub async fn purchase_dues(&self, purchase_id: &str, today: NaiveDate) -> ServiceResult<PurchaseDues> {
        Ok(self.get_purchase(purchase_id).await?.dues(today))
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a payment and refreshes the purchase's status.
    pub async fn add_payment(
        &self,
        purchase_id: &str,
        request: PaymentRequest,
        today: NaiveDate,
    ) -> ServiceResult<Payment> {
        let _guard = self.write_lock.lock().await;

        let mut purchases = self.store.list().await?;
        let purchase = purchases
            .iter_mut()
            .find(|p| p.id == purchase_id)
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?;
        let payment = apply_payment_request(purchase, request, today)?;

        self.write_payment_change(&purchases, purchase_id, today).await?;
        Ok(payment)
    }

    /// Removes a payment and refreshes the purchase's status.
    pub async fn delete_payment(
        &self,
        purchase_id: &str,
        payment_id: &str,
        today: NaiveDate,
    ) -> ServiceResult<Payment> {
        let _guard = self.write_lock.lock().await;

        let mut purchases = self.store.list().await?;
        let purchase = purchases
            .iter_mut()
            .find(|p| p.id == purchase_id)
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?;
        let removed = reverse_payment(purchase, payment_id, today)?;

        self.write_payment_change(&purchases, purchase_id, today).await?;
        Ok(removed)
    }

    /// Dry-run of [`add_payment`](Self::add_payment) for form validation.
    pub async fn check_payment(
        &self,
        purchase_id: &str,
        request: &PaymentRequest,
    ) -> ServiceResult<ValidationReport> {
        let purchase = self.get_purchase(purchase_id).await?;
        let payment = request.clone().into_payment();
        Ok(ValidationReport::from(&validate_payment(&purchase, &payment)))
    }

    async fn write_payment_change(
        &self,
        purchases: &[Purchase],
        purchase_id: &str,
        today: NaiveDate,
    ) -> ServiceResult<()> {
        let updated = recalculate_after_payment_change(purchases, purchase_id, today)?;
        let changed: Vec<Purchase> = updated.into_iter().filter(|p| p.id == purchase_id).collect();
        self.store.put_many(&changed).await?;
        Ok(())
    }

    // =========================================================================
    // Months
    // =========================================================================

    /// Re-prices a month on demand, e.g. after a tier change.
    pub async fn reprice_month(
        &self,
        month: u32,
        year: i32,
        today: NaiveDate,
    ) -> ServiceResult<MonthRecalculation> {
        let _guard = self.write_lock.lock().await;
        let directory = self.directory.read().await;

        let before = self.store.list().await?;
        let recalculation = recalculate_month(&before, month, year, &directory, &self.policy, today);
        self.write_changes(&before, &recalculation.updated_purchases).await?;

        info!(
            month,
            year,
            monthly_total = recalculation.aggregate.monthly_total_grams,
            "Month re-priced"
        );
        Ok(recalculation)
    }

    pub async fn month_summary(&self, month: u32, year: i32, today: NaiveDate) -> ServiceResult<MonthSummary> {
        let purchases = self.store.list().await?;
        Ok(summarize_month(&purchases, month, year, &self.policy, today))
    }

    // =========================================================================
    // Suppliers & Tiers
    // =========================================================================
    // Tier edits do not re-price existing purchases; callers follow up with
    // `reprice_month` for the months they want to move.

    pub async fn suppliers(&self) -> Vec<Supplier> {
        self.directory.read().await.iter().cloned().collect()
    }

    pub async fn upsert_supplier(&self, supplier: Supplier) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        let code = supplier.code.clone();
        self.directory.write().await.insert(supplier)?;
        info!(supplier = %code, "Supplier saved");
        Ok(())
    }

    pub async fn add_tier(&self, code: &str, karat: Karat, tier: DiscountTier) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        let name = tier.name.clone();
        self.directory.write().await.get_mut(code)?.add_tier(karat, tier)?;
        info!(supplier = code, %karat, tier = %name, "Tier added");
        Ok(())
    }

    pub async fn update_tier(
        &self,
        code: &str,
        karat: Karat,
        name: &str,
        tier: DiscountTier,
    ) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        self.directory
            .write()
            .await
            .get_mut(code)?
            .update_tier(karat, name, tier)?;
        info!(supplier = code, %karat, tier = name, "Tier updated");
        Ok(())
    }

    pub async fn delete_tier(&self, code: &str, karat: Karat, name: &str) -> ServiceResult<DiscountTier> {
        let _guard = self.write_lock.lock().await;
        let removed = self.directory.write().await.get_mut(code)?.delete_tier(karat, name)?;
        info!(supplier = code, %karat, tier = name, "Tier deleted");
        Ok(removed)
    }

    pub async fn set_schedule_active(&self, code: &str, karat: Karat, active: bool) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        self.directory
            .write()
            .await
            .get_mut(code)?
            .set_schedule_active(karat, active);
        info!(supplier = code, %karat, active, "Schedule toggled");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn recalculate_months(
        &self,
        mut purchases: Vec<Purchase>,
        months: &[(u32, i32)],
        directory: &SupplierDirectory,
        today: NaiveDate,
    ) -> Vec<Purchase> {
        for (month, year) in months {
            purchases =
                recalculate_month(&purchases, *month, *year, directory, &self.policy, today).updated_purchases;
        }
        purchases
    }

    /// Writes the purchases of `after` that differ from `before`.
    async fn write_changes(&self, before: &[Purchase], after: &[Purchase]) -> ServiceResult<()> {
        let previous: HashMap<&str, &Purchase> = before.iter().map(|p| (p.id.as_str(), p)).collect();
        let changed: Vec<Purchase> = after
            .iter()
            .filter(|p| previous.get(p.id.as_str()).copied() != Some(*p))
            .cloned()
            .collect();

        debug!(changed = changed.len(), "Writing purchase changes");
        if !changed.is_empty() {
            self.store.put_many(&changed).await?;
        }
        Ok(())
    }

    fn find(purchases: Vec<Purchase>, purchase_id: &str) -> ServiceResult<Purchase> {
        Ok(purchases
            .into_iter()
            .find(|p| p.id == purchase_id)
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ServiceError, StoreError};
    use crate::store::InMemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use goldbook_core::{KaratSchedule, PurchaseStatus, ReceiptInput, ValidationError};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> PurchaseService<InMemoryStore> {
        let directory = SupplierDirectory::from_suppliers([Supplier::new("EG18", "Egypt Gold")
            .with_schedule(
                Karat::K21,
                KaratSchedule::new(vec![
                    DiscountTier::new("Base", 0, 20.0).protected(),
                    DiscountTier::new("Silver", 500, 26.0),
                    DiscountTier::new("Gold", 1000, 34.0),
                ]),
            )])
        .unwrap();
        PurchaseService::new(InMemoryStore::new(), directory, PricingPolicy::default())
    }

    fn request(on: NaiveDate, grams_21k: f64) -> PurchaseRequest {
        let mut suppliers = std::collections::BTreeMap::new();
        suppliers.insert(
            "EG18".to_string(),
            ReceiptInput {
                grams_21k,
                ..ReceiptInput::default()
            },
        );
        PurchaseRequest {
            date: on,
            store_id: "store-1".to_string(),
            suppliers,
        }
    }

    fn payment(grams: f64, fees: f64) -> PaymentRequest {
        PaymentRequest {
            date: date(2025, 5, 20),
            grams_paid: Some(grams),
            fees_paid: Some(fees),
            karat_type: Karat::K21,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_create_reprices_siblings() {
        let service = service();
        let today = date(2025, 5, 25);

        let first = service.create_purchase(request(date(2025, 5, 3), 600.0), today).await.unwrap();
        assert_eq!(first.total_discount, 600.0 * 26.0 / 100.0);

        service.create_purchase(request(date(2025, 5, 10), 600.0), today).await.unwrap();
        service.create_purchase(request(date(2025, 5, 20), 600.0), today).await.unwrap();

        let purchases = service.store().list().await.unwrap();
        assert_eq!(purchases.len(), 3);
        for purchase in &purchases {
            assert_eq!(purchase.total_discount, 600.0 * 34.0 / 100.0);
            assert_eq!(purchase.total_fees, 3000.0 - 204.0);
        }
    }

    #[tokio::test]
    async fn test_edit_moves_purchase_between_months() {
        let service = service();
        let today = date(2025, 6, 5);
        let a = service.create_purchase(request(date(2025, 5, 3), 400.0), today).await.unwrap();
        let b = service.create_purchase(request(date(2025, 5, 4), 200.0), today).await.unwrap();
        assert_eq!(service.get_purchase(&a.id).await.unwrap().total_discount, 400.0 * 26.0 / 100.0);

        let moved = service
            .edit_purchase(&b.id, request(date(2025, 6, 1), 200.0), today)
            .await
            .unwrap();
        assert_eq!(moved.id, b.id);
        assert_eq!(moved.due_date, date(2025, 7, 1));

        // May dropped below 500g, so the remaining purchase loses its tier.
        let a = service.get_purchase(&a.id).await.unwrap();
        assert_eq!(a.total_discount, 400.0 * 20.0 / 100.0);
    }

    #[tokio::test]
    async fn test_delete_reprices_month() {
        let service = service();
        let today = date(2025, 5, 25);
        let a = service.create_purchase(request(date(2025, 5, 3), 400.0), today).await.unwrap();
        let b = service.create_purchase(request(date(2025, 5, 4), 200.0), today).await.unwrap();

        service.delete_purchase(&b.id, today).await.unwrap();
        assert!(service.store().get(&b.id).await.unwrap().is_none());
        assert_eq!(service.get_purchase(&a.id).await.unwrap().total_discount, 80.0);

        let err = service.delete_purchase(&b.id, today).await;
        assert!(matches!(err, Err(ServiceError::Core(CoreError::PurchaseNotFound(_)))));
    }

    /// Store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        reject_writes: AtomicBool,
    }

    #[async_trait::async_trait]
    impl PurchaseStore for FlakyStore {
        async fn list(&self) -> Result<Vec<Purchase>, StoreError> {
            self.inner.list().await
        }

        async fn get(&self, id: &str) -> Result<Option<Purchase>, StoreError> {
            self.inner.get(id).await
        }

        async fn put_many(&self, purchases: &[Purchase]) -> Result<(), StoreError> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("writes disabled".into()));
            }
            self.inner.put_many(purchases).await
        }

        async fn delete(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_delete_keeps_purchase_when_sibling_write_fails() {
        let directory = service().directory.into_inner();
        let service = PurchaseService::new(FlakyStore::default(), directory, PricingPolicy::default());
        let today = date(2025, 5, 25);
        let a = service.create_purchase(request(date(2025, 5, 3), 400.0), today).await.unwrap();
        let b = service.create_purchase(request(date(2025, 5, 4), 200.0), today).await.unwrap();

        service.store().reject_writes.store(true, Ordering::SeqCst);
        let err = service.delete_purchase(&b.id, today).await;
        assert!(matches!(err, Err(ServiceError::Store(StoreError::Unavailable(_)))));

        assert!(service.store().get(&b.id).await.unwrap().is_some());
        assert_eq!(service.get_purchase(&a.id).await.unwrap().total_discount, 400.0 * 26.0 / 100.0);
    }

    #[tokio::test]
    async fn test_payment_roundtrip() {
        let service = service();
        let today = date(2025, 5, 20);
        let purchase = service.create_purchase(request(date(2025, 5, 3), 100.0), today).await.unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Pending);

        let paid = service.add_payment(&purchase.id, payment(40.0, 0.0), today).await.unwrap();
        let stored = service.get_purchase(&purchase.id).await.unwrap();
        assert_eq!(stored.status, PurchaseStatus::Partial);
        assert_eq!(stored.payments.grams_paid, 40.0);

        let dues = service.purchase_dues(&purchase.id, today).await.unwrap();
        assert_eq!(dues.grams_due, 60.0);
        assert_eq!(dues.days_left, 13);

        service.delete_payment(&purchase.id, &paid.id, today).await.unwrap();
        let stored = service.get_purchase(&purchase.id).await.unwrap();
        assert_eq!(stored.status, PurchaseStatus::Pending);
        assert!(stored.payment_history.is_empty());

        let err = service.delete_payment(&purchase.id, &paid.id, today).await;
        assert!(matches!(err, Err(ServiceError::Core(CoreError::PaymentNotFound { .. }))));
    }

    #[tokio::test]
    async fn test_rejected_payment_leaves_store_untouched() {
        let service = service();
        let today = date(2025, 5, 20);
        let purchase = service.create_purchase(request(date(2025, 5, 3), 100.0), today).await.unwrap();

        let report = service.check_payment(&purchase.id, &payment(150.0, 0.0)).await.unwrap();
        assert!(!report.valid);

        let err = service.add_payment(&purchase.id, payment(150.0, 0.0), today).await;
        assert!(matches!(
            err,
            Err(ServiceError::Core(CoreError::Validation(ValidationError::ExceedsDue { .. })))
        ));
        assert_eq!(service.get_purchase(&purchase.id).await.unwrap(), purchase);

        // Fees may be overpaid.
        let report = service.check_payment(&purchase.id, &payment(0.0, 10_000.0)).await.unwrap();
        assert!(report.valid);
    }

    #[tokio::test]
    async fn test_tier_management_and_reprice() {
        let service = service();
        let today = date(2025, 5, 25);
        let purchase = service.create_purchase(request(date(2025, 5, 3), 300.0), today).await.unwrap();
        assert_eq!(purchase.total_discount, 60.0);

        let err = service.delete_tier("EG18", Karat::K21, "Base").await;
        assert!(matches!(err, Err(ServiceError::Core(CoreError::ProtectedTier { .. }))));

        service
            .add_tier("EG18", Karat::K21, DiscountTier::new("Bronze", 250, 22.0))
            .await
            .unwrap();
        // Existing purchases keep their price until the month is re-priced.
        assert_eq!(service.get_purchase(&purchase.id).await.unwrap().total_discount, 60.0);

        let result = service.reprice_month(5, 2025, today).await.unwrap();
        assert_eq!(result.aggregate.monthly_total_grams, 300.0);
        assert_eq!(service.get_purchase(&purchase.id).await.unwrap().total_discount, 66.0);

        service.set_schedule_active("EG18", Karat::K21, false).await.unwrap();
        service.reprice_month(5, 2025, today).await.unwrap();
        assert_eq!(service.get_purchase(&purchase.id).await.unwrap().total_discount, 0.0);

        let err = service.add_tier("XX", Karat::K21, DiscountTier::new("A", 1, 1.0)).await;
        assert!(matches!(err, Err(ServiceError::Core(CoreError::SupplierNotFound(_)))));
    }

    #[tokio::test]
    async fn test_month_summary() {
        let service = service();
        let today = date(2025, 5, 25);
        let purchase = service.create_purchase(request(date(2025, 5, 3), 100.0), today).await.unwrap();
        service.create_purchase(request(date(2025, 4, 3), 100.0), today).await.unwrap();
        service.add_payment(&purchase.id, payment(100.0, 500.0), today).await.unwrap();

        let summary = service.month_summary(5, 2025, today).await.unwrap();
        assert_eq!(summary.aggregate.purchase_ids, vec![purchase.id.clone()]);
        assert_eq!(summary.paid, 1);

        let april = service.month_summary(4, 2025, today).await.unwrap();
        assert_eq!(april.overdue, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_do_not_lose_updates() {
        let service = Arc::new(service());
        let today = date(2025, 5, 28);

        let handles: Vec<_> = (1..=10)
            .map(|day| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .create_purchase(request(date(2025, 5, day), 100.0), today)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let purchases = service.store().list().await.unwrap();
        assert_eq!(purchases.len(), 10);
        for purchase in &purchases {
            assert_eq!(purchase.total_discount, 34.0);
        }
    }
}
