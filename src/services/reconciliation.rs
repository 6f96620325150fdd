//! Turns confirmed payments into inventory decrements and an emptied cart.
//!
//! A reconciliation walks the line items in order and applies a clamped
//! decrement to each product, then clears the buyer's whole cart. Each write
//! is atomic for its own entity only: a failure part-way through leaves the
//! earlier decrements applied and the cart possibly untouched. Decrements are
//! not idempotent, so re-running the same line items decrements again.
//! [`StockReconciler::reconcile_payment`] guards the payment path against that
//! by claiming the payment reference first.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::events::{CheckoutEvent, DomainEvent, ProductEvent};
use crate::domain::payment::{LineItem, PaymentConfirmation};
use crate::error::{Error, Result};
use crate::messaging::EventPublisher;
use crate::repository::{CatalogRepository, PaymentLedger, UserRepository};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub applied_count: usize,
    /// Line items that could not be applied, in input order; a product
    /// appears once per skipped line item.
    pub skipped_product_refs: Vec<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Reconciled {
        reference: String,
        #[serde(flatten)]
        report: ReconciliationReport,
    },
    /// The reference was reconciled before; nothing was changed.
    AlreadyProcessed { reference: String },
}

#[derive(Clone)]
pub struct StockReconciler {
    catalog: Arc<dyn CatalogRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentLedger>,
    events: EventPublisher,
}

impl StockReconciler {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<dyn PaymentLedger>,
        events: EventPublisher,
    ) -> Self {
        Self { catalog, users, payments, events }
    }

    /// Applies `line_items` as clamped stock decrements and empties the cart.
    ///
    /// Missing products and per-item storage failures are logged and reported
    /// in `skipped_product_refs`; only a failure to clear the cart is an error.
    pub async fn reconcile_stock(&self, user_id: Uuid, line_items: &[LineItem]) -> Result<ReconciliationReport> {
        let report = self.apply(user_id, line_items).await?;
        self.publish(user_id, None, &report).await;
        Ok(report)
    }

    /// Reconciles a provider confirmation at most once per payment reference.
    ///
    /// The buyer is the user recorded in the payment metadata, falling back to
    /// `fallback_user` (the caller who asked for verification).
    pub async fn reconcile_payment(&self, confirmation: &PaymentConfirmation, fallback_user: Option<Uuid>) -> Result<PaymentOutcome> {
        if !confirmation.status.is_success() {
            return Err(Error::ExternalService("Payment failed".into()));
        }
        let user_id = confirmation
            .user_id
            .or(fallback_user)
            .ok_or_else(|| Error::validation("Payment is not linked to a user"))?;
        let reference = confirmation.reference.clone();

        if !self.payments.claim(&reference, user_id).await? {
            tracing::info!(%reference, %user_id, "payment already reconciled, skipping");
            return Ok(PaymentOutcome::AlreadyProcessed { reference });
        }

        match self.apply(user_id, &confirmation.line_items).await {
            Ok(report) => {
                self.publish(user_id, Some(reference.clone()), &report).await;
                Ok(PaymentOutcome::Reconciled { reference, report })
            }
            Err(err) => {
                // Let a retry through; decrements already applied stay applied.
                if let Err(release_err) = self.payments.release(&reference).await {
                    tracing::error!(%reference, error = %release_err, "could not release payment claim");
                }
                Err(err)
            }
        }
    }

    async fn apply(&self, user_id: Uuid, line_items: &[LineItem]) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::default();
        let mut adjusted = Vec::new();

        for item in line_items {
            match self.catalog.decrement_stock(item.product_id, item.quantity).await {
                Ok(Some(product)) => {
                    tracing::debug!(
                        product_id = %item.product_id,
                        by = item.quantity,
                        quantity = product.quantity(),
                        status = %product.status(),
                        "stock decremented"
                    );
                    adjusted.push(DomainEvent::Product(ProductEvent::StockAdjusted {
                        product_id: product.id(),
                        quantity: product.quantity(),
                        status: product.status(),
                    }));
                    report.applied_count += 1;
                }
                Ok(None) => {
                    tracing::warn!(product_id = %item.product_id, %user_id, "product no longer exists, skipping line item");
                    report.skipped_product_refs.push(item.product_id);
                }
                Err(error) => {
                    tracing::warn!(product_id = %item.product_id, %user_id, %error, "stock update failed, skipping line item");
                    report.skipped_product_refs.push(item.product_id);
                }
            }
        }

        self.users.clear_cart(user_id).await?;
        self.events.publish(adjusted).await;

        tracing::info!(
            %user_id,
            applied = report.applied_count,
            skipped = report.skipped_product_refs.len(),
            "stock reconciled"
        );
        Ok(report)
    }

    async fn publish(&self, user_id: Uuid, reference: Option<String>, report: &ReconciliationReport) {
        self.events
            .publish(vec![DomainEvent::Checkout(CheckoutEvent::StockReconciled {
                user_id,
                reference,
                applied: report.applied_count,
                skipped: report.skipped_product_refs.clone(),
            })])
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, Category, Favorites, NewProduct, Product, User};
    use crate::domain::payment::PaymentStatus;
    use crate::domain::value_objects::StockStatus;
    use crate::repository::MemoryStore;
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        reconciler: StockReconciler,
        user: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let user = User::register("Ada", "ada@example.com", "hash".into(), false).unwrap();
        store.insert_user(&user).await.unwrap();
        let reconciler = StockReconciler::new(store.clone(), store.clone(), store.clone(), EventPublisher::disabled());
        Fixture { store, reconciler, user: user.id }
    }

    async fn product(store: &MemoryStore, quantity: u32) -> Uuid {
        let p = Product::create(NewProduct {
            name: "Frontal Wig".into(), price: Decimal::new(200, 0), category: Uuid::now_v7(), quantity, ..Default::default()
        }).unwrap();
        store.insert_product(&p).await.unwrap();
        p.id()
    }

    async fn stock(store: &MemoryStore, id: Uuid) -> (u32, StockStatus) {
        let p = store.find_product(id).await.unwrap().unwrap();
        (p.quantity(), p.status())
    }

    fn item(product_id: Uuid, quantity: u32) -> LineItem {
        LineItem { product_id, quantity }
    }

    #[tokio::test]
    async fn test_decrement_then_clamp() {
        let f = fixture().await;
        let p1 = product(&f.store, 5).await;

        let report = f.reconciler.reconcile_stock(f.user, &[item(p1, 3)]).await.unwrap();
        assert_eq!(report.applied_count, 1);
        assert_eq!(stock(&f.store, p1).await, (2, StockStatus::LowStock));

        f.reconciler.reconcile_stock(f.user, &[item(p1, 3)]).await.unwrap();
        assert_eq!(stock(&f.store, p1).await, (0, StockStatus::OutOfStock));
    }

    #[tokio::test]
    async fn test_missing_product_is_skipped_and_cart_cleared() {
        let f = fixture().await;
        let p1 = product(&f.store, 5).await;
        let gone = product(&f.store, 5).await;
        f.store.add_cart_item(f.user, p1, 1).await.unwrap();
        f.store.delete_product(gone).await.unwrap();

        let report = f.reconciler.reconcile_stock(f.user, &[item(gone, 1), item(p1, 1)]).await.unwrap();
        assert_eq!(report, ReconciliationReport { applied_count: 1, skipped_product_refs: vec![gone] });
        assert!(f.store.find_user(f.user).await.unwrap().unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn test_empty_line_items_still_clear_cart() {
        let f = fixture().await;
        let p1 = product(&f.store, 5).await;
        f.store.add_cart_item(f.user, p1, 2).await.unwrap();

        let report = f.reconciler.reconcile_stock(f.user, &[]).await.unwrap();
        assert_eq!(report, ReconciliationReport::default());
        assert_eq!(stock(&f.store, p1).await.0, 5);
        assert!(f.store.find_user(f.user).await.unwrap().unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn test_cart_cleared_even_when_items_differ() {
        let f = fixture().await;
        let in_cart = product(&f.store, 5).await;
        let bought = product(&f.store, 5).await;
        f.store.add_cart_item(f.user, in_cart, 4).await.unwrap();

        f.reconciler.reconcile_stock(f.user, &[item(bought, 1)]).await.unwrap();
        assert!(f.store.find_user(f.user).await.unwrap().unwrap().cart.is_empty());
        assert_eq!(stock(&f.store, in_cart).await.0, 5);
    }

    #[tokio::test]
    async fn test_duplicate_refs_apply_cumulatively() {
        let f = fixture().await;
        let p1 = product(&f.store, 10).await;
        let report = f.reconciler.reconcile_stock(f.user, &[item(p1, 3), item(p1, 4)]).await.unwrap();
        assert_eq!(report.applied_count, 2);
        assert_eq!(stock(&f.store, p1).await, (3, StockStatus::LowStock));
    }

    /// Fails decrements for one product, delegating everything else.
    struct FlakyCatalog {
        inner: Arc<MemoryStore>,
        broken: Uuid,
    }

    #[async_trait]
    impl CatalogRepository for FlakyCatalog {
        async fn insert_category(&self, c: &Category) -> Result<()> { self.inner.insert_category(c).await }
        async fn update_category(&self, c: &Category) -> Result<()> { self.inner.update_category(c).await }
        async fn find_category(&self, id: Uuid) -> Result<Option<Category>> { self.inner.find_category(id).await }
        async fn list_categories(&self) -> Result<Vec<Category>> { self.inner.list_categories().await }
        async fn delete_category(&self, id: Uuid) -> Result<bool> { self.inner.delete_category(id).await }
        async fn insert_product(&self, p: &Product) -> Result<()> { self.inner.insert_product(p).await }
        async fn update_product(&self, p: &Product, q: bool) -> Result<Product> { self.inner.update_product(p, q).await }
        async fn find_product(&self, id: Uuid) -> Result<Option<Product>> { self.inner.find_product(id).await }
        async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> { self.inner.find_products(ids).await }
        async fn list_products(&self, s: Option<StockStatus>) -> Result<Vec<Product>> { self.inner.list_products(s).await }
        async fn delete_product(&self, id: Uuid) -> Result<bool> { self.inner.delete_product(id).await }
        async fn decrement_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>> {
            if id == self.broken { return Err(Error::Storage("write timed out".into())); }
            self.inner.decrement_stock(id, by).await
        }
        async fn sell_stock(&self, id: Uuid, by: u32) -> Result<Option<Product>> { self.inner.sell_stock(id, by).await }
        async fn restock(&self, id: Uuid, by: u32) -> Result<Option<Product>> { self.inner.restock(id, by).await }
    }

    /// A user store whose cart clear always fails.
    struct StuckCart(Arc<MemoryStore>);

    #[async_trait]
    impl UserRepository for StuckCart {
        async fn insert_user(&self, u: &User) -> Result<()> { self.0.insert_user(u).await }
        async fn find_user(&self, id: Uuid) -> Result<Option<User>> { self.0.find_user(id).await }
        async fn find_user_by_email(&self, e: &str) -> Result<Option<User>> { self.0.find_user_by_email(e).await }
        async fn add_cart_item(&self, id: Uuid, p: Uuid, q: u32) -> Result<Cart> { self.0.add_cart_item(id, p, q).await }
        async fn set_cart_quantity(&self, id: Uuid, p: Uuid, q: u32) -> Result<Cart> { self.0.set_cart_quantity(id, p, q).await }
        async fn remove_cart_item(&self, id: Uuid, p: Uuid) -> Result<Cart> { self.0.remove_cart_item(id, p).await }
        async fn clear_cart(&self, _: Uuid) -> Result<()> { Err(Error::Storage("connection reset".into())) }
        async fn add_favorite(&self, id: Uuid, p: Uuid) -> Result<Favorites> { self.0.add_favorite(id, p).await }
        async fn remove_favorite(&self, id: Uuid, p: Uuid) -> Result<Favorites> { self.0.remove_favorite(id, p).await }
    }

    #[tokio::test]
    async fn test_storage_failure_on_one_item_does_not_abort() {
        let f = fixture().await;
        let broken = product(&f.store, 5).await;
        let fine = product(&f.store, 5).await;
        let reconciler = StockReconciler::new(
            Arc::new(FlakyCatalog { inner: f.store.clone(), broken }),
            f.store.clone(),
            f.store.clone(),
            EventPublisher::disabled(),
        );

        let report = reconciler.reconcile_stock(f.user, &[item(broken, 1), item(fine, 2)]).await.unwrap();
        assert_eq!(report, ReconciliationReport { applied_count: 1, skipped_product_refs: vec![broken] });
        assert_eq!(stock(&f.store, broken).await.0, 5);
        assert_eq!(stock(&f.store, fine).await.0, 3);
    }

    #[tokio::test]
    async fn test_cart_clear_failure_is_surfaced() {
        let f = fixture().await;
        let p1 = product(&f.store, 5).await;
        let reconciler = StockReconciler::new(
            f.store.clone(),
            Arc::new(StuckCart(f.store.clone())),
            f.store.clone(),
            EventPublisher::disabled(),
        );

        let err = reconciler.reconcile_stock(f.user, &[item(p1, 1)]).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        // The decrement before the failure is not rolled back.
        assert_eq!(stock(&f.store, p1).await.0, 4);
    }

    fn confirmation(reference: &str, user: Option<Uuid>, items: Vec<LineItem>) -> PaymentConfirmation {
        PaymentConfirmation {
            reference: reference.into(), status: PaymentStatus::Success, amount: 20_000,
            email: None, user_id: user, line_items: items,
        }
    }

    #[tokio::test]
    async fn test_payment_reconciled_once_per_reference() {
        let f = fixture().await;
        let p1 = product(&f.store, 5).await;
        let c = confirmation("ref-1", Some(f.user), vec![item(p1, 2)]);

        let first = f.reconciler.reconcile_payment(&c, None).await.unwrap();
        assert!(matches!(first, PaymentOutcome::Reconciled { ref report, .. } if report.applied_count == 1));
        let second = f.reconciler.reconcile_payment(&c, None).await.unwrap();
        assert_eq!(second, PaymentOutcome::AlreadyProcessed { reference: "ref-1".into() });
        assert_eq!(stock(&f.store, p1).await.0, 3);
    }

    #[tokio::test]
    async fn test_failed_payment_changes_nothing() {
        let f = fixture().await;
        let p1 = product(&f.store, 5).await;
        let mut c = confirmation("ref-2", Some(f.user), vec![item(p1, 2)]);
        c.status = PaymentStatus::NotSuccessful("failed".into());

        assert!(matches!(f.reconciler.reconcile_payment(&c, None).await, Err(Error::ExternalService(_))));
        assert_eq!(stock(&f.store, p1).await.0, 5);
    }

    #[tokio::test]
    async fn test_payment_user_falls_back_to_caller() {
        let f = fixture().await;
        let c = confirmation("ref-3", None, vec![]);
        assert!(matches!(f.reconciler.reconcile_payment(&c, None).await, Err(Error::Validation(_))));
        assert!(f.reconciler.reconcile_payment(&c, Some(f.user)).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_reconciliation_releases_claim() {
        let f = fixture().await;
        let stuck = StockReconciler::new(
            f.store.clone(),
            Arc::new(StuckCart(f.store.clone())),
            f.store.clone(),
            EventPublisher::disabled(),
        );
        let c = confirmation("ref-4", Some(f.user), vec![]);
        assert!(stuck.reconcile_payment(&c, None).await.is_err());
        assert!(matches!(f.reconciler.reconcile_payment(&c, None).await, Ok(PaymentOutcome::Reconciled { .. })));
    }
}
