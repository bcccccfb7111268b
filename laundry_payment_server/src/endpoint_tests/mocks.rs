use chrono::Duration;
use laundry_payment_engine::{
    db_types::{NewOrder, Order, OrderId, PaymentEvent, PaymentEventRecord},
    order_objects::OrderQueryFilter,
    traits::{
        InsertOrderResult,
        MarkFailedOutcome,
        MarkPaidOutcome,
        OrderApiError,
        OrderManagement,
        ReconciliationDatabase,
        ReconciliationError,
    },
};
use mockall::mock;

mock! {
    pub OrderStore {}
    impl OrderManagement for OrderStore {
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError>;
        async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderApiError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError>;
        async fn fetch_unmatched_events(&self) -> Result<Vec<PaymentEventRecord>, OrderApiError>;
    }
}

mock! {
    pub ReconciliationStore {}
    impl ReconciliationDatabase for ReconciliationStore {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, ReconciliationError>;
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError>;
        async fn conditional_mark_paid(
            &self,
            order_id: &OrderId,
            reference: &str,
        ) -> Result<MarkPaidOutcome, ReconciliationError>;
        async fn conditional_mark_failed(&self, order_id: &OrderId) -> Result<MarkFailedOutcome, ReconciliationError>;
        async fn reconcile_charge(
            &self,
            order_id: &OrderId,
            event: &PaymentEvent,
        ) -> Result<(MarkPaidOutcome, bool), ReconciliationError>;
        async fn record_unmatched_event(&self, event: &PaymentEvent) -> Result<bool, ReconciliationError>;
        async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError>;
        async fn close(&mut self) -> Result<(), ReconciliationError>;
    }
}
