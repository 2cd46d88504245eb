//! Domain events and their NATS publisher

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::Role;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "entity", rename_all = "camelCase")]
pub enum DomainEvent {
    User(UserEvent),
    Product(ProductEvent),
    Promotion(PromotionEvent),
    Coupon(CouponEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UserEvent {
    Registered { user_id: Uuid, role: Role },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProductEvent {
    Created { product_id: Uuid, seller_id: Uuid, price: Decimal },
    Deleted { product_id: Uuid },
    VariantQuantityChanged { variant_id: Uuid, quantity: i32 },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PromotionEvent {
    Created { promotion_id: Uuid, coupons: usize },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CouponEvent {
    Redeemed { coupon_id: Uuid, code: String, usage_count: i32 },
}

impl DomainEvent {
    /// `marketplace.<entity>.<action>`
    pub fn subject(&self) -> String {
        let (entity, action) = match self {
            Self::User(UserEvent::Registered { .. }) => ("user", "registered"),
            Self::Product(ProductEvent::Created { .. }) => ("product", "created"),
            Self::Product(ProductEvent::Deleted { .. }) => ("product", "deleted"),
            Self::Product(ProductEvent::VariantQuantityChanged { .. }) => ("product", "variant_quantity_changed"),
            Self::Promotion(PromotionEvent::Created { .. }) => ("promotion", "created"),
            Self::Coupon(CouponEvent::Redeemed { .. }) => ("coupon", "redeemed"),
        };
        format!("marketplace.{entity}.{action}")
    }
}

/// Publishes events to NATS when a client is configured; otherwise only traces them.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let Some(client) = &self.nats else {
            tracing::debug!(%subject, ?event, "Event publishing disabled");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "Failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "Failed to publish event");
        }
    }
}
