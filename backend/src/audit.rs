//! Audit trail for business and security events
//!
//! Events are written as JSON under the `audit` tracing target, so the
//! subscriber decides where they end up. Emission never fails a request.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{PurchaseOrderStatus, ReservationSummary, UserRole};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum AuditEvent {
    #[serde(rename_all = "camelCase")]
    SalesOrderCreated {
        order_id: Uuid,
        client_id: Uuid,
        actor: Uuid,
        backorder_lines: usize,
        total_amount: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    SalesOrderReserved {
        order_id: Uuid,
        actor: Uuid,
        #[serde(flatten)]
        summary: ReservationSummary,
    },
    #[serde(rename_all = "camelCase")]
    ReplenishmentRequested {
        order_id: Uuid,
        actor: Uuid,
        draft_id: Uuid,
        #[serde(flatten)]
        summary: ReservationSummary,
    },
    #[serde(rename_all = "camelCase")]
    SalesOrderShipped {
        order_id: Uuid,
        actor: Uuid,
        carrier_id: Uuid,
        tracking_number: String,
    },
    #[serde(rename_all = "camelCase")]
    SalesOrderDelivered { order_id: Uuid, actor: Uuid },
    #[serde(rename_all = "camelCase")]
    SalesOrderCanceled {
        order_id: Uuid,
        actor: Uuid,
        released_reservations: bool,
    },
    #[serde(rename_all = "camelCase")]
    PurchaseOrderCreated {
        order_id: Uuid,
        actor: Uuid,
        supplier_id: Uuid,
        source_sales_order_id: Option<Uuid>,
    },
    #[serde(rename_all = "camelCase")]
    PurchaseOrderStatusChanged {
        order_id: Uuid,
        actor: Uuid,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    },
    #[serde(rename_all = "camelCase")]
    ProductStatusChanged {
        sku: String,
        actor: Uuid,
        active: bool,
    },
    #[serde(rename_all = "camelCase")]
    UserProvisioned { user_id: Uuid, role: UserRole },
    #[serde(rename_all = "camelCase")]
    AccessDenied {
        user_id: Uuid,
        role: UserRole,
        path: String,
    },
    #[serde(rename_all = "camelCase")]
    TokenRejected { reason: String },
}

impl AuditEvent {
    fn is_security(&self) -> bool {
        matches!(
            self,
            AuditEvent::AccessDenied { .. } | AuditEvent::TokenRejected { .. }
        )
    }
}

/// Write an audit event
pub fn emit(event: AuditEvent) {
    let payload = match serde_json::to_string(&event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(target: "audit", error = %e, "failed to serialize audit event");
            return;
        }
    };

    if event.is_security() {
        tracing::warn!(target: "audit", kind = "security", "{}", payload);
    } else {
        tracing::info!(target: "audit", kind = "business", "{}", payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = AuditEvent::PurchaseOrderStatusChanged {
            order_id: Uuid::nil(),
            actor: Uuid::nil(),
            from: PurchaseOrderStatus::Approved,
            to: PurchaseOrderStatus::Received,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "PurchaseOrderStatusChanged");
        assert_eq!(json["from"], "APPROVED");
        assert_eq!(json["to"], "RECEIVED");
        assert!(!event.is_security());
    }

    #[test]
    fn test_flattened_summary() {
        let event = AuditEvent::SalesOrderReserved {
            order_id: Uuid::nil(),
            actor: Uuid::nil(),
            summary: ReservationSummary {
                lines_reserved: 2,
                backorders_cleared: 1,
                units_short: 0,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["linesReserved"], 2);
        assert_eq!(json["backordersCleared"], 1);
    }

    #[test]
    fn test_order_total_is_a_string() {
        let event = AuditEvent::SalesOrderCreated {
            order_id: Uuid::nil(),
            client_id: Uuid::nil(),
            actor: Uuid::nil(),
            backorder_lines: 1,
            total_amount: Decimal::new(2500, 2),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["totalAmount"], "25.00");
        assert_eq!(json["backorderLines"], 1);
    }

    #[test]
    fn test_security_events() {
        let event = AuditEvent::TokenRejected {
            reason: "expired".into(),
        };
        assert!(event.is_security());
        emit(event);
    }
}
