//! Typed capability set backing the per-user permission gate.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::fmt;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::models::user::Role;

/// One capability flag; each maps to a boolean column of `permisos_usuario`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RegisterSales,
    VerifySales,
    RejectSales,
    RegisterReturns,
    ApproveReturns,
    RegisterPurchases,
    ReceivePurchases,
    RegisterExpenses,
    ApproveExpenses,
    CollectCash,
    VerifyPayments,
    CloseDay,
    ViewReports,
    ViewInventory,
    AdjustInventory,
    ManageProducts,
    ViewCash,
    ViewHistory,
    UseOcr,
    UploadFiles,
}

impl Capability {
    pub const ALL: [Capability; 20] = [
        Capability::RegisterSales,
        Capability::VerifySales,
        Capability::RejectSales,
        Capability::RegisterReturns,
        Capability::ApproveReturns,
        Capability::RegisterPurchases,
        Capability::ReceivePurchases,
        Capability::RegisterExpenses,
        Capability::ApproveExpenses,
        Capability::CollectCash,
        Capability::VerifyPayments,
        Capability::CloseDay,
        Capability::ViewReports,
        Capability::ViewInventory,
        Capability::AdjustInventory,
        Capability::ManageProducts,
        Capability::ViewCash,
        Capability::ViewHistory,
        Capability::UseOcr,
        Capability::UploadFiles,
    ];

    /// Column name in `permisos_usuario`.
    pub fn column(self) -> &'static str {
        match self {
            Capability::RegisterSales => "can_register_sales",
            Capability::VerifySales => "can_verify_sales",
            Capability::RejectSales => "can_reject_sales",
            Capability::RegisterReturns => "can_register_returns",
            Capability::ApproveReturns => "can_approve_returns",
            Capability::RegisterPurchases => "can_register_purchases",
            Capability::ReceivePurchases => "can_receive_purchases",
            Capability::RegisterExpenses => "can_register_expenses",
            Capability::ApproveExpenses => "can_approve_expenses",
            Capability::CollectCash => "can_collect_cash",
            Capability::VerifyPayments => "can_verify_payments",
            Capability::CloseDay => "can_close_day",
            Capability::ViewReports => "can_view_reports",
            Capability::ViewInventory => "can_view_inventory",
            Capability::AdjustInventory => "can_adjust_inventory",
            Capability::ManageProducts => "can_manage_products",
            Capability::ViewCash => "can_view_cash",
            Capability::ViewHistory => "can_view_history",
            Capability::UseOcr => "can_use_ocr",
            Capability::UploadFiles => "can_upload_files",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Bitset of granted capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    pub fn empty() -> Self {
        CapabilitySet(0)
    }

    pub fn all() -> Self {
        Capability::ALL.iter().copied().collect()
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.iter().copied().filter(|c| self.contains(*c))
    }

    /// Builds the set from a `permisos_usuario` row.
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let mut set = CapabilitySet::empty();
        for capability in Capability::ALL {
            if row.try_get::<bool, _>(capability.column())? {
                set.insert(capability);
            }
        }
        Ok(set)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = CapabilitySet::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Admins pass every check; other roles need the flag in their row.
pub fn has_capability(session: &Session, capability: Capability) -> bool {
    session.role == Role::Admin || session.capabilities.contains(capability)
}

/// Same as [`has_capability`] but as a `Result` for `?` in handlers.
pub fn require(session: &Session, capability: Capability) -> Result<(), LedgerError> {
    if has_capability(session, capability) {
        Ok(())
    } else {
        tracing::warn!(user_id = %session.user_id, %capability, "Capability check failed");
        Err(LedgerError::Forbidden(capability))
    }
}

/// Loads a user's capability row; a missing row yields an empty set.
pub async fn load_capabilities(pool: &PgPool, user_id: Uuid) -> Result<CapabilitySet, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM permisos_usuario WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => CapabilitySet::from_row(&row),
        None => Ok(CapabilitySet::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, capabilities: CapabilitySet) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            role,
            capabilities,
        }
    }

    #[test]
    fn admin_short_circuits() {
        let admin = session(Role::Admin, CapabilitySet::empty());
        assert!(Capability::ALL.iter().all(|c| has_capability(&admin, *c)));
    }

    #[test]
    fn seller_without_row_has_nothing() {
        let seller = session(Role::Vendedor, CapabilitySet::empty());
        assert!(!has_capability(&seller, Capability::RegisterSales));
        assert!(matches!(
            require(&seller, Capability::ApproveExpenses),
            Err(LedgerError::Forbidden(Capability::ApproveExpenses))
        ));
    }

    #[test]
    fn granted_flags_are_isolated() {
        let set: CapabilitySet = [Capability::RegisterSales, Capability::CollectCash].into_iter().collect();
        let seller = session(Role::Vendedor, set);
        assert!(has_capability(&seller, Capability::RegisterSales));
        assert!(has_capability(&seller, Capability::CollectCash));
        assert!(!has_capability(&seller, Capability::CloseDay));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn every_capability_has_distinct_bit_and_column() {
        let all = CapabilitySet::all();
        assert_eq!(all.iter().count(), Capability::ALL.len());
        let mut columns: Vec<_> = Capability::ALL.iter().map(|c| c.column()).collect();
        columns.dedup();
        assert_eq!(columns.len(), 20);
    }
}
