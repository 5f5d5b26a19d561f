// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the ledger tables.

pub mod broadcasts;
pub mod customers;
pub mod recipients;
pub mod statistics;

/// SQL list of the terminal broadcast statuses.
pub(crate) const TERMINAL_STATUSES: &str = "('completed', 'failed', 'partial')";

#[cfg(test)]
pub(crate) mod fixtures {
    use herald_core::{
        Broadcast, BroadcastId, BroadcastStatus, MessageTemplate, NewRecipient, TenantId,
    };
    use tempfile::tempdir;

    use crate::database::Database;

    pub async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    pub fn make_broadcast(id: &str, tenant: &str, created_at: &str) -> Broadcast {
        Broadcast {
            id: BroadcastId::from(id),
            tenant_id: TenantId::from(tenant),
            title: format!("title {id}"),
            template: MessageTemplate {
                body: "Hello {name}".to_string(),
                media: None,
            },
            status: BroadcastStatus::Draft,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    pub fn make_recipients(n: usize) -> Vec<NewRecipient> {
        (0..n)
            .map(|i| NewRecipient {
                customer_id: Some(i as i64 + 1),
                name: format!("customer {i}"),
                address: format!("6281200000{i:03}"),
                email: None,
            })
            .collect()
    }
}
