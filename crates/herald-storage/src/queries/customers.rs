// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer directory lookups.

use herald_core::{Customer, HeraldError, RecipientSelector, TenantId};
use rusqlite::{params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::customer_from_row;

/// Insert a customer and return it with its assigned id.
pub async fn insert_customer(
    db: &Database,
    tenant: &TenantId,
    name: &str,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<Customer, HeraldError> {
    let tenant_id = tenant.clone();
    let name = name.to_string();
    let phone = phone.map(str::to_string);
    let email = email.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO customers (tenant_id, name, phone, email) VALUES (?1, ?2, ?3, ?4)",
                params![tenant_id.0, name, phone, email],
            )?;
            Ok(Customer {
                id: conn.last_insert_rowid(),
                tenant_id,
                name,
                phone,
                email,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Customers of `tenant` matching the selector, ascending by id.
pub async fn customers_for(
    db: &Database,
    tenant: &TenantId,
    selector: &RecipientSelector,
) -> Result<Vec<Customer>, HeraldError> {
    let tenant = tenant.0.clone();
    let ids = match selector {
        RecipientSelector::All => None,
        RecipientSelector::Customers(ids) if ids.is_empty() => return Ok(Vec::new()),
        RecipientSelector::Customers(ids) => Some(ids.clone()),
    };
    db.connection()
        .call(move |conn| {
            let base = "SELECT id, tenant_id, name, phone, email FROM customers WHERE tenant_id = ?1";
            let rows = match ids {
                None => {
                    let mut stmt = conn.prepare(&format!("{base} ORDER BY id ASC"))?;
                    let all = stmt
                        .query_map(params![tenant], customer_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    all
                }
                Some(ids) => {
                    let placeholders = (0..ids.len())
                        .map(|i| format!("?{}", i + 2))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let sql = format!("{base} AND id IN ({placeholders}) ORDER BY id ASC");
                    let mut stmt = conn.prepare(&sql)?;
                    let values = std::iter::once(rusqlite::types::Value::Text(tenant))
                        .chain(ids.into_iter().map(rusqlite::types::Value::Integer));
                    let selected = stmt
                        .query_map(params_from_iter(values), customer_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    selected
                }
            };
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
