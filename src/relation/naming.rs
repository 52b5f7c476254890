//! Naming convention for auto-generated through tables.
//!
//! - the through table is `${FromModel}${ToModel}` (`${ToModel}${FromModel}` when inverse)
//! - each through column is `${lowerFirst(Model)}${Capitalize(property)}`

use crate::case::{capitalize, lower_first};
use crate::error::RelationError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThroughJoin {
    pub table: String,
    /// `table.column` references pointing at the `from` side, in key order.
    pub from: Vec<String>,
    /// `table.column` references pointing at the `to` side, in key order.
    pub to: Vec<String>,
}

pub fn through_table_name(from_model: &str, to_model: &str, inverse: bool) -> String {
    if inverse {
        format!("{}{}", to_model, from_model)
    } else {
        format!("{}{}", from_model, to_model)
    }
}

pub fn through_column(model: &str, property: &str) -> String {
    format!("{}{}", lower_first(model), capitalize(property))
}

/// Display form of a key reference: `Model.prop`, or `[Model.a, Model.b]` for composite keys.
pub fn display_reference(model: &str, properties: &[String]) -> String {
    let refs: Vec<String> = properties.iter().map(|p| format!("{}.{}", model, p)).collect();
    match refs.as_slice() {
        [single] => single.clone(),
        _ => format!("[{}]", refs.join(", ")),
    }
}

/// Derive the through join between two keys. Both keys must have the same arity.
pub fn through_join(
    from_model: &str,
    from_properties: &[String],
    to_model: &str,
    to_properties: &[String],
    inverse: bool,
) -> Result<ThroughJoin, RelationError> {
    let mismatch = || RelationError::CompositeKeyMismatch {
        from: display_reference(from_model, from_properties),
        to: display_reference(to_model, to_properties),
    };
    if from_properties.len() != to_properties.len() || from_properties.is_empty() {
        return Err(mismatch());
    }
    let table = through_table_name(from_model, to_model, inverse);
    let mut from = Vec::with_capacity(from_properties.len());
    let mut to = Vec::with_capacity(to_properties.len());
    for (from_property, to_property) in from_properties.iter().zip(to_properties) {
        if from_property.is_empty() || to_property.is_empty() {
            return Err(mismatch());
        }
        from.push(format!("{}.{}", table, through_column(from_model, from_property)));
        to.push(format!("{}.{}", table, through_column(to_model, to_property)));
    }
    Ok(ThroughJoin { table, from, to })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn names_table_and_columns() {
        let join = through_join("User", &props(&["id"]), "Role", &props(&["id"]), false).unwrap();
        assert_eq!(join.table, "UserRole");
        assert_eq!(join.from, vec!["UserRole.userId"]);
        assert_eq!(join.to, vec!["UserRole.roleId"]);
    }

    #[test]
    fn inverse_swaps_table_name_order() {
        let join = through_join("Role", &props(&["id"]), "User", &props(&["id"]), true).unwrap();
        assert_eq!(join.table, "UserRole");
        assert_eq!(join.from, vec!["UserRole.roleId"]);
        assert_eq!(join.to, vec!["UserRole.userId"]);
    }

    #[test]
    fn composite_keys_keep_order() {
        let join = through_join(
            "Order",
            &props(&["shopId", "number"]),
            "Product",
            &props(&["shopId", "sku"]),
            false,
        )
        .unwrap();
        assert_eq!(
            join.from,
            vec!["OrderProduct.orderShopId", "OrderProduct.orderNumber"]
        );
        assert_eq!(
            join.to,
            vec!["OrderProduct.productShopId", "OrderProduct.productSku"]
        );
    }

    #[test]
    fn rejects_arity_mismatch() {
        let err = through_join(
            "Order",
            &props(&["shopId", "number"]),
            "Product",
            &props(&["id"]),
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to create through join for composite keys from \
             '[Order.shopId, Order.number]' to 'Product.id'"
        );
    }
}
