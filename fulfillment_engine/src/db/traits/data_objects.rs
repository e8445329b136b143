use serde::{Deserialize, Serialize};

use crate::db_types::{Courier, Order};

/// The result of a successful courier acquisition: the order as it left the store (status
/// `out_for_delivery`, courier bound) and the courier marked busy with the matching back-reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub order: Order,
    pub courier: Courier,
}

impl Assignment {
    pub fn new(order: Order, courier: Courier) -> Self {
        Self { order, courier }
    }
}
