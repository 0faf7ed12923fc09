use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
    OutOfStock,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::OutOfStock => "out_of_stock",
            Self::Discontinued => "discontinued",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "out_of_stock" => Some(Self::OutOfStock),
            "discontinued" => Some(Self::Discontinued),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    pub category: String,
    pub status: ProductStatus,
    pub featured: bool,
    pub views_count: u64,
    pub orders_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_orderable(&self) -> bool {
        self.status == ProductStatus::Active && self.stock > 0
    }

    /// Read-only view captured at negotiation start and re-validated at
    /// confirmation and commit time.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            unit_price: self.price,
            stock: self.stock,
            category: self.category.clone(),
        }
    }

    pub fn remove_stock(&mut self, quantity: u32) {
        self.stock = self.stock.saturating_sub(quantity);
        if self.stock == 0 {
            self.status = ProductStatus::OutOfStock;
        }
    }

    pub fn add_stock(&mut self, quantity: u32) {
        self.stock += quantity;
        if self.status == ProductStatus::OutOfStock && self.stock > 0 {
            self.status = ProductStatus::Active;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub stock: u32,
    pub category: String,
}
