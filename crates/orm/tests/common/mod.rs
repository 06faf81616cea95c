#![allow(dead_code)]

use durable_orm::{
    Cardinality, DatabaseValue, Entity, EntityMetadata, HasMany, JunctionTable, MemoryRow,
    ModelResult, NativeType, NativeValue, NavigationDescriptor, Record, RelationKind,
};

/// Shop customer; drafts have no id yet
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Option<u32>,
    pub name: String,
    pub orders: Option<Vec<Order>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u32,
    pub customer_id: u32,
    pub total: f64,
    pub shipments: Option<Vec<Shipment>>,
    pub products: Option<Vec<Product>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub id: u32,
    pub order_id: u32,
    pub carrier: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: u32,
    pub name: String,
}

/// Stock location whose `products` navigation was declared without a junction table
#[derive(Debug, Clone, PartialEq)]
pub struct Warehouse {
    pub id: u32,
    pub products: Option<Vec<Product>>,
}

impl Customer {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            orders: None,
        }
    }

    pub fn draft(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            orders: None,
        }
    }
}

impl Entity for Customer {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Customer")
            .table("customers")
            .key("id", NativeType::U32)
            .field("name", NativeType::String)
            .has_many("orders", "Order", "customer_id")
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
            orders: None,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

impl Entity for Order {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Order")
            .table("orders")
            .key("id", NativeType::U32)
            .field("customer_id", NativeType::U32)
            .field("total", NativeType::F64)
            .has_many("shipments", "Shipment", "order_id")
            .many_to_many(
                "products",
                "Product",
                JunctionTable::new("order_items", "order_id", "product_id"),
            )
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            customer_id: record.get("customer_id")?,
            total: record.get("total")?,
            shipments: None,
            products: None,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "customer_id" => Some(self.customer_id.into()),
            "total" => Some(self.total.into()),
            _ => None,
        }
    }
}

impl Entity for Shipment {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Shipment")
            .table("shipments")
            .key("id", NativeType::U32)
            .field("order_id", NativeType::U32)
            .field("carrier", NativeType::String)
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            order_id: record.get("order_id")?,
            carrier: record.get("carrier")?,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "order_id" => Some(self.order_id.into()),
            "carrier" => Some(self.carrier.clone().into()),
            _ => None,
        }
    }
}

impl Entity for Product {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Product")
            .table("products")
            .key("id", NativeType::U32)
            .field("name", NativeType::String)
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

impl Entity for Warehouse {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Warehouse")
            .table("warehouses")
            .key("id", NativeType::U32)
            .with_navigation(NavigationDescriptor {
                name: "products".to_string(),
                cardinality: Cardinality::Collection,
                relation: RelationKind::ManyToMany,
                related_entity: "Product".to_string(),
                foreign_key: None,
                junction: None,
            })
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            products: None,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            _ => None,
        }
    }
}

fn orders_of(customer: &mut Customer) -> &mut Option<Vec<Order>> {
    &mut customer.orders
}

fn shipments_of(order: &mut Order) -> &mut Option<Vec<Shipment>> {
    &mut order.shipments
}

fn products_of(order: &mut Order) -> &mut Option<Vec<Product>> {
    &mut order.products
}

fn stocked_products_of(warehouse: &mut Warehouse) -> &mut Option<Vec<Product>> {
    &mut warehouse.products
}

pub const CUSTOMER_ORDERS: HasMany<Customer, Order> = HasMany::new("orders", orders_of);
pub const ORDER_SHIPMENTS: HasMany<Order, Shipment> = HasMany::new("shipments", shipments_of);
pub const ORDER_PRODUCTS: HasMany<Order, Product> = HasMany::new("products", products_of);
pub const WAREHOUSE_PRODUCTS: HasMany<Warehouse, Product> =
    HasMany::new("products", stocked_products_of);

pub fn order_row(id: i64, customer_id: i64, total: f64) -> MemoryRow {
    MemoryRow::new()
        .with("id", id)
        .with("customer_id", customer_id)
        .with("total", DatabaseValue::Float64(total))
}

pub fn shipment_row(id: i64, order_id: i64, carrier: &str) -> MemoryRow {
    MemoryRow::new()
        .with("id", id)
        .with("order_id", order_id)
        .with("carrier", carrier)
}

/// Product row as returned by the junction query, tagged with the order it belongs to
pub fn product_row(id: i64, name: &str, order_id: i64) -> MemoryRow {
    MemoryRow::new()
        .with("id", id)
        .with("name", name)
        .with("__parent_key", order_id)
}
