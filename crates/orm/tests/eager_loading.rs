mod common;

use std::time::Duration;

use common::*;
use durable_orm::prelude::*;
use durable_orm::{DatabaseValue, EagerLoader, IncludeTree, ScriptedExecutor};

fn loader() -> EagerLoader {
    EagerLoader::new()
}

#[tokio::test]
async fn one_to_many_groups_children_by_parent_in_one_query() {
    let mut executor = ScriptedExecutor::new();
    executor.push_rows(vec![
        order_row(10, 1, 19.5),
        order_row(11, 1, 5.0),
        order_row(12, 3, 42.0),
    ]);
    let mut customers = vec![
        Customer::new(1, "Ada"),
        Customer::new(2, "Brian"),
        Customer::new(3, "Cleo"),
    ];
    let tree = IncludeTree::new().include(Include::many(CUSTOMER_ORDERS));

    let stats = loader().load(&mut executor, &mut customers, &tree).await.unwrap();

    let counts: Vec<Option<usize>> = customers
        .iter()
        .map(|c| c.orders.as_ref().map(Vec::len))
        .collect();
    assert_eq!(counts, vec![Some(2), Some(0), Some(1)]);
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.rows, 3);
    assert_eq!(executor.query_count(), 1);

    let query = &executor.queries()[0];
    assert_eq!(query.sql, "SELECT * FROM `orders` WHERE `customer_id` IN (?, ?, ?)");
    assert_eq!(
        query.params,
        vec![DatabaseValue::Int64(1), DatabaseValue::Int64(2), DatabaseValue::Int64(3)]
    );
}

#[tokio::test]
async fn parents_without_keys_issue_no_query() {
    let mut executor = ScriptedExecutor::new();
    let mut customers = vec![Customer::draft("Dora"), Customer::draft("Eli")];
    let tree = IncludeTree::new().include(Include::many(CUSTOMER_ORDERS));

    let stats = loader().load(&mut executor, &mut customers, &tree).await.unwrap();

    assert_eq!(stats.queries, 0);
    assert_eq!(executor.query_count(), 0);
    assert!(customers.iter().all(|c| c.orders.is_none()));
}

#[tokio::test]
async fn null_key_parents_get_empty_collections_beside_keyed_ones() {
    let mut executor = ScriptedExecutor::new();
    executor.push_rows(vec![order_row(10, 1, 3.0)]);
    let mut customers = vec![Customer::new(1, "Ada"), Customer::draft("Dora")];
    let tree = IncludeTree::new().include(Include::many(CUSTOMER_ORDERS));

    loader().load(&mut executor, &mut customers, &tree).await.unwrap();

    assert_eq!(customers[0].orders.as_ref().map(Vec::len), Some(1));
    assert_eq!(customers[1].orders, Some(Vec::new()));
    assert_eq!(executor.queries()[0].params.len(), 1);
}

#[tokio::test]
async fn duplicate_parent_keys_are_bound_once() {
    let mut executor = ScriptedExecutor::new();
    executor.push_rows(vec![order_row(10, 1, 3.0)]);
    let mut customers = vec![Customer::new(1, "Ada"), Customer::new(1, "Ada again")];
    let tree = IncludeTree::new().include(Include::many(CUSTOMER_ORDERS));

    loader().load(&mut executor, &mut customers, &tree).await.unwrap();

    assert_eq!(executor.queries()[0].params, vec![DatabaseValue::Int64(1)]);
    assert_eq!(customers[0].orders, customers[1].orders);
}

// Deliberate behavior change: products used to come back without the
// junction's order column, leaving every order with an empty collection.
// They are now grouped by `__parent_key` and reach their orders.
#[tokio::test]
async fn many_to_many_fills_collections_through_junction_key_instead_of_empty() {
    let mut executor = ScriptedExecutor::new();
    executor.push_rows(vec![
        product_row(100, "Kettle", 10),
        product_row(101, "Mug", 10),
        product_row(101, "Mug", 11),
    ]);
    let mut orders = vec![
        Order {
            id: 10,
            customer_id: 1,
            total: 30.0,
            shipments: None,
            products: None,
        },
        Order {
            id: 11,
            customer_id: 1,
            total: 8.0,
            shipments: None,
            products: None,
        },
        Order {
            id: 12,
            customer_id: 2,
            total: 0.0,
            shipments: None,
            products: None,
        },
    ];
    let tree = IncludeTree::new().include(Include::many(ORDER_PRODUCTS));

    loader().load(&mut executor, &mut orders, &tree).await.unwrap();

    let names = |order: &Order| -> Vec<String> {
        order
            .products
            .as_ref()
            .map(|products| products.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    };
    assert_eq!(names(&orders[0]), vec!["Kettle", "Mug"]);
    assert_eq!(names(&orders[1]), vec!["Mug"]);
    assert_eq!(orders[2].products, Some(Vec::new()));

    assert_eq!(
        executor.queries()[0].sql,
        "SELECT `products`.*, `order_items`.`order_id` AS `__parent_key` FROM `products` \
         INNER JOIN `order_items` ON `products`.`id` = `order_items`.`product_id` \
         WHERE `order_items`.`order_id` IN (?, ?, ?)"
    );
}

#[tokio::test]
async fn many_to_many_without_junction_fails_before_any_query() {
    let mut executor = ScriptedExecutor::new();
    let mut warehouses = vec![Warehouse { id: 1, products: None }];
    let tree = IncludeTree::new().include(Include::many(WAREHOUSE_PRODUCTS));

    let invalid = loader().validate(&tree).unwrap_err();
    assert!(invalid.is_configuration());
    assert!(invalid.to_string().contains("junction"));

    let err = loader().load(&mut executor, &mut warehouses, &tree).await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(executor.query_count(), 0);
    assert!(warehouses[0].products.is_none());
}

#[tokio::test]
async fn nested_includes_issue_one_query_per_level() {
    let mut executor = ScriptedExecutor::new();
    executor
        .push_rows(vec![order_row(10, 1, 3.0), order_row(11, 2, 4.0)])
        .push_rows(vec![shipment_row(500, 10, "DHL"), shipment_row(501, 11, "UPS")])
        .push_rows(vec![product_row(100, "Kettle", 11)]);
    let mut customers = vec![Customer::new(1, "Ada"), Customer::new(2, "Brian")];
    let tree = IncludeTree::new().include(
        Include::many(CUSTOMER_ORDERS)
            .then_include(Include::many(ORDER_SHIPMENTS))
            .then_include(Include::many(ORDER_PRODUCTS)),
    );

    let stats = loader().load(&mut executor, &mut customers, &tree).await.unwrap();

    assert_eq!(stats.queries, 3);
    assert_eq!(stats.depth, 2);
    let ada_order = &customers[0].orders.as_ref().unwrap()[0];
    assert_eq!(ada_order.shipments.as_ref().unwrap()[0].carrier, "DHL");
    assert_eq!(ada_order.products, Some(Vec::new()));
    let brian_order = &customers[1].orders.as_ref().unwrap()[0];
    assert_eq!(brian_order.products.as_ref().unwrap()[0].name, "Kettle");
}

#[tokio::test]
async fn batch_cap_splits_the_in_list() {
    let mut executor = ScriptedExecutor::new();
    executor
        .push_rows(vec![order_row(10, 1, 1.0)])
        .push_rows(vec![order_row(11, 3, 1.0)]);
    let mut customers: Vec<Customer> = (1..=3).map(|id| Customer::new(id, "c")).collect();
    let tree = IncludeTree::new().include(Include::many(CUSTOMER_ORDERS));
    let loader = EagerLoader::new().with_config(LoaderConfig::default().with_max_batch_size(2));

    let stats = loader.load(&mut executor, &mut customers, &tree).await.unwrap();

    assert_eq!(stats.queries, 2);
    assert_eq!(executor.queries()[0].params.len(), 2);
    assert_eq!(executor.queries()[1].params.len(), 1);
    assert_eq!(customers[0].orders.as_ref().map(Vec::len), Some(1));
    assert_eq!(customers[1].orders, Some(Vec::new()));
    assert_eq!(customers[2].orders.as_ref().map(Vec::len), Some(1));
}

#[tokio::test]
async fn depth_cap_is_a_configuration_error_before_any_query() {
    let mut executor = ScriptedExecutor::new();
    let mut customers = vec![Customer::new(1, "Ada")];
    let tree = IncludeTree::new()
        .include(Include::many(CUSTOMER_ORDERS).then_include(Include::many(ORDER_SHIPMENTS)));
    let loader = EagerLoader::new().with_config(LoaderConfig::default().with_max_depth(1));

    let err = loader.load(&mut executor, &mut customers, &tree).await.unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(executor.query_count(), 0);
}

#[tokio::test]
async fn driver_failures_are_wrapped_with_the_node_path() {
    let mut executor = ScriptedExecutor::new();
    executor
        .push_rows(vec![order_row(10, 1, 3.0)])
        .push_failure("Lost connection to MySQL server during query");
    let mut customers = vec![Customer::new(1, "Ada")];
    let tree = IncludeTree::new()
        .include(Include::many(CUSTOMER_ORDERS).then_include(Include::many(ORDER_SHIPMENTS)));

    let err = loader().load(&mut executor, &mut customers, &tree).await.unwrap_err();

    assert!(err.to_string().starts_with("Failed to load include 'orders.shipments'"));
    assert!(matches!(err.root_cause(), ModelError::Database(_)));
}

#[tokio::test]
async fn conversion_failures_name_the_field() {
    let mut executor = ScriptedExecutor::new();
    executor.push_rows(vec![durable_orm::MemoryRow::new()
        .with("id", 10i64)
        .with("customer_id", 1i64)
        .with("total", "a lot")]);
    let mut customers = vec![Customer::new(1, "Ada")];
    let tree = IncludeTree::new().include(Include::many(CUSTOMER_ORDERS));

    let err = loader().load(&mut executor, &mut customers, &tree).await.unwrap_err();

    match err.root_cause() {
        ModelError::Materialization { entity, field, .. } => {
            assert_eq!(entity, "Order");
            assert_eq!(field, "total");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn slow_round_trip_surfaces_cancellation() {
    let mut executor = ScriptedExecutor::new();
    executor.push_delayed_rows(Duration::from_millis(250), vec![order_row(10, 1, 1.0)]);
    let mut customers = vec![Customer::new(1, "Ada")];
    let tree = IncludeTree::new().include(Include::many(CUSTOMER_ORDERS));
    let loader = EagerLoader::new()
        .with_config(LoaderConfig::default().with_query_timeout(Duration::from_millis(25)));

    let err = loader.load(&mut executor, &mut customers, &tree).await.unwrap_err();

    assert!(matches!(err.root_cause(), ModelError::Cancelled(_)));
    assert!(!err.is_configuration());
}

#[tokio::test]
async fn query_get_runs_includes() {
    let mut executor = ScriptedExecutor::new();
    executor
        .push_rows(vec![durable_orm::MemoryRow::new()
            .with("id", 1i64)
            .with("name", "Ada")])
        .push_rows(vec![order_row(10, 1, 12.5)]);

    let customers = Customer::query()
        .where_like("name", "A%")
        .unwrap()
        .include(Include::many(CUSTOMER_ORDERS))
        .get(&mut executor)
        .await
        .unwrap();

    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].orders.as_ref().unwrap()[0].total, 12.5);
    assert_eq!(
        executor.queries()[0].sql,
        "SELECT * FROM `customers` WHERE `name` LIKE ?"
    );
}
