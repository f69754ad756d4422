//! Inference and export tests over realistic catalogs

mod fixtures;

use cubesext_core::{Catalog, Column, DiagnosticCode, InferenceConfig, Table};
use cubesext_engine::{
    build_model, sql_to_cubes, CubesModelWriter, DatePart, Entity, EntityKind, InferenceEngine,
    InferenceError, InferenceResult, MapperKind, Mapping, ModelDocument, PipelineError,
};
use pretty_assertions::assert_eq;

fn infer(catalog: &Catalog) -> InferenceResult {
    InferenceEngine::with_options(InferenceConfig::default())
        .unwrap()
        .infer(catalog)
        .unwrap()
}

fn entity(result: &InferenceResult, id: cubesext_engine::EntityId) -> &Entity {
    result.registry.get(id).unwrap()
}

// =============================================================================
// Inference
// =============================================================================

#[test]
fn test_one_fact_per_table_in_order() {
    let result = infer(&fixtures::logistics());

    let names: Vec<&str> = result.facts().map(|(_, f)| f.name.as_str()).collect();
    assert_eq!(names, vec!["customers", "orders", "shipments"]);

    let tables: Vec<Option<&str>> = result.olap_mappers.iter().map(|m| m.table.as_deref()).collect();
    assert_eq!(tables, vec![Some("customers"), Some("orders"), Some("shipments")]);
}

#[test]
fn test_orders_customers_scenario() {
    let result = infer(&fixtures::retail());

    let orders = result.fact_for_table("orders").unwrap();
    assert_eq!(orders.key, "cubesext.orders.fact");
    assert_eq!(orders.measures.len(), 1);
    assert_eq!(orders.measures[0].name, "amount");
    assert_eq!(orders.dimensions.len(), 2);

    // Foreign key: alias of the customers fact dimension
    let Entity::AliasDimension(customer) = entity(&result, orders.dimensions[0]) else {
        panic!("expected alias");
    };
    assert_eq!(customer.key, "cubesext.orders.dim.fk.customers.customer_id");
    assert_eq!(customer.name, "orders_customers_customer");
    assert_eq!(customer.label, "orders customers customer");

    let Entity::FactDimension(fact_dim) = entity(&result, customer.target) else {
        panic!("expected fact dimension");
    };
    assert_eq!(fact_dim.key, "cubesext.orders.dim.fact.customers");
    assert_eq!(fact_dim.name, "customers");

    // The wrapped fact has one embedded string dimension
    let Entity::Fact(customers) = entity(&result, fact_dim.fact) else {
        panic!("expected fact");
    };
    assert_eq!(customers.name, "customers");
    assert_eq!(customers.dimensions.len(), 1);
    let Entity::Dimension(name) = entity(&result, customers.dimensions[0]) else {
        panic!("expected dimension");
    };
    assert_eq!(name.name, "customers_name");

    // Datetime: alias of the shared date dimension
    let Entity::AliasDimension(created) = entity(&result, orders.dimensions[1]) else {
        panic!("expected alias");
    };
    assert_eq!(created.name, "orders_created_at");
    assert_eq!(
        entity(&result, created.target).key(),
        cubesext_engine::DATE_DIMENSION_KEY
    );

    // Relationship mappers come first, fact mapper last
    let olap = result.olap_mapper("orders").unwrap();
    assert_eq!(olap.include, vec!["cubesext.customers.olapmapper"]);
    assert!(matches!(
        olap.mappers.last().map(|m| &m.kind),
        Some(MapperKind::Fact)
    ));
}

#[test]
fn test_fact_dimension_is_shared() {
    let result = infer(&fixtures::logistics());

    let fact_dims: Vec<_> = result.registry.of_kind(EntityKind::FactDimension).collect();
    // customers (from orders and shipments twice) and orders
    assert_eq!(fact_dims.len(), 2);

    let shipments = result.fact_for_table("shipments").unwrap();
    let orders = result.fact_for_table("orders").unwrap();

    let target = |id| match entity(&result, id) {
        Entity::AliasDimension(alias) => alias.target,
        other => panic!("expected alias, got {:?}", other.kind()),
    };

    let from_orders = target(orders.dimensions[0]);
    let sender = target(shipments.dimensions[1]);
    let receiver = target(shipments.dimensions[2]);
    assert_eq!(from_orders, sender);
    assert_eq!(sender, receiver);

    // Each foreign key still gets its own alias
    assert_ne!(shipments.dimensions[1], shipments.dimensions[2]);
}

#[test]
fn test_self_reference_is_skipped() {
    let result = infer(&Catalog::from_tables(vec![fixtures::employees()]));

    let employees = result.fact_for_table("employees").unwrap();
    assert_eq!(employees.dimensions.len(), 1);
    assert!(employees.measures.is_empty());
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::ForeignKeySelfReference));
}

#[test]
fn test_datetime_yields_five_extract_rules() {
    let result = infer(&fixtures::retail());

    let olap = result.olap_mapper("orders").unwrap();
    let date_mapper = olap
        .mappers
        .iter()
        .find(|m| m.mappings.iter().any(|r| matches!(r, Mapping::Extract { .. })))
        .unwrap();

    let parts: Vec<(DatePart, &str)> = date_mapper
        .mappings
        .iter()
        .map(|r| match r {
            Mapping::Extract { part, column, .. } => (*part, column.as_str()),
            other => panic!("unexpected rule {:?}", other),
        })
        .collect();

    assert_eq!(
        parts,
        vec![
            (DatePart::Year, "created_at"),
            (DatePart::Quarter, "created_at"),
            (DatePart::Month, "created_at"),
            (DatePart::Week, "created_at"),
            (DatePart::Day, "created_at"),
        ]
    );
}

#[test]
fn test_composite_primary_key() {
    let result = infer(&Catalog::from_tables(vec![Table::new(
        "lines",
        vec![
            Column::new("order_id", "INTEGER").primary_key(),
            Column::new("line_no", "INTEGER").primary_key(),
            Column::new("qty", "INTEGER"),
        ],
    )]));

    let mapper = result.olap_mapper("lines").unwrap().fact_mapper().unwrap();
    let keys: Vec<&str> = mapper.mappings.iter().map(|m| m.name()).collect();
    assert_eq!(keys, vec!["order_id", "line_no"]);
}

#[test]
fn test_inference_is_deterministic() {
    let first = CubesModelWriter::new(&infer(&fixtures::logistics())).build().unwrap();
    let second = CubesModelWriter::new(&infer(&fixtures::logistics())).build().unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Naming
// =============================================================================

fn dimension_keys_and_names(result: &InferenceResult) -> (Vec<String>, Vec<String>) {
    result
        .registry
        .iter()
        .filter(|(_, e)| e.kind() != EntityKind::Fact)
        .map(|(_, e)| (e.key().to_string(), e.name().to_string()))
        .unzip()
}

fn assert_all_distinct(values: &[String]) {
    let unique: std::collections::HashSet<&String> = values.iter().collect();
    assert_eq!(unique.len(), values.len(), "repeated value in {:?}", values);
}

#[test]
fn test_text_column_named_like_referenced_table() {
    let catalog = Catalog::from_tables(vec![
        fixtures::customers(),
        Table::new(
            "orders",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("customers", "TEXT"),
                Column::new("customer_id", "INTEGER").references("customers", "id"),
            ],
        ),
    ]);
    let result = infer(&catalog);

    let (keys, names) = dimension_keys_and_names(&result);
    assert_all_distinct(&keys);
    assert_all_distinct(&names);

    let fact = result.fact_for_table("orders").unwrap();
    let dims: Vec<&str> = fact
        .dimensions
        .iter()
        .map(|id| entity(&result, *id).name())
        .collect();
    assert_eq!(dims, vec!["orders_customers", "orders_customers_customer"]);

    let document = CubesModelWriter::new(&result).build().unwrap();
    assert!(document.dimension("customers").is_some());
}

#[test]
fn test_embedded_and_fact_dimension_names_do_not_clash() {
    let catalog = Catalog::from_tables(vec![
        Table::new(
            "order_lines",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("qty", "INTEGER"),
            ],
        ),
        Table::new(
            "order",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("lines", "TEXT"),
                Column::new("line_id", "INTEGER").references("order_lines", "id"),
            ],
        ),
    ]);
    let result = infer(&catalog);

    let (keys, names) = dimension_keys_and_names(&result);
    assert_all_distinct(&keys);
    assert_all_distinct(&names);

    let document = CubesModelWriter::new(&result).build().unwrap();
    let exported: Vec<String> = document.dimensions.iter().map(|d| d.name.clone()).collect();
    assert_all_distinct(&exported);

    let cube = document.cube("order").unwrap();
    assert_eq!(cube.dimensions, vec!["order_lines", "order_order_lines_line"]);

    let alias = document.dimension("order_order_lines_line").unwrap();
    assert_eq!(
        alias.info.as_ref().and_then(|i| i.alias_of.as_deref()),
        Some("order_lines_2")
    );
}

#[test]
fn test_non_latin_table_names_get_distinct_slugs() {
    let catalog = Catalog::from_tables(vec![
        Table::new(
            "注文",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("状態", "TEXT"),
            ],
        ),
        Table::new(
            "顧客",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("名前", "TEXT"),
            ],
        ),
    ]);
    let result = infer(&catalog);

    let names: Vec<&str> = result.facts().map(|(_, f)| f.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    for name in &names {
        assert!(!name.is_empty());
        assert!(name.is_ascii());
    }

    let (keys, dimension_names) = dimension_keys_and_names(&result);
    assert_all_distinct(&keys);
    assert_all_distinct(&dimension_names);
}

#[test]
fn test_untransliterable_names_fall_back_to_positions() {
    let result = infer(&Catalog::from_tables(vec![Table::new(
        "###",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("??", "TEXT"),
        ],
    )]));

    let fact = result.fact_for_table("###").unwrap();
    assert_eq!(fact.name, "t1");
    assert_eq!(fact.label, "###");

    let dim = entity(&result, fact.dimensions[0]);
    assert_eq!(dim.key(), "cubesext.t1.dim.col.c2");
    assert_eq!(dim.name(), "t1_c2");
}

#[test]
fn test_date_alias_drops_id_suffix() {
    let result = infer(&Catalog::from_tables(vec![Table::new(
        "parcels",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("shipped_id", "TIMESTAMP"),
        ],
    )]));

    let fact = result.fact_for_table("parcels").unwrap();
    let Entity::AliasDimension(alias) = entity(&result, fact.dimensions[0]) else {
        panic!("expected alias");
    };
    assert_eq!(alias.key, "cubesext.parcels.dim.datetime.shipped_id");
    assert_eq!(alias.name, "parcels_shipped");
    assert_eq!(alias.label, "parcels shipped");
}

#[test]
fn test_interval_columns_are_not_integers() {
    let result = infer(&Catalog::from_tables(vec![Table::new(
        "trips",
        vec![
            Column::new("id", "INTEGER").primary_key(),
            Column::new("duration", "interval"),
            Column::new("origin", "point"),
        ],
    )]));

    let fact = result.fact_for_table("trips").unwrap();
    assert!(fact.measures.is_empty());
    assert!(fact.dimensions.is_empty());

    let dropped: Vec<&str> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::ColumnUnmapped)
        .filter_map(|d| d.declared_type.as_deref())
        .collect();
    assert_eq!(dropped, vec!["interval", "point"]);

    let err = InferenceEngine::with_options(InferenceConfig::default())
        .unwrap()
        .infer(&Catalog::from_tables(vec![Table::new(
            "spans",
            vec![Column::new("span", "INTERVAL").primary_key()],
        )]))
        .unwrap_err();
    assert!(matches!(err, InferenceError::UnsupportedType { .. }));
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_round_trip_counts() {
    let result = infer(&fixtures::logistics());
    let document = CubesModelWriter::new(&result).build().unwrap();

    let parsed = ModelDocument::from_json(&document.to_json().unwrap()).unwrap();
    let stats = parsed.stats();

    assert_eq!(stats.cubes, result.fact_count());
    assert_eq!(stats.dimensions, result.used_dimensions().len());
    assert_eq!(stats.measures, result.measure_count());
    assert_eq!(stats.mappings, result.mapping_rule_count());
}

#[test]
fn test_exported_orders_cube() {
    let result = infer(&fixtures::retail());
    let document = CubesModelWriter::new(&result).build().unwrap();

    let cube = document.cube("orders").unwrap();
    assert_eq!(cube.fact, "orders");
    assert_eq!(cube.key.as_deref(), Some("id"));
    assert_eq!(cube.dimensions, vec!["orders_customers_customer", "orders_created_at"]);

    assert_eq!(cube.joins.len(), 1);
    assert_eq!(cube.joins[0].master, "orders.customer_id");
    assert_eq!(cube.joins[0].detail, "customers.id");
    assert_eq!(cube.joins[0].alias, "orders_customers_customer");

    assert!(cube.mappings.contains_key("orders_created_at.quarter"));

    // Dependencies come before the dimensions referring to them
    let names: Vec<&str> = document.dimensions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "date",
            "customers_name",
            "customers",
            "orders_customers_customer",
            "orders_created_at",
        ]
    );

    let alias = document.dimension("orders_created_at").unwrap();
    assert_eq!(alias.role.as_deref(), Some("time"));
    assert_eq!(alias.info.as_ref().and_then(|i| i.alias_of.as_deref()), Some("date"));
    assert_eq!(alias.hierarchies.len(), 2);

    let customers = document.dimension("customers").unwrap();
    assert_eq!(customers.levels[0].key.as_deref(), Some("id"));
    assert_eq!(customers.levels[0].label_attribute.as_deref(), Some("name"));
}

#[test]
fn test_cubes_follow_include_order() {
    let result = infer(&fixtures::logistics());
    let document = CubesModelWriter::new(&result).build().unwrap();

    let names: Vec<&str> = document.cubes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["customers", "orders", "shipments"]);
}

// =============================================================================
// Pipeline over SQLite
// =============================================================================

#[test]
fn test_sql_to_cubes_from_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("retail.sqlite3");
    rusqlite::Connection::open(&db_path)
        .unwrap()
        .execute_batch(fixtures::RETAIL_DDL)
        .unwrap();

    let model_path = dir.path().join("model.json");
    let build = sql_to_cubes(
        &format!("sqlite:///{}", db_path.display()),
        &InferenceConfig::default(),
        Some(&model_path),
    )
    .unwrap();

    assert_eq!(build.path, model_path);
    assert_eq!(build.tables, 2);

    let document = ModelDocument::load(&model_path).unwrap();
    assert_eq!(document, build.document);

    // `key` is excluded by default and sqlite_sequence is never a cube
    let orders = document.cube("orders").unwrap();
    assert!(!orders.mappings.keys().any(|k| k.contains("key")));
    assert!(document.cube("sqlite_sequence").is_none());
}

#[test]
fn test_unsupported_primary_key_writes_no_model() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let reader = cubesext_catalog::MockReader::from_tables(vec![Table::new(
        "readings",
        vec![Column::new("taken_at", "TIMESTAMP").primary_key()],
    )]);

    let err = build_model(&reader, &InferenceConfig::default(), Some(&model_path)).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Inference(InferenceError::UnsupportedType { .. })
    ));
    assert!(!model_path.exists());
}
