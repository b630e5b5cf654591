/// Pipeline Example
///
/// This example demonstrates:
/// - Building a pipeline with a column projection, a sort and a filter
/// - Running it with a progress monitor
/// - Loading the same pipeline from a JSON configuration
/// - Cancelling a pipeline from another thread

use std::rc::Rc;
use windowtable::{
    ColumnType, ColumnValue, FilterInfo, PipelineConfig, ProgressEvent, ProgressMonitor,
    RandomAccessTable, Row, Schema, SortKey, TableRef, TransformationPipeline, VecSource,
    WindowCache,
};

fn print_table(table: &TableRef, limit: usize) {
    println!("   Columns: {:?}", table.schema().get_column_names());
    for i in 0..limit {
        match table.get_row(i) {
            Ok(row) => {
                let cells: Vec<String> = row.cells().iter().map(|c| c.to_string()).collect();
                println!("   {:>8}  {}", row.key(), cells.join(" | "));
            }
            Err(_) => break,
        }
    }
}

fn main() {
    println!("=== WindowTable Pipeline Example ===\n");

    // 1. Create a sales source
    println!("1. Creating sales source...");
    let schema = Schema::new(vec![
        ("product".to_string(), ColumnType::String, false),
        ("category".to_string(), ColumnType::String, false),
        ("price".to_string(), ColumnType::Float64, false),
        ("quantity".to_string(), ColumnType::Int32, true),
    ]);
    let items = vec![
        ("Laptop", "Electronics", 999.99, Some(5)),
        ("Mouse", "Electronics", 29.99, Some(20)),
        ("Desk", "Furniture", 299.99, Some(3)),
        ("Chair", "Furniture", 199.99, None),
        ("Monitor", "Electronics", 399.99, Some(10)),
        ("Lamp", "Furniture", 49.99, Some(12)),
    ];
    let rows = items
        .into_iter()
        .enumerate()
        .map(|(i, (product, category, price, quantity))| {
            Row::new(
                format!("sale_{}", i),
                vec![
                    ColumnValue::String(product.to_string()),
                    ColumnValue::String(category.to_string()),
                    ColumnValue::Float64(price),
                    quantity.map_or(ColumnValue::Null, ColumnValue::Int32),
                ],
            )
        })
        .collect();
    let source = Rc::new(VecSource::new(schema, rows));

    // 2. Build a pipeline in code
    println!("\n2. Electronics by price, most expensive first:");
    let mut builder = TransformationPipeline::builder();
    builder
        .columns(["product", "category", "price"])
        .filter(FilterInfo::expression("category == 'Electronics'").unwrap())
        .unwrap()
        .sort(SortKey::descending("price"));
    let executor = builder.build();

    let mut monitor = ProgressMonitor::new();
    monitor.add_listener(|event: &ProgressEvent| {
        if let Some(message) = &event.message {
            if event.progress == 0.0 {
                println!("   [{}]", message);
            }
        }
    });
    let cache: TableRef = Rc::new(WindowCache::new(source.clone()));
    let result = executor.transform(cache, &monitor).unwrap();
    print_table(&result, 10);

    // 3. The same kind of pipeline from configuration
    println!("\n3. Stock levels, unknown quantities first, from JSON configuration:");
    let config = PipelineConfig::from_json_str(
        r#"{
            "cache": { "cache_size": 64, "look_ahead": 16 },
            "columns": ["product", "quantity"],
            "sort": [{ "column": "quantity", "order": "ascending", "nulls_first": true }],
            "filter": "quantity IS NULL OR quantity < 15"
        }"#,
    )
    .unwrap();
    let cache: TableRef = Rc::new(config.open_cache(source.clone()).unwrap());
    let result = config
        .to_builder()
        .unwrap()
        .build()
        .transform(cache, &ProgressMonitor::new())
        .unwrap();
    print_table(&result, 10);

    // 4. Cancel before running
    println!("\n4. Cancelling from another thread...");
    let monitor = ProgressMonitor::new();
    let handle = monitor.cancel_handle();
    std::thread::spawn(move || handle.cancel()).join().unwrap();
    let cache: TableRef = Rc::new(WindowCache::new(source));
    match executor.transform(cache, &monitor) {
        Ok(_) => println!("   Pipeline finished"),
        Err(e) => println!("   Pipeline stopped: {}", e),
    }

    println!("\n=== Example Complete ===");
}
