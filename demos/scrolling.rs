/// Scrolling Example
///
/// This example demonstrates:
/// - Wrapping a forward-only source in a WindowCache
/// - Scrolling forward through the window and its look-ahead
/// - What a backward jump costs (one rescan from row 0)
/// - Discovering the row count of a source of unknown length

use std::rc::Rc;
use windowtable::{ColumnType, ColumnValue, RandomAccessTable, Row, Schema, VecSource, WindowCache};

fn main() {
    println!("=== WindowTable Scrolling Example ===\n");

    // 1. Create a source that only supports forward iteration
    println!("1. Creating a 10,000 row source of unknown length...");
    let schema = Schema::new(vec![
        ("id".to_string(), ColumnType::Int64, false),
        ("label".to_string(), ColumnType::String, false),
        ("value".to_string(), ColumnType::Float64, false),
    ]);
    let rows = (0..10_000)
        .map(|i| {
            Row::new(
                format!("row_{}", i),
                vec![
                    ColumnValue::Int64(i),
                    ColumnValue::String(format!("item {}", i)),
                    ColumnValue::Float64(i as f64 * 0.5),
                ],
            )
        })
        .collect();
    let source = VecSource::new(schema, rows).with_unknown_length();

    // 2. Wrap it in a cache of 100 rows with 20 rows of look-ahead
    println!("\n2. Creating a window cache (cache size 100, look-ahead 20)...");
    let cache = WindowCache::new(Rc::new(source.clone()));
    cache.set_cache_size(100).unwrap();
    cache.set_look_ahead_size(20).unwrap();
    println!("   Included columns: {:?}", cache.included_columns());
    println!("   Row count known: {:?}", cache.row_count());

    // 3. Scroll through the first pages
    println!("\n3. Scrolling through rows 0..500...");
    for i in 0..500 {
        cache.get_row(i).unwrap();
    }
    println!("   Window: {:?}", cache.window());
    println!("   Stats:  {:?}", cache.stats());

    // 4. Jump back to the top
    println!("\n4. Jumping back to row 10...");
    let row = cache.get_row(10).unwrap();
    println!("   {} -> {:?}", row.key(), row.cells());
    println!("   Window: {:?}", cache.window());
    println!("   Rescans so far: {}", cache.stats().rescans);

    // 5. Jump far ahead, past the look-ahead horizon
    println!("\n5. Jumping to row 9,000...");
    let row = cache.get_row(9_000).unwrap();
    println!("   {} -> {}", row.key(), row.get(1).unwrap());
    println!("   Rescans so far: {}", cache.stats().rescans);

    // 6. Run off the end to learn the row count
    println!("\n6. Reading past the end...");
    match cache.get_row(10_050) {
        Ok(_) => println!("   Unexpected row"),
        Err(e) => println!("   {}", e),
    }
    println!("   Row count now known: {:?}", cache.row_count());
    println!("   Source scans started: {}", source.open_count());

    println!("\n=== Example Complete ===");
}
