//! Streaming export to an XLSX file
//!
//! Run: cargo run --example stream_to_file -- out.xlsx [rows]

use sheetstream::{DocumentProperties, StreamFileBuilder, StreamOptions, WorkbookGenerator};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "stream_output.xlsx".to_string());
    let rows: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 100_000,
    };

    println!("Streaming {} rows to {}", rows, path);
    let start = Instant::now();

    let generator = WorkbookGenerator::with_properties(
        DocumentProperties::default().with_creator("stream_to_file demo"),
    );
    let mut builder = StreamFileBuilder::for_path(&path)?
        .with_generator(generator)
        .with_options(StreamOptions::from_env());
    builder.add_sheet("Orders", &["Order ID", "Customer", "Amount", "Status"])?;
    builder.add_sheet("Summary", &["Metric", "Value"])?;

    let mut stream = builder.build()?;
    let statuses = ["pending", "shipped", "delivered"];
    for i in 1..=rows {
        stream.write_row(&[
            format!("ORD-{:06}", i),
            format!("Customer {}", i % 997),
            format!("{:.2}", (i % 1000) as f64 * 1.5),
            statuses[i % statuses.len()].to_string(),
        ])?;

        if i % 25_000 == 0 {
            println!("  {} rows written", i);
        }
    }

    stream.next_sheet()?;
    stream.write_row(&["Rows".to_string(), rows.to_string()])?;
    stream.close()?;

    println!("Done in {:.2?}", start.elapsed());
    Ok(())
}
