// Binary to export TypeScript types
// Run with: cargo run --bin export_types

use ts_rs::TS;

fn main() {
    println!("Exporting TypeScript types...");

    if let Err(e) = export() {
        eprintln!("Failed to export types: {}", e);
        std::process::exit(1);
    }

    println!("✓ TypeScript types exported successfully to bindings/");
}

fn export() -> Result<(), ts_rs::ExportError> {
    zipedit::EntryDescriptor::export()?;
    zipedit::DecodedContent::export()?;
    zipedit::Settings::export()?;
    Ok(())
}
