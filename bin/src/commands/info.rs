//! Info command implementation.
//!
//! Prints the header of a whisper file: aggregation, retention and the
//! layout of each archive.

use crate::display::{format_bytes, format_span};
use anyhow::{Context, Result};
use std::path::Path;
use whisperflux_lib::WhisperFile;

/// Show the header of a whisper file.
pub(crate) fn show_info(path: &Path) -> Result<()> {
    let file = WhisperFile::open(path)
        .with_context(|| format!("Failed to open whisper file: {}", path.display()))?;
    let header = file.header();
    let meta = &header.metadata;

    println!("File:           {}", path.display());
    println!("Aggregation:    {}", meta.aggregation);
    println!(
        "Max Retention:  {} ({}s)",
        format_span(meta.max_retention),
        meta.max_retention
    );
    println!("X-Files Factor: {}", meta.x_files_factor);
    println!("Archives:       {}", header.archives.len());

    println!(
        "\n{:<8} {:>12} {:>10} {:>12} {:>12}",
        "ARCHIVE", "RESOLUTION", "POINTS", "RETENTION", "SIZE"
    );
    println!("{}", "-".repeat(58));
    for (index, archive) in header.archives.iter().enumerate() {
        println!(
            "{:<8} {:>12} {:>10} {:>12} {:>12}",
            index,
            format_span(archive.seconds_per_point),
            archive.points,
            format_span(archive.retention()),
            format_bytes(archive.size()),
        );
    }

    Ok(())
}
