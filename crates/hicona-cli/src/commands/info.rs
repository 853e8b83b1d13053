use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use hicona_core::index_xml::IndexXml;
use hicona_core::measurement::Measurement;

#[derive(Args)]
pub struct InfoArgs {
    /// Measurement directory
    pub dir: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let measurement = Measurement::open(&args.dir)?;
    let config = &measurement.config;

    println!("Plate:       {}", config.plate_name);
    if !config.measurement.is_empty() {
        println!("Measurement: {}", config.measurement);
    }
    if !config.guid.is_empty() {
        println!("GUID:        {}", config.guid);
    }
    println!("Planes:      {}", config.planes);
    println!("Channels:    {}", config.channels);
    println!("Timepoints:  {}", config.timepoints);
    if let Some(fields) = config.fields {
        println!("Fields (kw): {}", fields);
    }

    let wells = measurement.wells()?;
    println!("Wells:       {}", wells.len());
    for well in &wells {
        match measurement.max_field(well) {
            Ok(max_field) => println!("  {}  {} field(s)", well.id, max_field),
            Err(_) => println!("  {}  (no tiles)", well.id),
        }
    }

    if let Some(ref xml_path) = measurement.index_xml_path {
        match IndexXml::load(xml_path) {
            Ok(xml) => {
                println!("Pixel size:  {:.4} um", xml.pixel_size_um);
                if !xml.channel_order.is_empty() {
                    println!("Channel order: {}", xml.channel_order.join(", "));
                }
            }
            Err(e) => println!("Index XML:   unreadable ({e})"),
        }
    }

    Ok(())
}
