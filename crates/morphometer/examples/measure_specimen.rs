use image::ImageReader;
use morphometer::{Measurer, SegmentationMask, SpecimenId, SpecimenInputs};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "Usage: {} <photo.png> <mask.png> <pixels_per_mm> [out.json]",
            args[0]
        );
        std::process::exit(2);
    }

    let photo = ImageReader::open(&args[1])?.decode()?.to_luma8();
    let mask = ImageReader::open(&args[2])?.decode()?;
    let pixels_per_mm: f64 = args[3].parse()?;

    let inputs = SpecimenInputs::new(SegmentationMask::from_dynamic(&mask))
        .with_photo(photo)
        .with_pixels_per_mm(pixels_per_mm);
    let record = Measurer::new().measure(SpecimenId::new(&args[2]), inputs);

    println!(
        "length = {:?} mm, pedestal height = {:?} mm, {} undefined field(s)",
        record.animal_length,
        record.pedestal_height,
        record.failures.len()
    );

    if let Some(out_path) = args.get(4) {
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
