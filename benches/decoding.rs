use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::{imageops, GrayImage};
use rayon::prelude::*;

use qrsight::{Binarizer, DecoderConfig, ECLevel, QRBuilder, QRReader, Version};

const ANGLES: [u32; 4] = [0, 90, 180, 270];

// Synthetic symbol with its band label and expected text
struct Sample {
    band: String,
    text: String,
    img: GrayImage,
}

fn samples() -> Vec<Sample> {
    let mut samples = Vec::new();
    for v in 1..=40 {
        for (i, ecl) in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H].into_iter().enumerate() {
            let ver = Version::new(v);
            let len = ver.data_codewords(ecl) - 3;
            let text = format!("bench v{v} {ecl:?} ").chars().cycle().take(len).collect::<String>();
            let scale = if v <= 10 { 4 } else { 2 + (i as u32 % 2) };
            let img = QRBuilder::new(text.as_bytes())
                .version(ver)
                .ec_level(ecl)
                .build()
                .unwrap()
                .to_image(scale);
            let lo = (v - 1) / 10 * 10 + 1;
            samples.push(Sample { band: format!("v{lo:02}-{:02}", lo + 9), text, img });
        }
    }
    samples
}

fn benchmark(binarizer: Binarizer, samples: &[Sample]) {
    let mut config = DecoderConfig::new();
    config.binarizer(binarizer);
    let reader = QRReader::new(config);

    let results = Arc::new(Mutex::new(HashMap::<String, HashMap<String, u128>>::new()));
    let runtimes = Arc::new(Mutex::new(HashMap::<String, Vec<u128>>::new()));

    samples.par_iter().for_each(|sample| {
        for angle in ANGLES.iter() {
            let img = match angle {
                90 => imageops::rotate90(&sample.img),
                180 => imageops::rotate180(&sample.img),
                270 => imageops::rotate270(&sample.img),
                _ => sample.img.clone(),
            };

            let start = Instant::now();
            let res = reader.decode(&img);
            let elapsed = start.elapsed();
            runtimes.lock().unwrap().entry(sample.band.clone()).or_default().push(elapsed.as_micros());

            match res {
                Ok(payload) if payload.text == sample.text => {
                    let mut results = results.lock().unwrap();
                    *results
                        .entry(sample.band.clone())
                        .or_default()
                        .entry(angle.to_string())
                        .or_default() += 1;
                }
                Ok(_) => println!("\x1b[1;31m[FAIL]\x1b[0m {} at {angle}deg: wrong text", sample.band),
                Err(e) => println!("\x1b[1;31m[FAIL]\x1b[0m {} at {angle}deg: {e}", sample.band),
            }
        }
    });

    let mut results = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
    let mut runtimes = Arc::try_unwrap(runtimes).unwrap().into_inner().unwrap();

    // Successes and median time per band
    for (band, runtime) in runtimes.iter_mut() {
        runtime.sort_unstable();
        let mid = runtime.len() / 2;
        let median_time =
            if runtime.len() % 2 == 1 { runtime[mid] } else { (runtime[mid - 1] + runtime[mid]) / 2 };
        let avg_time = runtime.iter().sum::<u128>() / runtime.len() as u128;

        let row = results.entry(band.clone()).or_default();
        let total = ANGLES.iter().filter_map(|a| row.get(&a.to_string())).sum::<u128>();
        row.insert("total".to_string(), total);
        row.insert("median_time".to_string(), median_time);
        row.insert("avg_time".to_string(), avg_time);
    }

    let mut rows = results.keys().map(|s| s.as_str()).collect::<Vec<_>>();
    rows.sort_unstable();
    let cols = ["Versions", "0", "90", "180", "270", "total", "median_time", "avg_time"];

    println!("\nResult ({binarizer:?}):");
    print_table(&results, &rows, &cols);
}

fn print_table<N>(result: &HashMap<String, HashMap<String, N>>, rows: &[&str], columns: &[&str])
where
    N: Display + Debug + Default,
{
    let cell_w = 15;
    let df = N::default();
    let divider = "-".repeat(columns.len() * (cell_w + 2) + 1);

    println!("{divider}");
    let mut header = String::from("| ");
    for c in columns {
        header.push_str(&format!("{c:<cell_w$}| "));
    }
    println!("{header}");
    println!("{divider}");

    for hr in rows {
        let r = &result[*hr];
        let mut row = format!("| {hr:<cell_w$}| ");
        for c in columns.iter().skip(1) {
            let cell = r.get(*c).unwrap_or(&df);
            row.push_str(&format!("{cell:<cell_w$}| "));
        }
        println!("{row}");
    }

    println!("{divider}");
}

fn main() {
    let start = Instant::now();
    let samples = samples();
    println!("Rendered {} symbols in {:?}", samples.len(), start.elapsed());

    for binarizer in [Binarizer::Otsu, Binarizer::Adaptive] {
        let start = Instant::now();
        benchmark(binarizer, &samples);
        println!("Time elapsed: {:?}", start.elapsed());
    }
}
