//! Extract one file from an MPQ archive
//!
//! Usage: cargo run --example extract_file -- <archive.mpq> <file> [output]
//!
//! Set `RUST_LOG=debug` to trace table loading and sector decoding.

use mpq_reader::Archive;
use std::env;
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <archive.mpq> <file> [output]", args[0]);
        std::process::exit(1);
    }

    let archive = Archive::open(&args[1])?;
    print!("{}", archive.header().debug_dump());

    let Some(info) = archive.find_file(&args[2]) else {
        eprintln!("{} not found in {}", args[2], args[1]);
        let live = archive.entries().iter().filter(|e| e.is_live()).count();
        eprintln!("Archive holds {live} live entries");
        std::process::exit(2);
    };

    println!(
        "{}: {} bytes ({} stored), flags 0x{:08X}, locale 0x{:04X}",
        info.filename,
        info.file_size(),
        info.compressed_size(),
        info.block.flags.bits(),
        info.locale
    );

    let data = archive.read_file_info(&info)?;

    match args.get(3) {
        Some(output) => {
            fs::write(output, &data)?;
            println!("Wrote {} bytes to {output}", data.len());
        }
        None => println!("{}", String::from_utf8_lossy(&data)),
    }

    Ok(())
}
