/// Interactive MFM_DISK console application

use mfmmanager::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "bitmap",
                "cat",
                "dir",
                "exit",
                "fs-export",
                "fs-list",
                "fs-read",
                "help",
                "info",
                "load",
                "ls",
                "map",
                "open",
                "quit",
                "read-sector",
                "sectors",
                "tracks",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word (command name)
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            // Already past the command, don't complete
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".mfmmanager_history");
        p
    })
}

fn main() {
    env_logger::init();

    println!("=== MFMManager ===");
    println!("Interactive console for exploring MFM_DISK format FTDOS disk images.");
    println!("Type 'help' for available commands\n");

    let mut rl = Editor::new().expect("Failed to create editor");
    rl.set_helper(Some(CommandCompleter::new()));

    // Load history if available
    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut image: Option<MfmImage> = None;

    loop {
        let readline = rl.readline("> ");
        let input = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Save history before exiting
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Add to history
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        if parts.is_empty() {
            continue;
        }
        let command = parts[0].to_lowercase();

        match command.as_str() {
            "help" => {
                print_help();
            }
            "quit" | "exit" => {
                // Save history before exiting
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            "open" | "load" => {
                if parts.len() < 2 {
                    println!("Usage: open <path>");
                    continue;
                }
                match MfmImage::open(&parts[1]) {
                    Ok(img) => {
                        println!("Opened: {}", parts[1]);
                        image = Some(img);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "info" => {
                if let Some(ref img) = image {
                    print_info(img);
                } else {
                    println!("No image loaded. Use 'open <path>' first.");
                }
            }
            "tracks" => {
                if let Some(ref img) = image {
                    list_tracks(img);
                } else {
                    println!("No image loaded.");
                }
            }
            "sectors" => {
                if let Some(ref img) = image {
                    let track: u8 = if parts.len() >= 2 {
                        parts[1].parse().unwrap_or(0)
                    } else {
                        0
                    };
                    let side: u8 = if parts.len() >= 3 {
                        parts[2].parse().unwrap_or(0)
                    } else {
                        0
                    };
                    list_sectors_on_track(img, track, side);
                } else {
                    println!("No image loaded.");
                }
            }
            "read-sector" => {
                if let Some(ref img) = image {
                    if parts.len() < 3 {
                        println!("Usage: read-sector <track> <sector> [side]");
                        continue;
                    }
                    let track: u8 = parts[1].parse().unwrap_or(0);
                    let sector: u8 = parts[2].parse().unwrap_or(1);
                    let side: u8 = if parts.len() >= 4 {
                        parts[3].parse().unwrap_or(0)
                    } else {
                        0
                    };

                    match img
                        .read_track(track, side)
                        .and_then(|t| t.sector_data(sector).map(|d| d.to_vec()))
                    {
                        Ok(data) => {
                            println!("Track {} sector {} ({} bytes):", track, sector, data.len());
                            print_hex_dump(&data, 256);
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No image loaded.");
                }
            }
            "fs-list" | "dir" | "cat" | "ls" => {
                if let Some(ref img) = image {
                    match FtdosFileSystem::mount(img) {
                        Ok(fs) => list_catalog(&fs),
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No image loaded.");
                }
            }
            "fs-read" => {
                if let Some(ref img) = image {
                    if parts.len() < 2 {
                        println!("Usage: fs-read <filename>");
                        continue;
                    }

                    match FtdosFileSystem::mount(img).and_then(|fs| fs.read_file(&parts[1])) {
                        Ok(record) => {
                            print_record(&parts[1], &record);
                            print_hex_dump(&record.bytes, 256);
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No image loaded.");
                }
            }
            "fs-export" => {
                if let Some(ref img) = image {
                    if parts.len() < 2 {
                        println!("Usage: fs-export <filename> [output_path] [orix|tape]");
                        println!("  Files export bare by default; 'orix' or 'tape' prepends");
                        println!("  the matching loader header.");
                        continue;
                    }
                    let src_filename = &parts[1];

                    // Parse arguments: filename [output_path] [orix|tape]
                    let mut output_path = None;
                    let mut header = ExportHeader::None;

                    for arg in parts.iter().skip(2) {
                        if let Some(h) = ExportHeader::from_str(arg) {
                            header = h;
                        } else if output_path.is_none() {
                            output_path = Some(arg.clone());
                        }
                    }

                    // If no output path specified, use the source filename
                    let output_path = output_path.unwrap_or_else(|| src_filename.clone());

                    match FtdosFileSystem::mount(img).and_then(|fs| fs.read_file(src_filename)) {
                        Ok(record) => {
                            let result = std::fs::File::create(&output_path).and_then(|mut out| {
                                export::write_record(&mut out, header, src_filename, &record)
                            });
                            match result {
                                Ok(_) => println!(
                                    "Exported {} ({} bytes, {}) to {}",
                                    src_filename,
                                    record.bytes.len(),
                                    header,
                                    output_path
                                ),
                                Err(e) => println!("Error writing file: {}", e),
                            }
                        }
                        Err(e) => println!("Error reading file: {}", e),
                    }
                } else {
                    println!("No image loaded.");
                }
            }
            "bitmap" | "map" => {
                if let Some(ref img) = image {
                    match FtdosFileSystem::mount(img).and_then(|fs| fs.bitmap_sector()) {
                        Ok(raw) => {
                            let header = img.header();
                            map::draw_allocation_map(
                                &raw,
                                header.tracks as usize,
                                header.sides as usize,
                            );
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No image loaded.");
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", command);
            }
        }
    }
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(current.clone());
                    current.clear();
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <path>                    - Open an MFM_DISK image file (use quotes for paths with spaces)");
    println!("  info                           - Show image and filesystem information");
    println!("  tracks                         - List all tracks with recovered sector counts");
    println!("  sectors [track] [side]         - List a track's recovered sector offsets");
    println!("  read-sector <t> <s> [side]     - Read and display a sector");
    println!("  fs-list                        - List catalog entries (dir, cat, ls)");
    println!("  fs-read <filename>             - Read and hex dump a file from the catalog");
    println!("  fs-export <file> [out] [hdr]   - Export a file to the host filesystem");
    println!("                                   (hdr: orix or tape loader header, bare by default)");
    println!("  bitmap                         - Per-track allocation map (map)");
    println!("  help                           - Show this help");
    println!("  quit, exit                     - Exit");
}

fn print_info(image: &MfmImage) {
    let header = image.header();
    println!("Path: {}", image.path().display());
    println!("Signature: MFM_DISK");
    println!("Sides: {}", header.sides);
    println!("Tracks per side: {}", header.tracks);
    println!("Geometry code: {}", header.geometry);

    match FtdosFileSystem::mount(image) {
        Ok(fs) => {
            println!("DOS: FT-Dos");
            println!("Sectors per track: {}", fs.sectors_per_track());
            match fs.disk_name() {
                Ok(name) => println!("Volume: {}", name),
                Err(e) => println!("Volume: <{}>", e),
            }
            println!("Files: {}", fs.catalog().len());
        }
        Err(e) => println!("DOS: not recognised ({})", e),
    }
}

fn list_tracks(image: &MfmImage) {
    let header = image.header();

    for side in 0..header.sides {
        println!("\nSide {}:", side);
        println!("{:<8} {:<8} {:<8}", "Track", "Sectors", "No Data");
        println!("{}", "-".repeat(26));

        for track_num in 0..header.tracks {
            match image.read_track(track_num as u8, side as u8) {
                Ok(track) => {
                    let missing = track.sectors().filter(|s| !s.has_data()).count();
                    println!(
                        "{:<8} {:<8} {:<8}",
                        track_num,
                        track.sector_count(),
                        missing
                    );
                }
                Err(e) => println!("{:<8} Error: {}", track_num, e),
            }
        }
    }
}

fn list_sectors_on_track(image: &MfmImage, track_num: u8, side: u8) {
    match image.read_track(track_num, side) {
        Ok(track) => {
            println!(
                "{:<8} {:<8} {:<8} {:<10} {:<11}",
                "Sector", "Track", "Size", "ID Offset", "Data Offset"
            );
            println!("{}", "-".repeat(48));

            for entry in track.sectors() {
                let data_offset = match entry.data_offset {
                    Some(offset) => offset.to_string(),
                    None => "-".to_string(),
                };
                println!(
                    "{:<8} {:<8} {:<8} {:<10} {:<11}",
                    entry.id.sector,
                    entry.id.track,
                    entry.id.size_bytes(),
                    entry.id_offset,
                    data_offset
                );
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn list_catalog(fs: &FtdosFileSystem) {
    if fs.catalog().is_empty() {
        println!("No files found.");
        return;
    }

    if let Ok(name) = fs.disk_name() {
        println!("Volume: {}\n", name);
    }

    println!(
        "{:<14} {:>5} {:>6} {:>5} {:>4} {:>4} {}",
        "Name", "Track", "Sector", "Blks", "Lock", "Type", "Kind"
    );
    println!("{}", "-".repeat(52));

    for (name, entry) in fs.catalog() {
        println!(
            "{:<14} {:>5} {:>6} {:>5} {:>4} {:>4} ({})",
            name,
            entry.first_fcb_track,
            entry.first_fcb_sector,
            entry.size_blocks,
            entry.lock,
            entry.type_flag,
            entry.content
        );
    }
}

fn print_record(name: &str, record: &FileRecord) {
    println!("File: {} ({} bytes)", name, record.bytes.len());
    println!("Type: {:02X}", record.file_type);
    println!("Load address: {:04X}", record.load_address);
    println!("End address: {:04X}", record.end_address);
    if record.exec_address != 0 {
        println!("Exec address: {:04X}", record.exec_address);
    }
}

fn print_hex_dump(data: &[u8], max_bytes: usize) {
    let len = data.len().min(max_bytes);

    for (i, chunk) in data[..len].chunks(16).enumerate() {
        print!("{:04X}: ", i * 16);

        // Print hex
        for (j, byte) in chunk.iter().enumerate() {
            print!("{:02X} ", byte);
            if j == 7 {
                print!(" ");
            }
        }

        // Pad if less than 16 bytes
        for j in chunk.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");

        // Print ASCII
        for byte in chunk {
            let c = if *byte >= 32 && *byte < 127 {
                *byte as char
            } else {
                '.'
            };
            print!("{}", c);
        }

        println!("|");
    }

    if data.len() > max_bytes {
        println!("... ({} more bytes)", data.len() - max_bytes);
    }
}
