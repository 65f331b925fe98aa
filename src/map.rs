/// Allocation bitmap visualization

/// Glyph for a used (or reserved) sector
const GLYPH_USED: char = '*';
/// Glyph for a free sector
const GLYPH_FREE: char = '.';

/// Sectors rendered per track side
const SECTORS_PER_ROW: usize = 17;

/// Decode the allocation bitmap sector into one usage string per track side
///
/// The sector holds `tracks * sides` groups of 3 bytes, side-major. Groups
/// are read back to front: the last byte is the marker — top bit set means
/// a reserved/out-of-range track, rendered fully occupied; otherwise its
/// lowest bit covers sector 1 and the remaining two bytes cover eight
/// sectors each, high bit first. A set bit is a free sector.
pub fn decode_bitmap(raw: &[u8], tracks: usize, sides: usize) -> Vec<String> {
    let mut rows = Vec::with_capacity(tracks * sides);

    for group in 0..tracks * sides {
        let base = group * 3;
        if base + 3 > raw.len() {
            break;
        }

        let marker = raw[base + 2];
        let mut row = String::with_capacity(SECTORS_PER_ROW);

        if marker >= 0x80 {
            for _ in 0..SECTORS_PER_ROW {
                row.push(GLYPH_USED);
            }
        } else {
            row.push(if marker & 0x01 == 0x01 {
                GLYPH_FREE
            } else {
                GLYPH_USED
            });
            for byte in [raw[base + 1], raw[base]] {
                for bit in (0..8).rev() {
                    row.push(if byte & (1 << bit) != 0 {
                        GLYPH_FREE
                    } else {
                        GLYPH_USED
                    });
                }
            }
        }

        rows.push(row);
    }

    rows
}

/// Draw the per-track allocation map, sides separated by ` : `
pub fn draw_allocation_map(raw: &[u8], tracks: usize, sides: usize) {
    let rows = decode_bitmap(raw, tracks, sides);

    for track in 0..tracks {
        print!("Track {:02}: ", track);

        for side in 0..sides {
            let index = side * tracks + track;
            let Some(row) = rows.get(index) else {
                break;
            };

            if side > 0 {
                print!(" : ");
            }

            let base = index * 3;
            print!("{:02X} {:02X} {:02X} ", raw[base + 2], raw[base + 1], raw[base]);
            for glyph in row.chars() {
                print!("{} ", glyph);
            }
        }
        println!();
    }
}
