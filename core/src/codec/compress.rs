//! LZW-style string compression into a URI-safe alphabet
//!
//! The input is processed as UTF-16 code units. Codes are emitted with a bit
//! width that grows with the dictionary, and the bit stream is packed six bits
//! per output character using the unreserved characters `A-Z a-z 0-9 - _`,
//! so the output never needs percent-encoding.

use crate::error::{Result, RouterError};
use std::collections::{HashMap, HashSet};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const BITS_PER_CHAR: u32 = 6;
const RESET_VALUE: u32 = 1 << (BITS_PER_CHAR - 1);

/// Stream markers
const CHAR_8BIT: u32 = 0;
const CHAR_16BIT: u32 = 1;
const END_OF_STREAM: u32 = 2;

/// Compress a string into the URI-safe alphabet
pub fn compress(input: &str) -> String {
    let units: Vec<u16> = input.encode_utf16().collect();
    let mut encoder = Encoder::new();

    for &unit in &units {
        let c = vec![unit];
        if !encoder.dictionary.contains_key(&c) {
            encoder.dictionary.insert(c.clone(), encoder.dict_size);
            encoder.dict_size += 1;
            encoder.to_create.insert(c);
        }

        let mut wc = encoder.w.clone();
        wc.push(unit);
        if encoder.dictionary.contains_key(&wc) {
            encoder.w = wc;
        } else {
            encoder.emit_w();
            encoder.dictionary.insert(wc, encoder.dict_size);
            encoder.dict_size += 1;
            encoder.w = vec![unit];
        }
    }

    if !encoder.w.is_empty() {
        encoder.emit_w();
    }

    encoder.out.write_bits(END_OF_STREAM, encoder.num_bits);
    encoder.out.finish()
}

/// Reverse [`compress`]
pub fn decompress(input: &str) -> Result<String> {
    let values = input
        .chars()
        .map(|c| {
            alphabet_index(c)
                .ok_or_else(|| RouterError::decode(format!("invalid compressed character '{c}'")))
        })
        .collect::<Result<Vec<u32>>>()?;

    if values.is_empty() {
        return Err(RouterError::decode("empty compressed data"));
    }

    let mut reader = BitReader::new(&values);
    let mut dictionary: Vec<Vec<u16>> = vec![Vec::new(), Vec::new(), Vec::new()];
    let mut enlarge_in: u64 = 4;
    let mut num_bits: u32 = 3;

    let first = match reader.read_bits(2) {
        CHAR_8BIT => reader.read_bits(8),
        CHAR_16BIT => reader.read_bits(16),
        END_OF_STREAM => return Ok(String::new()),
        other => return Err(RouterError::decode(format!("invalid stream marker {other}"))),
    } as u16;

    dictionary.push(vec![first]);
    let mut w = vec![first];
    let mut result = w.clone();

    loop {
        if reader.index > values.len() {
            return Err(RouterError::decode("truncated compressed data"));
        }

        let mut code = reader.read_bits(num_bits) as usize;
        match code as u32 {
            CHAR_8BIT | CHAR_16BIT => {
                let width = if code as u32 == CHAR_8BIT { 8 } else { 16 };
                let unit = reader.read_bits(width) as u16;
                dictionary.push(vec![unit]);
                code = dictionary.len() - 1;
                enlarge_in -= 1;
            }
            END_OF_STREAM => {
                return String::from_utf16(&result)
                    .map_err(|e| RouterError::decode(e.to_string()));
            }
            _ => {}
        }

        if enlarge_in == 0 {
            enlarge_in = 1 << num_bits;
            num_bits += 1;
        }

        let entry = if code < dictionary.len() {
            dictionary[code].clone()
        } else if code == dictionary.len() {
            let mut entry = w.clone();
            entry.push(w[0]);
            entry
        } else {
            return Err(RouterError::decode(format!("invalid dictionary code {code}")));
        };

        result.extend_from_slice(&entry);

        let mut next = w;
        next.push(entry[0]);
        dictionary.push(next);
        enlarge_in -= 1;
        w = entry;

        if enlarge_in == 0 {
            enlarge_in = 1 << num_bits;
            num_bits += 1;
        }
    }
}

fn alphabet_index(c: char) -> Option<u32> {
    ALPHABET
        .iter()
        .position(|&b| b as char == c)
        .map(|i| i as u32)
}

struct Encoder {
    dictionary: HashMap<Vec<u16>, u32>,
    /// Single characters that have not been written literally yet
    to_create: HashSet<Vec<u16>>,
    w: Vec<u16>,
    enlarge_in: u64,
    dict_size: u32,
    num_bits: u32,
    out: BitWriter,
}

impl Encoder {
    fn new() -> Self {
        Self {
            dictionary: HashMap::new(),
            to_create: HashSet::new(),
            w: Vec::new(),
            enlarge_in: 2,
            dict_size: 3,
            num_bits: 2,
            out: BitWriter::default(),
        }
    }

    fn emit_w(&mut self) {
        if self.to_create.remove(&self.w) {
            let unit = u32::from(self.w[0]);
            if unit < 256 {
                self.out.write_bits(CHAR_8BIT, self.num_bits);
                self.out.write_bits(unit, 8);
            } else {
                self.out.write_bits(CHAR_16BIT, self.num_bits);
                self.out.write_bits(unit, 16);
            }
            self.shrink_budget();
        } else {
            let code = self.dictionary.get(&self.w).copied().unwrap_or_default();
            self.out.write_bits(code, self.num_bits);
        }
        self.shrink_budget();
    }

    fn shrink_budget(&mut self) {
        self.enlarge_in -= 1;
        if self.enlarge_in == 0 {
            self.enlarge_in = 1 << self.num_bits;
            self.num_bits += 1;
        }
    }
}

#[derive(Default)]
struct BitWriter {
    out: String,
    val: u32,
    position: u32,
}

impl BitWriter {
    fn write_bit(&mut self, bit: u32) {
        self.val = (self.val << 1) | bit;
        if self.position == BITS_PER_CHAR - 1 {
            self.position = 0;
            self.push_char();
        } else {
            self.position += 1;
        }
    }

    /// Write `count` bits of `value`, least significant first
    fn write_bits(&mut self, value: u32, count: u32) {
        let mut value = value;
        for _ in 0..count {
            self.write_bit(value & 1);
            value >>= 1;
        }
    }

    fn push_char(&mut self) {
        self.out.push(ALPHABET[(self.val & 0x3f) as usize] as char);
        self.val = 0;
    }

    fn finish(mut self) -> String {
        loop {
            self.val <<= 1;
            if self.position == BITS_PER_CHAR - 1 {
                self.push_char();
                break;
            }
            self.position += 1;
        }
        self.out
    }
}

struct BitReader<'a> {
    values: &'a [u32],
    val: u32,
    position: u32,
    index: usize,
}

impl<'a> BitReader<'a> {
    fn new(values: &'a [u32]) -> Self {
        Self {
            values,
            val: values[0],
            position: RESET_VALUE,
            index: 1,
        }
    }

    fn read_bits(&mut self, count: u32) -> u32 {
        let mut bits = 0;
        for power in 0..count {
            let bit = self.val & self.position;
            self.position >>= 1;
            if self.position == 0 {
                self.position = RESET_VALUE;
                self.val = self.values.get(self.index).copied().unwrap_or(0);
                self.index += 1;
            }
            if bit > 0 {
                bits |= 1 << power;
            }
        }
        bits
    }
}
