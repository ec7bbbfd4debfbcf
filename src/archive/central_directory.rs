//! Raw central directory listing
//!
//! `zip::ZipArchive` keys entries by name, so a container that stores the
//! same name twice is listed with a single entry carrying the data of the
//! last record. Broker archives are copied first-occurrence-wins, so the
//! central directory is also walked here, in order and duplicates included,
//! and the first record of every repeated name is read directly.
//!
//! Only the plain layout is handled: a single disk and no Zip64 fields.
//! Anything else yields no listing and the zip crate's view is used as is.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};

use flate2::read::DeflateDecoder;
use log::debug;

const SIG_EOCD: u32 = 0x0605_4b50;
const SIG_CDFH: u32 = 0x0201_4b50;
const SIG_LFH: u32 = 0x0403_4b50;

const EOCD_LEN: usize = 22;
// 64 KiB comment + record
const EOCD_SEARCH_MAX: u64 = 66 * 1024;
const CDFH_LEN: usize = 46;
const LFH_LEN: usize = 30;

const FLAG_ENCRYPTED: u16 = 0x0001;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

/// One central directory record, in container order
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawRecord {
    pub name: String,
    pub flags: u16,
    pub method: u16,
    pub compressed_size: u64,
    pub local_header_offset: u64,
}

fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Position of the end-of-central-directory record whose comment fits the
/// window, scanning backwards.
fn find_eocd(window: &[u8]) -> Option<usize> {
    if window.len() < EOCD_LEN {
        return None;
    }
    (0..=window.len() - EOCD_LEN).rev().find(|&pos| {
        le_u32(&window[pos..pos + 4]) == SIG_EOCD
            && pos + EOCD_LEN + le_u16(&window[pos + 20..pos + 22]) as usize <= window.len()
    })
}

/// List the central directory records in order.
///
/// Returns `Ok(None)` for layouts this listing does not handle.
pub(crate) fn records<R: Read + Seek>(reader: &mut R) -> io::Result<Option<Vec<RawRecord>>> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let window_len = file_len.min(EOCD_SEARCH_MAX);
    reader.seek(SeekFrom::Start(file_len - window_len))?;
    let mut window = vec![0u8; window_len as usize];
    reader.read_exact(&mut window)?;

    let Some(eocd_pos) = find_eocd(&window) else {
        return Ok(None);
    };
    let eocd = &window[eocd_pos..];
    let disk = le_u16(&eocd[4..6]);
    let cd_disk = le_u16(&eocd[6..8]);
    let entries_disk = le_u16(&eocd[8..10]);
    let entries_total = le_u16(&eocd[10..12]);
    let cd_size = le_u32(&eocd[12..16]);
    let cd_offset = le_u32(&eocd[16..20]);

    if disk != 0 || cd_disk != 0 || entries_disk != entries_total {
        return Ok(None);
    }
    if entries_total == 0xFFFF || cd_size == 0xFFFF_FFFF || cd_offset == 0xFFFF_FFFF {
        return Ok(None);
    }
    if u64::from(cd_offset) + u64::from(cd_size) > file_len {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(u64::from(cd_offset)))?;
    let mut directory = vec![0u8; cd_size as usize];
    reader.read_exact(&mut directory)?;

    let mut records = Vec::with_capacity(entries_total as usize);
    let mut pos = 0usize;
    for _ in 0..entries_total {
        let Some(header) = directory.get(pos..pos + CDFH_LEN) else {
            return Ok(None);
        };
        if le_u32(&header[0..4]) != SIG_CDFH {
            return Ok(None);
        }
        let flags = le_u16(&header[8..10]);
        let method = le_u16(&header[10..12]);
        let compressed_size = le_u32(&header[20..24]);
        let name_len = le_u16(&header[28..30]) as usize;
        let extra_len = le_u16(&header[30..32]) as usize;
        let comment_len = le_u16(&header[32..34]) as usize;
        let local_header_offset = le_u32(&header[42..46]);
        if compressed_size == 0xFFFF_FFFF || local_header_offset == 0xFFFF_FFFF {
            return Ok(None);
        }

        let name_start = pos + CDFH_LEN;
        let Some(name) = directory.get(name_start..name_start + name_len) else {
            return Ok(None);
        };
        records.push(RawRecord {
            name: String::from_utf8_lossy(name).into_owned(),
            flags,
            method,
            compressed_size: u64::from(compressed_size),
            local_header_offset: u64::from(local_header_offset),
        });
        pos = name_start + name_len + extra_len + comment_len;
    }

    Ok(Some(records))
}

/// Read and decompress the data of one record.
pub(crate) fn read_record<R: Read + Seek>(reader: &mut R, record: &RawRecord) -> io::Result<Vec<u8>> {
    if record.flags & FLAG_ENCRYPTED != 0 {
        return Err(invalid(format!("entry '{}' is encrypted", record.name)));
    }

    reader.seek(SeekFrom::Start(record.local_header_offset))?;
    let mut header = [0u8; LFH_LEN];
    reader.read_exact(&mut header)?;
    if le_u32(&header[0..4]) != SIG_LFH {
        return Err(invalid(format!("bad local header for entry '{}'", record.name)));
    }
    let name_len = u64::from(le_u16(&header[26..28]));
    let extra_len = u64::from(le_u16(&header[28..30]));
    reader.seek(SeekFrom::Start(
        record.local_header_offset + LFH_LEN as u64 + name_len + extra_len,
    ))?;

    let mut data = reader.by_ref().take(record.compressed_size);
    let mut content = Vec::new();
    match record.method {
        METHOD_STORED => {
            data.read_to_end(&mut content)?;
        }
        METHOD_DEFLATED => {
            DeflateDecoder::new(data).read_to_end(&mut content)?;
        }
        other => {
            return Err(invalid(format!(
                "unsupported compression method {} for entry '{}'",
                other, record.name
            )))
        }
    }
    if record.method == METHOD_STORED && content.len() as u64 != record.compressed_size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("entry '{}' is truncated", record.name),
        ));
    }
    Ok(content)
}

/// Content of the first record of every name listed more than once, keyed
/// by name. Empty when there are no repeated names.
pub(crate) fn shadowed_entries<R: Read + Seek>(reader: &mut R) -> io::Result<HashMap<String, Vec<u8>>> {
    let Some(records) = records(reader)? else {
        return Ok(HashMap::new());
    };

    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut repeated: Vec<usize> = Vec::new();
    for (position, record) in records.iter().enumerate() {
        match first_seen.get(record.name.as_str()) {
            Some(&first) => {
                debug!("Entry {} is listed more than once, keeping the first", record.name);
                if !repeated.contains(&first) {
                    repeated.push(first);
                }
            }
            None => {
                first_seen.insert(&record.name, position);
            }
        }
    }

    let mut shadowed = HashMap::with_capacity(repeated.len());
    for position in repeated {
        let record = &records[position];
        shadowed.insert(record.name.clone(), read_record(reader, record)?);
    }
    Ok(shadowed)
}
