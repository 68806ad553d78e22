// On-disk path profile format: header table plus per-procedure path tables

pub mod collector;
pub mod db;

pub use collector::PathCollector;
pub use db::ProfileDb;

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Size of one header record on disk: three u32 fields
pub const HEADER_SIZE: u32 = 12;

/// Size of one path record on disk: u64 id, u32 count, 4 bytes padding
/// carried over from the original C struct layout
pub const PATH_RECORD_SIZE: u32 = 16;

/// Header-table record for one procedure
///
/// `offset` is the absolute byte offset of the procedure's path table in
/// the file. The table ends with a sentinel record whose `num_paths` is
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcHeader {
    pub function_id: u32,
    pub offset: u32,
    pub num_paths: u32,
}

/// One recorded path and its execution count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRecord {
    pub path_id: u64,
    pub exec_count: u32,
}

/// The recorded paths of one procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcProfile {
    pub function_id: u32,
    pub paths: Vec<PathRecord>,
}

/// Errors raised while reading or writing a profile file
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("profile file truncated while reading {0}")]
    Truncated(&'static str),
    #[error("header table has no sentinel record")]
    MissingSentinel,
}

/// Write a profile: per-procedure path-count maps indexed by procedure id
///
/// Everything is little-endian. The header table covers procedures
/// `0..=max_proc_id` plus the sentinel; each header's offset points at the
/// procedure's slice of the concatenated path tables.
pub fn write_profile<W: Write>(
    out: &mut W,
    counts: &[BTreeMap<u64, u32>],
) -> Result<(), ProfileError> {
    let num_procs = counts.len() as u32;
    let fixed_offset = (num_procs + 1) * HEADER_SIZE;

    let mut cumulative: u32 = 0;
    for (id, paths) in counts.iter().enumerate() {
        let header = ProcHeader {
            function_id: id as u32,
            offset: fixed_offset + cumulative * PATH_RECORD_SIZE,
            num_paths: paths.len() as u32,
        };
        write_header(out, &header)?;
        cumulative += paths.len() as u32;
    }

    // Sentinel: one id past the end, zero paths
    write_header(
        out,
        &ProcHeader {
            function_id: num_procs,
            offset: fixed_offset + cumulative * PATH_RECORD_SIZE,
            num_paths: 0,
        },
    )?;

    for paths in counts {
        for (&path_id, &exec_count) in paths {
            write_record(out, &PathRecord { path_id, exec_count })?;
        }
    }

    Ok(())
}

/// Read a profile file back into per-procedure path tables
///
/// The header-table length is recovered from the first header's offset,
/// which always points just past the table; the last record must be the
/// zero-path sentinel.
pub fn read_profile<R: Read>(input: &mut R) -> Result<Vec<ProcProfile>, ProfileError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;

    let first = parse_header(&bytes, 0)?;
    if first.offset < HEADER_SIZE || first.offset % HEADER_SIZE != 0 {
        return Err(ProfileError::MissingSentinel);
    }
    let header_count = (first.offset / HEADER_SIZE) as usize;

    let sentinel = parse_header(&bytes, (header_count - 1) * HEADER_SIZE as usize)?;
    if sentinel.num_paths != 0 {
        return Err(ProfileError::MissingSentinel);
    }

    let mut procs = Vec::new();
    for i in 0..header_count - 1 {
        let header = parse_header(&bytes, i * HEADER_SIZE as usize)?;
        let mut paths = Vec::new();
        let mut at = header.offset as usize;
        for _ in 0..header.num_paths {
            paths.push(parse_record(&bytes, at)?);
            at += PATH_RECORD_SIZE as usize;
        }
        procs.push(ProcProfile { function_id: header.function_id, paths });
    }

    Ok(procs)
}

fn write_header<W: Write>(out: &mut W, header: &ProcHeader) -> Result<(), ProfileError> {
    out.write_all(&header.function_id.to_le_bytes())?;
    out.write_all(&header.offset.to_le_bytes())?;
    out.write_all(&header.num_paths.to_le_bytes())?;
    Ok(())
}

fn write_record<W: Write>(out: &mut W, record: &PathRecord) -> Result<(), ProfileError> {
    out.write_all(&record.path_id.to_le_bytes())?;
    out.write_all(&record.exec_count.to_le_bytes())?;
    out.write_all(&[0u8; 4])?;
    Ok(())
}

fn parse_header(bytes: &[u8], at: usize) -> Result<ProcHeader, ProfileError> {
    let end = at + HEADER_SIZE as usize;
    if end > bytes.len() {
        return Err(ProfileError::Truncated("header record"));
    }
    Ok(ProcHeader {
        function_id: u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()),
        offset: u32::from_le_bytes(bytes[at + 4..at + 8].try_into().unwrap()),
        num_paths: u32::from_le_bytes(bytes[at + 8..at + 12].try_into().unwrap()),
    })
}

fn parse_record(bytes: &[u8], at: usize) -> Result<PathRecord, ProfileError> {
    let end = at + PATH_RECORD_SIZE as usize;
    if end > bytes.len() {
        return Err(ProfileError::Truncated("path record"));
    }
    Ok(PathRecord {
        path_id: u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap()),
        exec_count: u32::from_le_bytes(bytes[at + 8..at + 12].try_into().unwrap()),
    })
}
