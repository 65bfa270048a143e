//! Ingest parsing for the CSV formats external harnesses feed the index.
//!
//! Two formats, both with a header row that is skipped unparsed:
//!
//! - **Records**: each line is `D` vector components followed by one
//!   scalar `s` — `v0,v1,...,s`.
//! - **Query batches**: each line is `D` vector components, then integer
//!   `k`, then `smin`, `smax`, then an integer candidate budget `o` —
//!   `v0,...,k,smin,smax,o`.
//!
//! The vector dimension is taken from the first data line; later lines
//! must agree. Malformed lines fail the whole parse with the offending
//! line number rather than being skipped silently.

use std::io::BufRead;

use crate::error::{IndexError, Result};

/// One parsed query line: vector, k, scalar range, candidate budget.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec {
    pub vector: Vec<f32>,
    pub k: usize,
    pub smin: f32,
    pub smax: f32,
    pub candidates: usize,
}

fn parse_f32(field: &str, line_no: usize) -> Result<f32> {
    field.trim().parse().map_err(|_| {
        IndexError::InvalidRecord(format!("line {line_no}: not a float: {field:?}"))
    })
}

fn parse_usize(field: &str, line_no: usize) -> Result<usize> {
    field.trim().parse().map_err(|_| {
        IndexError::InvalidRecord(format!("line {line_no}: not an integer: {field:?}"))
    })
}

fn read_error(line_no: usize, err: std::io::Error) -> IndexError {
    IndexError::InvalidRecord(format!("line {line_no}: read failed: {err}"))
}

/// Parse a record CSV: one `(vector, s)` pair per line after the header.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<(Vec<f32>, f32)>> {
    let mut records = Vec::new();
    let mut dim = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| read_error(line_no, e))?;
        if idx == 0 || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 2 {
            return Err(IndexError::InvalidRecord(format!(
                "line {line_no}: expected at least one component and a scalar"
            )));
        }
        let expected = *dim.get_or_insert(fields.len() - 1);
        if fields.len() - 1 != expected {
            return Err(IndexError::InvalidRecord(format!(
                "line {line_no}: expected {expected} components, got {}",
                fields.len() - 1
            )));
        }

        let vector = fields[..expected]
            .iter()
            .map(|f| parse_f32(f, line_no))
            .collect::<Result<Vec<f32>>>()?;
        let s = parse_f32(fields[expected], line_no)?;
        records.push((vector, s));
    }
    Ok(records)
}

/// Parse a query-batch CSV: one [`QuerySpec`] per line after the header.
pub fn read_queries<R: BufRead>(reader: R) -> Result<Vec<QuerySpec>> {
    let mut queries = Vec::new();
    let mut dim = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| read_error(line_no, e))?;
        if idx == 0 || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 5 {
            return Err(IndexError::InvalidRecord(format!(
                "line {line_no}: expected components plus k, smin, smax, o"
            )));
        }
        let expected = *dim.get_or_insert(fields.len() - 4);
        if fields.len() - 4 != expected {
            return Err(IndexError::InvalidRecord(format!(
                "line {line_no}: expected {expected} components, got {}",
                fields.len() - 4
            )));
        }

        let vector = fields[..expected]
            .iter()
            .map(|f| parse_f32(f, line_no))
            .collect::<Result<Vec<f32>>>()?;
        queries.push(QuerySpec {
            vector,
            k: parse_usize(fields[expected], line_no)?,
            smin: parse_f32(fields[expected + 1], line_no)?,
            smax: parse_f32(fields[expected + 2], line_no)?,
            candidates: parse_usize(fields[expected + 3], line_no)?,
        });
    }
    Ok(queries)
}
