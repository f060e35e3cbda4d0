use std::io::Read;

use flate2::read::DeflateDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::types::{FormatReader, RawPage};
use super::ExtractionError;

/// ZIP entry holding the document body.
const BODY_ENTRY: &str = "word/document.xml";

/// Upper bound on the inflated body size.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;
const LOCAL_SIGNATURE: u32 = 0x0403_4b50;
const EOCD_MIN_LEN: usize = 22;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// General-purpose flag bit 0: entry is encrypted.
const FLAG_ENCRYPTED: u16 = 0x0001;

/// DOCX reader: body paragraphs from `word/document.xml`.
/// DOCX has no stable pagination, so the document is a single page.
pub struct DocxReader;

impl FormatReader for DocxReader {
    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<RawPage>, ExtractionError> {
        let xml = read_zip_entry(bytes, BODY_ENTRY)?;
        let xml = String::from_utf8(xml)
            .map_err(|e| corrupt(format!("document.xml is not UTF-8: {e}")))?;
        let text = body_text(&xml)?;

        Ok(vec![RawPage {
            page_number: None,
            text,
        }])
    }
}

fn corrupt(msg: impl Into<String>) -> ExtractionError {
    ExtractionError::CorruptFile(msg.into())
}

fn u16_at(bytes: &[u8], pos: usize) -> Result<u16, ExtractionError> {
    bytes
        .get(pos..pos + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| corrupt("truncated ZIP structure"))
}

fn u32_at(bytes: &[u8], pos: usize) -> Result<u32, ExtractionError> {
    bytes
        .get(pos..pos + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| corrupt("truncated ZIP structure"))
}

/// Locate the end-of-central-directory record, scanning back over a
/// possible archive comment.
fn find_eocd(bytes: &[u8]) -> Result<usize, ExtractionError> {
    if bytes.len() < EOCD_MIN_LEN {
        return Err(corrupt("too small to be a ZIP archive"));
    }
    let last = bytes.len() - EOCD_MIN_LEN;
    let first = last.saturating_sub(u16::MAX as usize);
    (first..=last)
        .rev()
        .find(|&pos| u32_at(bytes, pos).ok() == Some(EOCD_SIGNATURE))
        .ok_or_else(|| corrupt("ZIP end of central directory not found"))
}

fn zip64_unsupported() -> ExtractionError {
    corrupt("ZIP64 archives are not supported")
}

/// Read and inflate a single entry of a ZIP archive.
pub(crate) fn read_zip_entry(bytes: &[u8], name: &str) -> Result<Vec<u8>, ExtractionError> {
    read_zip_entry_limited(bytes, name, MAX_BODY_BYTES)
}

/// As `read_zip_entry`, failing when the entry inflates past `limit` bytes.
fn read_zip_entry_limited(
    bytes: &[u8],
    name: &str,
    limit: u64,
) -> Result<Vec<u8>, ExtractionError> {
    let eocd = find_eocd(bytes)?;
    let entries = u16_at(bytes, eocd + 10)?;
    let cd_offset = u32_at(bytes, eocd + 16)?;
    if entries == u16::MAX || cd_offset == u32::MAX {
        return Err(zip64_unsupported());
    }
    let mut pos = cd_offset as usize;

    for _ in 0..entries {
        if u32_at(bytes, pos)? != CENTRAL_SIGNATURE {
            return Err(corrupt("bad ZIP central directory entry"));
        }
        let flags = u16_at(bytes, pos + 8)?;
        let method = u16_at(bytes, pos + 10)?;
        let compressed = u32_at(bytes, pos + 20)?;
        let name_len = u16_at(bytes, pos + 28)? as usize;
        let extra_len = u16_at(bytes, pos + 30)? as usize;
        let comment_len = u16_at(bytes, pos + 32)? as usize;
        let local_offset = u32_at(bytes, pos + 42)?;
        let entry_name = bytes
            .get(pos + 46..pos + 46 + name_len)
            .ok_or_else(|| corrupt("truncated ZIP entry name"))?;

        if entry_name == name.as_bytes() {
            if flags & FLAG_ENCRYPTED != 0 {
                return Err(corrupt(format!("{name} is encrypted")));
            }
            if compressed == u32::MAX || local_offset == u32::MAX {
                return Err(zip64_unsupported());
            }
            return inflate_local_entry(
                bytes,
                local_offset as usize,
                method,
                compressed as usize,
                limit,
            );
        }
        pos += 46 + name_len + extra_len + comment_len;
    }

    Err(corrupt(format!("{name} missing from archive")))
}

fn inflate_local_entry(
    bytes: &[u8],
    offset: usize,
    method: u16,
    compressed: usize,
    limit: u64,
) -> Result<Vec<u8>, ExtractionError> {
    if u32_at(bytes, offset)? != LOCAL_SIGNATURE {
        return Err(corrupt("bad ZIP local header"));
    }
    let name_len = u16_at(bytes, offset + 26)? as usize;
    let extra_len = u16_at(bytes, offset + 28)? as usize;
    let start = offset + 30 + name_len + extra_len;
    let data = bytes
        .get(start..start + compressed)
        .ok_or_else(|| corrupt("truncated ZIP entry data"))?;

    let mut out = Vec::new();
    match method {
        METHOD_STORED => out.extend_from_slice(data),
        METHOD_DEFLATE => {
            DeflateDecoder::new(data)
                .take(limit.saturating_add(1))
                .read_to_end(&mut out)
                .map_err(|e| corrupt(format!("inflate failed: {e}")))?;
        }
        other => return Err(corrupt(format!("unsupported ZIP compression method {other}"))),
    }
    if out.len() as u64 > limit {
        return Err(corrupt(format!("document body exceeds limit of {limit} bytes")));
    }
    Ok(out)
}

/// Flatten WordprocessingML into text: one line per `<w:p>`, a blank line
/// between paragraphs. Tabs become spaces, `<w:br/>` becomes a line break.
pub(crate) fn body_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"p" => start_paragraph(&mut out),
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = false;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push(' '),
                b"br" | b"cr" => out.push('\n'),
                b"p" => start_paragraph(&mut out),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| corrupt(format!("document.xml: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(corrupt(format!("document.xml: {e}"))),
        }
    }

    Ok(out)
}

fn start_paragraph(out: &mut String) {
    if !out.is_empty() {
        out.push_str("\n\n");
    }
}
