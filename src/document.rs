//! Document Assembler: translated-text PDF and image CBZ per chapter
//!
//! Both writers are deterministic: the PDF carries no dates or IDs and the
//! CBZ uses sorted entry names with a fixed modification time, so rebuilding
//! from the same inputs yields identical bytes.

use crate::helpers::is_image_file_name;
use crate::models::Transcription;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const HEADER_SIZE: i64 = 14;
const BODY_SIZE: i64 = 11;
const LEADING: i64 = 14;
const BODY_TOP: i64 = PAGE_HEIGHT - MARGIN - 2 * LEADING;
/// Characters per body line at 11pt Helvetica inside the margins
const WRAP_COLUMNS: usize = 90;
const MAX_BODY_LINES: usize = ((BODY_TOP - MARGIN) / LEADING) as usize + 1;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("nothing to write: {0}")]
    Empty(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to serialise PDF: {0}")]
    Encode(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> DocumentError + '_ {
    move |source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One PDF page: a bold header line and plain body lines
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub header: String,
    pub lines: Vec<String>,
}

/// Encode text for a WinAnsi Type1 font; unmappable characters become `?`
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '\t' => b' ',
            c if (c as u32) >= 0x20 && (c as u32) < 0x7F => c as u8,
            c if (c as u32) >= 0xA0 && (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn from_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x85 => '…',
            0x91 => '‘',
            0x92 => '’',
            0x93 => '“',
            0x94 => '”',
            0x96 => '–',
            0x97 => '—',
            0x80 => '€',
            b => b as char,
        })
        .collect()
}

/// Greedy word wrap; words longer than `width` are split
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            out.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let current_len = current.chars().count();
        if current.is_empty() {
            current = word;
        } else if current_len + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            out.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

/// Paragraph lines of `text`, wrapped to the page width. Empty text gives no lines.
pub fn body_lines(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.trim()
        .lines()
        .flat_map(|l| wrap_line(l.trim(), WRAP_COLUMNS))
        .collect()
}

/// Fit body lines on one page, ending with an ellipsis line when clipped
fn clip_to_page(mut lines: Vec<String>, header: &str) -> Vec<String> {
    if lines.len() > MAX_BODY_LINES {
        log::warn!(
            "Text for {} needs {} lines, clipping to {}",
            header,
            lines.len(),
            MAX_BODY_LINES
        );
        lines.truncate(MAX_BODY_LINES - 1);
        lines.push("…".to_string());
    }
    lines
}

fn page_content(page: &PdfPage) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), HEADER_SIZE.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(&page.header), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ];

    if !page.lines.is_empty() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), BODY_SIZE.into()]));
        operations.push(Operation::new("TL", vec![LEADING.into()]));
        operations.push(Operation::new("Td", vec![MARGIN.into(), BODY_TOP.into()]));
        for line in &page.lines {
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(to_win_ansi(line), StringFormat::Literal)],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));
    }

    Content { operations }
}

fn font(doc: &mut Document, base: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Render `pages` into PDF bytes, one PDF page per entry
pub fn render_pdf(pages: &[PdfPage]) -> Result<Vec<u8>, DocumentError> {
    if pages.is_empty() {
        return Err(DocumentError::Empty("no pages".to_string()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = font(&mut doc, "Helvetica");
    let bold = font(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let clipped = PdfPage {
            header: page.header.clone(),
            lines: clip_to_page(page.lines.clone(), &page.header),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(&clipped).encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| DocumentError::Encode(e.to_string()))?;
    Ok(out)
}

/// Write `bytes` to `path` through a `.tmp` sibling so readers never see a partial file
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    std::fs::rename(&tmp, path).map_err(io_err(path))
}

/// PDF with one page per transcription: filename header, translated text body
pub fn build_pdf(transcriptions: &[Transcription], path: &Path) -> Result<usize, DocumentError> {
    let pages: Vec<PdfPage> = transcriptions
        .iter()
        .map(|t| PdfPage {
            header: t.filename.clone(),
            lines: body_lines(t.translated_text()),
        })
        .collect();
    write_pdf(&pages, path)
}

/// Render `pages` and write them to `path`; returns the page count
pub fn write_pdf(pages: &[PdfPage], path: &Path) -> Result<usize, DocumentError> {
    let bytes = render_pdf(pages)?;
    write_atomically(path, &bytes)?;
    log::info!("Wrote {} ({} page(s))", path.display(), pages.len());
    Ok(pages.len())
}

/// Text lines of each page, header first, as written by [`render_pdf`]
pub fn read_page_lines(path: &Path) -> Result<Vec<Vec<String>>, DocumentError> {
    let doc = Document::load(path)?;
    let mut pages = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let content = Content::decode(&doc.get_page_content(page_id)?)?;
        let lines = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(from_win_ansi(bytes)),
                _ => None,
            })
            .collect();
        pages.push(lines);
    }
    Ok(pages)
}

/// Zip every image in `image_dir` into a flat, name-sorted CBZ. Returns the image count.
pub fn build_cbz(
    image_dir: &Path,
    cbz_path: &Path,
    comicinfo_xml: Option<&str>,
) -> Result<usize, DocumentError> {
    let images = crate::transcriber::list_images(image_dir).map_err(io_err(image_dir))?;
    if images.is_empty() {
        return Err(DocumentError::Empty(format!(
            "no images in {}",
            image_dir.display()
        )));
    }

    let fixed_time = DateTime::default();
    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(fixed_time);
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(fixed_time);

    let tmp_path = cbz_path.with_extension("cbz.tmp");
    let file = File::create(&tmp_path).map_err(io_err(&tmp_path))?;
    let mut zip = ZipWriter::new(file);

    let result = (|| -> Result<(), DocumentError> {
        if let Some(xml) = comicinfo_xml {
            zip.start_file("ComicInfo.xml", deflated)?;
            zip.write_all(xml.as_bytes()).map_err(io_err(cbz_path))?;
        }
        for image in &images {
            let name = image
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let bytes = std::fs::read(image).map_err(io_err(image))?;
            zip.start_file(name, stored)?;
            zip.write_all(&bytes).map_err(io_err(cbz_path))?;
        }
        zip.finish()?;
        Ok(())
    })();

    if let Err(e) = result {
        // Cleanup partial file on error
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, cbz_path).map_err(io_err(cbz_path))?;
    log::info!("Wrote {} ({} image(s))", cbz_path.display(), images.len());
    Ok(images.len())
}

/// Names of the image entries of a CBZ, in archive order
pub fn cbz_image_entries(cbz_path: &Path) -> Result<Vec<String>, DocumentError> {
    let file = File::open(cbz_path).map_err(io_err(cbz_path))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if is_image_file_name(entry.name()) {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}
