use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::domain::requirement::Requirement;
use crate::error::{AppError, AppResult};
use crate::services::RequirementSource;

const DOCUMENT_XML: &str = "word/document.xml";

/// Picks a reader by file extension: `.docx` is parsed as Word, anything else as plain text.
pub fn open(path: &Path) -> AppResult<Box<dyn RequirementSource>> {
    if !path.is_file() {
        return Err(AppError::Document(format!(
            "{} does not exist or is not a file",
            path.display()
        )));
    }

    let is_docx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));

    if is_docx {
        Ok(Box::new(DocxDocument::new(path.to_path_buf())))
    } else {
        Ok(Box::new(TextDocument::new(path.to_path_buf())))
    }
}

pub struct DocxDocument {
    path: PathBuf,
}

impl DocxDocument {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_document_xml(&self) -> AppResult<String> {
        let file = File::open(&self.path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|err| {
            AppError::Document(format!("{} is not a DOCX archive: {err}", self.path.display()))
        })?;
        let mut entry = archive.by_name(DOCUMENT_XML).map_err(|_| {
            AppError::Document(format!(
                "{} is missing {DOCUMENT_XML}",
                self.path.display()
            ))
        })?;

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|err| AppError::Document(format!("failed to read {DOCUMENT_XML}: {err}")))?;
        Ok(xml)
    }
}

impl RequirementSource for DocxDocument {
    fn extract(&self) -> AppResult<Vec<Requirement>> {
        let xml = self.read_document_xml()?;
        Ok(Requirement::collect(docx_paragraphs(&xml)?))
    }
}

/// Paragraph texts from a WordprocessingML body, one entry per `<w:p>`.
///
/// Paragraphs can nest (a text box inside a run); each level keeps its own buffer and
/// the inner paragraph is emitted when it closes, before the outer one.
fn docx_paragraphs(xml: &str) -> AppResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if let Some(current) = open.last_mut() {
                    match e.local_name().as_ref() {
                        b"tab" => current.push('\t'),
                        b"br" | b"cr" => current.push('\n'),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(finished) = open.pop() {
                        paragraphs.push(finished);
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| AppError::Document(format!("invalid DOCX text: {err}")))?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(AppError::Document(format!(
                    "XML parse error at position {}: {err}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

pub struct TextDocument {
    path: PathBuf,
}

impl TextDocument {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RequirementSource for TextDocument {
    fn extract(&self) -> AppResult<Vec<Requirement>> {
        let contents = fs::read_to_string(&self.path).map_err(|err| {
            AppError::Document(format!("failed to read {}: {err}", self.path.display()))
        })?;
        Ok(Requirement::collect(text_blocks(&contents)))
    }
}

/// Blocks separated by blank lines; lines inside a block are joined with a space.
fn text_blocks(contents: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join(" "));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Users can reset their password.</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t xml:space="preserve">Admins can </w:t></w:r><w:r><w:t>export &amp; archive reports.</w:t></w:r></w:p>
    <w:p><w:r><w:t>   </w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    fn write_docx(dir: &Path, xml: &str) -> PathBuf {
        let path = dir.join("requirements.docx");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file(DOCUMENT_XML, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
        path
    }

    #[test]
    fn extracts_non_empty_docx_paragraphs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(dir.path(), BODY);

        let requirements = open(&path).unwrap().extract().unwrap();
        let texts = requirements
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            texts,
            vec![
                "Users can reset their password.",
                "Admins can export & archive reports."
            ]
        );
        assert_eq!(requirements[1].index, 1);
    }

    #[test]
    fn keeps_line_breaks_inside_a_paragraph() {
        let xml = r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>First</w:t><w:br/><w:t>second</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(docx_paragraphs(xml).unwrap(), vec!["First\nsecond"]);
    }

    #[test]
    fn text_box_paragraph_does_not_drop_outer_text() {
        let xml = r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>Users can </w:t></w:r><w:r><w:txbxContent><w:p><w:r><w:t>Callout</w:t></w:r></w:p></w:txbxContent></w:r><w:r><w:t>log in.</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(
            docx_paragraphs(xml).unwrap(),
            vec!["Callout", "Users can log in."]
        );
    }

    #[test]
    fn rejects_archive_without_document_xml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file("word/other.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        writer.finish().unwrap();

        let err = open(&path).unwrap().extract().unwrap_err();
        assert!(matches!(err, AppError::Document(_)));
    }

    #[test]
    fn splits_text_on_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.md");
        fs::write(
            &path,
            "Users can reset\ntheir password.\n\n\n  \nAdmins can export reports.\n",
        )
        .unwrap();

        let requirements = open(&path).unwrap().extract().unwrap();
        assert_eq!(requirements.len(), 2);
        assert_eq!(requirements[0].text, "Users can reset their password.");
        assert_eq!(requirements[1].text, "Admins can export reports.");
    }

    #[test]
    fn missing_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            open(&dir.path().join("nope.docx")),
            Err(AppError::Document(_))
        ));
    }
}
